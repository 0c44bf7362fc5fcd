pub mod mock;

#[cfg(feature = "llm-integration")]
pub mod openai;

pub use mock::MockCompletionService;

#[cfg(feature = "llm-integration")]
pub use openai::OpenAiCompletionService;
