//! Capability traits for the external collaborators.
//!
//! The reasoning service and the embedding service are consumed through
//! these narrow contracts and injected as explicitly constructed handles.
//! Construct a service once at startup and pass it by reference; there is
//! no hidden process-wide client.

use async_trait::async_trait;
use std::sync::Arc;

/// Boxed error type used by trait-object service handles.
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// External reasoning service: natural-language completion with a system
/// instruction and a user instruction, returning raw text.
#[async_trait]
pub trait TextCompletionService: Send + Sync {
    type Error;

    async fn complete(&self, system: &str, user: &str) -> Result<String, Self::Error>;
}

/// Handle shape used wherever a completion service is injected.
pub type SharedCompletionService = Arc<dyn TextCompletionService<Error = DynError>>;

/// External embedding service backing semantic similarity search.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    type Error;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error>;

    fn dimension(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Self::Error> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

/// Handle shape used wherever an embedding service is injected.
pub type SharedEmbeddingService = Arc<dyn EmbeddingService<Error = DynError>>;
