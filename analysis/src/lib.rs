//! # Analysis
//!
//! Turns raw conversations and (wrong, correct) pairs into canonical
//! mistake records via the external reasoning service, and detects
//! recurring error patterns across a collection of records.
//!
//! Extraction and enrichment are best-effort by contract: a failed service
//! call or an unparseable response is logged and degrades to "no mistakes
//! found" (extraction) or the default enrichment bundle (enrichment). It
//! never crashes the caller's conversation loop.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod llm;
pub mod processor;
pub mod schema;

pub use analyzer::ConversationAnalyzer;
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use processor::{MistakeProcessor, extract_error_pattern};
