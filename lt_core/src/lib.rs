//! # Language-Tutor Core
//!
//! Shared types and traits for the mistake knowledge system.
//!
//! This crate provides:
//! - The canonical [`types::MistakeRecord`] and its enum vocabularies
//! - Transcript and pattern-summary types
//! - Capability traits for the external reasoning and embedding services

pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use traits::{
    DynError, EmbeddingService, SharedCompletionService, SharedEmbeddingService,
    TextCompletionService,
};
pub use types::{
    ChatMessage, ChatRole, Difficulty, ErrorCategory, MistakePair, MistakeRecord, PatternSummary,
    RecurrenceRisk,
};
