//! # Mistake Memory
//!
//! Durable, semantically searchable persistence for mistake records.
//!
//! The store composes two injected collaborators: an
//! [`lt_core::traits::EmbeddingService`] and a [`index::SemanticIndex`].
//! A file-backed local index ships by default; a Qdrant-backed index is
//! available behind the `qdrant` feature.

pub mod embedding;
pub mod error;
pub mod index;
pub mod store;

pub use error::StoreError;
pub use index::{Document, MetadataFilter, ScoredDocument, SemanticIndex, StoredDocument};
pub use store::MistakeStore;
