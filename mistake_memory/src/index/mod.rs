//! Semantic index abstraction consumed by the mistake store.
//!
//! An index accepts plain text plus a flat string-keyed metadata mapping,
//! supports k-nearest-neighbor lookup by text with an optional exact-match
//! metadata filter, full enumeration, and full deletion. Ids are assigned
//! by the index, never by the caller.

pub mod factory;
pub mod local;

#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use factory::{IndexBackendType, IndexConfig, create_index};
pub use local::LocalIndex;

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A unit of text to index, with its exact-match metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: HashMap<String, String>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A document as stored, with its index-assigned id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub text: String,
    pub metadata: HashMap<String, String>,
}

/// A search hit: stored document plus its similarity score (higher is
/// closer).
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: StoredDocument,
    pub score: f32,
}

/// Exact-match constraint on one metadata field.
#[derive(Debug, Clone)]
pub struct MetadataFilter {
    pub field: String,
    pub value: String,
}

impl MetadataFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, metadata: &HashMap<String, String>) -> bool {
        metadata.get(&self.field).is_some_and(|v| *v == self.value)
    }
}

/// Embedding-backed vector index collaborator.
///
/// Implementations own their synchronization: concurrent `add` calls from
/// independent sessions must all land, and `clear` must be serialized with
/// in-flight writes.
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    /// Indexes the documents and returns their assigned ids, in order.
    async fn add(&self, documents: Vec<Document>) -> Result<Vec<String>, StoreError>;

    /// Returns up to `limit` documents ranked by semantic closeness to
    /// `text`, best first, optionally restricted by an exact-match filter.
    async fn query(
        &self,
        text: &str,
        limit: usize,
        filter: Option<MetadataFilter>,
    ) -> Result<Vec<ScoredDocument>, StoreError>;

    /// Returns every stored document in storage order.
    async fn all(&self) -> Result<Vec<StoredDocument>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// Irreversibly deletes everything; the index stays usable afterward.
    async fn clear(&self) -> Result<(), StoreError>;

    fn index_name(&self) -> &'static str;
}
