//! The mistake store: canonical records in, ids out, similarity and
//! metadata-filtered retrieval back.
//!
//! Records are projected onto the index as their searchable text plus a
//! flat string metadata map covering every scalar field. The projection is
//! recomputed at `put` time, so stored text can never drift from the
//! record's source fields.

use crate::error::StoreError;
use crate::index::{Document, LocalIndex, MetadataFilter, SemanticIndex, StoredDocument};
use lt_core::traits::SharedEmbeddingService;
use lt_core::types::{Difficulty, ErrorCategory, MistakeRecord, RecurrenceRisk};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct MistakeStore {
    index: Arc<dyn SemanticIndex>,
}

impl MistakeStore {
    pub fn new(index: Arc<dyn SemanticIndex>) -> Self {
        Self { index }
    }

    /// Opens a store over a file-backed local index at `dir`.
    ///
    /// An unusable location fails here, at construction, with
    /// [`StoreError::Unavailable`].
    pub async fn open_local(
        dir: impl AsRef<Path>,
        embedder: SharedEmbeddingService,
    ) -> Result<Self, StoreError> {
        let index = LocalIndex::open(dir, embedder).await?;
        Ok(Self::new(Arc::new(index)))
    }

    /// Stores one record and returns its store-generated id.
    pub async fn put(&self, record: &MistakeRecord) -> Result<String, StoreError> {
        let ids = self.put_many(std::slice::from_ref(record)).await?;
        ids.into_iter()
            .next()
            .ok_or_else(|| StoreError::Index("index returned no id".to_string()))
    }

    /// Stores a batch of records, preserving their order, and returns one
    /// id per record.
    pub async fn put_many(&self, records: &[MistakeRecord]) -> Result<Vec<String>, StoreError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let documents = records.iter().map(record_to_document).collect();
        let ids = self.index.add(documents).await?;
        info!("Stored {} mistake record(s)", ids.len());
        Ok(ids)
    }

    /// Returns up to `k` records ranked by semantic closeness of their
    /// searchable text to `query`, best first.
    pub async fn search_similar(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<MistakeRecord>, StoreError> {
        let hits = self.index.query(query, k, None).await?;
        Ok(hits
            .into_iter()
            .map(|hit| document_to_record(&hit.document))
            .collect())
    }

    /// Exact-match metadata lookup on one scalar field, up to `k` results.
    /// Similarity against `value` orders the matches.
    pub async fn search_by_field(
        &self,
        field: &str,
        value: &str,
        k: usize,
    ) -> Result<Vec<MistakeRecord>, StoreError> {
        let filter = MetadataFilter::new(field, value);
        let hits = self.index.query(value, k, Some(filter)).await?;
        Ok(hits
            .into_iter()
            .map(|hit| document_to_record(&hit.document))
            .collect())
    }

    /// Returns records in storage order, truncated to `limit` when given.
    pub async fn list_all(&self, limit: Option<usize>) -> Result<Vec<MistakeRecord>, StoreError> {
        let mut documents = self.index.all().await?;
        if let Some(limit) = limit {
            documents.truncate(limit);
        }
        Ok(documents.iter().map(document_to_record).collect())
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        self.index.count().await
    }

    /// Irreversibly deletes every record. The store stays usable: count
    /// resets to 0 and subsequent puts work normally.
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        self.index.clear().await?;
        info!("Cleared all mistake records");
        Ok(())
    }
}

fn record_to_document(record: &MistakeRecord) -> Document {
    Document::new(record.build_searchable_text())
        .with_metadata("message_index", record.message_index.to_string())
        .with_metadata("student_input", &record.student_input)
        .with_metadata("corrected_answer", &record.corrected_answer)
        .with_metadata("error_type", &record.error_type)
        .with_metadata("error_category", record.error_category.to_string())
        .with_metadata("concepts", record.concepts.join(","))
        .with_metadata("explanation", &record.explanation)
        .with_metadata("difficulty", record.difficulty.to_string())
        .with_metadata("suggested_practice", &record.suggested_practice)
        .with_metadata("recurrence_risk", record.recurrence_risk.to_string())
        .with_metadata("related_concepts", record.related_concepts.join(","))
        .with_metadata("timestamp", &record.timestamp)
}

fn document_to_record(document: &StoredDocument) -> MistakeRecord {
    let get = |key: &str| -> String {
        document.metadata.get(key).cloned().unwrap_or_default()
    };

    MistakeRecord {
        message_index: get("message_index").parse().unwrap_or_default(),
        student_input: get("student_input"),
        corrected_answer: get("corrected_answer"),
        error_type: get("error_type"),
        error_category: ErrorCategory::parse_lenient(&get("error_category")),
        concepts: split_list(&get("concepts")),
        explanation: get("explanation"),
        difficulty: Difficulty::parse_lenient(&get("difficulty")),
        suggested_practice: get("suggested_practice"),
        recurrence_risk: RecurrenceRisk::parse_lenient(&get("recurrence_risk")),
        related_concepts: split_list(&get("related_concepts")),
        timestamp: get("timestamp"),
        searchable_text: document.text.clone(),
    }
}

fn split_list(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
