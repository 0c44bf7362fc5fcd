//! File-backed semantic index.
//!
//! Embeds on insert, ranks by cosine similarity in memory, and persists a
//! JSON snapshot under a caller-supplied directory. Reopening the same
//! directory recovers the same content. All mutation goes through one
//! `RwLock`, so concurrent writers serialize and `clear` can never
//! interleave with an in-flight `add`.

use super::{Document, MetadataFilter, ScoredDocument, SemanticIndex, StoredDocument};
use crate::error::StoreError;
use async_trait::async_trait;
use lt_core::traits::SharedEmbeddingService;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

const SNAPSHOT_FILE: &str = "mistakes.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedEntry {
    id: String,
    text: String,
    metadata: HashMap<String, String>,
    vector: Vec<f32>,
}

pub struct LocalIndex {
    embedder: SharedEmbeddingService,
    snapshot_path: PathBuf,
    entries: RwLock<Vec<IndexedEntry>>,
}

impl LocalIndex {
    /// Opens (or creates) the index at `dir`.
    ///
    /// An unusable location is a fatal error here, at construction; the
    /// index never silently operates as a no-op.
    pub async fn open(
        dir: impl AsRef<Path>,
        embedder: SharedEmbeddingService,
    ) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", dir.display(), e)))?;

        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let entries = match tokio::fs::read(&snapshot_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StoreError::Unavailable(format!(
                    "corrupt snapshot {}: {}",
                    snapshot_path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "{}: {}",
                    snapshot_path.display(),
                    e
                )));
            }
        };

        info!(
            "Opened local mistake index at {} with {} record(s)",
            snapshot_path.display(),
            entries.len()
        );

        let index = Self {
            embedder,
            snapshot_path,
            entries: RwLock::new(entries),
        };

        // Write the snapshot once up front so an unwritable location fails
        // construction rather than the first put.
        {
            let entries = index.entries.read().await;
            index
                .persist(&entries)
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }

        Ok(index)
    }

    /// Atomically replaces the snapshot: write to a sibling temp file,
    /// then rename over the target. Callers hold the write lock (or are
    /// still in construction), so temp-file races cannot happen.
    async fn persist(&self, entries: &[IndexedEntry]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(entries)?;
        let tmp_path = self.snapshot_path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &self.snapshot_path).await?;
        Ok(())
    }
}

#[async_trait]
impl SemanticIndex for LocalIndex {
    async fn add(&self, documents: Vec<Document>) -> Result<Vec<String>, StoreError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| StoreError::Embedding(e.to_string()))?;

        let mut entries = self.entries.write().await;
        let mut ids = Vec::with_capacity(documents.len());

        for (document, vector) in documents.into_iter().zip(vectors) {
            let id = uuid::Uuid::new_v4().to_string();
            ids.push(id.clone());
            entries.push(IndexedEntry {
                id,
                text: document.text,
                metadata: document.metadata,
                vector,
            });
        }

        self.persist(&entries).await?;
        debug!("Indexed {} document(s)", ids.len());
        Ok(ids)
    }

    async fn query(
        &self,
        text: &str,
        limit: usize,
        filter: Option<MetadataFilter>,
    ) -> Result<Vec<ScoredDocument>, StoreError> {
        let query_vector = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| StoreError::Embedding(e.to_string()))?;

        let entries = self.entries.read().await;
        let mut hits: Vec<ScoredDocument> = entries
            .iter()
            .filter(|entry| {
                filter
                    .as_ref()
                    .is_none_or(|f| f.matches(&entry.metadata))
            })
            .map(|entry| ScoredDocument {
                score: cosine_similarity(&query_vector, &entry.vector),
                document: StoredDocument {
                    id: entry.id.clone(),
                    text: entry.text.clone(),
                    metadata: entry.metadata.clone(),
                },
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn all(&self) -> Result<Vec<StoredDocument>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .map(|entry| StoredDocument {
                id: entry.id.clone(),
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.entries.read().await.len())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.persist(&entries).await?;
        info!("Cleared local mistake index");
        Ok(())
    }

    fn index_name(&self) -> &'static str {
        "local"
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
