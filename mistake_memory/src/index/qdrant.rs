//! Qdrant-backed semantic index.
//!
//! Embeds on insert via the injected embedding service and stores the
//! document text alongside the flat metadata payload, so one collection
//! carries everything needed to rebuild records.

use super::factory::QdrantIndexConfig;
use super::{Document, MetadataFilter, ScoredDocument, SemanticIndex, StoredDocument};
use crate::error::StoreError;
use async_trait::async_trait;
use lt_core::traits::SharedEmbeddingService;
use qdrant_client::{
    Qdrant,
    qdrant::{
        Condition, CreateCollectionBuilder, Distance, Filter, PointId, PointStruct,
        SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParams,
        VectorsConfig, point_id::PointIdOptions, vectors_config::Config,
    },
};
use std::collections::HashMap;
use std::sync::Arc;

/// Payload key carrying the indexed text itself.
const DOCUMENT_KEY: &str = "document";

pub struct QdrantIndex {
    client: Arc<Qdrant>,
    embedder: SharedEmbeddingService,
    collection: String,
    embedding_dimension: usize,
}

impl QdrantIndex {
    pub async fn new(
        config: QdrantIndexConfig,
        embedder: SharedEmbeddingService,
    ) -> Result<Self, StoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", config.url, e)))?;

        let index = Self {
            client: Arc::new(client),
            embedder,
            collection: config.collection,
            embedding_dimension: config.embedding_dimension,
        };

        // A collection that cannot be created is fatal at construction.
        index
            .ensure_collection()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(index)
    }

    async fn ensure_collection(&self) -> Result<(), StoreError> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| StoreError::Index(format!("Failed to list collections: {}", e)))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            let request =
                CreateCollectionBuilder::new(&self.collection).vectors_config(VectorsConfig {
                    config: Some(Config::Params(VectorParams {
                        size: self.embedding_dimension as u64,
                        distance: Distance::Cosine.into(),
                        ..Default::default()
                    })),
                });

            self.client
                .create_collection(request)
                .await
                .map_err(|e| StoreError::Index(format!("Failed to create collection: {}", e)))?;
        }

        Ok(())
    }

    fn point_to_document(
        id: Option<PointId>,
        payload: HashMap<String, QdrantValue>,
    ) -> StoredDocument {
        let id = match id.and_then(|p| p.point_id_options) {
            Some(PointIdOptions::Uuid(u)) => u,
            Some(PointIdOptions::Num(n)) => n.to_string(),
            None => String::new(),
        };

        let mut text = String::new();
        let mut metadata = HashMap::new();

        for (key, value) in payload {
            let json: serde_json::Value = value.into();
            let string_value = json
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| json.to_string());

            if key == DOCUMENT_KEY {
                text = string_value;
            } else {
                metadata.insert(key, string_value);
            }
        }

        StoredDocument { id, text, metadata }
    }
}

#[async_trait]
impl SemanticIndex for QdrantIndex {
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

        let mut ids = Vec::with_capacity(documents.len());
        let points: Vec<PointStruct> = documents
            .into_iter()
            .zip(vectors)
            .map(|(document, vector)| {
                let id = uuid::Uuid::new_v4().to_string();
                ids.push(id.clone());

                let mut payload: HashMap<String, QdrantValue> = HashMap::new();
                payload.insert(DOCUMENT_KEY.to_string(), document.text.into());
                for (key, value) in document.metadata {
                    payload.insert(key, value.into());
                }

                PointStruct {
                    id: Some(PointId::from(id)),
                    vectors: Some(vector.into()),
                    payload,
                }
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
            .await
            .map_err(|e| StoreError::Index(format!("Upsert failed: {}", e)))?;

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

        let mut request =
            SearchPointsBuilder::new(&self.collection, query_vector, limit as u64)
                .with_payload(true);

        if let Some(f) = filter {
            request = request.filter(Filter::all(vec![Condition::matches(f.field, f.value)]));
        }

        let result = self
            .client
            .search_points(request)
            .await
            .map_err(|e| StoreError::Index(format!("Search failed: {}", e)))?;

        Ok(result
            .result
            .into_iter()
            .map(|p| ScoredDocument {
                score: p.score,
                document: Self::point_to_document(p.id, p.payload),
            })
            .collect())
    }

    async fn all(&self) -> Result<Vec<StoredDocument>, StoreError> {
        let scroll_request = qdrant_client::qdrant::ScrollPoints {
            collection_name: self.collection.clone(),
            limit: Some(u32::MAX),
            with_payload: Some(true.into()),
            ..Default::default()
        };

        let result = self
            .client
            .scroll(scroll_request)
            .await
            .map_err(|e| StoreError::Index(format!("Scroll failed: {}", e)))?;

        Ok(result
            .result
            .into_iter()
            .map(|p| Self::point_to_document(p.id, p.payload))
            .collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| StoreError::Index(format!("Collection info failed: {}", e)))?;

        Ok(info
            .result
            .and_then(|r| r.points_count)
            .unwrap_or_default() as usize)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| StoreError::Index(format!("Delete collection failed: {}", e)))?;

        self.ensure_collection().await
    }

    fn index_name(&self) -> &'static str {
        "qdrant"
    }
}
