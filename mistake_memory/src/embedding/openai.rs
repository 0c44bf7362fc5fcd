use async_trait::async_trait;
use lt_core::traits::{DynError, EmbeddingService};
use std::sync::Arc;
use tokio::sync::RwLock;

/// OpenAI-backed embedding service with an in-process LRU cache.
pub struct OpenAiEmbeddingService {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimension: usize,
    cache: Arc<RwLock<lru::LruCache<String, Vec<f32>>>>,
}

impl OpenAiEmbeddingService {
    pub fn new(api_key: String, model: &str) -> Self {
        Self::with_cache_size(api_key, model, 1000)
    }

    pub fn with_cache_size(api_key: String, model: &str, cache_size: usize) -> Self {
        let config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
        let client = async_openai::Client::with_config(config);

        let dimension = match model {
            "text-embedding-3-large" => 3072,
            _ => 1536,
        };

        Self {
            client,
            model: model.to_string(),
            dimension,
            cache: Arc::new(RwLock::new(lru::LruCache::new(
                std::num::NonZeroUsize::new(cache_size.max(1)).unwrap(),
            ))),
        }
    }

    pub fn with_default_model(api_key: String) -> Self {
        Self::new(api_key, "text-embedding-3-small")
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbeddingService {
    type Error = DynError;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error> {
        {
            let mut cache = self.cache.write().await;
            if let Some(cached) = cache.get(text) {
                return Ok(cached.clone());
            }
        }

        let request = async_openai::types::CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(text)
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        let embedding = response
            .data
            .first()
            .ok_or("No embedding returned")?
            .embedding
            .clone();

        {
            let mut cache = self.cache.write().await;
            cache.put(text.to_string(), embedding.clone());
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Self::Error> {
        let mut results = vec![Vec::new(); texts.len()];
        let mut uncached_texts = Vec::new();
        let mut uncached_indices = Vec::new();

        let mut cache = self.cache.write().await;

        for (i, text) in texts.iter().enumerate() {
            if let Some(cached) = cache.get(text) {
                results[i] = cached.clone();
            } else {
                uncached_texts.push(text.clone());
                uncached_indices.push(i);
            }
        }

        if !uncached_texts.is_empty() {
            let request = async_openai::types::CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(uncached_texts.clone())
                .build()?;

            let response = self.client.embeddings().create(request).await?;

            for (i, embedding_data) in response.data.into_iter().enumerate() {
                let idx = uncached_indices[i];
                let embedding = embedding_data.embedding;

                cache.put(uncached_texts[i].clone(), embedding.clone());
                results[idx] = embedding;
            }
        }

        Ok(results)
    }
}
