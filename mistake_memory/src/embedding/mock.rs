use async_trait::async_trait;
use lt_core::traits::{DynError, EmbeddingService};
use std::hash::{DefaultHasher, Hash, Hasher};

/// Deterministic embedding service for tests and offline use.
///
/// Hashes each token into a fixed bucket and L2-normalizes the counts, so
/// texts sharing vocabulary score higher under cosine similarity and the
/// same text always embeds identically.
pub struct MockEmbeddingService {
    dimension: usize,
}

impl MockEmbeddingService {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];

        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimension;
            embedding[bucket] += 1.0;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingService for MockEmbeddingService {
    type Error = DynError;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error> {
        Ok(self.generate(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
