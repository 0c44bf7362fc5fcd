use super::SemanticIndex;
use crate::error::StoreError;
use lt_core::traits::SharedEmbeddingService;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackendType {
    #[default]
    Local,
    Qdrant,
}

impl std::fmt::Display for IndexBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexBackendType::Local => write!(f, "local"),
            IndexBackendType::Qdrant => write!(f, "qdrant"),
        }
    }
}

impl std::str::FromStr for IndexBackendType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(IndexBackendType::Local),
            "qdrant" => Ok(IndexBackendType::Qdrant),
            _ => Err(StoreError::Configuration(format!(
                "Unknown index backend: {}. Valid options: local, qdrant",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    pub backend_type: IndexBackendType,
    /// Storage location for the local backend.
    pub persist_dir: PathBuf,
    #[serde(default)]
    pub qdrant: Option<QdrantIndexConfig>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend_type: IndexBackendType::Local,
            persist_dir: PathBuf::from("data/mistakes_db"),
            qdrant: None,
        }
    }
}

impl IndexConfig {
    pub fn from_env() -> Result<Self, StoreError> {
        let backend_type = std::env::var("MISTAKE_INDEX_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .parse()?;

        let persist_dir = std::env::var("MISTAKE_PERSIST_DIR")
            .unwrap_or_else(|_| "data/mistakes_db".to_string())
            .into();

        Ok(Self {
            backend_type,
            persist_dir,
            qdrant: QdrantIndexConfig::from_env().ok(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QdrantIndexConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub embedding_dimension: usize,
}

impl Default for QdrantIndexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            collection: "mistakes".to_string(),
            embedding_dimension: 1536,
        }
    }
}

impl QdrantIndexConfig {
    pub fn from_env() -> Result<Self, StoreError> {
        Ok(Self {
            url: std::env::var("QDRANT_URL")
                .unwrap_or_else(|_| "http://localhost:6334".to_string()),
            api_key: std::env::var("QDRANT_API_KEY").ok(),
            collection: std::env::var("QDRANT_COLLECTION")
                .unwrap_or_else(|_| "mistakes".to_string()),
            embedding_dimension: std::env::var("EMBEDDING_DIMENSION")
                .unwrap_or_else(|_| "1536".to_string())
                .parse()
                .map_err(|e| {
                    StoreError::Configuration(format!("Invalid embedding dimension: {}", e))
                })?,
        })
    }
}

/// Builds the configured index against the given embedding service.
pub async fn create_index(
    config: IndexConfig,
    embedder: SharedEmbeddingService,
) -> Result<Arc<dyn SemanticIndex>, StoreError> {
    match config.backend_type {
        IndexBackendType::Local => {
            let index = super::local::LocalIndex::open(&config.persist_dir, embedder).await?;
            Ok(Arc::new(index))
        }
        IndexBackendType::Qdrant => {
            #[cfg(feature = "qdrant")]
            {
                let qdrant_config = config
                    .qdrant
                    .ok_or_else(|| StoreError::Configuration("Qdrant config missing".into()))?;
                let index = super::qdrant::QdrantIndex::new(qdrant_config, embedder).await?;
                Ok(Arc::new(index))
            }
            #[cfg(not(feature = "qdrant"))]
            {
                Err(StoreError::Configuration(
                    "Qdrant index not enabled. Compile with --features qdrant".into(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_parsing() {
        assert_eq!(
            "local".parse::<IndexBackendType>().unwrap(),
            IndexBackendType::Local
        );
        assert_eq!(
            "Qdrant".parse::<IndexBackendType>().unwrap(),
            IndexBackendType::Qdrant
        );
        assert!("chroma".parse::<IndexBackendType>().is_err());
    }

    #[test]
    fn test_backend_type_display() {
        assert_eq!(IndexBackendType::Local.to_string(), "local");
        assert_eq!(IndexBackendType::Qdrant.to_string(), "qdrant");
    }

    #[test]
    fn test_default_config() {
        let config = IndexConfig::default();
        assert_eq!(config.backend_type, IndexBackendType::Local);
        assert_eq!(config.persist_dir, PathBuf::from("data/mistakes_db"));
    }
}
