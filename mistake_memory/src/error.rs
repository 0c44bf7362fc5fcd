use thiserror::Error;

/// Failure taxonomy for the mistake store and its index backends.
///
/// `Unavailable` is fatal and surfaces at construction time; the store
/// never degrades to a silent no-op. Post-initialization failures
/// propagate to the caller and are not retried by the core.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Index unavailable: {0}")]
    Unavailable(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Index operation failed: {0}")]
    Index(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Embedding(_) | StoreError::Index(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Persistence(e.to_string())
    }
}
