use thiserror::Error;

/// Internal failure taxonomy for the analysis pipelines.
///
/// These never escape the public `extract` / `enrich_*` operations: they
/// are logged at the point of recovery and converted to an empty result or
/// the default enrichment bundle.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Completion service error: {0}")]
    Completion(String),

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Completion timed out after {0}s")]
    Timeout(u64),
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        AnalysisError::Parse(e.to_string())
    }
}
