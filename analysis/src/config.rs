use serde::Deserialize;

/// Tunables for the extraction and enrichment pipelines.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Model name passed to the completion provider.
    pub model: String,
    /// Upper bound for one completion round-trip. On expiry the call is
    /// treated like any other service failure.
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
        }
    }
}

impl AnalysisConfig {
    pub fn from_env() -> Self {
        let model =
            std::env::var("ANALYSIS_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let timeout_secs = std::env::var("ANALYSIS_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Self {
            model,
            timeout_secs,
        }
    }
}
