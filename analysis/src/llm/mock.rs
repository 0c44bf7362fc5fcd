use async_trait::async_trait;
use lt_core::traits::{DynError, TextCompletionService};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Scripted completion service for tests.
///
/// Queued responses are returned in order; once the queue is empty the
/// fixed fallback response is returned. Counts every call so tests can
/// assert that short-circuit paths never reach the service.
pub struct MockCompletionService {
    queue: Arc<RwLock<VecDeque<String>>>,
    fallback: String,
    fail_with: Option<String>,
    calls: AtomicUsize,
}

impl MockCompletionService {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(RwLock::new(VecDeque::new())),
            fallback: "[]".to_string(),
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Service that always answers with `response`.
    pub fn with_response(response: impl Into<String>) -> Self {
        let mut service = Self::new();
        service.fallback = response.into();
        service
    }

    /// Service whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let mut service = Self::new();
        service.fail_with = Some(message.into());
        service
    }

    pub async fn push_response(&self, response: impl Into<String>) {
        self.queue.write().await.push_back(response.into());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockCompletionService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextCompletionService for MockCompletionService {
    type Error = DynError;

    async fn complete(&self, _system: &str, _user: &str) -> Result<String, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.fail_with {
            return Err(message.clone().into());
        }

        let mut queue = self.queue.write().await;
        Ok(queue.pop_front().unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queued_then_fallback() {
        let service = MockCompletionService::with_response("{}");
        service.push_response("first").await;

        assert_eq!(service.complete("s", "u").await.unwrap(), "first");
        assert_eq!(service.complete("s", "u").await.unwrap(), "{}");
        assert_eq!(service.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_service() {
        let service = MockCompletionService::failing("connection refused");
        let err = service.complete("s", "u").await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(service.call_count(), 1);
    }
}
