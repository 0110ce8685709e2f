//! Mock completion client for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use panelscore_core::error::ProviderError;
use panelscore_core::traits::{CompletionClient, CompletionRequest, CompletionResponse};

/// A mock completion client for driving the service without real API calls.
///
/// Returns configurable bodies based on prompt content matching.
pub struct MockCompletionClient {
    name: String,
    /// Map of prompt substring → response body.
    responses: HashMap<String, String>,
    default_response: String,
    status: u16,
    /// Simulated latency, observed against the request deadline.
    delay: Duration,
    call_count: AtomicU32,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl MockCompletionClient {
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            name: "mock".to_string(),
            responses,
            default_response: r#"{"dimension_scores":{}}"#.to_string(),
            status: 200,
            delay: Duration::ZERO,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// A mock that always returns the same body.
    pub fn with_fixed_response(body: &str) -> Self {
        Self {
            default_response: body.to_string(),
            ..Self::new(HashMap::new())
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        if !self.delay.is_zero() {
            if self.delay > request.timeout {
                tokio::time::sleep(request.timeout).await;
                return Err(ProviderError::Timeout(request.timeout.as_millis() as u64));
            }
            tokio::time::sleep(self.delay).await;
        }

        let body = self
            .responses
            .iter()
            .find(|(key, _)| request.prompt.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_response.clone());

        Ok(CompletionResponse {
            status: self.status,
            body,
            latency_ms: self.delay.as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_matches_prompt() {
        let mut responses = HashMap::new();
        responses.insert("iv-7".into(), r#"{"scores":{"logic":80}}"#.into());
        let mock = MockCompletionClient::new(responses);

        let resp = mock
            .complete(&CompletionRequest::new("evaluate iv-7 transcript"))
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert!(resp.body.contains("logic"));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn mock_default_response() {
        let mock = MockCompletionClient::with_fixed_response("{}").with_name("stub");
        let resp = mock
            .complete(&CompletionRequest::new("anything"))
            .await
            .unwrap();
        assert_eq!(resp.body, "{}");
        assert_eq!(mock.name(), "stub");
        assert_eq!(mock.last_request().unwrap().prompt, "anything");
    }

    #[tokio::test(start_paused = true)]
    async fn mock_delay_past_deadline_times_out() {
        let mock = MockCompletionClient::with_fixed_response("{}")
            .with_delay(Duration::from_secs(120));
        let request = CompletionRequest::new("slow").with_timeout(Duration::from_secs(5));
        let err = mock.complete(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(5000)));
    }
}
