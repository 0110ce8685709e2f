//! Collaborator traits for persistence and completion calls.
//!
//! Storage is implemented in-process by [`crate::store::MemoryStore`]; the
//! completion client lives in the `panelscore-providers` crate.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EvalResult, ProviderError};
use crate::record::ScoreRecord;
use crate::summary::Summary;

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Key-value persistence for score records and summaries, keyed by interview.
///
/// Each call is treated as an atomic get or put.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Store a record. Fails if a record with the same id already exists.
    async fn save_record(&self, record: ScoreRecord) -> EvalResult<()>;

    /// All records for an interview, in submission order.
    async fn records_for(&self, interview_id: &str) -> EvalResult<Vec<ScoreRecord>>;

    /// Store a summary if the stored revision still equals `expected_revision`
    /// (`None` meaning no summary is stored yet). Otherwise fails with
    /// [`EvalError::ConcurrencyConflict`](crate::error::EvalError::ConcurrencyConflict).
    async fn save_summary(&self, summary: Summary, expected_revision: Option<u64>)
        -> EvalResult<()>;

    async fn find_summary(&self, interview_id: &str) -> EvalResult<Option<Summary>>;
}

// ---------------------------------------------------------------------------
// Completion client
// ---------------------------------------------------------------------------

/// Outbound call to a generative completion service.
///
/// Prompt construction happens elsewhere; the client only ships an already
/// built prompt and hands back the raw body for extraction.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Provider name (e.g. "deepseek").
    fn name(&self) -> &str;

    /// Issue the request. Must return within `request.timeout`.
    async fn complete(&self, request: &CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;
}

/// A prepared completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier. Empty means the client's configured default.
    #[serde(default)]
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Hard deadline for the whole call.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: String::new(),
            prompt: prompt.into(),
            system_prompt: None,
            max_tokens: 2048,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Raw result of a completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// HTTP status of the reply.
    pub status: u16,
    /// Unparsed response body.
    pub body: String,
    pub latency_ms: u64,
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_timeout_round_trips_as_seconds() {
        let request = CompletionRequest::new("rate this").with_timeout(Duration::from_millis(1500));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["timeout"], 1.5);
        let back: CompletionRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back.timeout, Duration::from_millis(1500));
    }
}
