//! Error types for scoring operations and completion providers.
//!
//! `ProviderError` lives here rather than in `panelscore-providers` so the
//! service layer can classify completion failures without string matching.

use thiserror::Error;

/// Errors returned by the externally facing scoring operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Score out of range, malformed override, duplicate submission.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No records exist for the interview.
    #[error("not found: {0}")]
    NotFound(String),

    /// The external response could not be turned into scores.
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionFailure),

    /// A concurrent write to the same interview won the race.
    #[error("concurrent update conflict: {0}")]
    ConcurrencyConflict(String),

    /// Unusable weight scheme or thresholds.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The persistence collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl EvalError {
    /// Returns `true` when the caller may retry or continue without the
    /// failed piece (e.g. proceed with human-only data).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EvalError::Extraction(_) | EvalError::ConcurrencyConflict(_) | EvalError::Storage(_)
        )
    }
}

/// Why a raw completion body yielded no usable scores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    /// No `{` opening a balanced object was found anywhere.
    #[error("no balanced object found")]
    NoBalancedObject,

    /// An object was opened but never closed (typically a truncated response).
    #[error("unbalanced delimiters at byte {0}")]
    Unbalanced(usize),

    /// The service replied with an error envelope instead of choices.
    #[error("service returned an error: {0}")]
    ErrorEnvelope(String),

    /// Balanced objects exist but none carries scoring keys.
    #[error("no scoring payload in response")]
    NoPayload,

    /// The completion call itself failed.
    #[error("completion request failed: {0}")]
    Provider(String),
}

/// Errors that can occur when talking to the completion service.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request did not finish within the caller's timeout.
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The client could not be built from its configuration.
    #[error("provider misconfigured: {0}")]
    Configuration(String),
}

impl ProviderError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_)
                | ProviderError::ModelNotFound(_)
                | ProviderError::Configuration(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

impl From<ProviderError> for EvalError {
    fn from(e: ProviderError) -> Self {
        EvalError::Extraction(ExtractionFailure::Provider(e.to_string()))
    }
}

pub type EvalResult<T> = Result<T, EvalError>;
