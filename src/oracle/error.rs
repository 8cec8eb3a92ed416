use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for oracle operations.
pub type OracleResult<T> = Result<T, OracleError>;

/// Classified failures at the oracle boundary. Classification switches on
/// the transport's status code, never on message substrings.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The credential is missing or was rejected. Fatal configuration
    /// problem; never retried.
    #[error("oracle credential missing or rejected")]
    AuthMissing,
    /// Quota or rate limit exhausted. Fatal for the current session; the
    /// player has to wait.
    #[error("oracle quota or rate limit exhausted")]
    QuotaExceeded,
    /// The requested model cannot serve right now. Retryable with the next
    /// fallback model.
    #[error("model `{model}` unavailable: {reason}")]
    ModelUnavailable {
        /// Model identifier that failed.
        model: String,
        /// Status code or transport detail.
        reason: String,
    },
    /// The model answered, but not with anything the repair pass could turn
    /// into the expected shape. An empty completion lands here too.
    /// Terminal for the attempt; retried only while attempts remain.
    #[error("oracle returned unusable output: {reason}")]
    MalformedResponse {
        /// Why parsing gave up.
        reason: String,
    },
}

impl OracleError {
    /// Whether another attempt with a fallback model is worthwhile.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OracleError::ModelUnavailable { .. } | OracleError::MalformedResponse { .. }
        )
    }

    /// Classify an HTTP error status from the completion endpoint.
    pub fn from_status(status: StatusCode, model: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => OracleError::AuthMissing,
            StatusCode::TOO_MANY_REQUESTS => OracleError::QuotaExceeded,
            StatusCode::NOT_FOUND
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT => OracleError::ModelUnavailable {
                model: model.to_string(),
                reason: format!("status {status}"),
            },
            other => OracleError::MalformedResponse {
                reason: format!("unexpected status {other}"),
            },
        }
    }

    /// Classify a transport-level failure (connect, TLS, deadline).
    pub fn from_transport(err: reqwest::Error, model: &str) -> Self {
        OracleError::ModelUnavailable {
            model: model.to_string(),
            reason: err.to_string(),
        }
    }

    /// Shorthand for a malformed-output failure.
    pub fn malformed(reason: impl Into<String>) -> Self {
        OracleError::MalformedResponse {
            reason: reason.into(),
        }
    }
}
