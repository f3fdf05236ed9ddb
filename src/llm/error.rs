//! Language model error types with retry classification.
//!
//! Transient failures (rate limits, 5xx, network) are retried by the client;
//! everything else surfaces to the calling stage as-is.

use std::time::Duration;

/// Error from a language model call.
#[derive(Debug, Clone)]
pub struct LlmError {
    pub kind: LlmErrorKind,
    /// HTTP status code, if the failure came from a response
    pub status_code: Option<u16>,
    pub message: String,
    /// Server-provided delay from a Retry-After header
    pub retry_after: Option<Duration>,
}

impl LlmError {
    fn new(kind: LlmErrorKind, status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            retry_after,
            ..Self::new(LlmErrorKind::RateLimited, Some(429), message)
        }
    }

    /// Build an error from a non-success HTTP response.
    pub fn from_status(status: u16, body: impl Into<String>, retry_after: Option<Duration>) -> Self {
        match classify_http_status(status) {
            LlmErrorKind::RateLimited => Self::rate_limited(body, retry_after),
            kind => Self::new(kind, Some(status), body),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::NetworkError, None, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ParseError, None, message)
    }

    pub fn empty_response(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::EmptyResponse, None, message)
    }

    /// No model is configured for this deployment.
    pub fn unavailable() -> Self {
        Self::new(
            LlmErrorKind::Unavailable,
            None,
            "language model is not configured",
        )
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Delay before retry attempt `attempt` (zero-based).
    ///
    /// Honors `retry_after` when present; otherwise exponential backoff from a
    /// per-kind base, capped at 60 seconds.
    pub fn suggested_delay(&self, attempt: u32) -> Duration {
        if let Some(retry_after) = self.retry_after {
            return retry_after;
        }

        let base_secs: u64 = match self.kind {
            LlmErrorKind::RateLimited => 5,
            LlmErrorKind::ServerError => 2,
            _ => 1,
        };
        let delay = base_secs.saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_secs(delay.min(60))
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for LlmError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// 429
    RateLimited,
    /// 5xx
    ServerError,
    /// Other 4xx (auth, bad request)
    ClientError,
    /// Connection failure or timeout
    NetworkError,
    ParseError,
    /// The response parsed but carried no text
    EmptyResponse,
    Unavailable,
}

impl LlmErrorKind {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmErrorKind::RateLimited | LlmErrorKind::ServerError | LlmErrorKind::NetworkError
        )
    }
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LlmErrorKind::RateLimited => "Rate limited",
            LlmErrorKind::ServerError => "Server error",
            LlmErrorKind::ClientError => "Client error",
            LlmErrorKind::NetworkError => "Network error",
            LlmErrorKind::ParseError => "Parse error",
            LlmErrorKind::EmptyResponse => "Empty response",
            LlmErrorKind::Unavailable => "Unavailable",
        };
        f.write_str(label)
    }
}

/// Retry limits for transient failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Upper bound on time spent across all attempts
    pub max_retry_duration: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_retry_duration: Duration::from_secs(120),
        }
    }
}

impl RetryConfig {
    pub fn should_retry(&self, error: &LlmError, attempt: u32) -> bool {
        error.is_transient() && attempt < self.max_retries
    }
}

pub fn classify_http_status(status: u16) -> LlmErrorKind {
    match status {
        429 => LlmErrorKind::RateLimited,
        400..=499 => LlmErrorKind::ClientError,
        _ => LlmErrorKind::ServerError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_classification() {
        assert_eq!(classify_http_status(429), LlmErrorKind::RateLimited);
        assert_eq!(classify_http_status(503), LlmErrorKind::ServerError);
        assert_eq!(classify_http_status(401), LlmErrorKind::ClientError);
        assert!(LlmError::from_status(502, "bad gateway", None).is_transient());
        assert!(!LlmError::from_status(400, "bad request", None).is_transient());
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let error = LlmError::from_status(500, "boom", None);
        assert!(error.suggested_delay(1) > error.suggested_delay(0));
        assert_eq!(error.suggested_delay(20), Duration::from_secs(60));
    }

    #[test]
    fn test_retry_after_wins() {
        let error = LlmError::rate_limited("slow down", Some(Duration::from_secs(7)));
        assert_eq!(error.suggested_delay(3), Duration::from_secs(7));
    }

    #[test]
    fn test_retry_config_limits_attempts() {
        let config = RetryConfig::default();
        let transient = LlmError::network("reset");
        assert!(config.should_retry(&transient, 0));
        assert!(!config.should_retry(&transient, 3));
        assert!(!config.should_retry(&LlmError::unavailable(), 0));
    }
}
