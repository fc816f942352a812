use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy for a chat turn. Each variant maps to one HTTP status
/// class at the gateway boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input rejected before any outbound call (empty message, unknown
    /// provider, image sent to a text-only model, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// Client exceeded its request window.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Missing or unusable configuration (typically an absent API key).
    #[error("configuration error: {0}")]
    Config(String),

    /// Non-success status or timeout from an LLM provider.
    #[error("{provider} error ({status}): {message}")]
    Upstream {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a dispatch failure is worth one retry against a fallback
    /// model: timeouts, throttling, server-side errors and model-not-found.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Upstream { status, .. } => {
                matches!(*status, 0 | 404 | 408 | 429 | 500..=599)
            }
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(format!("serialization error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_retryability() {
        let err = |status| Error::Upstream {
            provider: "openai".into(),
            status,
            message: String::new(),
        };
        assert!(err(429).is_retryable());
        assert!(err(503).is_retryable());
        assert!(err(404).is_retryable());
        assert!(err(0).is_retryable()); // network/timeout, no status
        assert!(!err(400).is_retryable());
        assert!(!err(401).is_retryable());
        assert!(!Error::Validation("x".into()).is_retryable());
    }
}
