//! Error types for groundask
//!
//! Library-level failures (configuration, search backends, transport setup).
//! Generation failures are deliberately not represented here: the invoker
//! reports them as a typed [`crate::gateway::FailureReason`] so the pipeline
//! can route them into the local fallback.

use thiserror::Error;

/// Main error type for the groundask library
#[derive(Error, Debug)]
pub enum AskError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Search backend errors (vector, lexical, catalog)
    #[error("Search error ({backend}): {message}")]
    SearchError { backend: String, message: String },

    /// Reranker failures; always swallowed by the fail-open reranker
    #[error("Reranker error: {0}")]
    RerankError(String),

    /// Upstream answered with something we could not interpret
    #[error("Unexpected response from {backend}: HTTP {status}")]
    UnexpectedResponse { backend: String, status: u16 },

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid text-cleanup pattern
    #[error("Pattern error: {0}")]
    PatternError(#[from] regex::Error),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

impl AskError {
    /// Build a search error for the named backend
    pub fn search(backend: impl Into<String>, message: impl Into<String>) -> Self {
        AskError::SearchError {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, AskError>;

/// Convert anyhow errors to AskError
impl From<anyhow::Error> for AskError {
    fn from(err: anyhow::Error) -> Self {
        AskError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_error_display() {
        let err = AskError::search("lexical", "relation missing");
        let text = err.to_string();
        assert!(text.contains("lexical"));
        assert!(text.contains("relation missing"));
    }

    #[test]
    fn test_unexpected_response_hides_body() {
        let err = AskError::UnexpectedResponse {
            backend: "search".to_string(),
            status: 502,
        };
        assert_eq!(err.to_string(), "Unexpected response from search: HTTP 502");
    }

    #[test]
    fn test_from_anyhow() {
        let err: AskError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, AskError::Generic(ref m) if m == "boom"));
    }
}
