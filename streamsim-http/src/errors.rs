//! HTTP error types

use streamsim_resilience::Retryable;

/// Result type for backend calls
pub type HttpResult<T> = Result<T, HttpError>;

/// Error type for backend calls
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Connection, timeout or send failure
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("{method} {path} returned HTTP {status}: {body}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response body from {path}: {message}")]
    InvalidResponse { path: String, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl HttpError {
    /// HTTP status carried by the error, if the backend answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            HttpError::NotFound(_) => Some(404),
            HttpError::NetworkError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl Retryable for HttpError {
    fn is_retryable(&self) -> bool {
        match self {
            HttpError::NetworkError(e) => !e.is_decode() && !e.is_builder(),
            HttpError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> HttpError {
        HttpError::Status {
            method: "GET",
            path: "/music/genres".to_string(),
            status: code,
            body: String::new(),
        }
    }

    #[test]
    fn test_server_errors_are_retryable() {
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(!HttpError::NotFound("/music/song/random".into()).is_retryable());
    }

    #[test]
    fn test_not_found_detection() {
        assert!(HttpError::NotFound("/x".into()).is_not_found());
        assert!(status(404).is_not_found());
        assert!(!status(409).is_not_found());
    }
}
