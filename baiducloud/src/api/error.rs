use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Error document returned by a BCE service
    #[error("[Code: {code}; Message: {message}; RequestId: {request_id}] (HTTP {status})")]
    ServiceError {
        status: u16,
        code: String,
        message: String,
        request_id: String,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ApiError {
    /// BCE error code, when the service returned one
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::ServiceError { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ServiceError { status, .. } => Some(*status),
            ApiError::RequestError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
