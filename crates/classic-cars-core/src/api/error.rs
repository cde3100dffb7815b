use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request. Please check the submitted data.")]
    BadRequest,

    #[error("Unauthorized. Please check your API key.")]
    Unauthorized,

    #[error("Access denied. You do not have the required permissions.")]
    AccessDenied,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Server error. Please try again later.")]
    ServerError,

    #[error("Service temporarily unavailable. Please try again later.")]
    ServiceUnavailable,

    #[error("HTTP error {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("Could not connect to the server. Check your internet connection.")]
    Connection,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Map a non-success status to a user-facing error.
    pub fn from_status(status: reqwest::StatusCode, resource: &str) -> Self {
        match status.as_u16() {
            400 => ApiError::BadRequest,
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied,
            404 => ApiError::NotFound(resource.to_string()),
            500 => ApiError::ServerError,
            503 => ApiError::ServiceUnavailable,
            code => ApiError::Http {
                status: code,
                reason: status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string(),
            },
        }
    }

    /// Transport failures that may succeed on a second attempt.
    pub fn is_transient(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect() || error.is_request()
    }

    pub fn is_not_found(error: &anyhow::Error) -> bool {
        matches!(error.downcast_ref::<ApiError>(), Some(ApiError::NotFound(_)))
    }
}
