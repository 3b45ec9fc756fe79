use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    UnprocessableEntity(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Calculation failed: {message}")]
    Calculation {
        message: String,
        details: Option<String>,
    },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body shape used by the backend (`{success: false, message, ...}`)
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
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

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            400 => ApiError::BadRequest(truncated),
            401 => ApiError::Unauthorized(truncated),
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            409 => ApiError::Conflict(truncated),
            422 => ApiError::UnprocessableEntity(truncated),
            429 => ApiError::RateLimited,
            code @ 500..=599 => ApiError::ServerError {
                status: code,
                body: truncated,
            },
            code => ApiError::UnexpectedStatus {
                status: code,
                body: truncated,
            },
        }
    }

    /// HTTP status of the failed response. `Some(0)` means the server was
    /// never reached; `None` means the request did not fail on status.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadRequest(_) => Some(400),
            ApiError::Unauthorized(_) => Some(401),
            ApiError::AccessDenied(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::Conflict(_) => Some(409),
            ApiError::UnprocessableEntity(_) => Some(422),
            ApiError::RateLimited => Some(429),
            ApiError::ServerError { status, .. } | ApiError::UnexpectedStatus { status, .. } => {
                Some(*status)
            }
            ApiError::NetworkError(e) => match e.status() {
                Some(status) => Some(status.as_u16()),
                None if e.is_decode() => None,
                None => Some(0),
            },
            ApiError::InvalidResponse(_) | ApiError::Calculation { .. } => None,
        }
    }

    fn body(&self) -> Option<&str> {
        match self {
            ApiError::BadRequest(body)
            | ApiError::Unauthorized(body)
            | ApiError::AccessDenied(body)
            | ApiError::NotFound(body)
            | ApiError::Conflict(body)
            | ApiError::UnprocessableEntity(body)
            | ApiError::ServerError { body, .. }
            | ApiError::UnexpectedStatus { body, .. } => Some(body),
            _ => None,
        }
    }

    /// The `message` field of the error body, if the server sent one.
    pub fn server_message(&self) -> Option<String> {
        if let ApiError::Calculation { message, .. } = self {
            return Some(message.clone());
        }
        let body = self.body()?;
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
    }

    /// Human-readable message categorized by status code.
    pub fn user_message(&self) -> String {
        let server = self.server_message();
        match self.status() {
            Some(0) => "Unable to connect to the server. Check your connection.".to_string(),
            Some(400) => server.unwrap_or_else(|| "Invalid request".to_string()),
            Some(401) => "Session expired or invalid credentials".to_string(),
            Some(403) => "You do not have permission to perform this action".to_string(),
            Some(404) => "Resource not found".to_string(),
            Some(409) => server.unwrap_or_else(|| "Data conflict".to_string()),
            Some(422) => "Invalid input data".to_string(),
            Some(429) => "Too many requests. Try again later.".to_string(),
            Some(500) => "Internal server error".to_string(),
            Some(502..=504) => "Service temporarily unavailable".to_string(),
            Some(code) => server.unwrap_or_else(|| format!("Error {}", code)),
            None => server.unwrap_or_else(|| self.to_string()),
        }
    }
}
