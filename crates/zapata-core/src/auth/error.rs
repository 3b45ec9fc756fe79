use thiserror::Error;

use crate::api::ApiError;

/// Failures of the session layer, split by where they originate.
///
/// Local token failures (`MalformedToken`, `ExpiredToken`) never reach the
/// user; they simply mean "not logged in". Remote failures during an explicit
/// login or register are surfaced through [`AuthError::user_message`].
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Token expired at {exp}")]
    ExpiredToken { exp: i64 },

    #[error("Rejected by server ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("Request failed ({status}): {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid server response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    /// Message suitable for a login/register form.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::MalformedToken(_) | AuthError::ExpiredToken { .. } => {
                "Session expired".to_string()
            }
            AuthError::RemoteRejected { message, .. }
            | AuthError::RequestFailed { message, .. }
            | AuthError::ServerError { message, .. } => message.clone(),
            AuthError::NetworkUnavailable(_) => {
                "Unable to connect to the server. Check your connection.".to_string()
            }
            AuthError::InvalidResponse(_) => "Authentication failed".to_string(),
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, AuthError::RemoteRejected { .. })
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        // Server-supplied text wins over the categorized fallback.
        let message = err.server_message().unwrap_or_else(|| err.user_message());
        match err.status() {
            Some(0) => AuthError::NetworkUnavailable(err.to_string()),
            Some(status @ (401 | 403)) => AuthError::RemoteRejected { status, message },
            Some(status @ 500..=599) => AuthError::ServerError { status, message },
            Some(status) => AuthError::RequestFailed { status, message },
            None => AuthError::InvalidResponse(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_api_error_rejections() {
        let err: AuthError = ApiError::from_status(StatusCode::UNAUTHORIZED, "").into();
        assert!(matches!(err, AuthError::RemoteRejected { status: 401, .. }));
        assert!(err.is_rejection());

        let err: AuthError = ApiError::from_status(StatusCode::FORBIDDEN, "").into();
        assert!(matches!(err, AuthError::RemoteRejected { status: 403, .. }));
    }

    #[test]
    fn test_from_api_error_prefers_server_message() {
        let err: AuthError = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"success": false, "message": "Wrong password"}"#,
        )
        .into();
        assert_eq!(err.user_message(), "Wrong password");
    }

    #[test]
    fn test_from_api_error_server_and_other() {
        let err: AuthError = ApiError::from_status(StatusCode::BAD_GATEWAY, "").into();
        assert!(matches!(err, AuthError::ServerError { status: 502, .. }));
        assert_eq!(err.user_message(), "Service temporarily unavailable");

        let err: AuthError = ApiError::from_status(StatusCode::CONFLICT, "").into();
        assert!(matches!(err, AuthError::RequestFailed { status: 409, .. }));

        let err: AuthError = ApiError::InvalidResponse("missing data".to_string()).into();
        assert!(matches!(err, AuthError::InvalidResponse(_)));
    }
}
