//! Error types for calls to the catalog backend.
//!
//! Every failure is returned to the caller. The only failure with a side
//! effect is [`ApiError::SessionExpired`]: by the time it is returned the
//! session has been cleared and the login redirect has fired.

use serde::Deserialize;
use thiserror::Error;

/// Fallback shown when login fails without a server message.
pub const LOGIN_FAILED_MESSAGE: &str =
    "Username or Password has not been found in our database. Please try again.";

const SERVER_FAILURE_MESSAGE: &str =
    "The server could not complete the request. Please try again later.";
const NETWORK_FAILURE_MESSAGE: &str =
    "Unable to reach the server. Check your connection and try again.";
const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Coarse classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No response was received.
    Network,
    /// The server rejected the credentials (HTTP 401).
    Authorization,
    /// The server rejected the request (other 4xx).
    Validation,
    /// The server failed (5xx) or answered with something unreadable.
    Server,
}

/// Errors returned by the authenticated request client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never got a response.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Still unauthorized after refreshing the token once.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The token could not be refreshed; the session has ended.
    #[error("Session expired: {0}")]
    SessionExpired(#[from] RefreshError),

    /// The server rejected the request (4xx other than 401).
    #[error("Request rejected ({status}): {message}")]
    Validation { status: u16, message: String },

    /// The server failed (5xx).
    #[error("Server error ({status})")]
    Server {
        status: u16,
        message: Option<String>,
    },

    /// A body that could not be encoded, or a 2xx response whose body did
    /// not match the expected shape.
    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Build the error for a non-2xx response other than a retriable 401.
    pub(crate) fn from_status(status: reqwest::StatusCode, body: &[u8]) -> Self {
        let message = server_message(body);
        let code = status.as_u16();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            Self::Unauthorized {
                message: message.unwrap_or_else(|| "Unauthorized".to_string()),
            }
        } else if status.is_client_error() {
            Self::Validation {
                status: code,
                message: message.unwrap_or_else(|| status.to_string()),
            }
        } else {
            Self::Server {
                status: code,
                message,
            }
        }
    }

    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Network(_) => FailureKind::Network,
            Self::Unauthorized { .. } | Self::SessionExpired(_) => FailureKind::Authorization,
            Self::Validation { .. } | Self::Url(_) => FailureKind::Validation,
            Self::Server { .. } | Self::Decode(_) => FailureKind::Server,
        }
    }

    /// HTTP status of the failed response, when there was one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Validation { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message to show next to the form that made the call.
    ///
    /// Validation failures carry the server's text verbatim; server failures
    /// are reduced to a generic message.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::Validation { message, .. } | Self::Unauthorized { message } => message.clone(),
            Self::SessionExpired(_) => SESSION_EXPIRED_MESSAGE.to_string(),
            Self::Network(_) => NETWORK_FAILURE_MESSAGE.to_string(),
            Self::Server { .. } | Self::Decode(_) | Self::Url(_) => {
                SERVER_FAILURE_MESSAGE.to_string()
            }
        }
    }
}

/// Errors from the token refresh flow.
///
/// Any of these ends the session.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// No refresh token is stored.
    #[error("No refresh token available")]
    MissingRefreshToken,

    /// The refresh endpoint refused the refresh token.
    #[error("Token refresh rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The refresh endpoint could not be reached.
    #[error("Token refresh failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The refresh endpoint answered with an unexpected body.
    #[error("Invalid refresh response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Another caller's refresh already failed and cleared the session.
    #[error("Session ended by a concurrent refresh failure")]
    SessionEnded,

    /// The refresh URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Errors from login and registration.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The credentials were refused. Carries the text to show the user.
    #[error("Authentication failed: {0}")]
    InvalidCredentials(String),

    /// The backend rejected the registration.
    #[error("Registration failed: {0}")]
    RegistrationRejected(String),

    /// The backend could not be reached.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with an unexpected body.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Error body returned by the backend.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Extract the server-provided message from an error body.
pub(crate) fn server_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_validation_keeps_server_message() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, br#"{"message":"Name taken"}"#);
        assert_eq!(err.kind(), FailureKind::Validation);
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.display_message(), "Name taken");
    }

    #[test]
    fn test_server_failure_is_generic() {
        let err = ApiError::from_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            br#"{"message":"NullPointerException at line 42"}"#,
        );
        assert_eq!(err.kind(), FailureKind::Server);
        assert!(!err.display_message().contains("NullPointer"));
    }

    #[test]
    fn test_unauthorized_classification() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, b"");
        assert_eq!(err.kind(), FailureKind::Authorization);
        assert_eq!(err.to_string(), "Unauthorized: Unauthorized");
    }

    #[test]
    fn test_session_expired_message() {
        let err = ApiError::from(RefreshError::MissingRefreshToken);
        assert_eq!(err.kind(), FailureKind::Authorization);
        assert_eq!(err.display_message(), SESSION_EXPIRED_MESSAGE);
    }

    #[test]
    fn test_server_message_falls_back_to_error_field() {
        assert_eq!(
            server_message(br#"{"error":"Forbidden"}"#).as_deref(),
            Some("Forbidden")
        );
        assert_eq!(server_message(b"<html>"), None);
        assert_eq!(server_message(br#"{"message":"  "}"#), None);
    }
}
