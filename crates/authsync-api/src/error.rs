//! API error types.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Coarse classification every caller branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Authoritative "not logged in" (HTTP 401).
    Unauthorized,
    /// Network, timeout or server trouble. Never proof of being logged out.
    Transient,
    /// Bad input, caught locally or rejected by the server as malformed.
    Validation,
}

/// API error type.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server rejected the session or the credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The server rejected the request body (400/409/422) or local input is bad
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Any other non-success status
    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// The request exceeded the client timeout
    #[error("Request timed out")]
    Timeout,

    /// The server could not be reached
    #[error("Network unavailable: {0}")]
    Network(String),

    /// Other transport failure
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// A success response carried a body we could not read
    #[error("Malformed response: {0}")]
    Decode(String),

    /// Request URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Classify a transport-level reqwest failure.
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            ApiError::Network(err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Http(err)
        }
    }

    /// Build an error from a non-success status and its raw body.
    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        let message = server_message(body);
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message.unwrap_or_default()),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::Validation(message.unwrap_or_else(|| status.to_string()))
            }
            _ => ApiError::Server {
                status: status.as_u16(),
                message: message.unwrap_or_else(|| {
                    status.canonical_reason().unwrap_or("unknown").to_string()
                }),
            },
        }
    }

    /// Which of the three outcomes this error represents.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthorized(_) => ErrorKind::Unauthorized,
            ApiError::Validation(_) | ApiError::InvalidUrl(_) => ErrorKind::Validation,
            ApiError::Server { .. }
            | ApiError::Timeout
            | ApiError::Network(_)
            | ApiError::Http(_)
            | ApiError::Decode(_) => ErrorKind::Transient,
        }
    }

    /// Returns true if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// Returns true for an authoritative 401.
    pub fn is_unauthorized(&self) -> bool {
        self.kind() == ErrorKind::Unauthorized
    }

    /// Short text suitable for showing next to a form.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized(message) if !message.is_empty() => message.clone(),
            ApiError::Unauthorized(_) => {
                "Authentication required. Please sign in again.".to_string()
            }
            ApiError::Validation(message) => message.clone(),
            ApiError::Server { status: 403, .. } => {
                "You do not have permission to do that.".to_string()
            }
            ApiError::Server { status: 404, .. } => {
                "The requested resource was not found.".to_string()
            }
            ApiError::Server { status, .. } if *status >= 500 => {
                "The server ran into a problem. Please try again shortly.".to_string()
            }
            ApiError::Server { message, .. } => message.clone(),
            ApiError::Timeout | ApiError::Network(_) | ApiError::Http(_) => {
                "Cannot reach the server. Check your connection.".to_string()
            }
            ApiError::Decode(_) | ApiError::InvalidUrl(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

/// Error body shape the API uses: `{ statusCode, message, error }`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<MessageField>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageField {
    One(String),
    Many(Vec<String>),
}

/// Extract the human-readable message from an error body.
///
/// Array messages (one per failed field) are joined with ", ".
fn server_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let message = match parsed.message {
        Some(MessageField::One(message)) => message,
        Some(MessageField::Many(messages)) => messages.join(", "),
        None => parsed.error.unwrap_or_default(),
    };
    let message = message.trim().to_string();
    (!message.is_empty()).then_some(message)
}
