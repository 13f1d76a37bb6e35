//! Errors returned by explicit user actions.
//!
//! Background reconciliation never surfaces errors; only login, signup and
//! profile edits do, and each carries a message fit to show inline.

use authsync_api::{ApiError, ErrorKind};
use thiserror::Error;

/// Failure of an explicit action.
#[derive(Error, Debug)]
pub enum ActionError {
    /// Rejected locally before any request was sent
    #[error("{0}")]
    InvalidInput(String),

    /// The server answered but declined
    #[error("{0}")]
    Rejected(String),

    /// The request failed
    #[error("{message}")]
    Api {
        message: String,
        #[source]
        source: ApiError,
    },
}

/// Result type for explicit actions.
pub type ActionResult<T> = Result<T, ActionError>;

impl ActionError {
    /// Wrap an API error, using `unauthorized` as the text for a bare 401.
    pub(crate) fn from_api(source: ApiError, unauthorized: &str) -> Self {
        let message = match &source {
            ApiError::Unauthorized(server) if server.trim().is_empty() => unauthorized.to_string(),
            _ => source.user_message(),
        };
        ActionError::Api { message, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::InvalidInput(_) | ActionError::Rejected(_) => ErrorKind::Validation,
            ActionError::Api { source, .. } => source.kind(),
        }
    }

    /// Text to show next to the form.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
