//! Error types for backend calls and editor workflows

use thiserror::Error;

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the backend or driving an editor
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level failure (connection refused, timeout, bad body)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("Backend returned {status}: {}", api_detail(*.status, .message))]
    Api {
        /// HTTP status code
        status: u16,
        /// Server-provided message; empty when the body carried none
        message: String,
    },

    /// Client-side validation, configuration or session error
    #[error(transparent)]
    Core(#[from] kerala_core::Error),

    /// A mutation for the same record is still in flight
    #[error("A change to {record} is already being saved")]
    Busy {
        /// Record name
        record: String,
    },

    /// The operation needs a loaded record
    #[error("{record} has not been loaded")]
    NotLoaded {
        /// Record name
        record: String,
    },

    /// The operation is not valid in the current workflow state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },
}

/// The server message, or the status reason when there is none
fn api_detail(status: u16, message: &str) -> String {
    if !message.is_empty() {
        return message.to_string();
    }
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Request failed")
        .to_string()
}

impl ClientError {
    /// Create a new API error
    #[must_use]
    pub fn api<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a new busy error
    #[must_use]
    pub fn busy<S: Into<String>>(record: S) -> Self {
        Self::Busy {
            record: record.into(),
        }
    }

    /// Create a new not-loaded error
    #[must_use]
    pub fn not_loaded<S: Into<String>>(record: S) -> Self {
        Self::NotLoaded {
            record: record.into(),
        }
    }

    /// Create a new invalid-state error
    #[must_use]
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Message provided by the backend, if the failure came with one
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }

    /// Whether the error was raised before any request was sent
    #[must_use]
    pub const fn is_client_side(&self) -> bool {
        matches!(
            self,
            Self::Core(_) | Self::Busy { .. } | Self::NotLoaded { .. } | Self::InvalidState { .. }
        )
    }
}
