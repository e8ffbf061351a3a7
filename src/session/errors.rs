use thiserror::Error;

/// Message surfaced when a session cannot be recovered in development mode.
pub const SESSION_EXPIRED_MESSAGE: &str =
    "Authentication expired. Please refresh the page and log in again.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("Response error: {0}")]
    Parse(String),
    #[error("Request error: {0}")]
    Serialization(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Authentication expired. Please refresh the page and log in again.")]
    SessionExpired,
    #[error("Session expired, redirecting to {location}")]
    Redirected { location: String },
}

impl SessionError {
    /// HTTP status carried by the error, if the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for both escalation outcomes of the 401 recovery protocol.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::Redirected { .. })
    }
}
