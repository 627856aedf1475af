//! Error types used throughout the workspace

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for resource access, transport and migration operations
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum RestError {
    /// Body does not parse under the declared content type
    #[error("Decode error: {0}")]
    Decode(String),

    /// Transport-level status outside 2xx/3xx
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// Status accepted by HTTP but not the one the operation requires
    #[error("Expected a {expected} response, got {actual}")]
    UnexpectedStatus { expected: u16, actual: u16 },

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("No collection declared as '{0}'")]
    UnknownCollection(String),

    /// Operation invoked in a state that forbids it
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Missing token or failed token exchange
    #[error("Token error: {0}")]
    Token(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RestError {
    /// Status code carried by HTTP-level failures
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::UnexpectedStatus { actual, .. } => Some(*actual),
            _ => None,
        }
    }

    /// Whether the remote service rejected the request itself (as opposed to
    /// local state, decoding or connectivity problems)
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::UnexpectedStatus { .. })
    }
}

/// Result type alias for workspace operations
pub type Result<T> = std::result::Result<T, RestError>;
