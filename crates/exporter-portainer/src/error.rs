//! Error types for the Portainer client.

use thiserror::Error;

/// Errors returned by Portainer API calls.
#[derive(Debug, Error)]
pub enum PortainerError {
    /// Connection failure, timeout, or a body that could not be read.
    #[error("portainer unavailable at {url}: {reason}")]
    Unavailable { url: String, reason: String },

    /// Portainer rejected the token (401/403).
    #[error("portainer rejected credentials at {url} (HTTP {status})")]
    Auth { url: String, status: u16 },

    /// Any other non-2xx status, or a body that is not the expected JSON.
    #[error("unexpected response from {url}: {reason}")]
    Protocol { url: String, reason: String },

    /// A single listing entry that could not be interpreted.
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

impl PortainerError {
    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "unavailable",
            Self::Auth { .. } => "auth",
            Self::Protocol { .. } => "protocol",
            Self::MalformedRecord(_) => "malformed_record",
        }
    }
}
