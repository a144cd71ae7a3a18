//! Error types for bulk delivery.
//!
//! Only [`CampaignError`] aborts a run. Everything else is scoped to a single
//! recipient and ends up as a failed count in the batch result.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The recipient file could not be opened or parsed.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to open recipient file '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// The body template cannot be rendered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template references unknown placeholder '{{{0}}}'")]
    UnknownPlaceholder(String),

    #[error("Malformed template at byte {position}: {reason}")]
    Malformed {
        position: usize,
        reason: &'static str,
    },
}

/// An attachment file could not be loaded. Recovered by the builder.
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Attachment not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read attachment '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A message could not be built for a recipient.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Recipient record has no email address")]
    MissingEmail,

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// A session to the relay could not be established.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Failed to connect to {server}:{port}: {details}")]
    Unreachable {
        server: String,
        port: u16,
        details: String,
    },

    #[error("TLS negotiation with {server} failed: {details}")]
    Tls { server: String, details: String },

    #[error("Authentication failed for '{user}': {details}")]
    Auth { user: String, details: String },
}

/// A single send attempt failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The connection is gone; only a reconnect can help
    #[error("Server disconnected: {0}")]
    Disconnected(String),

    /// Temporary (4xx) SMTP reply
    #[error("SMTP protocol error: {0}")]
    Protocol(String),

    /// Socket-level failure or timeout
    #[error("Network error: {0}")]
    Network(String),

    #[error("TLS error: {0}")]
    Tls(String),

    /// Permanent (5xx) rejection by the relay
    #[error("Rejected by server: {0}")]
    Rejected(String),

    /// The message itself could not be serialized
    #[error("Invalid message: {0}")]
    Message(String),
}

impl TransportError {
    /// Whether retrying the same message may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Disconnected(_) | Self::Protocol(_) | Self::Network(_) | Self::Tls(_)
        )
    }

    /// Whether the session is unusable and must be replaced
    pub fn is_session_dead(&self) -> bool {
        matches!(self, Self::Disconnected(_))
    }
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("Failed to connect/login to SMTP server: {0}")]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Template(#[from] TemplateError),
}
