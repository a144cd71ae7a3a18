//! Mail relay sessions

pub mod mock;
pub mod smtp;

pub use mock::{MockConnector, MockSession};
pub use smtp::{SmtpConfig, SmtpConnector, SmtpSession};

use crate::error::{ConnectError, TransportError};
use crate::models::OutboundMessage;
use async_trait::async_trait;

/// One live, authenticated connection to a relay
#[async_trait]
pub trait MailSession: Send {
    /// Transmit a single message
    async fn send(&mut self, message: &OutboundMessage) -> Result<(), TransportError>;

    /// Best-effort graceful shutdown; never fails
    async fn close(&mut self);
}

/// Opens new sessions to a relay
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: MailSession;

    /// Connect and authenticate
    async fn connect(&self) -> Result<Self::Session, ConnectError>;

    /// Get connector name
    fn name(&self) -> &'static str;
}
