//! SMTP session using lettre's low-level connection
//!
//! A single connection is kept open for the whole batch. lettre's pooled
//! transports are not used because the batch needs explicit control over
//! connect, reconnect and teardown.

use super::{Connector, MailSession};
use crate::error::{ConnectError, TransportError};
use crate::models::OutboundMessage;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{AsyncSmtpConnection, TlsParameters},
        extension::ClientId,
        Error as SmtpError,
    },
    Address, Message,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Port on which TLS starts with the connection (SMTPS)
pub const IMPLICIT_TLS_PORT: u16 = 465;

/// Default per-connection I/O timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// SMTP relay configuration
#[derive(Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// TLS from connection start; otherwise STARTTLS is attempted
    pub implicit_tls: bool,
    pub timeout: Duration,
}

impl SmtpConfig {
    /// Relay at `server:port`; implicit TLS when `port` is 465
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Self {
            server: server.into(),
            port,
            username: None,
            password: None,
            implicit_tls: port == IMPLICIT_TLS_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Credentials, only when both user and password are set
    fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                Some(Credentials::new(user.clone(), pass.clone()))
            }
            _ => None,
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self::new("smtp.gmail.com", IMPLICIT_TLS_PORT)
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("implicit_tls", &self.implicit_tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Opens authenticated SMTP sessions
#[derive(Clone, Debug)]
pub struct SmtpConnector {
    config: Arc<SmtpConfig>,
}

impl SmtpConnector {
    pub fn new(config: SmtpConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SmtpConfig {
        &self.config
    }

    fn tls_parameters(&self) -> Result<TlsParameters, SmtpError> {
        TlsParameters::new(self.config.server.clone())
    }

    async fn open(
        &self,
        hello: &ClientId,
        tls: Option<TlsParameters>,
    ) -> Result<AsyncSmtpConnection, SmtpError> {
        AsyncSmtpConnection::connect_tokio1(
            (self.config.server.as_str(), self.config.port),
            Some(self.config.timeout),
            hello,
            tls,
            None,
        )
        .await
    }

    fn unreachable(&self, err: &SmtpError) -> ConnectError {
        ConnectError::Unreachable {
            server: self.config.server.clone(),
            port: self.config.port,
            details: err.to_string(),
        }
    }

    /// Plaintext connect, then try to upgrade. A failed upgrade falls back to
    /// an unencrypted connection instead of aborting.
    async fn open_with_starttls(
        &self,
        hello: &ClientId,
    ) -> Result<AsyncSmtpConnection, ConnectError> {
        let mut conn = self
            .open(hello, None)
            .await
            .map_err(|e| self.unreachable(&e))?;

        if !conn.can_starttls() {
            warn!(server = %self.config.server, "Server does not offer STARTTLS; continuing unencrypted");
            return Ok(conn);
        }

        let upgrade = match self.tls_parameters() {
            Ok(tls) => conn.starttls(tls, hello).await,
            Err(e) => Err(e),
        };

        match upgrade {
            Ok(()) => Ok(conn),
            Err(e) => {
                warn!(server = %self.config.server, error = %e, "STARTTLS failed; continuing unencrypted");
                if conn.has_broken() {
                    self.open(hello, None)
                        .await
                        .map_err(|e| self.unreachable(&e))
                } else {
                    Ok(conn)
                }
            }
        }
    }

    /// Connect, negotiate TLS and authenticate
    async fn establish(&self) -> Result<AsyncSmtpConnection, ConnectError> {
        let hello = ClientId::default();

        let mut conn = if self.config.implicit_tls {
            let tls = self.tls_parameters().map_err(|e| ConnectError::Tls {
                server: self.config.server.clone(),
                details: e.to_string(),
            })?;
            self.open(&hello, Some(tls)).await.map_err(|e| {
                if e.is_tls() {
                    ConnectError::Tls {
                        server: self.config.server.clone(),
                        details: e.to_string(),
                    }
                } else {
                    self.unreachable(&e)
                }
            })?
        } else {
            self.open_with_starttls(&hello).await?
        };

        if let Some(credentials) = self.config.credentials() {
            conn.auth(&[Mechanism::Plain, Mechanism::Login], &credentials)
                .await
                .map_err(|e| ConnectError::Auth {
                    user: self.config.username.clone().unwrap_or_default(),
                    details: e.to_string(),
                })?;
        }

        debug!(
            server = %self.config.server,
            port = self.config.port,
            tls = conn.is_encrypted(),
            "Connected to SMTP server"
        );

        Ok(conn)
    }
}

#[async_trait]
impl Connector for SmtpConnector {
    type Session = SmtpSession;

    async fn connect(&self) -> Result<SmtpSession, ConnectError> {
        let conn = self.establish().await?;
        Ok(SmtpSession {
            conn,
            connector: self.clone(),
            reset_pending: false,
        })
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// A live SMTP connection
///
/// lettre closes the connection after any failed transaction. When the
/// failure was an SMTP reply the server is still reachable, so the next send
/// re-opens the connection first. Any other broken connection is reported as
/// [`TransportError::Disconnected`].
pub struct SmtpSession {
    conn: AsyncSmtpConnection,
    connector: SmtpConnector,
    reset_pending: bool,
}

impl SmtpSession {
    async fn ensure_ready(&mut self) -> Result<(), TransportError> {
        if self.reset_pending {
            self.conn = self
                .connector
                .establish()
                .await
                .map_err(|e| TransportError::Disconnected(e.to_string()))?;
            self.reset_pending = false;
        } else if self.conn.has_broken() {
            return Err(TransportError::Disconnected(
                "connection closed by server".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MailSession for SmtpSession {
    async fn send(&mut self, message: &OutboundMessage) -> Result<(), TransportError> {
        let email = to_lettre(message)?;
        self.ensure_ready().await?;

        match self.conn.send(email.envelope(), &email.formatted()).await {
            Ok(response) => {
                debug!(to = %message.to, code = %response.code(), "Relay accepted message");
                Ok(())
            }
            Err(e) => {
                let err = classify(&e, self.conn.has_broken());
                if matches!(err, TransportError::Protocol(_) | TransportError::Rejected(_)) {
                    self.reset_pending = true;
                }
                Err(err)
            }
        }
    }

    async fn close(&mut self) {
        if self.reset_pending || self.conn.has_broken() {
            return;
        }
        if let Err(e) = self.conn.quit().await {
            debug!(error = %e, "Error while closing SMTP session");
        }
    }
}

/// Map a lettre error to the transport taxonomy
fn classify(err: &SmtpError, broken: bool) -> TransportError {
    let details = err.to_string();

    if err.is_permanent() {
        TransportError::Rejected(details)
    } else if err.is_transient() {
        TransportError::Protocol(details)
    } else if err.is_response() {
        // no reply code: the stream ended or stopped speaking SMTP
        TransportError::Disconnected(details)
    } else if err.is_client() {
        TransportError::Message(details)
    } else if err.is_tls() {
        TransportError::Tls(details)
    } else if err.is_timeout() {
        TransportError::Network(details)
    } else if broken {
        TransportError::Disconnected(details)
    } else {
        TransportError::Network(details)
    }
}

/// Serialize an outbound message with lettre's builder
fn to_lettre(message: &OutboundMessage) -> Result<Message, TransportError> {
    let from_address: Address = message.from_address.parse().map_err(|e| {
        TransportError::Message(format!("Invalid from address '{}': {}", message.from_address, e))
    })?;
    let from = Mailbox::new(message.from_name.clone(), from_address);
    let to: Mailbox = message
        .to
        .parse()
        .map_err(|e| TransportError::Message(format!("Invalid to address '{}': {}", message.to, e)))?;

    let builder = Message::builder().from(from).to(to).subject(&message.subject);

    let built = match &message.attachment {
        Some(attachment) => {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| TransportError::Message(format!("Invalid content type: {}", e)))?;

            builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(message.body.clone()))
                    .singlepart(
                        MimeAttachment::new(attachment.filename.clone())
                            .body(attachment.data.clone(), content_type),
                    ),
            )
        }
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone()),
    };

    built.map_err(|e| TransportError::Message(format!("Failed to build message: {}", e)))
}
