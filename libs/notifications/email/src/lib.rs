//! Bulk email delivery library
//!
//! Sends one personalized message per CSV row over a single SMTP session,
//! retrying transient failures and reconnecting once when the session drops.
//!
//! ## Components
//!
//! - **Recipient Source**: `RecipientSource` reads `RecipientRecord`s lazily from CSV
//! - **Message Builder**: `MessageBuilder` renders a `Template` into an `OutboundMessage`
//! - **Transport**: `Connector` / `MailSession` traits, `SmtpConnector` (lettre) and `MockConnector`
//! - **Orchestration**: `Campaign` drives the batch with a `RetryPolicy` and tallies a `BatchResult`
//!
//! ## Usage
//!
//! ```ignore
//! use email::{Campaign, MessageBuilder, RecipientSource, RetryPolicy, SmtpConfig, SmtpConnector, Template};
//!
//! let source = RecipientSource::open("recipients.csv")?;
//! let builder = MessageBuilder::new("Hello", Template::builtin(), "me@example.com", None);
//! let connector = SmtpConnector::new(SmtpConfig::new("smtp.example.com", 465));
//! let result = Campaign::new(connector, builder, RetryPolicy::default())
//!     .run(source)
//!     .await?;
//! ```

pub mod builder;
pub mod campaign;
pub mod error;
pub mod models;
pub mod recipients;
pub mod retry;
pub mod templates;
pub mod transport;

pub use builder::MessageBuilder;
pub use campaign::{Campaign, CampaignState};
pub use error::{
    AttachmentError, BuildError, CampaignError, ConnectError, SourceError, TemplateError,
    TransportError,
};
pub use models::{Attachment, BatchResult, OutboundMessage, RecipientRecord};
pub use recipients::RecipientSource;
pub use retry::{RetryPolicy, SendOutcome};
pub use templates::Template;
pub use transport::{Connector, MailSession, MockConnector, MockSession, SmtpConfig, SmtpConnector};
