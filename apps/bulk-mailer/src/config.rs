//! Configuration for the bulk mailer

use core_config::{parse_or, ConfigError, ConfigSource, FromEnv};
use email::transport::smtp::{DEFAULT_TIMEOUT, IMPLICIT_TLS_PORT};
use email::SmtpConfig;
use std::time::Duration;

pub const DEFAULT_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SUBJECT: &str = "Automated message";

/// Sender used when rendering without credentials in dry-run mode
const DRY_RUN_SENDER: &str = "dry-run@localhost";

#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub smtp: SmtpConfig,
    /// `EMAIL_SUBJECT`
    pub subject: Option<String>,
    /// `FROM_NAME`
    pub from_name: Option<String>,
}

impl FromEnv for MailerConfig {
    fn from_source(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        let port = parse_or(source, "SMTP_PORT", IMPLICIT_TLS_PORT)?;
        let timeout = parse_or(source, "SMTP_TIMEOUT", DEFAULT_TIMEOUT.as_secs())?;

        let smtp = SmtpConfig::new(source.get_or("SMTP_SERVER", DEFAULT_SERVER), port)
            .with_credentials(source.non_empty("SMTP_USER"), source.non_empty("SMTP_PASSWORD"))
            .with_timeout(Duration::from_secs(timeout));

        Ok(Self {
            smtp,
            subject: source.non_empty("EMAIL_SUBJECT"),
            from_name: source.non_empty("FROM_NAME"),
        })
    }
}

impl MailerConfig {
    /// `--subject`, then `EMAIL_SUBJECT`, then the built-in fallback
    pub fn subject(&self, flag: Option<&str>) -> String {
        flag.filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.subject.clone())
            .unwrap_or_else(|| DEFAULT_SUBJECT.to_string())
    }

    /// `--from-name`, then `FROM_NAME`
    pub fn from_name(&self, flag: Option<&str>) -> Option<String> {
        flag.filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.from_name.clone())
    }

    /// Envelope and header sender; the SMTP login doubles as the address
    pub fn sender_address(&self, dry_run: bool) -> Result<String, ConfigError> {
        match &self.smtp.username {
            Some(user) => Ok(user.clone()),
            None if dry_run => Ok(DRY_RUN_SENDER.to_string()),
            None => Err(ConfigError::MissingEnvVar("SMTP_USER".to_string())),
        }
    }
}
