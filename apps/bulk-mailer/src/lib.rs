//! Bulk mailer
//!
//! Reads recipients from a CSV file and sends each one a personalized
//! message over a single SMTP session.

pub mod cli;
pub mod config;

pub use cli::Cli;
pub use config::MailerConfig;

use core_config::tracing::{init_tracing, LogSettings, RotatingLogFile};
use core_config::{ConfigSource, Environment, FromEnv, Layered};
use email::{BatchResult, Campaign, MessageBuilder, RecipientSource, RetryPolicy, SmtpConnector, Template};
use eyre::{Result, WrapErr};
use std::path::Path;
use tracing::info;

/// Resolve configuration, install logging and run the batch
pub async fn run(cli: Cli) -> Result<BatchResult> {
    let source = Layered::env_with_override(&cli.env_file)
        .wrap_err("Failed to load configuration")?;

    init_tracing(&Environment::from_source(&source), &log_settings(&cli));

    execute(&cli, &source).await
}

/// Run the batch against an already resolved configuration source
pub async fn execute(cli: &Cli, source: &dyn ConfigSource) -> Result<BatchResult> {
    let config = MailerConfig::from_source(source).wrap_err("Invalid configuration")?;

    let template = load_template(cli.template.as_deref())?;
    let builder = MessageBuilder::new(
        config.subject(cli.subject.as_deref()),
        template,
        config.sender_address(cli.dry_run)?,
        config.from_name(cli.from_name.as_deref()),
    );

    let recipients = RecipientSource::open(&cli.csv)
        .wrap_err_with(|| format!("Failed to read recipients from {}", cli.csv.display()))?;

    info!(
        csv = %cli.csv.display(),
        server = %config.smtp.server,
        port = config.smtp.port,
        dry_run = cli.dry_run,
        max_retries = cli.max_retries,
        backoff_factor = cli.backoff_factor,
        "Starting batch"
    );

    let policy = RetryPolicy::new(cli.max_retries, cli.backoff_factor);
    let result = Campaign::new(SmtpConnector::new(config.smtp), builder, policy)
        .dry_run(cli.dry_run)
        .run(recipients)
        .await?;

    Ok(result)
}

fn log_settings(cli: &Cli) -> LogSettings {
    LogSettings {
        default_filter: if cli.verbose { "debug" } else { "info" }.to_string(),
        file: Some(RotatingLogFile::new(&cli.log_file)),
    }
}

fn load_template(path: Option<&Path>) -> Result<Template> {
    let Some(path) = path else {
        return Ok(Template::builtin());
    };

    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read template {}", path.display()))?;
    Template::parse(&text).wrap_err_with(|| format!("Invalid template {}", path.display()))
}
