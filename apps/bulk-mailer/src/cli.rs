use clap::Parser;
use email::retry::{DEFAULT_BACKOFF_FACTOR, DEFAULT_MAX_RETRIES};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "bulk-mailer")]
#[command(about = "Send a personalized email to every row of a CSV file")]
pub struct Cli {
    /// CSV file with an `email` column and optional name and attachment columns
    #[arg(long)]
    pub csv: PathBuf,

    /// Subject line (falls back to EMAIL_SUBJECT)
    #[arg(long)]
    pub subject: Option<String>,

    /// Plain-text body template with {placeholders}
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Sender display name (falls back to FROM_NAME)
    #[arg(long)]
    pub from_name: Option<String>,

    /// Render every message without connecting or sending
    #[arg(long)]
    pub dry_run: bool,

    /// Attempts per message, including the first
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Base of the exponential wait between attempts, in seconds
    #[arg(long, default_value_t = DEFAULT_BACKOFF_FACTOR)]
    pub backoff_factor: u32,

    /// Override file read beneath the process environment
    #[arg(long, default_value = ".env")]
    pub env_file: PathBuf,

    /// Size-rotated log file
    #[arg(long, default_value = "send_emails.log")]
    pub log_file: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,
}
