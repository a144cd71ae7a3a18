//! Bulk Mailer
//!
//! Sends one personalized email per CSV row over SMTP.
//! Exits 0 when the batch completes, even if some recipients failed.

use bulk_mailer::Cli;
use clap::Parser;
use core_config::tracing::install_color_eyre;
use eyre::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();
    bulk_mailer::run(cli).await?;

    Ok(())
}
