//! cursor-rules CLI entry point.
//!
//! Parses arguments, initializes logging, runs the selected command, and
//! renders failures through the user-friendly error layer.

use anyhow::Result;
use clap::Parser;
use cursor_rules_cli::cli::Cli;
use cursor_rules_cli::core::user_friendly_error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins when set; --verbose maps to debug; otherwise logging
    // stays off so normal output is clean.
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    } else if cli.verbose() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("off")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(error) => {
            user_friendly_error(error).display();
            std::process::exit(1);
        }
    }
}
