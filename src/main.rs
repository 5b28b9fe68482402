//! plexup CLI entry point
//!
//! Parses command-line arguments, executes the selected command, and renders
//! failures as user-friendly diagnostics before exiting non-zero.

use anyhow::Result;
use clap::Parser;
use plexup::cli;
use plexup::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
