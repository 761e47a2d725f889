//! fetchdep CLI entry point
//!
//! Parses arguments, runs the engine and maps the outcome to an exit status:
//! 0 when every dependency is prepared (or missing ones were tolerated), 1
//! when the run stopped early or aborted with an error.

use anyhow::Result;
use clap::Parser;
use fetchdep::cli;
use fetchdep::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(outcome) if outcome.is_success() => Ok(()),
        Ok(_) => std::process::exit(1),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
