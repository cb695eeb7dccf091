//! promptkit CLI binary entry point.
//!
//! Parses command-line arguments with clap, initializes the tracing
//! subscriber and dispatches to the selected subcommand via [`Cli::run`].

mod cli;
mod logging;
mod output;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Held until exit so buffered file logs are flushed.
    let _guard = logging::init_tracing(cli.verbose, cli.log_file.as_deref())?;

    cli.run().await
}
