//! stampede - hammer one shared record with concurrent appends and check
//! that nothing was lost.
//!
//! # Usage
//!
//! ```bash
//! # OCC, 50 workers, until interrupted or an anomaly shows up
//! stampede run
//!
//! # Transactional protocol, bounded, with a lost update injected for index 3
//! stampede run --protocol transaction --max-trials 100 --drop-index 3
//!
//! # Both protocols side by side, JSON for scripting
//! stampede --json compare --trials 20 --latency-ms 1
//! ```

mod cli;
mod commands;
mod config;
mod output;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

/// Initialize tracing subscriber with environment-based filtering.
///
/// - `quiet`: Suppress all logging output (for scripting)
/// - `verbose`: Enable debug-level logging
fn init_tracing(quiet: bool, verbose: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).compact().init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.global.is_quiet, cli.global.is_verbose);

    cli.run().await
}
