//! CLI argument parsing and command dispatch.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use clap::Parser;
use clap::Subcommand;

use crate::commands::compare::CompareArgs;
use crate::commands::run::RunArgs;

/// Contention harness for concurrent appends to one shared record.
#[derive(Parser)]
#[command(name = "stampede")]
#[command(version)]
#[command(about = "Contention harness for concurrent appends to one shared record")]
#[command(long_about = "Launches many concurrent workers that each append their index to one \
    shared record, retrying on contention, then verifies that every acknowledged append is durable.")]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Global options available to all commands.
#[derive(Args, Clone)]
pub struct GlobalOptions {
    /// TOML configuration file.
    ///
    /// Command-line flags override values from the file.
    #[arg(long, env = "STAMPEDE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output JSON instead of human-readable format.
    #[arg(long = "json", global = true)]
    pub is_json: bool,

    /// Enable verbose logging.
    #[arg(short = 'v', long = "verbose", global = true)]
    pub is_verbose: bool,

    /// Suppress all logging output.
    #[arg(short = 'q', long = "quiet", global = true)]
    pub is_quiet: bool,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run trials until an anomaly, the trial limit, or Ctrl-C.
    Run(RunArgs),

    /// Run a fixed number of trials with each protocol and compare them.
    Compare(CompareArgs),
}

impl Cli {
    /// Execute the selected command.
    pub async fn run(self) -> Result<ExitCode> {
        match self.command {
            Commands::Run(args) => args.execute(&self.global).await,
            Commands::Compare(args) => args.execute(&self.global).await,
        }
    }
}
