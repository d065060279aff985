//! kettle — automatic SourceMod plugin update CLI.
//!
//! # Usage
//!
//! ```text
//! kettle run [--config <path>] [--root <path>] [--dry-run] [--skip-self-update]
//! kettle status [--config <path>] [--root <path>] [--json]
//! ```
//!
//! `run` performs one reconciliation cycle and exits non-zero if any
//! resource or recipe failed, so a cron line like
//! `@daily cd /srv/nt && kettle run` surfaces problems through the
//! scheduler's mail.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{run::RunArgs, status::StatusArgs};

#[derive(Parser, Debug)]
#[command(
    name = "kettle",
    version,
    about = "Keep SourceMod plugins and includes in sync with remote recipes",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one full update cycle.
    Run(RunArgs),

    /// Show what the local state store believes is installed.
    Status(StatusArgs),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}
