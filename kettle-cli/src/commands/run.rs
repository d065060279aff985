//! `kettle run` — one reconciliation cycle.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use kettle_core::Config;
use kettle_sync::{selfupdate, CycleReport, HttpFetcher, ResourceOutcome};

/// Arguments for `kettle run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Configuration file (default: <config dir>/kettle/config.yml).
    #[arg(long, env = "KETTLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server working root the game directory lives under (default: cwd).
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Report what would change without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the self-update check even when the config enables it.
    #[arg(long)]
    pub skip_self_update: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        // A previous cycle may have parked a new binary (non-POSIX swap).
        if selfupdate::apply_pending().context("failed to apply a pending self-update")? {
            println!("{} applied a pending self-update", "✓".green());
        }

        let config_path = match self.config {
            Some(path) => path,
            None => super::default_config_path()?,
        };
        let mut config = Config::load(&config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?;
        if self.skip_self_update {
            config.self_update_url = None;
        }

        let root = super::resolve_root(self.root)?;
        let fetcher = HttpFetcher::new(config.fetch_timeout());

        let report = kettle_sync::run_cycle(&root, &config, &fetcher, self.dry_run)
            .context("update cycle aborted")?;
        print_report(&report, self.dry_run);

        if report.has_failures() {
            bail!(
                "{} resource(s) failed, {} recipe(s) unavailable",
                report.failed(),
                report.manifest_failures.len()
            );
        }
        Ok(())
    }
}

fn print_report(report: &CycleReport, dry_run: bool) {
    for failure in &report.manifest_failures {
        println!(
            "{} recipe {} skipped: {}",
            "✗".red(),
            failure.url,
            failure.error
        );
    }
    for warning in &report.warnings {
        println!("{} {warning}", "warning:".yellow().bold());
    }

    for r in &report.resources {
        match &r.outcome {
            ResourceOutcome::Updated => {
                println!("  {}  {} '{}' updated", "✎".green(), r.kind, r.name);
            }
            ResourceOutcome::WouldUpdate => {
                println!("  {}  {} '{}' would update", "~".yellow(), r.kind, r.name);
            }
            ResourceOutcome::Unchanged => {
                println!("  ·  {} '{}' unchanged", r.kind, r.name);
            }
            ResourceOutcome::Failed { reason } => {
                println!("  {}  {} '{}': {reason}", "✗".red(), r.kind, r.name);
            }
        }
    }

    let prefix = if dry_run { "[dry-run] " } else { "" };
    println!(
        "{prefix}{} updated, {} unchanged, {} failed",
        report.updated(),
        report.unchanged(),
        report.failed()
    );
}
