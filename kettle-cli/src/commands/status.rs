//! `kettle status` — local state store visibility.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use kettle_core::Config;
use kettle_sync::state;

/// Arguments for `kettle status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Configuration file (default: <config dir>/kettle/config.yml).
    #[arg(long, env = "KETTLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server working root the game directory lives under (default: cwd).
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "RESOURCE")]
    resource: String,
    #[tabled(rename = "FINGERPRINT")]
    fingerprint: String,
    #[tabled(rename = "UPDATED")]
    updated: String,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => super::default_config_path()?,
        };
        let config = Config::load(&config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?;
        let root = super::resolve_root(self.root)?;
        let layout = config.layout_at(&root);

        let state = state::load(&layout.state_file)
            .with_context(|| format!("failed to load {}", layout.state_file.display()))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&state)?);
            return Ok(());
        }

        if state.resources.is_empty() {
            println!("Nothing installed yet. Run `kettle run` first.");
            return Ok(());
        }

        let rows: Vec<StatusRow> = state
            .resources
            .iter()
            .map(|(key, rs)| StatusRow {
                resource: key.clone(),
                fingerprint: short_fingerprint(&rs.fingerprint),
                updated: format_age(rs.updated_at),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::sharp());
        println!("{table}");
        println!("state store: {}", layout.state_file.display());
        Ok(())
    }
}

fn short_fingerprint(fingerprint: &str) -> String {
    fingerprint.chars().take(12).collect()
}

/// `Utc::now() - then` rendered as a coarse human age.
fn format_age(then: DateTime<Utc>) -> String {
    let secs = (Utc::now() - then).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_owned(),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
