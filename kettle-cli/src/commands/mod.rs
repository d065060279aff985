pub mod run;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};

/// `--config` fallback: `<platform config dir>/kettle/config.yml`.
pub(crate) fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("could not determine the user configuration directory")?;
    Ok(dir.join("kettle").join("config.yml"))
}

/// `--root` fallback: the current working directory, where cron runs us.
pub(crate) fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(path) => Ok(path),
        None => std::env::current_dir().context("could not determine the working directory"),
    }
}
