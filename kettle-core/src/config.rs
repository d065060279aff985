//! Kettle configuration.
//!
//! A strict YAML document, loaded once per invocation and passed into the
//! engine as an explicit record:
//!
//! ```yaml
//! game_dir: nt
//! recipes:
//!   - https://example.com/recipe.json
//! compiler: spcomp            # optional, default <scripting>/spcomp
//! fetch_timeout_secs: 30      # optional
//! build_timeout_secs: 120     # optional
//! self_update_url: null       # optional; enables the self-update path
//! state_file: null            # optional, default <root>/kettle_state.json
//! ```
//!
//! Filesystem layout is resolved against an explicit `root` (the server's
//! working directory), so everything stays testable with a `TempDir`:
//!
//! ```text
//! <root>/<game_dir>/addons/sourcemod/plugins/     (compiled .smx)
//! <root>/<game_dir>/addons/sourcemod/scripting/   (.sp sources, spcomp)
//! <root>/<game_dir>/addons/sourcemod/scripting/include/
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

fn default_fetch_timeout() -> u64 {
    30
}

fn default_build_timeout() -> u64 {
    120
}

/// Validated configuration record for one engine invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Game directory name under the working root, e.g. `nt` or `tf`.
    pub game_dir: String,

    /// Ordered recipe URLs; order is the merge priority (first wins).
    pub recipes: Vec<String>,

    /// Compiler binary; relative paths resolve against the root. Defaults to
    /// `spcomp` (`spcomp.exe` on Windows) in the scripting directory.
    #[serde(default)]
    pub compiler: Option<PathBuf>,

    /// Per-request network timeout, seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Per-invocation compiler timeout, seconds.
    #[serde(default = "default_build_timeout")]
    pub build_timeout_secs: u64,

    /// Source URL for the engine's own executable. Absent: self-update
    /// disabled.
    #[serde(default)]
    pub self_update_url: Option<String>,

    /// Local state store path. Defaults to `<root>/kettle_state.json`.
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

/// Concrete on-disk layout derived from a [`Config`] and a root.
#[derive(Debug, Clone)]
pub struct Layout {
    pub plugins_dir: PathBuf,
    pub scripting_dir: PathBuf,
    pub includes_dir: PathBuf,
    pub compiler: PathBuf,
    pub state_file: PathBuf,
}

impl Config {
    /// Load the configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the installation layout against `root`.
    pub fn layout_at(&self, root: &Path) -> Layout {
        let sourcemod = root
            .join(&self.game_dir)
            .join("addons")
            .join("sourcemod");
        let scripting_dir = sourcemod.join("scripting");
        let compiler = match &self.compiler {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => root.join(p),
            None => scripting_dir.join(if cfg!(windows) { "spcomp.exe" } else { "spcomp" }),
        };
        Layout {
            plugins_dir: sourcemod.join("plugins"),
            includes_dir: scripting_dir.join("include"),
            state_file: self
                .state_file
                .clone()
                .unwrap_or_else(|| root.join("kettle_state.json")),
            scripting_dir,
            compiler,
        }
    }

    /// Pre-flight validation; must pass before any network activity.
    ///
    /// Rejects plaintext recipe / self-update URLs and a missing
    /// installation layout.
    pub fn validate_at(&self, root: &Path) -> Result<(), ConfigError> {
        for url in &self.recipes {
            if !url.starts_with("https://") {
                return Err(ConfigError::InsecureRecipeUrl { url: url.clone() });
            }
        }
        if let Some(url) = &self.self_update_url {
            if !url.starts_with("https://") {
                return Err(ConfigError::InsecureRecipeUrl { url: url.clone() });
            }
        }

        let layout = self.layout_at(root);
        for dir in [
            &layout.plugins_dir,
            &layout.scripting_dir,
            &layout.includes_dir,
        ] {
            if !dir.is_dir() {
                return Err(ConfigError::MissingDirectory { path: dir.clone() });
            }
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
