//! Local state store — SHA-256 fingerprint tracking for installed resources.
//!
//! Persists a `StateFile` JSON document at the configured path (default
//! `<root>/kettle_state.json`). Writes use the atomic `.tmp` + rename
//! pattern, so a crash mid-write never corrupts previously committed
//! entries.
//!
//! The installer is the sole writer; the reconciler only reads.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kettle_core::ResourceKey;

use crate::error::{io_err, SyncError};

/// Fingerprint + timestamp of one installed resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceState {
    /// SHA-256 hex digest of the installed source content.
    pub fingerprint: String,
    /// When the resource was last successfully committed.
    pub updated_at: DateTime<Utc>,
}

/// On-disk state store payload. Keys are [`ResourceKey::state_key`] strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateFile {
    pub updated_at: DateTime<Utc>,
    pub resources: BTreeMap<String, ResourceState>,
}

impl StateFile {
    pub fn empty() -> Self {
        Self {
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }

    /// Fingerprint recorded for `key`, if any.
    pub fn fingerprint_of(&self, key: &ResourceKey) -> Option<&str> {
        self.resources
            .get(&key.state_key())
            .map(|s| s.fingerprint.as_str())
    }

    /// Record a successful commit. Only the installer calls this.
    pub fn record(&mut self, key: &ResourceKey, fingerprint: String) {
        let now = Utc::now();
        self.resources.insert(
            key.state_key(),
            ResourceState {
                fingerprint,
                updated_at: now,
            },
        );
        self.updated_at = now;
    }
}

/// Load the state store from `path`.
///
/// Returns an empty store if the file does not yet exist.
pub fn load(path: &Path) -> Result<StateFile, SyncError> {
    if !path.exists() {
        return Ok(StateFile::empty());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save the state store to `path` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save(path: &Path, state: &StateFile) -> Result<(), SyncError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid state path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}
