//! Per-resource reconciliation: fetch, fingerprint, compare, stage.
//!
//! Within one resource the steps are strictly sequential; across resources
//! nothing here imposes an order. A failure anywhere in this module is
//! scoped to the resource being reconciled.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use kettle_core::{ResourceEntry, ResourceKind};

use crate::error::{io_err, SyncError};
use crate::fetch::Fetch;
use crate::state::StateFile;

/// SHA-256 hex fingerprint of content. The only comparison the engine does.
pub fn fingerprint(data: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(data);
    hex::encode(h.finalize())
}

/// Fetched content staged in the cycle's temporary directory, never in the
/// live installation. Discarded wholesale if the cycle drops it.
#[derive(Debug)]
pub struct StagedResource {
    pub entry: ResourceEntry,
    /// Fingerprint of the fetched source content.
    pub fingerprint: String,
    /// Staged copy of the fetched source file.
    pub staged_source: PathBuf,
    /// Compiled artifact, filled in by the build driver for plugins.
    pub artifact: Option<PathBuf>,
}

/// What reconciliation decided for one resource.
#[derive(Debug)]
pub enum Reconciliation {
    /// Remote fingerprint equals the recorded local fingerprint.
    Unchanged,
    /// Dry-run: content differs, but nothing was staged.
    WouldUpdate,
    /// Content differs (or was never installed); staged for build/commit.
    Staged(StagedResource),
}

/// Reconcile a single include or plugin entry against the local state.
///
/// Fetches the remote content once, fingerprints it, compares against the
/// state store, and stages the content under `staging_dir` when an update is
/// needed.
pub fn reconcile(
    entry: &ResourceEntry,
    state: &StateFile,
    fetcher: &dyn Fetch,
    staging_dir: &Path,
    dry_run: bool,
) -> Result<Reconciliation, SyncError> {
    let content = fetcher.fetch(&entry.source_url)?;
    let remote_fingerprint = fingerprint(&content);

    let key = entry.key();
    if state.fingerprint_of(&key) == Some(remote_fingerprint.as_str()) {
        tracing::debug!("unchanged: {key}");
        return Ok(Reconciliation::Unchanged);
    }

    if dry_run {
        tracing::info!("[dry-run] would update: {key}");
        return Ok(Reconciliation::WouldUpdate);
    }

    let ext = match entry.kind {
        ResourceKind::Include => "inc",
        ResourceKind::Plugin => "sp",
        ResourceKind::SelfUpdate => "bin",
    };
    let staged_source = staging_dir.join(format!("{}.{ext}", entry.name));
    std::fs::write(&staged_source, &content).map_err(|e| io_err(&staged_source, e))?;

    tracing::debug!("staged {key} at {}", staged_source.display());
    Ok(Reconciliation::Staged(StagedResource {
        entry: entry.clone(),
        fingerprint: remote_fingerprint,
        staged_source,
        artifact: None,
    }))
}
