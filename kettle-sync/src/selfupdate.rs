//! Self-update path.
//!
//! A specialized reconciliation of exactly one resource: the engine's own
//! executable. Two differences from the general flow:
//!
//! - The running file is never truncated in place. On POSIX the staged copy
//!   is renamed over the executable (the running process keeps its old
//!   inode); elsewhere the copy is parked at `<exe>.new` and swapped in by
//!   [`apply_pending`] at the start of the next invocation.
//! - The current cycle always continues on the old in-memory code; the new
//!   version takes effect on the next scheduler run. No re-exec.
//!
//! When the state store has no entry yet (manual install, first run) the
//! executable on disk is fingerprinted directly, so an up-to-date binary is
//! not rewritten just because it was never recorded.

use std::path::Path;

use kettle_core::{ResourceKey, ResourceKind};

use crate::error::{io_err, SyncError};
use crate::fetch::Fetch;
use crate::reconcile::fingerprint;
use crate::report::{ResourceOutcome, ResourceReport};
use crate::state::{self, StateFile};

/// Name under which the engine tracks itself in the state store.
pub const SELF_RESOURCE_NAME: &str = "kettle";

fn self_key() -> ResourceKey {
    ResourceKey::new(ResourceKind::SelfUpdate, SELF_RESOURCE_NAME)
}

/// Run the self-update check against the currently running executable.
pub fn run(
    url: &str,
    fetcher: &dyn Fetch,
    state: &mut StateFile,
    state_path: &Path,
    dry_run: bool,
) -> ResourceReport {
    let outcome = match std::env::current_exe() {
        Ok(exe) => update_at(&exe, url, fetcher, state, state_path, dry_run)
            .unwrap_or_else(|err| ResourceOutcome::Failed {
                reason: err.to_string(),
            }),
        Err(err) => ResourceOutcome::Failed {
            reason: format!("cannot locate own executable: {err}"),
        },
    };
    ResourceReport {
        name: SELF_RESOURCE_NAME.to_owned(),
        kind: ResourceKind::SelfUpdate,
        outcome,
    }
}

/// Self-update against an explicit executable path (test seam).
pub fn update_at(
    exe: &Path,
    url: &str,
    fetcher: &dyn Fetch,
    state: &mut StateFile,
    state_path: &Path,
    dry_run: bool,
) -> Result<ResourceOutcome, SyncError> {
    let remote = fetcher.fetch(url)?;
    let remote_fingerprint = fingerprint(&remote);

    let key = self_key();
    let local_fingerprint = match state.fingerprint_of(&key) {
        Some(fp) => fp.to_owned(),
        // No record yet: fingerprint the binary actually on disk.
        None => fingerprint(&std::fs::read(exe).map_err(|e| io_err(exe, e))?),
    };

    if local_fingerprint == remote_fingerprint {
        tracing::debug!("self-update: already current");
        return Ok(ResourceOutcome::Unchanged);
    }

    if dry_run {
        tracing::info!("[dry-run] self-update available");
        return Ok(ResourceOutcome::WouldUpdate);
    }

    stage_and_swap(exe, &remote)?;

    state.record(&key, remote_fingerprint);
    state::save(state_path, state)?;
    tracing::info!("self-update staged; takes effect on the next invocation");
    Ok(ResourceOutcome::Updated)
}

/// Write the new executable next to the old one and swap.
fn stage_and_swap(exe: &Path, content: &[u8]) -> Result<(), SyncError> {
    let staged = exe.with_extension("kettle.tmp");
    std::fs::write(&staged, content).map_err(|e| io_err(&staged, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&staged, std::fs::Permissions::from_mode(0o755))
            .map_err(|e| io_err(&staged, e))?;
        // Safe while running: the process keeps its old inode.
        std::fs::rename(&staged, exe).map_err(|e| io_err(exe, e))?;
    }

    #[cfg(not(unix))]
    {
        // The running binary is locked; park the new version for the next
        // launch to pick up via `apply_pending`.
        let pending = exe.with_extension("new");
        std::fs::rename(&staged, &pending).map_err(|e| io_err(&pending, e))?;
    }

    Ok(())
}

/// Apply a previously parked self-update, if one exists.
///
/// Called at process start, before any cycle work. Returns whether a swap
/// happened. Always a no-op on platforms where the swap is done in-cycle.
pub fn apply_pending() -> Result<bool, SyncError> {
    let exe = std::env::current_exe().map_err(|e| io_err("<current_exe>", e))?;
    apply_pending_at(&exe)
}

/// `apply_pending` against an explicit executable path (test seam).
pub fn apply_pending_at(exe: &Path) -> Result<bool, SyncError> {
    if cfg!(unix) {
        return Ok(false);
    }
    let pending = exe.with_extension("new");
    if !pending.exists() {
        return Ok(false);
    }
    std::fs::rename(&pending, exe).map_err(|e| io_err(exe, e))?;
    tracing::info!("applied pending self-update");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use crate::error::FetchError;

    use super::*;

    struct OneShotFetcher {
        responses: HashMap<String, Vec<u8>>,
    }

    impl Fetch for OneShotFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    url: url.to_owned(),
                    code: 404,
                })
        }
    }

    const URL: &str = "https://releases.test/kettle";

    fn fetcher(body: &[u8]) -> OneShotFetcher {
        OneShotFetcher {
            responses: HashMap::from([(URL.to_owned(), body.to_vec())]),
        }
    }

    fn fake_exe(dir: &Path, content: &[u8]) -> std::path::PathBuf {
        let exe = dir.join("kettle");
        std::fs::write(&exe, content).unwrap();
        exe
    }

    #[test]
    fn unrecorded_but_identical_binary_is_unchanged() {
        let tmp = TempDir::new().unwrap();
        let exe = fake_exe(tmp.path(), b"binary v1");
        let state_path = tmp.path().join("state.json");

        let mut state = StateFile::empty();
        let outcome = update_at(
            &exe,
            URL,
            &fetcher(b"binary v1"),
            &mut state,
            &state_path,
            false,
        )
        .unwrap();
        assert!(matches!(outcome, ResourceOutcome::Unchanged));
        assert!(
            state.resources.is_empty(),
            "no install happened, so nothing is recorded"
        );
    }

    #[test]
    fn changed_binary_is_swapped_and_recorded() {
        let tmp = TempDir::new().unwrap();
        let exe = fake_exe(tmp.path(), b"binary v1");
        let state_path = tmp.path().join("state.json");

        let mut state = StateFile::empty();
        let outcome = update_at(
            &exe,
            URL,
            &fetcher(b"binary v2"),
            &mut state,
            &state_path,
            false,
        )
        .unwrap();
        assert!(matches!(outcome, ResourceOutcome::Updated));

        if cfg!(unix) {
            assert_eq!(std::fs::read(&exe).unwrap(), b"binary v2");
        } else {
            assert_eq!(std::fs::read(exe.with_extension("new")).unwrap(), b"binary v2");
        }
        assert_eq!(
            state.fingerprint_of(&self_key()),
            Some(fingerprint(b"binary v2").as_str())
        );
        assert!(state_path.exists(), "state persisted as part of the commit");
    }

    #[cfg(unix)]
    #[test]
    fn swapped_binary_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let exe = fake_exe(tmp.path(), b"binary v1");
        let state_path = tmp.path().join("state.json");

        update_at(
            &exe,
            URL,
            &fetcher(b"binary v2"),
            &mut StateFile::empty(),
            &state_path,
            false,
        )
        .unwrap();
        let mode = std::fs::metadata(&exe).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111, "executable bits set");
    }

    #[test]
    fn dry_run_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let exe = fake_exe(tmp.path(), b"binary v1");
        let state_path = tmp.path().join("state.json");

        let mut state = StateFile::empty();
        let outcome = update_at(
            &exe,
            URL,
            &fetcher(b"binary v2"),
            &mut state,
            &state_path,
            true,
        )
        .unwrap();
        assert!(matches!(outcome, ResourceOutcome::WouldUpdate));
        assert_eq!(std::fs::read(&exe).unwrap(), b"binary v1");
        assert!(!state_path.exists());
    }

    #[test]
    fn fetch_failure_reports_failed_resource() {
        let tmp = TempDir::new().unwrap();
        let exe = fake_exe(tmp.path(), b"binary v1");
        let state_path = tmp.path().join("state.json");

        let empty = OneShotFetcher {
            responses: HashMap::new(),
        };
        let err = update_at(
            &exe,
            URL,
            &empty,
            &mut StateFile::empty(),
            &state_path,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::Fetch(_)));
        assert_eq!(std::fs::read(&exe).unwrap(), b"binary v1");
    }

    #[test]
    fn apply_pending_is_noop_without_parked_update() {
        let tmp = TempDir::new().unwrap();
        let exe = fake_exe(tmp.path(), b"binary v1");
        assert!(!apply_pending_at(&exe).unwrap());
        assert_eq!(std::fs::read(&exe).unwrap(), b"binary v1");
    }
}
