//! Installer / commit manager.
//!
//! ## Atomic replacement protocol
//!
//! 1. Copy the staged file to `<final>.kettle.tmp` — same directory, so the
//!    rename stays on one volume (the staging dir is usually on tmpfs).
//!    Multi-file resources stage every copy before any rename happens, so a
//!    copy failure leaves the live directory untouched.
//! 2. Single `fs::rename` into place per file; readers of the live
//!    directory never observe a half-written file.
//! 3. Record the new fingerprint in the state store and persist it.
//!
//! The rename and the state save form one commit: any failure reports the
//! resource as failed and the previous fingerprint stays recorded, so the
//! next cycle re-fetches and converges. Resources commit independently of
//! each other.

use std::path::{Path, PathBuf};

use kettle_core::{Layout, ResourceKind};

use crate::error::SyncError;
use crate::reconcile::StagedResource;
use crate::state::{self, StateFile};

fn commit_err(name: &str, path: &Path, source: std::io::Error) -> SyncError {
    SyncError::Commit {
        name: name.to_owned(),
        path: path.to_path_buf(),
        source,
    }
}

/// Copy `staged` into `dest`'s directory as `<dest>.kettle.tmp`.
fn stage_sibling(name: &str, staged: &Path, dest: &Path) -> Result<PathBuf, SyncError> {
    let tmp = dest.with_extension(match dest.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{ext}.kettle.tmp"),
        None => "kettle.tmp".to_owned(),
    });
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| commit_err(name, parent, e))?;
    }
    std::fs::copy(staged, &tmp).map_err(|e| commit_err(name, &tmp, e))?;
    Ok(tmp)
}

/// Atomically rename a staged sibling into place, cleaning up on failure.
fn swap(name: &str, tmp: &Path, dest: &Path) -> Result<(), SyncError> {
    if let Err(e) = std::fs::rename(tmp, dest) {
        let _ = std::fs::remove_file(tmp);
        return Err(commit_err(name, dest, e));
    }
    Ok(())
}

/// Copy `staged` next to `dest` and atomically rename it into place.
pub(crate) fn promote(name: &str, staged: &Path, dest: &Path) -> Result<(), SyncError> {
    let tmp = stage_sibling(name, staged, dest)?;
    swap(name, &tmp, dest)
}

/// Commit one fully staged (and, for plugins, built) resource.
///
/// On success the live file(s) carry the staged content and the state store
/// on disk records the new fingerprint.
pub fn commit(
    staged: &StagedResource,
    layout: &Layout,
    state: &mut StateFile,
) -> Result<(), SyncError> {
    let name = staged.entry.name.to_string();

    match staged.entry.kind {
        ResourceKind::Include => {
            let dest = layout.includes_dir.join(format!("{name}.inc"));
            promote(&name, &staged.staged_source, &dest)?;
        }
        ResourceKind::Plugin => {
            // The compiled artifact is the part the server loads; move it
            // first, then the source it was built from.
            let artifact = staged.artifact.as_deref().ok_or_else(|| {
                commit_err(
                    &name,
                    &staged.staged_source,
                    std::io::Error::other("plugin committed without a built artifact"),
                )
            })?;
            let smx_dest = layout.plugins_dir.join(format!("{name}.smx"));
            let sp_dest = layout.scripting_dir.join(format!("{name}.sp"));
            // Stage both copies before renaming either; a copy failure must
            // not leave a half-replaced plugin.
            let smx_tmp = stage_sibling(&name, artifact, &smx_dest)?;
            let sp_tmp = match stage_sibling(&name, &staged.staged_source, &sp_dest) {
                Ok(tmp) => tmp,
                Err(e) => {
                    let _ = std::fs::remove_file(&smx_tmp);
                    return Err(e);
                }
            };
            if let Err(e) = swap(&name, &smx_tmp, &smx_dest) {
                let _ = std::fs::remove_file(&sp_tmp);
                return Err(e);
            }
            swap(&name, &sp_tmp, &sp_dest)?;
        }
        ResourceKind::SelfUpdate => {
            // The self-update path has its own swap semantics; it never goes
            // through the generic installer.
            return Err(commit_err(
                &name,
                &staged.staged_source,
                std::io::Error::other("self-update resources are not installed here"),
            ));
        }
    }

    state.record(&staged.entry.key(), staged.fingerprint.clone());
    state::save(&layout.state_file, state)?;
    tracing::info!("committed {} '{name}'", staged.entry.kind);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use kettle_core::{ResourceEntry, ResourceKey};
    use tempfile::TempDir;

    use crate::reconcile::fingerprint;

    use super::*;

    fn layout_in(root: &Path) -> Layout {
        let sm = root.join("nt").join("addons").join("sourcemod");
        let layout = Layout {
            plugins_dir: sm.join("plugins"),
            scripting_dir: sm.join("scripting"),
            includes_dir: sm.join("scripting").join("include"),
            compiler: sm.join("scripting").join("spcomp"),
            state_file: root.join("kettle_state.json"),
        };
        fs::create_dir_all(&layout.plugins_dir).unwrap();
        fs::create_dir_all(&layout.includes_dir).unwrap();
        layout
    }

    fn entry(name: &str, kind: ResourceKind) -> ResourceEntry {
        ResourceEntry {
            name: name.into(),
            kind,
            source_url: format!("https://x.test/{name}"),
            about: None,
            version: None,
            origin: "https://x.test/r.json".into(),
        }
    }

    fn stage(dir: &Path, file: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(file);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn include_commit_lands_in_includes_dir() {
        let root = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let layout = layout_in(root.path());

        let staged = StagedResource {
            entry: entry("neotokyo", ResourceKind::Include),
            fingerprint: fingerprint(b"inc v1"),
            staged_source: stage(staging.path(), "neotokyo.inc", b"inc v1"),
            artifact: None,
        };
        let mut state = StateFile::empty();
        commit(&staged, &layout, &mut state).expect("commit");

        let live = layout.includes_dir.join("neotokyo.inc");
        assert_eq!(fs::read(&live).unwrap(), b"inc v1");

        // Persisted state reflects the same fingerprint.
        let on_disk = crate::state::load(&layout.state_file).unwrap();
        let key = ResourceKey::new(ResourceKind::Include, "neotokyo");
        assert_eq!(on_disk.fingerprint_of(&key), Some(staged.fingerprint.as_str()));
    }

    #[test]
    fn plugin_commit_lands_smx_and_sp() {
        let root = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let layout = layout_in(root.path());

        let staged = StagedResource {
            entry: entry("nt_srs_limiter", ResourceKind::Plugin),
            fingerprint: fingerprint(b"sp v1"),
            staged_source: stage(staging.path(), "nt_srs_limiter.sp", b"sp v1"),
            artifact: Some(stage(staging.path(), "nt_srs_limiter.smx", b"smx v1")),
        };
        let mut state = StateFile::empty();
        commit(&staged, &layout, &mut state).expect("commit");

        assert_eq!(
            fs::read(layout.plugins_dir.join("nt_srs_limiter.smx")).unwrap(),
            b"smx v1"
        );
        assert_eq!(
            fs::read(layout.scripting_dir.join("nt_srs_limiter.sp")).unwrap(),
            b"sp v1"
        );
    }

    #[test]
    fn plugin_without_artifact_is_rejected() {
        let root = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let layout = layout_in(root.path());

        let staged = StagedResource {
            entry: entry("nt_srs_limiter", ResourceKind::Plugin),
            fingerprint: fingerprint(b"sp v1"),
            staged_source: stage(staging.path(), "nt_srs_limiter.sp", b"sp v1"),
            artifact: None,
        };
        let mut state = StateFile::empty();
        let err = commit(&staged, &layout, &mut state).unwrap_err();
        assert!(matches!(err, SyncError::Commit { .. }));
        assert!(state.resources.is_empty(), "no fingerprint recorded");
    }

    #[test]
    fn no_tmp_litter_after_commit() {
        let root = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let layout = layout_in(root.path());

        let staged = StagedResource {
            entry: entry("neotokyo", ResourceKind::Include),
            fingerprint: fingerprint(b"x"),
            staged_source: stage(staging.path(), "neotokyo.inc", b"x"),
            artifact: None,
        };
        commit(&staged, &layout, &mut StateFile::empty()).expect("commit");

        let leftovers: Vec<_> = fs::read_dir(&layout.includes_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".kettle.tmp"))
            .collect();
        assert!(leftovers.is_empty(), "tmp files must not survive a commit");
    }

    #[test]
    #[cfg(unix)]
    fn failed_rename_leaves_live_file_and_state_untouched() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let layout = layout_in(root.path());

        let live = layout.includes_dir.join("neotokyo.inc");
        fs::write(&live, b"previous good").unwrap();

        let staged = StagedResource {
            entry: entry("neotokyo", ResourceKind::Include),
            fingerprint: fingerprint(b"new"),
            staged_source: stage(staging.path(), "neotokyo.inc", b"new"),
            artifact: None,
        };

        // Read-only includes dir: the copy to `.kettle.tmp` fails.
        let mut perms = fs::metadata(&layout.includes_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&layout.includes_dir, perms).unwrap();

        let mut state = StateFile::empty();
        let err = commit(&staged, &layout, &mut state).unwrap_err();
        assert!(matches!(err, SyncError::Commit { .. }));

        let mut perms = fs::metadata(&layout.includes_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&layout.includes_dir, perms).unwrap();

        assert_eq!(fs::read(&live).unwrap(), b"previous good");
        assert!(state.resources.is_empty());
        assert!(!layout.state_file.exists(), "state store never written");
    }

    #[test]
    #[cfg(unix)]
    fn failed_sp_stage_keeps_previous_smx_live() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let layout = layout_in(root.path());

        let live_smx = layout.plugins_dir.join("nt_srs_limiter.smx");
        fs::write(&live_smx, b"previous build").unwrap();

        let staged = StagedResource {
            entry: entry("nt_srs_limiter", ResourceKind::Plugin),
            fingerprint: fingerprint(b"sp v2"),
            staged_source: stage(staging.path(), "nt_srs_limiter.sp", b"sp v2"),
            artifact: Some(stage(staging.path(), "nt_srs_limiter.smx", b"smx v2")),
        };

        // Read-only scripting dir: the `.sp` copy fails after the `.smx`
        // copy succeeded, before any rename.
        let mut perms = fs::metadata(&layout.scripting_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&layout.scripting_dir, perms).unwrap();

        let mut state = StateFile::empty();
        let err = commit(&staged, &layout, &mut state).unwrap_err();
        assert!(matches!(err, SyncError::Commit { .. }));

        let mut perms = fs::metadata(&layout.scripting_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&layout.scripting_dir, perms).unwrap();

        assert_eq!(fs::read(&live_smx).unwrap(), b"previous build");
        assert!(state.resources.is_empty());
        assert!(!layout.state_file.exists(), "state store never written");

        let leftovers: Vec<_> = fs::read_dir(&layout.plugins_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".kettle.tmp"))
            .collect();
        assert!(leftovers.is_empty(), "staged smx copy cleaned up");
    }
}
