//! Cycle orchestration — the engine entry point used by the CLI.
//!
//! One call to [`run_cycle`] is one full reconciliation cycle:
//!
//! 1. Pre-flight config validation (fatal; no network before this passes).
//! 2. Self-update check (first, like every cycle's other resources it is
//!    isolated — a failure here never blocks plugin updates).
//! 3. Fetch + parse every configured recipe; failures exclude only that
//!    recipe.
//! 4. Merge into the target resource set (earliest recipe wins conflicts).
//! 5. Reconcile each resource: includes commit directly, plugins compile
//!    first. Failures are caught at the resource boundary.
//!
//! Resources are processed sequentially in `(kind, name)` order, so includes
//! land before any plugin compiles against them. Nothing observable depends
//! on that order.

use std::path::Path;

use kettle_core::{manifest, merge, Config, Layout, ManifestDocument, ResourceEntry, ResourceKind};

use crate::build;
use crate::error::{io_err, SyncError};
use crate::fetch::Fetch;
use crate::install;
use crate::reconcile::{self, Reconciliation};
use crate::report::{CycleReport, ManifestFailure, ResourceOutcome, ResourceReport};
use crate::selfupdate;
use crate::state::{self, StateFile};

/// Run one reconciliation cycle rooted at `root`.
///
/// Fatal errors (`Config`, an unreadable state store, an unusable staging
/// dir) abort the cycle; everything else lands in the returned
/// [`CycleReport`].
pub fn run_cycle(
    root: &Path,
    config: &Config,
    fetcher: &dyn Fetch,
    dry_run: bool,
) -> Result<CycleReport, SyncError> {
    config.validate_at(root)?;
    let layout = config.layout_at(root);

    let mut state = state::load(&layout.state_file)?;
    let mut report = CycleReport::default();

    if let Some(url) = &config.self_update_url {
        let self_report = selfupdate::run(url, fetcher, &mut state, &layout.state_file, dry_run);
        report.resources.push(self_report);
    }

    let documents = load_manifests(&config.recipes, fetcher, &mut report.manifest_failures);
    let target = merge::merge(&documents);

    for conflict in &target.conflicts {
        report.warnings.push(format!(
            "{} defined in multiple recipes; kept the copy from {} over {}",
            conflict.key, conflict.winner_origin, conflict.loser_origin
        ));
    }
    for origin in &target.deprecated_updater_origins {
        report.warnings.push(format!(
            "recipe {origin} still carries the deprecated 'updater' section; it is ignored"
        ));
    }
    for warning in &report.warnings {
        tracing::warn!("{warning}");
    }

    let staging = tempfile::tempdir().map_err(|e| io_err("<staging>", e))?;

    for entry in target.entries.values() {
        let outcome = process_resource(
            entry,
            &layout,
            &mut state,
            fetcher,
            staging.path(),
            config,
            dry_run,
        )
        .unwrap_or_else(|err| {
            tracing::warn!("{} '{}' failed: {err}", entry.kind, entry.name);
            ResourceOutcome::Failed {
                reason: err.to_string(),
            }
        });
        report.resources.push(ResourceReport {
            name: entry.name.to_string(),
            kind: entry.kind,
            outcome,
        });
    }

    Ok(report)
}

/// Fetch and parse recipes in configured order; a failure on one records it
/// and moves on.
fn load_manifests(
    recipes: &[String],
    fetcher: &dyn Fetch,
    failures: &mut Vec<ManifestFailure>,
) -> Vec<ManifestDocument> {
    let mut documents = Vec::with_capacity(recipes.len());
    for url in recipes {
        let loaded = fetcher
            .fetch(url)
            .map_err(SyncError::from)
            .and_then(|bytes| manifest::parse(url, &bytes).map_err(SyncError::from));
        match loaded {
            Ok(doc) => {
                tracing::debug!(
                    "loaded recipe {url}: {} include(s), {} plugin(s)",
                    doc.includes.len(),
                    doc.plugins.len()
                );
                documents.push(doc);
            }
            Err(err) => {
                tracing::warn!("skipping recipe {url}: {err}");
                failures.push(ManifestFailure {
                    url: url.clone(),
                    error: err.to_string(),
                });
            }
        }
    }
    documents
}

/// Reconcile, (build,) and commit one resource. Errors returned here are
/// caught by the caller and become `Failed` outcomes for this resource only.
fn process_resource(
    entry: &ResourceEntry,
    layout: &Layout,
    state: &mut StateFile,
    fetcher: &dyn Fetch,
    staging_dir: &Path,
    config: &Config,
    dry_run: bool,
) -> Result<ResourceOutcome, SyncError> {
    match reconcile::reconcile(entry, state, fetcher, staging_dir, dry_run)? {
        Reconciliation::Unchanged => Ok(ResourceOutcome::Unchanged),
        Reconciliation::WouldUpdate => Ok(ResourceOutcome::WouldUpdate),
        Reconciliation::Staged(mut staged) => {
            if entry.kind == ResourceKind::Plugin {
                let artifact = build::compile_plugin(
                    &layout.compiler,
                    &staged.staged_source,
                    staging_dir,
                    &layout.includes_dir,
                    &entry.name,
                    config.build_timeout(),
                )?;
                staged.artifact = Some(artifact);
            }
            install::commit(&staged, layout, state)?;
            Ok(ResourceOutcome::Updated)
        }
    }
}
