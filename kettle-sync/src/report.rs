//! Per-cycle outcome reporting.
//!
//! The report is produced for the caller and never persisted; exit-code
//! policy and formatting live in the CLI.

use serde::Serialize;

use kettle_core::ResourceKind;

/// Outcome of one resource within a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum ResourceOutcome {
    /// Remote fingerprint matches the local state; nothing done.
    Unchanged,
    /// Fetched, (built,) and committed.
    Updated,
    /// `--dry-run`: an update is needed but nothing was written.
    WouldUpdate,
    /// The resource failed; live installation and state untouched.
    Failed { reason: String },
}

/// One resource's report line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceReport {
    pub name: String,
    pub kind: ResourceKind,
    #[serde(flatten)]
    pub outcome: ResourceOutcome,
}

/// A recipe that could not be loaded this cycle. Its contributions are
/// simply absent from the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestFailure {
    pub url: String,
    pub error: String,
}

/// Outcome of one full reconciliation cycle.
#[derive(Debug, Default, Serialize)]
pub struct CycleReport {
    pub resources: Vec<ResourceReport>,
    pub warnings: Vec<String>,
    pub manifest_failures: Vec<ManifestFailure>,
}

impl CycleReport {
    /// True if any resource failed or any recipe failed to load.
    ///
    /// A recipe that fails to load means its resources could not even be
    /// enumerated, so it counts toward a failing exit code.
    pub fn has_failures(&self) -> bool {
        !self.manifest_failures.is_empty()
            || self
                .resources
                .iter()
                .any(|r| matches!(r.outcome, ResourceOutcome::Failed { .. }))
    }

    pub fn count(&self, want: fn(&ResourceOutcome) -> bool) -> usize {
        self.resources.iter().filter(|r| want(&r.outcome)).count()
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Updated | ResourceOutcome::WouldUpdate))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Unchanged))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Failed { .. }))
    }
}
