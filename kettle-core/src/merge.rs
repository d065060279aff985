//! Deterministic merge of multiple recipe documents into one target set.
//!
//! Conflict policy: resources are keyed by kind + name; when the same key
//! appears in more than one recipe, the entry from the recipe **earliest in
//! the configured URL order** wins. The loss is recorded as a
//! [`MergeConflict`], reported as a warning, never fatal.

use std::collections::BTreeMap;

use crate::types::{ManifestDocument, ResourceEntry, ResourceKey};

/// A losing entry that was shadowed by an earlier recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConflict {
    pub key: ResourceKey,
    pub winner_origin: String,
    pub loser_origin: String,
}

/// The merged, deduplicated resource set for one cycle. Built fresh every
/// cycle; never persisted.
///
/// `entries` iterates in `(kind, name)` order, so includes come before
/// plugins.
#[derive(Debug, Default)]
pub struct TargetResourceSet {
    pub entries: BTreeMap<ResourceKey, ResourceEntry>,
    pub conflicts: Vec<MergeConflict>,
    /// Origins of recipes that still carry a non-empty deprecated `updater`
    /// section. Surfaced as warnings, never acted on.
    pub deprecated_updater_origins: Vec<String>,
}

/// Merge documents given in configured URL order (earliest wins).
pub fn merge(documents: &[ManifestDocument]) -> TargetResourceSet {
    let mut set = TargetResourceSet::default();

    for doc in documents {
        if !doc.updater.is_empty() {
            set.deprecated_updater_origins.push(doc.origin.clone());
        }
        for entry in doc.includes.iter().chain(doc.plugins.iter()) {
            let key = entry.key();
            if let Some(winner) = set.entries.get(&key) {
                set.conflicts.push(MergeConflict {
                    key,
                    winner_origin: winner.origin.clone(),
                    loser_origin: entry.origin.clone(),
                });
            } else {
                set.entries.insert(key, entry.clone());
            }
        }
    }

    set
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
