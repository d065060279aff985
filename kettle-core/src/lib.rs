//! Kettle core library — domain types, recipe parsing, merging, configuration.
//!
//! Public API surface:
//! - [`types`] — newtypes and domain structs
//! - [`error`] — [`ManifestError`] and [`ConfigError`]
//! - [`manifest`] — recipe document parsing + validation
//! - [`merge`] — deterministic multi-recipe merge
//! - [`config`] — YAML configuration record and pre-flight validation

pub mod config;
pub mod error;
pub mod manifest;
pub mod merge;
pub mod types;

pub use config::{Config, Layout};
pub use error::{ConfigError, ManifestError};
pub use merge::{MergeConflict, TargetResourceSet};
pub use types::{
    ManifestDocument, ResourceEntry, ResourceKey, ResourceKind, ResourceName, UpdaterEntry,
};
