//! # kettle-sync
//!
//! The reconciliation engine: fetch recipe resources, detect staleness by
//! content fingerprint, compile plugins, and atomically commit results.
//!
//! Call [`run_cycle`] with an explicit [`kettle_core::Config`] record and a
//! [`Fetch`] implementation to perform one full update cycle.

pub mod build;
pub mod error;
pub mod fetch;
pub mod install;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod selfupdate;
pub mod state;

pub use error::{FetchError, SyncError};
pub use fetch::{Fetch, HttpFetcher};
pub use pipeline::run_cycle;
pub use report::{CycleReport, ManifestFailure, ResourceOutcome, ResourceReport};
