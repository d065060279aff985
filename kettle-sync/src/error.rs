//! Error types for kettle-sync.

use std::path::PathBuf;

use thiserror::Error;

use kettle_core::error::{ConfigError, ManifestError};

/// A failed content fetch. Always scoped to one URL; the pipeline decides
/// whether that means a skipped recipe or a failed resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL does not use an encrypted scheme.
    #[error("refusing plaintext URL {url}")]
    Scheme { url: String },

    /// The remote answered with a non-success status.
    #[error("HTTP {code} fetching {url}")]
    Status { url: String, code: u16 },

    /// Transport-level failure: DNS, TLS, connect, or the request timeout.
    #[error("transport error fetching {url}: {reason}")]
    Transport { url: String, reason: String },
}

/// All errors that can arise from one reconciliation cycle.
///
/// `Config` is fatal pre-flight; everything else is caught at the manifest
/// or resource boundary and recorded in the cycle report.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Fatal pre-flight configuration problem.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A recipe document failed to parse or validate.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A network fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The external compiler failed, timed out, or produced no artifact.
    #[error("build failed for '{name}': {reason}")]
    Build { name: String, reason: String },

    /// A staged resource could not be promoted into the live installation.
    #[error("commit failed for '{name}' at {path}: {source}")]
    Commit {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (state store).
    #[error("state store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
