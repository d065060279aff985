//! Error types for kettle-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while parsing and validating a recipe document.
///
/// Any of these rejects the offending document whole; other documents in the
/// same cycle are unaffected.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The document is not valid JSON or has the wrong shape.
    #[error("failed to parse recipe from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// A required per-entry field is absent.
    #[error("recipe {origin}: entry {index} in '{section}' is missing '{field}'")]
    MissingField {
        origin: String,
        section: &'static str,
        index: usize,
        field: &'static str,
    },

    /// An entry name contains characters outside `[A-Za-z0-9_-]`.
    #[error("recipe {origin}: invalid resource name {name:?}")]
    InvalidName { origin: String, name: String },

    /// A source URL does not use an encrypted scheme.
    #[error("recipe {origin}: source URL must use https: {url}")]
    InsecureUrl { origin: String, url: String },
}

/// All errors that can arise from loading or validating the configuration.
///
/// Configuration errors are fatal: the cycle aborts before any network
/// activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file did not exist at the expected path.
    #[error("configuration not found at {path}")]
    NotFound { path: PathBuf },

    /// YAML parse error on load — includes file path and line context.
    #[error("failed to parse configuration at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A recipe or self-update URL does not use an encrypted scheme.
    #[error("recipe URLs must use https (got {url})")]
    InsecureRecipeUrl { url: String },

    /// An expected installation directory is absent.
    #[error("installation directory missing: {path}")]
    MissingDirectory { path: PathBuf },
}
