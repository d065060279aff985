//! Domain types for kettle recipes and resources.
//!
//! All types are immutable once constructed by the manifest parser; nothing
//! here performs I/O. Serializable via serde where reporting needs it.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed resource name, unique within its kind across the merged
/// resource set.
///
/// Valid names match `^[A-Za-z0-9_\-]+$`; the manifest parser enforces this
/// before a `ResourceName` is ever constructed from remote input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceName(pub String);

impl ResourceName {
    /// Whether `s` is an acceptable resource name.
    pub fn is_valid(s: &str) -> bool {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ResourceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResourceName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The kind-namespace a resource lives in.
///
/// Ordering matters: iteration over a merged set processes `Include` before
/// `Plugin`, so plugin compiles in the same cycle see freshly updated
/// includes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// A `.inc` include file; installed without a build step.
    Include,
    /// A `.sp` plugin source; compiled to `.smx` before install.
    Plugin,
    /// The engine's own executable artifact.
    SelfUpdate,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Include => write!(f, "include"),
            ResourceKind::Plugin => write!(f, "plugin"),
            ResourceKind::SelfUpdate => write!(f, "self-update"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// Composite key identifying a resource across the merged set and the local
/// state store: kind-namespace plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    pub name: ResourceName,
}

impl ResourceKey {
    pub fn new(kind: ResourceKind, name: impl Into<ResourceName>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Stable string form used as the state-store map key, e.g.
    /// `"plugin:nt_srs_limiter"`. `:` can never appear in a valid name.
    pub fn state_key(&self) -> String {
        format!("{}:{}", self.kind, self.name)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.name)
    }
}

/// One validated entry from a recipe section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub name: ResourceName,
    pub kind: ResourceKind,
    /// Always an `https://` URL; the parser rejects anything else.
    pub source_url: String,
    /// Human description; no semantic effect.
    pub about: Option<String>,
    /// Opaque version token; carried for visibility, never compared.
    pub version: Option<String>,
    /// URL of the recipe this entry came from.
    pub origin: String,
}

impl ResourceEntry {
    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            kind: self.kind,
            name: self.name.clone(),
        }
    }
}

/// An entry from the deprecated `updater` recipe section. Accepted for
/// document compatibility, recorded for visibility, never acted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdaterEntry {
    pub version: Option<String>,
    pub url: Option<String>,
}

/// One fetched and validated recipe document. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDocument {
    /// URL the document was fetched from.
    pub origin: String,
    pub includes: Vec<ResourceEntry>,
    pub plugins: Vec<ResourceEntry>,
    pub updater: Vec<UpdaterEntry>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
