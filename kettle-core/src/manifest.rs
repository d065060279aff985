//! Recipe document parsing and validation.
//!
//! A recipe is a JSON document with top-level sequences `includes`,
//! `plugins`, and the deprecated `updater`:
//!
//! ```json
//! {
//!   "includes": [ { "name": "neotokyo", "source_url": "https://..." } ],
//!   "plugins":  [ { "name": "nt_srs_limiter", "about": "...", "source_url": "https://..." } ],
//!   "updater":  [ { "version": "1.6.2", "url": "https://..." } ]
//! }
//! ```
//!
//! Unknown top-level keys and unknown per-entry keys are ignored. A document
//! that fails to parse or validate is rejected whole; validation happens up
//! front so the reconciler only ever sees typed, well-formed entries.

use serde::Deserialize;

use crate::error::ManifestError;
use crate::types::{ManifestDocument, ResourceEntry, ResourceKind, ResourceName, UpdaterEntry};

// ---------------------------------------------------------------------------
// Raw (untrusted) document shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawEntry {
    name: Option<String>,
    about: Option<String>,
    source_url: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUpdaterEntry {
    version: Option<String>,
    // The deprecated updater form used `url` rather than `source_url`.
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawManifest {
    #[serde(default)]
    includes: Vec<RawEntry>,
    #[serde(default)]
    plugins: Vec<RawEntry>,
    #[serde(default)]
    updater: Vec<RawUpdaterEntry>,
}

// ---------------------------------------------------------------------------
// Parse + validate
// ---------------------------------------------------------------------------

/// Parse and validate the bytes of one fetched recipe.
///
/// `origin` is the URL the bytes were fetched from; it is recorded on the
/// document and every entry, and threaded through errors for context.
pub fn parse(origin: &str, bytes: &[u8]) -> Result<ManifestDocument, ManifestError> {
    let raw: RawManifest =
        serde_json::from_slice(bytes).map_err(|source| ManifestError::Parse {
            origin: origin.to_owned(),
            source,
        })?;

    let includes = validate_section(origin, "includes", ResourceKind::Include, raw.includes)?;
    let plugins = validate_section(origin, "plugins", ResourceKind::Plugin, raw.plugins)?;
    let updater = raw
        .updater
        .into_iter()
        .map(|u| UpdaterEntry {
            version: u.version,
            url: u.url,
        })
        .collect();

    Ok(ManifestDocument {
        origin: origin.to_owned(),
        includes,
        plugins,
        updater,
    })
}

fn validate_section(
    origin: &str,
    section: &'static str,
    kind: ResourceKind,
    raw: Vec<RawEntry>,
) -> Result<Vec<ResourceEntry>, ManifestError> {
    let mut entries = Vec::with_capacity(raw.len());
    for (index, entry) in raw.into_iter().enumerate() {
        let name = entry.name.ok_or(ManifestError::MissingField {
            origin: origin.to_owned(),
            section,
            index,
            field: "name",
        })?;
        if !ResourceName::is_valid(&name) {
            return Err(ManifestError::InvalidName {
                origin: origin.to_owned(),
                name,
            });
        }
        let source_url = entry.source_url.ok_or(ManifestError::MissingField {
            origin: origin.to_owned(),
            section,
            index,
            field: "source_url",
        })?;
        if !source_url.starts_with("https://") {
            return Err(ManifestError::InsecureUrl {
                origin: origin.to_owned(),
                url: source_url,
            });
        }
        entries.push(ResourceEntry {
            name: ResourceName(name),
            kind,
            source_url,
            about: entry.about,
            version: entry.version,
            origin: origin.to_owned(),
        });
    }
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://example.com/recipe.json";

    #[test]
    fn parses_full_document() {
        let doc = parse(
            ORIGIN,
            br#"{
                "includes": [
                    { "name": "neotokyo", "about": "NT helpers", "source_url": "https://example.com/neotokyo.inc" }
                ],
                "plugins": [
                    { "name": "nt_srs_limiter", "source_url": "https://example.com/nt_srs_limiter.sp", "version": "2.1" }
                ],
                "updater": [
                    { "version": "1.6.2", "url": "https://example.com/updater" }
                ]
            }"#,
        )
        .expect("parse");

        assert_eq!(doc.origin, ORIGIN);
        assert_eq!(doc.includes.len(), 1);
        assert_eq!(doc.includes[0].name, ResourceName::from("neotokyo"));
        assert_eq!(doc.includes[0].kind, ResourceKind::Include);
        assert_eq!(doc.includes[0].about.as_deref(), Some("NT helpers"));
        assert_eq!(doc.plugins.len(), 1);
        assert_eq!(doc.plugins[0].kind, ResourceKind::Plugin);
        assert_eq!(doc.plugins[0].version.as_deref(), Some("2.1"));
        assert_eq!(doc.updater.len(), 1);
        assert_eq!(doc.updater[0].version.as_deref(), Some("1.6.2"));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let doc = parse(ORIGIN, b"{}").expect("parse");
        assert!(doc.includes.is_empty());
        assert!(doc.plugins.is_empty());
        assert!(doc.updater.is_empty());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let doc = parse(
            ORIGIN,
            br#"{
                "schema_version": 3,
                "plugins": [
                    { "name": "ok", "source_url": "https://x.test/ok.sp", "maintainer": "someone" }
                ]
            }"#,
        )
        .expect("parse");
        assert_eq!(doc.plugins.len(), 1);
    }

    #[test]
    fn malformed_json_is_rejected_whole() {
        let err = parse(ORIGIN, b"{ not json").unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
    }

    #[test]
    fn entry_without_name_is_rejected() {
        let err = parse(
            ORIGIN,
            br#"{ "plugins": [ { "source_url": "https://x.test/a.sp" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ManifestError::MissingField { field: "name", .. }
        ));
    }

    #[test]
    fn entry_without_source_url_is_rejected() {
        let err = parse(ORIGIN, br#"{ "includes": [ { "name": "a" } ] }"#).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::MissingField {
                field: "source_url",
                ..
            }
        ));
    }

    #[test]
    fn plaintext_source_url_is_rejected() {
        let err = parse(
            ORIGIN,
            br#"{ "plugins": [ { "name": "a", "source_url": "http://x.test/a.sp" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::InsecureUrl { .. }));
    }

    #[test]
    fn bad_name_is_rejected() {
        let err = parse(
            ORIGIN,
            br#"{ "plugins": [ { "name": "../evil", "source_url": "https://x.test/a.sp" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidName { .. }));
    }
}
