//! Package service manifest
//!
//! INI-style `service.manifest` shipped inside a package's opt prefix:
//!
//! ```text
//! [Service]
//! StartupUser=_postgres
//! Template=share/postgresql.plist
//!
//! [Attributes]
//! port=5432
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Section name -> ordered key/value lines
pub type ParsedFile = HashMap<String, Vec<(String, String)>>;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Section '{0}' appears more than once")]
    DuplicateSection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown setting in [Service]: {0}")]
    UnknownSetting(String),

    #[error("Invalid attribute name: {0}")]
    InvalidAttribute(String),
}

/// What a package declares about running as a service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// User the service should run as when not root
    pub startup_user: Option<String>,
    /// Template source: path relative to the opt prefix, absolute path, or URL
    pub template: Option<String>,
    /// Extra values for `{{name}}` placeholders
    pub attributes: BTreeMap<String, String>,
}

/// Parse manifest text into sections. Lines before the first `[Section]`
/// header, blank lines, and `#`/`;` comments are skipped.
pub fn parse_file(content: &str) -> Result<ParsedFile, ManifestError> {
    let mut sections = ParsedFile::new();
    let mut current: Option<String> = None;

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            if sections.insert(name.clone(), Vec::new()).is_some() {
                return Err(ManifestError::DuplicateSection(name));
            }
            current = Some(name);
            continue;
        }

        let Some(entries) = current.as_ref().and_then(|name| sections.get_mut(name)) else {
            continue;
        };
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if !key.is_empty() {
                entries.push((key.to_string(), value.trim().to_string()));
            }
        }
    }

    Ok(sections)
}

/// Parse a manifest from text
pub fn parse_manifest(content: &str) -> Result<Manifest, ManifestError> {
    let parsed = parse_file(content)?;
    let mut manifest = Manifest::default();

    for (section, entries) in &parsed {
        match section.as_str() {
            "Service" => {
                for (key, value) in entries {
                    let value = (!value.is_empty()).then(|| value.clone());
                    match key.to_uppercase().as_str() {
                        "STARTUPUSER" => manifest.startup_user = value,
                        "TEMPLATE" => manifest.template = value,
                        _ => return Err(ManifestError::UnknownSetting(key.clone())),
                    }
                }
            }
            "Attributes" => {
                for (key, value) in entries {
                    if !is_identifier(key) {
                        return Err(ManifestError::InvalidAttribute(key.clone()));
                    }
                    manifest.attributes.insert(key.clone(), value.clone());
                }
            }
            other => log::debug!("Ignoring manifest section {}", other),
        }
    }

    Ok(manifest)
}

/// Load a manifest from disk; `None` if the file does not exist
pub async fn load_manifest(path: &Path) -> Result<Option<Manifest>, ManifestError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => parse_manifest(&content).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Letter followed by letters, digits, or underscores
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
