//! Locale discovery.
//!
//! A locale exists iff the data root holds a directory with its name. There
//! is no separate registry.

use std::fmt;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::DataError;

/// Tag used when no locale is requested or configured.
pub const FALLBACK_LOCALE: &str = "en";

/// A content-language tag such as `en` or `pt-br`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locale(String);

impl Locale {
    /// Create a locale from a tag.
    ///
    /// The tag names a directory, so it must be a single non-empty path
    /// component.
    pub fn new(tag: impl Into<String>) -> Result<Self, DataError> {
        let tag = tag.into();
        let valid = !tag.is_empty()
            && tag != "."
            && tag != ".."
            && !tag.contains(['/', '\\'])
            && !tag.starts_with('.');

        if valid {
            Ok(Self(tag))
        } else {
            Err(DataError::InvalidLocale(tag))
        }
    }

    /// The tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self(FALLBACK_LOCALE.to_string())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for Locale {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// Enumerate the locales under `root`.
///
/// Returns the direct subdirectory names sorted lexically. Hidden
/// directories are skipped.
pub fn discover_locales(root: &Path) -> Result<Vec<Locale>, DataError> {
    if !root.is_dir() {
        return Err(DataError::filesystem(root, "data directory not found"));
    }

    let mut locales = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| DataError::filesystem(root, e))?;

        if !entry.path().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }

        locales.push(Locale::new(name)?);
    }

    tracing::debug!("Discovered {} locales in {}", locales.len(), root.display());

    Ok(locales)
}

/// Resolve a requested tag against the locales present under `root`.
pub fn resolve_locale(root: &Path, tag: &str) -> Result<Locale, DataError> {
    let requested = Locale::new(tag)?;

    if discover_locales(root)?.contains(&requested) {
        Ok(requested)
    } else {
        Err(DataError::filesystem(
            &root.join(requested.as_str()),
            "locale directory not found",
        ))
    }
}
