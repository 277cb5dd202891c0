//! Content aggregation.
//!
//! Aggregation runs in two explicit phases per locale:
//!
//! 1. `items/*.json` is merged by file stem into `_items.json`.
//! 2. `_items.json` (read back from disk) goes under the `_items` key, and
//!    the top-level keys of every `project/*.json` fragment are merged beside
//!    it into `_project.json`.
//!
//! Inputs are merged in lexical filename order. On a key collision the
//! later value replaces the earlier one wholesale.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::error::DataError;
use crate::fanout::{for_each_locale, LocaleReport};
use crate::freshness::is_newer_than_all;
use crate::locale::Locale;

/// Directory holding per-item documents.
pub const ITEMS_DIR: &str = "items";

/// Directory holding project fragments.
pub const PROJECT_DIR: &str = "project";

/// Aggregated items output, relative to the locale directory.
pub const ITEMS_FILE: &str = "_items.json";

/// Aggregated project output, relative to the locale directory.
pub const PROJECT_FILE: &str = "_project.json";

/// Key under which the items document is nested in the project document.
pub const ITEMS_KEY: &str = "_items";

/// A JSON object document.
pub type Document = Map<String, Value>;

/// Paths of the per-locale data tree.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn locale_dir(&self, locale: &Locale) -> PathBuf {
        self.root.join(locale)
    }

    pub fn items_dir(&self, locale: &Locale) -> PathBuf {
        self.locale_dir(locale).join(ITEMS_DIR)
    }

    pub fn project_dir(&self, locale: &Locale) -> PathBuf {
        self.locale_dir(locale).join(PROJECT_DIR)
    }

    pub fn items_output(&self, locale: &Locale) -> PathBuf {
        self.locale_dir(locale).join(ITEMS_FILE)
    }

    pub fn project_output(&self, locale: &Locale) -> PathBuf {
        self.locale_dir(locale).join(PROJECT_FILE)
    }
}

/// Outcome of one aggregation phase.
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// Locale the document belongs to
    pub locale: Locale,

    /// Merged document
    pub document: Document,

    /// Where the document was written
    pub output: PathBuf,

    /// Number of source fragments merged
    pub sources: usize,

    /// Whether the persisted output was reused instead of recomputed
    pub cached: bool,
}

/// Merges locale JSON fragments into aggregated documents.
#[derive(Debug, Clone)]
pub struct Aggregator {
    layout: DataLayout,
    reuse_cache: bool,
}

impl Aggregator {
    /// Create an aggregator over the given data tree.
    pub fn new(layout: DataLayout) -> Self {
        Self {
            layout,
            reuse_cache: true,
        }
    }

    /// Enable or disable reuse of an up-to-date `_items.json`.
    pub fn with_cache(mut self, reuse: bool) -> Self {
        self.reuse_cache = reuse;
        self
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Phase 1: merge `items/*.json` into `_items.json`.
    pub fn aggregate_items(&self, locale: &Locale) -> Result<Aggregation, DataError> {
        let dir = self.layout.items_dir(locale);
        let files = list_json_files(&dir)?;
        let output = self.layout.items_output(locale);

        if self.reuse_cache && is_cache_fresh(&output, &dir, &files) {
            match load_document(&output) {
                Ok(document) => {
                    tracing::debug!("[{}] Reusing {}", locale, output.display());
                    return Ok(Aggregation {
                        locale: locale.clone(),
                        document,
                        output,
                        sources: files.len(),
                        cached: true,
                    });
                }
                Err(e) => tracing::warn!("[{}] Ignoring unreadable cache: {}", locale, e),
            }
        }

        let mut document = Document::new();
        for path in &files {
            let item = load_document(path)?;
            document.insert(file_stem(path), Value::Object(item));
        }

        write_document(&output, &document)?;

        tracing::info!(
            "[{}] Aggregated {} items into {}",
            locale,
            files.len(),
            output.display()
        );

        Ok(Aggregation {
            locale: locale.clone(),
            document,
            output,
            sources: files.len(),
            cached: false,
        })
    }

    /// Phase 2: merge `_items.json` and `project/*.json` into `_project.json`.
    ///
    /// Reads phase 1's persisted output; fails if it has never been written.
    pub fn aggregate_project(&self, locale: &Locale) -> Result<Aggregation, DataError> {
        let items_path = self.layout.items_output(locale);
        if !items_path.is_file() {
            return Err(DataError::filesystem(
                &items_path,
                "aggregated items not found; the items phase has not run",
            ));
        }
        let items = load_document(&items_path)?;

        let dir = self.layout.project_dir(locale);
        let files = list_json_files(&dir)?;

        let mut document = Document::new();
        document.insert(ITEMS_KEY.to_string(), Value::Object(items));
        for path in &files {
            merge_shallow(&mut document, load_document(path)?);
        }

        let output = self.layout.project_output(locale);
        write_document(&output, &document)?;

        tracing::info!(
            "[{}] Aggregated {} project fragments into {}",
            locale,
            files.len(),
            output.display()
        );

        Ok(Aggregation {
            locale: locale.clone(),
            document,
            output,
            sources: files.len() + 1,
            cached: false,
        })
    }

    /// Run both phases for one locale, items first.
    pub fn aggregate(&self, locale: &Locale) -> Result<Aggregation, DataError> {
        self.aggregate_items(locale)?;
        self.aggregate_project(locale)
    }

    /// Aggregate every locale independently.
    pub fn aggregate_all(&self, locales: &[Locale]) -> LocaleReport<Aggregation, DataError> {
        for_each_locale(locales, |locale| self.aggregate(locale))
    }
}

/// Read a file that must contain a JSON object.
pub fn load_document(path: &Path) -> Result<Document, DataError> {
    let bytes = fs::read(path).map_err(|e| DataError::filesystem(path, e))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DataError::parse(
            path,
            format!("expected a JSON object, found {}", kind_of(&other)),
        )),
        Err(e) => Err(DataError::parse(path, e)),
    }
}

/// Shallow union: keys from `fragment` replace existing keys wholesale.
fn merge_shallow(target: &mut Document, fragment: Document) {
    for (key, value) in fragment {
        target.insert(key, value);
    }
}

/// List `*.json` files directly inside `dir`, sorted by file name.
fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>, DataError> {
    if !dir.is_dir() {
        return Err(DataError::filesystem(dir, "directory not found"));
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| DataError::filesystem(dir, e))?;
        let path = entry.path();

        if !path.is_file() || entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

fn is_cache_fresh(output: &Path, dir: &Path, inputs: &[PathBuf]) -> bool {
    is_newer_than_all(
        output,
        std::iter::once(dir).chain(inputs.iter().map(PathBuf::as_path)),
    )
}

/// Write atomically: a failed write never leaves a partial document behind.
fn write_document(path: &Path, document: &Document) -> Result<(), DataError> {
    let json = serde_json::to_vec(document).map_err(|e| DataError::filesystem(path, e))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, json).map_err(|e| DataError::filesystem(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        DataError::filesystem(path, e)
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
