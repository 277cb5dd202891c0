//! Locale discovery and JSON content aggregation for tessera sites.
//!
//! Each locale owns a directory under the data root holding `items/` and
//! `project/` JSON fragments. This crate merges them into the `_items.json`
//! and `_project.json` documents the page renderer consumes.

pub mod aggregate;
pub mod error;
pub mod fanout;
pub mod freshness;
pub mod locale;

pub use aggregate::{
    load_document, Aggregation, Aggregator, DataLayout, Document, ITEMS_DIR, ITEMS_FILE,
    ITEMS_KEY, PROJECT_DIR, PROJECT_FILE,
};
pub use error::DataError;
pub use fanout::{for_each_locale, LocaleReport};
pub use locale::{discover_locales, resolve_locale, Locale, FALLBACK_LOCALE};
