//! Facility normalization, deduplication and search over an in-memory
//! dataset.
//!
//! Callers own the dataset lifecycle: load and normalize once, filter many
//! times against the immutable result, and normalize again only when the
//! upstream data changes.

use directory_core::{json_kind, CanonicalFacility, DirectoryConfig, DirectoryError};
use directory_sanitize::{HtmlSanitizer, Sanitizer};
use log::warn;
use serde::Deserialize;
use serde_json::Value;

mod filter;
mod normalize;
mod render;
mod views;

pub use filter::SearchOutcome;
pub use views::{facilities_for_page, rank_by_status, DirectoryPage, RecentSearches};

/// Normalization and search service. Holds nothing but its configuration and
/// the sanitizer used on every text field.
#[derive(Debug, Clone)]
pub struct DirectoryService<S = HtmlSanitizer> {
    config: DirectoryConfig,
    sanitizer: S,
}

impl DirectoryService<HtmlSanitizer> {
    pub fn new(config: DirectoryConfig) -> Self {
        Self::with_sanitizer(config, HtmlSanitizer)
    }
}

impl Default for DirectoryService<HtmlSanitizer> {
    fn default() -> Self {
        Self::new(DirectoryConfig::default())
    }
}

impl<S: Sanitizer> DirectoryService<S> {
    pub fn with_sanitizer(config: DirectoryConfig, sanitizer: S) -> Self {
        Self { config, sanitizer }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    pub fn sanitizer(&self) -> &S {
        &self.sanitizer
    }
}

/// Deserialize an already-normalized facility list, as handed back by a
/// front end. Anything other than an array is a caller error; entries that do
/// not read as facilities are logged and skipped.
pub fn parse_facilities(dataset: &Value) -> Result<Vec<CanonicalFacility>, DirectoryError> {
    let entries = dataset
        .as_array()
        .ok_or_else(|| DirectoryError::InvalidDataset(json_kind(dataset).to_string()))?;

    Ok(entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match CanonicalFacility::deserialize(entry) {
            Ok(facility) => Some(facility),
            Err(err) => {
                warn!("Skipping facility #{index}: {err}");
                None
            }
        })
        .collect())
}
