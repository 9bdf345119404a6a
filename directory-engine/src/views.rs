//! Helpers for callers that present the normalized dataset: per-page subsets,
//! availability ranking and the recent-search list.

use std::fmt;
use std::str::FromStr;

use directory_core::{CanonicalFacility, DirectoryError};
use directory_sanitize::Sanitizer;
use serde::{Deserialize, Serialize};

use crate::DirectoryService;

/// Directory section a facility list is shown on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DirectoryPage {
    #[default]
    All,
    /// Residential treatment; detox programs are listed here as well.
    TreatmentCenter,
    HalfwayHouse,
    Outpatient,
    Detox,
}

impl DirectoryPage {
    /// Facility types shown on this page; empty means everything.
    pub fn facility_types(self) -> &'static [&'static str] {
        match self {
            DirectoryPage::All => &[],
            DirectoryPage::TreatmentCenter => &["Treatment Center", "Detox"],
            DirectoryPage::HalfwayHouse => &["Halfway House"],
            DirectoryPage::Outpatient => &["Outpatient"],
            DirectoryPage::Detox => &["Detox"],
        }
    }

    pub fn includes(self, facility: &CanonicalFacility) -> bool {
        let types = self.facility_types();
        types.is_empty() || types.iter().any(|t| facility.has_facility_type(t))
    }
}

impl fmt::Display for DirectoryPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DirectoryPage::All => "all",
            DirectoryPage::TreatmentCenter => "treatment-center",
            DirectoryPage::HalfwayHouse => "halfway-house",
            DirectoryPage::Outpatient => "outpatient",
            DirectoryPage::Detox => "detox",
        };
        f.write_str(label)
    }
}

impl FromStr for DirectoryPage {
    type Err = DirectoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().replace([' ', '_'], "-").as_str() {
            "" | "all" => Ok(DirectoryPage::All),
            "treatment-center" | "treatment-centers" => Ok(DirectoryPage::TreatmentCenter),
            "halfway-house" | "halfway-houses" => Ok(DirectoryPage::HalfwayHouse),
            "outpatient" => Ok(DirectoryPage::Outpatient),
            "detox" => Ok(DirectoryPage::Detox),
            other => Err(DirectoryError::Config(format!("unknown directory page {other:?}"))),
        }
    }
}

/// Facilities listed on `page`, in their original order.
pub fn facilities_for_page(
    facilities: &[CanonicalFacility],
    page: DirectoryPage,
) -> Vec<CanonicalFacility> {
    facilities
        .iter()
        .filter(|facility| page.includes(facility))
        .cloned()
        .collect()
}

/// Most urgent availability first; ties keep their order.
pub fn rank_by_status(facilities: &mut [CanonicalFacility]) {
    facilities.sort_by_key(CanonicalFacility::status_priority);
}

impl<S: Sanitizer> DirectoryService<S> {
    /// Empty recent-search list sized by `max_recent_searches`.
    pub fn recent_searches(&self) -> RecentSearches {
        RecentSearches::new(self.config.max_recent_searches)
    }
}

/// Most-recent-first list of distinct search terms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentSearches {
    capacity: usize,
    entries: Vec<String>,
}

impl RecentSearches {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
        }
    }

    /// Record a term. Blank terms are ignored; an earlier entry differing only
    /// in case is replaced by the new spelling.
    pub fn remember(&mut self, term: &str) {
        let trimmed = term.trim();
        if trimmed.is_empty() {
            return;
        }
        let normalized = trimmed.to_lowercase();
        self.entries
            .retain(|entry| entry.to_lowercase() != normalized);
        self.entries.insert(0, trimmed.to_string());
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
