//! Core data model for the treatment facility directory: raw and canonical
//! facility records, search criteria, configuration and errors.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub mod geo;

pub use geo::{calculate_distance, EARTH_RADIUS_MILES};

pub const DEFAULT_STATUS: &str = "Contact for Availability";
pub const DEFAULT_TREATMENT_TYPE: &str = "Unknown";
pub const DEFAULT_FACILITY_TYPE: &str = "Treatment Center";
pub const DEFAULT_GENDER_SERVED: &str = "Co-ed";
pub const DEFAULT_AGE_GROUP: &str = "Adult";

/// Matches every age group or treatment type in the filter engine.
pub const WILDCARD_BOTH: &str = "Both";
/// Matches every gender in the filter engine.
pub const WILDCARD_CO_ED: &str = "Co-ed";

/// Tunables shared by normalization, filtering and the outer surfaces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Radius value (miles) meaning "no distance constraint".
    pub unlimited_radius: u32,
    /// Radius applied when a location is supplied without an explicit radius.
    pub default_search_radius: u32,
    /// Longer search terms return no results.
    pub max_search_term_len: usize,
    pub max_recent_searches: usize,
    pub field_limits: FieldLimits,
    pub demographic_merge: DemographicMergePolicy,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            unlimited_radius: 999,
            default_search_radius: 75,
            max_search_term_len: 200,
            max_recent_searches: 5,
            field_limits: FieldLimits::default(),
            demographic_merge: DemographicMergePolicy::LastWins,
        }
    }
}

impl DirectoryConfig {
    /// Reject configurations the engines cannot honour.
    pub fn validate(&self) -> Result<(), DirectoryError> {
        if self.unlimited_radius == 0 {
            return Err(DirectoryError::Config(
                "unlimited_radius must be at least 1".to_string(),
            ));
        }
        if self.default_search_radius == 0 || self.default_search_radius > self.unlimited_radius {
            return Err(DirectoryError::Config(format!(
                "default_search_radius must be between 1 and {}",
                self.unlimited_radius
            )));
        }
        if self.max_search_term_len == 0 {
            return Err(DirectoryError::Config(
                "max_search_term_len must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Maximum accepted length (in characters) of each raw record field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FieldLimits {
    pub name: usize,
    pub address: usize,
    pub phone: usize,
    pub website: usize,
    pub facility_type: usize,
    pub treatment_type: usize,
    pub gender_served: usize,
    pub age_group: usize,
    pub status: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            name: 200,
            address: 500,
            phone: 50,
            website: 500,
            facility_type: 50,
            treatment_type: 50,
            gender_served: 20,
            age_group: 20,
            status: 50,
        }
    }
}

/// How `genderServed` / `ageGroup` are resolved when several records merge.
///
/// `LastWins` keeps the long-standing behaviour where every non-empty value
/// overwrites the previous one, unlike the first-wins text fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DemographicMergePolicy {
    #[default]
    LastWins,
    FirstWins,
}

/// Availability status, ordered from most to least urgent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FacilityStatus {
    #[serde(rename = "Emergency/Crisis Only")]
    EmergencyCrisisOnly,
    #[serde(rename = "Openings Available")]
    OpeningsAvailable,
    #[serde(rename = "Accepting Assessments")]
    AcceptingAssessments,
    #[serde(rename = "Waitlist")]
    Waitlist,
    #[serde(rename = "No Openings")]
    NoOpenings,
    #[serde(rename = "Contact for Availability")]
    ContactForAvailability,
}

impl FacilityStatus {
    pub const ALL: [FacilityStatus; 6] = [
        FacilityStatus::EmergencyCrisisOnly,
        FacilityStatus::OpeningsAvailable,
        FacilityStatus::AcceptingAssessments,
        FacilityStatus::Waitlist,
        FacilityStatus::NoOpenings,
        FacilityStatus::ContactForAvailability,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FacilityStatus::EmergencyCrisisOnly => "Emergency/Crisis Only",
            FacilityStatus::OpeningsAvailable => "Openings Available",
            FacilityStatus::AcceptingAssessments => "Accepting Assessments",
            FacilityStatus::Waitlist => "Waitlist",
            FacilityStatus::NoOpenings => "No Openings",
            FacilityStatus::ContactForAvailability => "Contact for Availability",
        }
    }

    /// Lower is more important.
    pub fn priority(self) -> u8 {
        self as u8
    }

    /// Exact label match; labels are case-sensitive.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.label() == label)
    }

    /// Priority of a free-text status; unrecognized values rank with
    /// "Contact for Availability".
    pub fn priority_of(label: &str) -> u8 {
        Self::from_label(label)
            .unwrap_or(FacilityStatus::ContactForAvailability)
            .priority()
    }
}

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// One facility entry as delivered by a data source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFacilityRecord {
    pub id: Option<i64>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub facility_type: Option<String>,
    pub treatment_type: Option<String>,
    pub gender_served: Option<String>,
    pub age_group: Option<String>,
    pub status: Option<String>,
    pub last_updated: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_coordinates")]
    pub coordinates: Option<Coordinates>,
}

/// Coordinates count only when both `lat` and `lng` are JSON numbers; any
/// other shape is read as absent instead of failing the whole record.
fn lenient_coordinates<'de, D>(deserializer: D) -> Result<Option<Coordinates>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| {
        let lat = value.get("lat").and_then(Value::as_f64)?;
        let lng = value.get("lng").and_then(Value::as_f64)?;
        Some(Coordinates { lat, lng })
    }))
}

/// Deduplicated facility assembled from one or more raw records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CanonicalFacility {
    pub id: i64,
    pub source_ids: Vec<i64>,
    pub key: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub website: String,
    pub description: String,
    pub gender_served: String,
    pub age_group: String,
    pub status: String,
    pub last_updated: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub treatment_type: String,
    pub treatment_types: Vec<String>,
    #[serde(rename = "type")]
    pub facility_type: String,
    pub facility_types: Vec<String>,
    pub search_index: String,
    pub phone_digits: String,
}

impl CanonicalFacility {
    pub fn status_priority(&self) -> u8 {
        FacilityStatus::priority_of(&self.status)
    }

    /// Whether the facility is listed under `value`, either in its type set or
    /// as its primary type.
    pub fn has_facility_type(&self, value: &str) -> bool {
        self.facility_types.iter().any(|t| t == value) || self.facility_type == value
    }

    pub fn has_treatment_type(&self, value: &str) -> bool {
        self.treatment_types.iter().any(|t| t == value) || self.treatment_type == value
    }
}

/// Rendering-safe projection of a `CanonicalFacility`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SafeFacility {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub facility_type: String,
    pub facility_types: Vec<String>,
    pub treatment_types: Vec<String>,
    pub primary_treatment_type: String,
    pub status: String,
    pub address: String,
    pub gender_served: String,
    pub age_group: String,
    pub phone: String,
    pub website: String,
    pub last_updated: Option<String>,
    pub data_attributes: DataAttributes,
}

/// Attribute-escaped values for embedding in HTML attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DataAttributes {
    pub address: String,
    pub phone: String,
    pub website: String,
}

/// Structured query; empty fields do not constrain the result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchCriteria {
    pub search_term: String,
    /// Radius in miles as entered (numeric string).
    #[serde(deserialize_with = "lenient_radius")]
    pub radius: String,
    pub age_group: String,
    pub gender_served: String,
    pub treatment_type: String,
    pub facility_type: String,
}

/// Accept either a string or a number for `radius`.
fn lenient_radius<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => text,
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    })
}

impl SearchCriteria {
    /// Radius in miles, read like JavaScript `parseInt`: the leading integer
    /// counts, a missing/zero/unreadable value means unlimited, and the result
    /// is clamped into `1..=unlimited`.
    pub fn radius_miles(&self, unlimited: u32) -> u32 {
        let trimmed = self.radius.trim();
        let sign_len = usize::from(trimmed.starts_with(['-', '+']));
        let digit_len = trimmed[sign_len..]
            .chars()
            .take_while(char::is_ascii_digit)
            .count();
        if digit_len == 0 {
            return unlimited;
        }

        // Only overflow can fail here; saturate by sign.
        let miles = trimmed[..sign_len + digit_len]
            .parse::<i64>()
            .unwrap_or(if trimmed.starts_with('-') {
                i64::MIN
            } else {
                i64::MAX
            });
        match miles {
            0 => unlimited,
            miles => miles.clamp(1, i64::from(unlimited)) as u32,
        }
    }

    pub fn is_unlimited(&self, unlimited: u32) -> bool {
        self.radius_miles(unlimited) >= unlimited
    }

    /// Copy with the radius replaced.
    pub fn with_radius(&self, miles: u32) -> Self {
        Self {
            radius: miles.to_string(),
            ..self.clone()
        }
    }

    /// Human-readable description of the active constraints.
    pub fn summary(&self, unlimited: u32) -> Vec<String> {
        let mut parts = Vec::new();
        let term = self.search_term.trim();
        if !term.is_empty() {
            parts.push(format!("Search: \"{term}\""));
        }
        if !self.is_unlimited(unlimited) {
            parts.push(format!("{} mi radius", self.radius_miles(unlimited)));
        }
        if !self.age_group.is_empty() {
            parts.push(format!("Age: {}", self.age_group));
        }
        if !self.gender_served.is_empty() {
            parts.push(format!("Gender: {}", self.gender_served));
        }
        if !self.treatment_type.is_empty() {
            parts.push(format!("Treatment: {}", self.treatment_type));
        }
        if !self.facility_type.is_empty() {
            parts.push(format!("Facility: {}", self.facility_type));
        }
        parts
    }
}

/// Errors raised at the edges of the directory (parsing, configuration).
/// Malformed individual records never produce one of these.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Could not parse input: {0}")]
    Parse(String),
    #[error("Expected a JSON array of facilities, received {0}")]
    InvalidDataset(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// JSON type name used in error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
