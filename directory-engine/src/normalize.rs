//! Raw records to canonical facilities: validate, sanitize, merge by dedup
//! key, then finalize.

use std::collections::{hash_map::Entry, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use directory_core::{
    json_kind, CanonicalFacility, Coordinates, DemographicMergePolicy, DirectoryError,
    FacilityStatus, FieldLimits, RawFacilityRecord, DEFAULT_AGE_GROUP, DEFAULT_FACILITY_TYPE,
    DEFAULT_GENDER_SERVED, DEFAULT_STATUS, DEFAULT_TREATMENT_TYPE,
};
use directory_sanitize::{digits_only, Sanitizer};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::DirectoryService;

#[derive(Debug, thiserror::Error)]
enum RecordRejection {
    #[error("expected an object, received {0}")]
    NotAnObject(&'static str),
    #[error("malformed record: {0}")]
    Shape(String),
    #[error("{field} exceeds {limit} characters")]
    TooLong { field: &'static str, limit: usize },
    #[error("{field} contains markup or script content")]
    UnsafeText { field: &'static str },
}

impl<S: Sanitizer> DirectoryService<S> {
    /// Merge raw records into canonical facilities, in first-seen key order.
    /// Records that fail validation are logged and skipped.
    pub fn normalize(&self, records: &[RawFacilityRecord]) -> Vec<CanonicalFacility> {
        let mut merger = FacilityMerger::new(self.config.demographic_merge);
        for (index, record) in records.iter().enumerate() {
            self.ingest(&mut merger, index, record);
        }
        merger.finalize()
    }

    /// Same as [`normalize`](Self::normalize) for loosely shaped JSON. A
    /// non-array value yields an empty list.
    pub fn normalize_value(&self, dataset: &Value) -> Vec<CanonicalFacility> {
        match dataset.as_array() {
            Some(entries) => self.normalize_entries(entries),
            None => {
                warn!(
                    "Facility dataset is {}, expected an array; nothing to normalize",
                    json_kind(dataset)
                );
                Vec::new()
            }
        }
    }

    /// Load a dataset that may already be normalized.
    ///
    /// A single object counts as a one-element list. When the first entry
    /// already carries a string `searchIndex` the list is returned as is
    /// rather than merged a second time.
    pub fn load_dataset(&self, dataset: &Value) -> Vec<CanonicalFacility> {
        let entries = match dataset {
            Value::Array(entries) => entries.as_slice(),
            Value::Null => return Vec::new(),
            other => std::slice::from_ref(other),
        };
        let Some(first) = entries.first() else {
            return Vec::new();
        };

        if first.get("searchIndex").is_some_and(Value::is_string) {
            let passthrough: Result<Vec<CanonicalFacility>, _> = entries
                .iter()
                .map(CanonicalFacility::deserialize)
                .collect();
            match passthrough {
                Ok(facilities) => {
                    debug!("Dataset already normalized ({} facilities)", facilities.len());
                    return facilities;
                }
                Err(err) => {
                    warn!("Dataset looked normalized but could not be read ({err}); normalizing")
                }
            }
        }

        self.normalize_entries(entries)
    }

    /// Parse JSON text and hand it to [`load_dataset`](Self::load_dataset).
    pub fn load_dataset_str(&self, json: &str) -> Result<Vec<CanonicalFacility>, DirectoryError> {
        let value: Value =
            serde_json::from_str(json).map_err(|err| DirectoryError::Parse(err.to_string()))?;
        Ok(self.load_dataset(&value))
    }

    fn normalize_entries(&self, entries: &[Value]) -> Vec<CanonicalFacility> {
        let mut merger = FacilityMerger::new(self.config.demographic_merge);
        for (index, entry) in entries.iter().enumerate() {
            match read_record(entry) {
                Ok(record) => self.ingest(&mut merger, index, &record),
                Err(reason) => warn!("Skipping facility record #{index}: {reason}"),
            }
        }
        merger.finalize()
    }

    fn ingest(&self, merger: &mut FacilityMerger, index: usize, record: &RawFacilityRecord) {
        match self.prepare(record) {
            Ok(prepared) => merger.absorb(prepared),
            Err(reason) => warn!(
                "Skipping facility record #{index} ({:?}): {reason}",
                record.name.as_deref().unwrap_or_default()
            ),
        }
    }

    fn prepare(&self, record: &RawFacilityRecord) -> Result<PreparedRecord, RecordRejection> {
        self.validate(record)?;

        let text = |value: &Option<String>| {
            self.sanitizer
                .sanitize_text(value.as_deref().unwrap_or_default().trim())
        };

        let status = text(&record.status);
        let last_updated = record
            .last_updated
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(PreparedRecord {
            id: record.id,
            name: text(&record.name),
            facility_type: text(&record.facility_type),
            treatment_type: text(&record.treatment_type),
            gender_served: text(&record.gender_served),
            age_group: text(&record.age_group),
            status: if status.is_empty() {
                DEFAULT_STATUS.to_string()
            } else {
                status
            },
            last_updated,
            address: text(&record.address),
            phone: self
                .sanitizer
                .sanitize_phone(record.phone.as_deref().unwrap_or_default().trim()),
            website: self
                .sanitizer
                .sanitize_url(record.website.as_deref().unwrap_or_default().trim()),
            description: text(&record.description),
            coordinates: record.coordinates.as_ref().and_then(Coordinates::clamped),
        })
    }

    fn validate(&self, record: &RawFacilityRecord) -> Result<(), RecordRejection> {
        let limits: &FieldLimits = &self.config.field_limits;

        for (field, value, limit) in [
            ("name", &record.name, limits.name),
            ("address", &record.address, limits.address),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                if char_len(value) > limit {
                    return Err(RecordRejection::TooLong { field, limit });
                }
                if !self.sanitizer.validate_input_text(value, limit) {
                    return Err(RecordRejection::UnsafeText { field });
                }
            }
        }

        let website = record.website.as_deref().map(str::trim).unwrap_or_default();
        if char_len(website) > limits.website {
            return Err(RecordRejection::TooLong {
                field: "website",
                limit: limits.website,
            });
        }

        for (field, value, limit) in [
            ("phone", &record.phone, limits.phone),
            ("type", &record.facility_type, limits.facility_type),
            ("treatmentType", &record.treatment_type, limits.treatment_type),
            ("genderServed", &record.gender_served, limits.gender_served),
            ("ageGroup", &record.age_group, limits.age_group),
            ("status", &record.status, limits.status),
        ] {
            if value.as_deref().is_some_and(|v| char_len(v) > limit) {
                return Err(RecordRejection::TooLong { field, limit });
            }
        }

        Ok(())
    }
}

fn read_record(entry: &Value) -> Result<RawFacilityRecord, RecordRejection> {
    if !entry.is_object() {
        return Err(RecordRejection::NotAnObject(json_kind(entry)));
    }
    RawFacilityRecord::deserialize(entry).map_err(|err| RecordRejection::Shape(err.to_string()))
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// A validated, trimmed and sanitized raw record.
struct PreparedRecord {
    id: Option<i64>,
    name: String,
    facility_type: String,
    treatment_type: String,
    gender_served: String,
    age_group: String,
    status: String,
    last_updated: Option<String>,
    address: String,
    phone: String,
    website: String,
    description: String,
    coordinates: Option<Coordinates>,
}

impl PreparedRecord {
    fn dedup_key(&self) -> String {
        match self.id {
            Some(id) => format!("id:{id}"),
            None => format!(
                "name:{}|address:{}",
                key_part(&self.name),
                key_part(&self.address)
            ),
        }
    }
}

fn key_part(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Accumulators keyed by dedup key, kept in first-seen order. Records must be
/// absorbed in input order for the first-wins fields to be deterministic.
struct FacilityMerger {
    policy: DemographicMergePolicy,
    positions: HashMap<String, usize>,
    entries: Vec<FacilityAccumulator>,
}

impl FacilityMerger {
    fn new(policy: DemographicMergePolicy) -> Self {
        Self {
            policy,
            positions: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn absorb(&mut self, record: PreparedRecord) {
        let key = record.dedup_key();
        let position = match self.positions.entry(key) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                self.entries
                    .push(FacilityAccumulator::new(entry.key().clone(), record.id));
                *entry.insert(self.entries.len() - 1)
            }
        };
        self.entries[position].absorb(record, self.policy);
    }

    fn finalize(self) -> Vec<CanonicalFacility> {
        self.entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.finish(index as i64 + 1))
            .collect()
    }
}

struct FacilityAccumulator {
    id: Option<i64>,
    key: String,
    name: String,
    address: String,
    phone: String,
    website: String,
    description: String,
    gender_served: Option<String>,
    age_group: Option<String>,
    status: Option<(u8, String)>,
    last_updated: Option<(DateTime<Utc>, String)>,
    coordinates: Option<Coordinates>,
    treatment_types: Vec<String>,
    facility_types: Vec<String>,
    source_ids: Vec<i64>,
}

impl FacilityAccumulator {
    fn new(key: String, id: Option<i64>) -> Self {
        Self {
            id,
            key,
            name: String::new(),
            address: String::new(),
            phone: String::new(),
            website: String::new(),
            description: String::new(),
            gender_served: None,
            age_group: None,
            status: None,
            last_updated: None,
            coordinates: None,
            treatment_types: Vec::new(),
            facility_types: Vec::new(),
            source_ids: Vec::new(),
        }
    }

    fn absorb(&mut self, record: PreparedRecord, policy: DemographicMergePolicy) {
        if let Some(id) = record.id {
            if !self.source_ids.contains(&id) {
                self.source_ids.push(id);
            }
        }

        fill_if_empty(&mut self.name, record.name);
        fill_if_empty(&mut self.address, record.address);
        fill_if_empty(&mut self.phone, record.phone);
        fill_if_empty(&mut self.website, record.website);
        fill_if_empty(&mut self.description, record.description);

        merge_demographic(&mut self.gender_served, record.gender_served, policy);
        merge_demographic(&mut self.age_group, record.age_group, policy);

        if self.coordinates.is_none() {
            self.coordinates = record.coordinates;
        }

        push_unique(
            &mut self.treatment_types,
            non_empty_or(record.treatment_type, DEFAULT_TREATMENT_TYPE),
        );
        push_unique(
            &mut self.facility_types,
            non_empty_or(record.facility_type, DEFAULT_FACILITY_TYPE),
        );

        let priority = FacilityStatus::priority_of(&record.status);
        if self
            .status
            .as_ref()
            .map_or(true, |(best, _)| priority < *best)
        {
            self.status = Some((priority, record.status));
        }

        if let Some(raw) = record.last_updated {
            match parse_last_updated(&raw) {
                Some(parsed) => {
                    if self
                        .last_updated
                        .as_ref()
                        .map_or(true, |(latest, _)| parsed > *latest)
                    {
                        self.last_updated = Some((parsed, raw));
                    }
                }
                None => debug!("Ignoring unparseable lastUpdated {raw:?} for {}", self.key),
            }
        }
    }

    fn finish(self, position: i64) -> CanonicalFacility {
        let treatment_type = self.treatment_types.first().cloned().unwrap_or_default();
        let facility_type = self.facility_types.first().cloned().unwrap_or_default();

        let treatments = self.treatment_types.join(" ");
        let categories = self.facility_types.join(" ");
        let search_index = [
            self.name.as_str(),
            self.address.as_str(),
            self.phone.as_str(),
            self.description.as_str(),
            treatments.as_str(),
            categories.as_str(),
        ]
        .join(" ")
        .to_lowercase();

        CanonicalFacility {
            id: self.id.unwrap_or(position),
            source_ids: self.source_ids,
            key: self.key,
            phone_digits: digits_only(&self.phone),
            name: self.name,
            address: self.address,
            phone: self.phone,
            website: self.website,
            description: self.description,
            gender_served: self
                .gender_served
                .unwrap_or_else(|| DEFAULT_GENDER_SERVED.to_string()),
            age_group: self
                .age_group
                .unwrap_or_else(|| DEFAULT_AGE_GROUP.to_string()),
            status: self
                .status
                .map(|(_, status)| status)
                .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            last_updated: self.last_updated.map(|(_, raw)| raw),
            coordinates: self.coordinates,
            treatment_type,
            treatment_types: self.treatment_types,
            facility_type,
            facility_types: self.facility_types,
            search_index,
        }
    }
}

fn fill_if_empty(slot: &mut String, candidate: String) {
    if slot.is_empty() && !candidate.is_empty() {
        *slot = candidate;
    }
}

fn merge_demographic(
    slot: &mut Option<String>,
    candidate: String,
    policy: DemographicMergePolicy,
) {
    if candidate.is_empty() {
        return;
    }
    match policy {
        DemographicMergePolicy::LastWins => *slot = Some(candidate),
        DemographicMergePolicy::FirstWins => {
            if slot.is_none() {
                *slot = Some(candidate);
            }
        }
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Accepts RFC 3339 timestamps, ISO dates with or without a time, and US
/// `MM/DD/YYYY` dates. Values without a zone are read as UTC.
fn parse_last_updated(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.and_utc());
        }
    }

    ["%Y-%m-%d", "%m/%d/%Y"]
        .into_iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
}
