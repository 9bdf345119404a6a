//! Multi-criteria search over normalized facilities.

use directory_core::{
    CanonicalFacility, Coordinates, DirectoryConfig, SearchCriteria, WILDCARD_BOTH, WILDCARD_CO_ED,
};
use directory_sanitize::{digits_only, Sanitizer};
use log::debug;
use serde::Serialize;

use crate::DirectoryService;

/// Result of [`DirectoryService::search_with_fallback`].
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub facilities: Vec<CanonicalFacility>,
    /// Criteria that produced `facilities`; differs from the request when the
    /// radius was widened.
    pub criteria: SearchCriteria,
    pub broadened: bool,
}

impl<S: Sanitizer> DirectoryService<S> {
    /// Facilities matching every active criterion, in input order.
    ///
    /// When a radius below the unlimited sentinel is combined with a user
    /// location, facilities without coordinates are excluded.
    pub fn filter(
        &self,
        facilities: &[CanonicalFacility],
        criteria: &SearchCriteria,
        user_location: Option<Coordinates>,
    ) -> Vec<CanonicalFacility> {
        let Some(query) = Query::compile(criteria, &self.config) else {
            debug!("Search term longer than {} characters; returning nothing", self.config.max_search_term_len);
            return Vec::new();
        };

        debug!(
            "Filtering {} facilities (term: {:?}, radius: {:?}, located: {})",
            facilities.len(),
            query.term,
            query.radius,
            user_location.is_some()
        );

        facilities
            .iter()
            .filter(|facility| query.matches(facility, user_location))
            .cloned()
            .collect()
    }

    /// Run [`filter`](Self::filter); when a radius-limited search around a
    /// user location finds nothing, run it again without the radius.
    pub fn search_with_fallback(
        &self,
        facilities: &[CanonicalFacility],
        criteria: &SearchCriteria,
        user_location: Option<Coordinates>,
    ) -> SearchOutcome {
        let unlimited = self.config.unlimited_radius;
        let matches = self.filter(facilities, criteria, user_location);

        if matches.is_empty() && user_location.is_some() && !criteria.is_unlimited(unlimited) {
            let widened = criteria.with_radius(unlimited);
            debug!(
                "No facilities within {} miles; widening to unlimited radius",
                criteria.radius_miles(unlimited)
            );
            return SearchOutcome {
                facilities: self.filter(facilities, &widened, user_location),
                criteria: widened,
                broadened: true,
            };
        }

        SearchOutcome {
            facilities: matches,
            criteria: criteria.clone(),
            broadened: false,
        }
    }
}

/// Criteria prepared once per call.
#[derive(Debug)]
struct Query {
    term: String,
    words: Vec<String>,
    digits: String,
    /// `None` when unlimited.
    radius: Option<f64>,
    age_group: String,
    gender_served: String,
    treatment_type: String,
    facility_type: String,
}

impl Query {
    /// `None` when the search term trips the length guard.
    fn compile(criteria: &SearchCriteria, config: &DirectoryConfig) -> Option<Self> {
        let term = criteria.search_term.trim().to_lowercase();
        if term.chars().count() > config.max_search_term_len {
            return None;
        }

        let limits = &config.field_limits;
        let miles = criteria.radius_miles(config.unlimited_radius);

        Some(Self {
            words: term.split_whitespace().map(str::to_string).collect(),
            digits: digits_only(&term),
            term,
            radius: (miles < config.unlimited_radius).then_some(f64::from(miles)),
            age_group: truncate(&criteria.age_group, limits.age_group),
            gender_served: truncate(&criteria.gender_served, limits.gender_served),
            treatment_type: truncate(&criteria.treatment_type, limits.treatment_type),
            facility_type: truncate(&criteria.facility_type, limits.facility_type),
        })
    }

    fn matches(&self, facility: &CanonicalFacility, user_location: Option<Coordinates>) -> bool {
        self.matches_search(facility)
            && self.matches_age(facility)
            && self.matches_gender(facility)
            && self.matches_treatment(facility)
            && self.matches_facility_type(facility)
            && self.matches_distance(facility, user_location)
    }

    /// Any single word is enough; digits in the term also match the phone.
    fn matches_search(&self, facility: &CanonicalFacility) -> bool {
        if self.term.is_empty() {
            return true;
        }

        let text_hit = if self.words.is_empty() {
            facility.search_index.contains(&self.term)
        } else {
            self.words
                .iter()
                .any(|word| facility.search_index.contains(word.as_str()))
        };

        text_hit || (!self.digits.is_empty() && facility.phone_digits.contains(&self.digits))
    }

    fn matches_age(&self, facility: &CanonicalFacility) -> bool {
        self.age_group.is_empty()
            || facility.age_group == self.age_group
            || facility.age_group == WILDCARD_BOTH
    }

    fn matches_gender(&self, facility: &CanonicalFacility) -> bool {
        self.gender_served.is_empty()
            || facility.gender_served == self.gender_served
            || facility.gender_served == WILDCARD_CO_ED
    }

    fn matches_treatment(&self, facility: &CanonicalFacility) -> bool {
        self.treatment_type.is_empty()
            || facility.has_treatment_type(&self.treatment_type)
            || facility.treatment_types.iter().any(|t| t == WILDCARD_BOTH)
    }

    fn matches_facility_type(&self, facility: &CanonicalFacility) -> bool {
        self.facility_type.is_empty() || facility.has_facility_type(&self.facility_type)
    }

    fn matches_distance(
        &self,
        facility: &CanonicalFacility,
        user_location: Option<Coordinates>,
    ) -> bool {
        match (self.radius, user_location) {
            (Some(radius), Some(origin)) => facility
                .coordinates
                .is_some_and(|coordinates| origin.distance_to(&coordinates) <= radius),
            _ => true,
        }
    }
}

fn truncate(value: &str, limit: usize) -> String {
    value.chars().take(limit).collect()
}
