//! Projection of canonical facilities into values safe for HTML text and
//! attribute contexts.

use directory_core::{
    CanonicalFacility, DataAttributes, SafeFacility, DEFAULT_AGE_GROUP, DEFAULT_GENDER_SERVED,
    DEFAULT_STATUS, DEFAULT_TREATMENT_TYPE,
};
use directory_sanitize::Sanitizer;

use crate::DirectoryService;

impl<S: Sanitizer> DirectoryService<S> {
    /// Project a facility into values that are safe to drop into markup.
    /// Every text field passes through the sanitizer again, so the result does
    /// not depend on how the facility was produced.
    pub fn sanitize_for_render(&self, facility: &CanonicalFacility) -> SafeFacility {
        let text = |value: &str| self.sanitizer.sanitize_text(value);
        let text_or = |value: &str, fallback: &str| {
            text(if value.is_empty() { fallback } else { value })
        };

        let treatment_types: Vec<String> = if facility.treatment_types.is_empty() {
            Some(text(&facility.treatment_type))
                .filter(|value| !value.is_empty())
                .into_iter()
                .collect()
        } else {
            facility.treatment_types.iter().map(|t| text(t)).collect()
        };

        let website = self.sanitizer.sanitize_url(&facility.website);
        let data_attributes = DataAttributes {
            address: self.sanitizer.sanitize_attribute_text(&facility.address),
            phone: self.sanitizer.sanitize_attribute_text(&facility.phone),
            website: if website.is_empty() {
                String::new()
            } else {
                self.sanitizer.sanitize_attribute_text(&website)
            },
        };

        SafeFacility {
            id: facility.id,
            name: text(&facility.name),
            facility_type: text(&facility.facility_type),
            facility_types: facility.facility_types.iter().map(|t| text(t)).collect(),
            primary_treatment_type: treatment_types
                .first()
                .cloned()
                .unwrap_or_else(|| DEFAULT_TREATMENT_TYPE.to_string()),
            treatment_types,
            status: text_or(&facility.status, DEFAULT_STATUS),
            address: text(&facility.address),
            gender_served: text_or(&facility.gender_served, DEFAULT_GENDER_SERVED),
            age_group: text_or(&facility.age_group, DEFAULT_AGE_GROUP),
            phone: self.sanitizer.sanitize_phone(&facility.phone),
            website,
            last_updated: facility.last_updated.clone(),
            data_attributes,
        }
    }
}
