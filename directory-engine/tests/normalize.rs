use directory_core::{
    Coordinates, DemographicMergePolicy, DirectoryConfig, DirectoryError, RawFacilityRecord,
};
use directory_engine::DirectoryService;
use directory_sanitize::IdentitySanitizer;
use serde_json::json;

fn record(value: serde_json::Value) -> RawFacilityRecord {
    serde_json::from_value(value).expect("test record deserializes")
}

#[test]
fn records_sharing_an_id_merge_into_one_facility() {
    let facilities = DirectoryService::default().normalize(&[
        record(json!({ "id": 1, "name": "A Clinic", "status": "No Openings", "type": "Detox" })),
        record(json!({ "id": 1, "name": "", "status": "Openings Available", "type": "Outpatient" })),
    ]);

    assert_eq!(facilities.len(), 1);
    let facility = &facilities[0];
    assert_eq!(facility.name, "A Clinic");
    assert_eq!(facility.status, "Openings Available");
    assert_eq!(facility.facility_types, vec!["Detox", "Outpatient"]);
    assert_eq!(facility.facility_type, "Detox");
    assert_eq!(facility.source_ids, vec![1]);
    assert_eq!(facility.key, "id:1");
}

#[test]
fn same_id_merges_despite_different_names_and_addresses() {
    let facilities = DirectoryService::default().normalize(&[
        record(json!({ "id": 42, "name": "North Campus", "address": "1 A St" })),
        record(json!({ "id": 42, "name": "South Campus", "address": "2 B St" })),
    ]);

    assert_eq!(facilities.len(), 1);
    assert_eq!(facilities[0].name, "North Campus");
    assert_eq!(facilities[0].address, "1 A St");
}

#[test]
fn status_priority_wins_regardless_of_order() {
    let service = DirectoryService::default();
    let closed = record(json!({ "id": 3, "status": "No Openings" }));
    let open = record(json!({ "id": 3, "status": "Openings Available" }));

    let forward = service.normalize(&[closed.clone(), open.clone()]);
    let backward = service.normalize(&[open, closed]);

    assert_eq!(forward[0].status, "Openings Available");
    assert_eq!(backward[0].status, "Openings Available");
}

#[test]
fn merge_order_does_not_change_status_dates_or_sets() {
    let service = DirectoryService::default();
    let first = record(json!({
        "id": 5, "name": "First", "status": "Waitlist", "type": "Detox",
        "treatmentType": "Detox", "lastUpdated": "2024-01-02"
    }));
    let second = record(json!({
        "id": 5, "name": "Second", "status": "Accepting Assessments", "type": "Outpatient",
        "treatmentType": "Mental Health", "lastUpdated": "2024-06-30"
    }));

    let forward = &service.normalize(&[first.clone(), second.clone()])[0];
    let backward = &service.normalize(&[second, first])[0];

    assert_eq!(forward.status, backward.status);
    assert_eq!(forward.last_updated, backward.last_updated);
    assert_eq!(forward.last_updated.as_deref(), Some("2024-06-30"));

    let mut forward_types = forward.facility_types.clone();
    let mut backward_types = backward.facility_types.clone();
    forward_types.sort();
    backward_types.sort();
    assert_eq!(forward_types, backward_types);

    // First-wins fields follow the input order.
    assert_eq!(forward.name, "First");
    assert_eq!(backward.name, "Second");
}

#[test]
fn unparseable_dates_are_ignored() {
    let facilities = DirectoryService::default().normalize(&[
        record(json!({ "id": 8, "lastUpdated": "03/15/2024" })),
        record(json!({ "id": 8, "lastUpdated": "sometime in May" })),
        record(json!({ "id": 8, "lastUpdated": "2024-02-01T12:00:00Z" })),
    ]);
    assert_eq!(facilities[0].last_updated.as_deref(), Some("03/15/2024"));

    let only_garbage =
        DirectoryService::default().normalize(&[record(json!({ "id": 9, "lastUpdated": "soon" }))]);
    assert_eq!(only_garbage[0].last_updated, None);
}

#[test]
fn demographics_take_the_last_non_empty_value_by_default() {
    let facilities = DirectoryService::default().normalize(&[
        record(json!({ "id": 4, "genderServed": "Male", "ageGroup": "Juvenile" })),
        record(json!({ "id": 4, "genderServed": "Female", "ageGroup": "" })),
    ]);
    assert_eq!(facilities[0].gender_served, "Female");
    assert_eq!(facilities[0].age_group, "Juvenile");
}

#[test]
fn first_wins_demographic_policy_keeps_the_earliest_value() {
    let config = DirectoryConfig {
        demographic_merge: DemographicMergePolicy::FirstWins,
        ..DirectoryConfig::default()
    };
    let facilities = DirectoryService::new(config).normalize(&[
        record(json!({ "id": 4, "genderServed": "Male" })),
        record(json!({ "id": 4, "genderServed": "Female" })),
    ]);
    assert_eq!(facilities[0].gender_served, "Male");
}

#[test]
fn defaults_fill_missing_fields() {
    let facilities = DirectoryService::default().normalize(&[record(json!({ "name": "Bare" }))]);
    let facility = &facilities[0];

    assert_eq!(facility.id, 1);
    assert!(facility.source_ids.is_empty());
    assert_eq!(facility.key, "name:bare|address:");
    assert_eq!(facility.status, "Contact for Availability");
    assert_eq!(facility.gender_served, "Co-ed");
    assert_eq!(facility.age_group, "Adult");
    assert_eq!(facility.treatment_types, vec!["Unknown"]);
    assert_eq!(facility.facility_types, vec!["Treatment Center"]);
    assert_eq!(facility.treatment_type, "Unknown");
    assert_eq!(facility.facility_type, "Treatment Center");
}

#[test]
fn name_and_address_keys_are_case_and_space_insensitive() {
    let facilities = DirectoryService::default().normalize(&[
        record(json!({ "name": "Hope Center", "address": "10 Elm St" })),
        record(json!({ "name": "  HOPE center ", "address": "10 ELM ST  ", "type": "Detox" })),
        record(json!({ "name": "Hope Center", "address": "11 Elm St" })),
    ]);

    assert_eq!(facilities.len(), 2);
    assert_eq!(facilities[0].facility_types, vec!["Treatment Center", "Detox"]);
    assert_eq!(facilities[1].id, 2);
}

#[test]
fn sequence_ids_follow_output_position() {
    let facilities = DirectoryService::default().normalize(&[
        record(json!({ "id": 50, "name": "Has Id" })),
        record(json!({ "name": "No Id" })),
    ]);
    assert_eq!(facilities[0].id, 50);
    assert_eq!(facilities[1].id, 2);
}

#[test]
fn invalid_records_are_dropped_not_raised() {
    let service = DirectoryService::default();
    let facilities = service.normalize_value(&json!([
        { "id": 1, "name": "x".repeat(201) },
        { "id": 2, "name": "Fine", "phone": "1".repeat(51) },
        { "id": 3, "name": "Fine", "genderServed": "Everyone who needs help" },
        { "id": 4, "name": "<script>alert(1)</script>" },
        { "id": 5, "address": "1 Main St onclick=steal()" },
        { "id": 6, "name": 12 },
        { "id": "7", "name": "String id" },
        42,
        null,
        ["nested"],
        { "id": 8, "name": "Survivor" }
    ]));

    assert_eq!(facilities.len(), 1);
    assert_eq!(facilities[0].name, "Survivor");
}

#[test]
fn non_array_input_normalizes_to_nothing() {
    let service = DirectoryService::default();
    assert!(service.normalize_value(&json!({ "id": 1 })).is_empty());
    assert!(service.normalize_value(&json!("facilities")).is_empty());
    assert!(service.normalize(&[]).is_empty());
}

#[test]
fn text_fields_are_trimmed_and_escaped() {
    let facilities = DirectoryService::default().normalize(&[record(json!({
        "id": 1,
        "name": "  Smith & Sons Recovery ",
        "phone": " 402-555-0100 x12 ",
        "website": "data:text/html,hi",
        "status": "   "
    }))]);
    let facility = &facilities[0];

    assert_eq!(facility.name, "Smith &amp; Sons Recovery");
    assert_eq!(facility.phone, "402-555-0100");
    assert_eq!(facility.phone_digits, "4025550100");
    assert_eq!(facility.website, "");
    assert_eq!(facility.status, "Contact for Availability");
}

#[test]
fn identity_sanitizer_keeps_raw_text() {
    let service = DirectoryService::with_sanitizer(DirectoryConfig::default(), IdentitySanitizer);
    let facilities = service.normalize(&[record(json!({
        "id": 1,
        "name": "Smith & Sons",
        "phone": "555",
    }))]);

    assert_eq!(facilities[0].name, "Smith & Sons");
    assert_eq!(facilities[0].phone, "555");
}

#[test]
fn length_limits_apply_whatever_the_sanitizer() {
    let service = DirectoryService::with_sanitizer(DirectoryConfig::default(), IdentitySanitizer);
    let facilities = service.normalize(&[
        record(json!({ "id": 1, "name": "x".repeat(201) })),
        record(json!({ "id": 2, "name": "Ok", "address": "a".repeat(501) })),
        record(json!({ "id": 3, "name": "y".repeat(200), "address": "b".repeat(500) })),
    ]);

    assert_eq!(facilities.len(), 1);
    assert_eq!(facilities[0].id, 3);
    assert_eq!(facilities[0].name.chars().count(), 200);
}

#[test]
fn coordinates_are_clamped_and_first_wins() {
    let facilities = DirectoryService::default().normalize(&[
        record(json!({ "id": 1 })),
        record(json!({ "id": 1, "coordinates": { "lat": 95.0, "lng": -190.0 } })),
        record(json!({ "id": 1, "coordinates": { "lat": 41.0, "lng": -96.0 } })),
    ]);
    assert_eq!(
        facilities[0].coordinates,
        Some(Coordinates {
            lat: 90.0,
            lng: -180.0
        })
    );
}

#[test]
fn search_index_is_lowercase_and_includes_all_types() {
    let facilities = DirectoryService::default().normalize(&[
        record(json!({
            "id": 1, "name": "Blue Valley", "address": "Grand Island, NE",
            "description": "Medication Assisted", "treatmentType": "Substance Abuse"
        })),
        record(json!({ "id": 1, "treatmentType": "Mental Health", "type": "Outpatient" })),
    ]);
    let index = &facilities[0].search_index;

    assert_eq!(index, &index.to_lowercase());
    for needle in [
        "blue valley",
        "grand island",
        "medication assisted",
        "substance abuse",
        "mental health",
        "treatment center",
        "outpatient",
    ] {
        assert!(index.contains(needle), "{needle} missing from {index:?}");
    }
}

#[test]
fn already_normalized_datasets_pass_through() {
    let service = DirectoryService::default();
    let normalized = service.normalize(&[
        record(json!({ "id": 1, "name": "One" })),
        record(json!({ "id": 1, "name": "Dup", "type": "Detox" })),
    ]);
    let as_json = serde_json::to_value(&normalized).unwrap();

    let reloaded = service.load_dataset(&as_json);
    assert_eq!(reloaded, normalized);
    assert_eq!(reloaded[0].facility_types, vec!["Treatment Center", "Detox"]);
}

#[test]
fn load_dataset_accepts_single_objects_and_empty_input() {
    let service = DirectoryService::default();

    let single = service.load_dataset(&json!({ "id": 3, "name": "Solo" }));
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].name, "Solo");

    assert!(service.load_dataset(&json!([])).is_empty());
    assert!(service.load_dataset(&serde_json::Value::Null).is_empty());
}

#[test]
fn load_dataset_str_reports_unparseable_text() {
    let result = DirectoryService::default().load_dataset_str("[{ not json");
    assert!(matches!(result, Err(DirectoryError::Parse(_))));
}
