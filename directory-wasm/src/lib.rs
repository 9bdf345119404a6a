//! JavaScript bindings for the directory engine. Values cross the boundary as
//! plain JS objects; failures come back as string `JsValue`s.

use directory_core::{
    CanonicalFacility, Coordinates, DemographicMergePolicy, DirectoryConfig, DirectoryError,
    SearchCriteria,
};
use directory_engine::{parse_facilities, DirectoryService};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::from_value;
use wasm_bindgen::prelude::*;

/// Partial configuration from JS; missing fields keep their defaults.
#[derive(Deserialize)]
struct JsDirectoryConfig {
    #[serde(default)]
    unlimited_radius: Option<u32>,
    #[serde(default)]
    default_search_radius: Option<u32>,
    #[serde(default)]
    max_search_term_len: Option<usize>,
    #[serde(default)]
    max_recent_searches: Option<usize>,
    #[serde(default)]
    demographic_merge: Option<DemographicMergePolicy>,
}

impl From<JsDirectoryConfig> for DirectoryConfig {
    fn from(cfg: JsDirectoryConfig) -> Self {
        let mut base = DirectoryConfig::default();
        if let Some(miles) = cfg.unlimited_radius {
            base.unlimited_radius = miles;
        }
        if let Some(miles) = cfg.default_search_radius {
            base.default_search_radius = miles;
        }
        if let Some(len) = cfg.max_search_term_len {
            base.max_search_term_len = len;
        }
        if let Some(count) = cfg.max_recent_searches {
            base.max_recent_searches = count;
        }
        if let Some(policy) = cfg.demographic_merge {
            base.demographic_merge = policy;
        }
        base
    }
}

/// Normalize and deduplicate a raw facility list. Already-normalized input is
/// returned unchanged.
#[wasm_bindgen]
pub fn normalize_dataset(records: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    init_panic_hook();

    let service = service(config)?;
    let dataset = from_value::<serde_json::Value>(records)
        .map_err(|err| JsValue::from_str(&format!("Could not read facility records: {err}")))?;

    encode(&service.load_dataset(&dataset))
}

/// Facilities matching `criteria`. `location` is `{ lat, lng }` or absent.
#[wasm_bindgen]
pub fn filter_facilities(
    facilities: JsValue,
    criteria: JsValue,
    location: Option<JsValue>,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    init_panic_hook();

    let service = service(config)?;
    let request = SearchRequest::read(facilities, criteria, location)?;

    encode(&service.filter(&request.facilities, &request.criteria, request.location))
}

/// Like [`filter_facilities`], widening to an unlimited radius when a
/// located, radius-limited search finds nothing. Returns
/// `{ facilities, criteria, broadened }`.
#[wasm_bindgen]
pub fn search_facilities(
    facilities: JsValue,
    criteria: JsValue,
    location: Option<JsValue>,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    init_panic_hook();

    let service = service(config)?;
    let request = SearchRequest::read(facilities, criteria, location)?;

    encode(&service.search_with_fallback(
        &request.facilities,
        &request.criteria,
        request.location,
    ))
}

#[wasm_bindgen]
pub fn sanitize_facility_for_render(facility: JsValue) -> Result<JsValue, JsValue> {
    init_panic_hook();

    let facility: CanonicalFacility = from_value(facility)
        .map_err(|err| JsValue::from_str(&format!("Could not read facility: {err}")))?;

    encode(&DirectoryService::default().sanitize_for_render(&facility))
}

/// Haversine distance in miles; `Infinity` for unusable coordinates.
#[wasm_bindgen]
pub fn calculate_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    directory_core::calculate_distance(lat1, lng1, lat2, lng2)
}

struct SearchRequest {
    facilities: Vec<CanonicalFacility>,
    criteria: SearchCriteria,
    location: Option<Coordinates>,
}

impl SearchRequest {
    fn read(
        facilities: JsValue,
        criteria: JsValue,
        location: Option<JsValue>,
    ) -> Result<Self, JsValue> {
        let dataset = from_value::<serde_json::Value>(facilities)
            .map_err(|err| JsValue::from_str(&format!("Could not read facilities: {err}")))?;
        let facilities = parse_facilities(&dataset).map_err(format_directory_error)?;

        let criteria = if criteria.is_undefined() || criteria.is_null() {
            SearchCriteria::default()
        } else {
            from_value(criteria)
                .map_err(|err| JsValue::from_str(&format!("Could not read criteria: {err}")))?
        };

        let location = match location {
            Some(value) if !value.is_undefined() && !value.is_null() => Some(
                from_value::<Coordinates>(value)
                    .map_err(|err| JsValue::from_str(&format!("Could not read location: {err}")))?,
            ),
            _ => None,
        };

        Ok(Self {
            facilities,
            criteria,
            location,
        })
    }
}

fn service(config: Option<JsValue>) -> Result<DirectoryService, JsValue> {
    let cfg = match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsDirectoryConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Could not read config: {err}")))?;
            DirectoryConfig::from(cfg)
        }
        _ => DirectoryConfig::default(),
    };
    cfg.validate().map_err(format_directory_error)?;
    Ok(DirectoryService::new(cfg))
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    // Plain objects rather than ES maps so callers can use dot access.
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value
        .serialize(&serializer)
        .map_err(|err| JsValue::from_str(&format!("Could not serialize result: {err}")))
}

fn format_directory_error(err: DirectoryError) -> JsValue {
    JsValue::from_str(&format!("Directory error: {err}"))
}

fn init_panic_hook() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}
