//! Road feature schema: the canonical GeoJSON feature model and the
//! business constants for road attributes.
//!
//! Feature properties are parsed once into a typed set of known fields;
//! anything else lands in an extension map instead of being re-read by
//! string key downstream.

use serde::{Deserialize, Deserializer, Serialize};

use crate::geometry::Geometry;

// ── Business constants ───────────────────────────────────────────────

/// The fixed road classification enum. `roadType` values outside this
/// list are validation errors.
pub const VALID_ROAD_TYPES: &[&str] = &[
    "highway",
    "expressway",
    "arterial",
    "collector",
    "local",
    "service",
];

/// Default classification for inserted records without a `roadType`.
pub const DEFAULT_ROAD_TYPE: &str = "local";

/// Default lane count for inserted records without `lanes`.
pub const DEFAULT_LANES: i64 = 2;

/// Default direction for inserted records without `direction`.
pub const DEFAULT_DIRECTION: &str = "both";

/// Service coverage envelope in the canonical CRS (EPSG:4326).
/// Coordinates outside it are flagged as warnings during validation.
pub const COVERAGE_MIN_X: f64 = 118.0;
pub const COVERAGE_MIN_Y: f64 = 21.5;
pub const COVERAGE_MAX_X: f64 = 122.5;
pub const COVERAGE_MAX_Y: f64 = 26.5;

/// Whether a position lies inside the coverage envelope.
pub fn within_coverage(position: &[f64]) -> bool {
    match position {
        [x, y, ..] => {
            *x >= COVERAGE_MIN_X && *x <= COVERAGE_MAX_X && *y >= COVERAGE_MIN_Y && *y <= COVERAGE_MAX_Y
        }
        _ => false,
    }
}

// ── Canonical feature model ──────────────────────────────────────────

/// A canonical GeoJSON feature collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<RoadFeature>,
}

impl FeatureCollection {
    /// Parse a canonical GeoJSON document.
    pub fn from_str(raw: &str) -> Result<Self, crate::error::CoreError> {
        serde_json::from_str(raw).map_err(|e| {
            crate::error::CoreError::Validation(format!("Malformed GeoJSON collection: {e}"))
        })
    }
}

/// One feature from a canonical collection.
///
/// The geometry stays a raw JSON value until it is actually compared or
/// written; a malformed geometry on one feature must not poison the
/// whole collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadFeature {
    #[serde(default)]
    pub geometry: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "de_properties")]
    pub properties: RoadProperties,
}

impl RoadFeature {
    /// Parse the raw geometry into the typed model, if present.
    pub fn parsed_geometry(&self) -> Option<Result<Geometry, crate::error::CoreError>> {
        self.geometry.as_ref().map(Geometry::from_value)
    }
}

/// The known road feature properties; everything else is preserved in
/// `extra`. An absent property means "not asserted", never "cleared".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoadProperties {
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "roadType")]
    pub road_type: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_int")]
    pub lanes: Option<i64>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, rename = "dataSource")]
    pub data_source: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ── Lenient deserializers ────────────────────────────────────────────

/// Treat `"properties": null` the same as an absent properties object.
fn de_properties<'de, D>(deserializer: D) -> Result<RoadProperties, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RoadProperties>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept a string or a number for id-like properties. GIS exports are
/// not consistent about quoting feature ids.
fn de_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accept an integer or a numeric string for count-like properties.
fn de_lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_collection_with_known_and_extra_properties() {
        let raw = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": [[121.5, 25.0], [121.6, 25.1]] },
                "properties": {
                    "id": "R-001",
                    "name": "Zhongshan Rd",
                    "roadType": "arterial",
                    "lanes": 4,
                    "surface": "asphalt"
                }
            }]
        })
        .to_string();

        let collection = FeatureCollection::from_str(&raw).unwrap();
        assert_eq!(collection.features.len(), 1);
        let props = &collection.features[0].properties;
        assert_eq!(props.id.as_deref(), Some("R-001"));
        assert_eq!(props.road_type.as_deref(), Some("arterial"));
        assert_eq!(props.lanes, Some(4));
        assert_eq!(props.extra.get("surface"), Some(&json!("asphalt")));
        assert!(props.data_source.is_none());
    }

    #[test]
    fn numeric_id_and_string_lanes_are_accepted() {
        let props: RoadProperties =
            serde_json::from_value(json!({ "id": 1042, "lanes": "3" })).unwrap();
        assert_eq!(props.id.as_deref(), Some("1042"));
        assert_eq!(props.lanes, Some(3));
    }

    #[test]
    fn missing_geometry_and_properties_are_tolerated() {
        let raw = json!({
            "type": "FeatureCollection",
            "features": [{ "type": "Feature", "properties": null }]
        })
        .to_string();
        let collection = FeatureCollection::from_str(&raw).unwrap();
        assert!(collection.features[0].geometry.is_none());
        assert!(collection.features[0].properties.id.is_none());
    }

    #[test]
    fn coverage_envelope_check() {
        assert!(within_coverage(&[121.5, 25.0]));
        assert!(!within_coverage(&[3.0, 25.0]));
        assert!(!within_coverage(&[121.5, 55.0]));
        assert!(!within_coverage(&[121.5]));
    }
}
