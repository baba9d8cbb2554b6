//! Rule checks for canonical road feature collections.
//!
//! One pass over the collection, producing structured errors and
//! warnings. Warnings never affect validity; `valid` is simply
//! "no errors".

use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;
use crate::roads::{within_coverage, FeatureCollection, VALID_ROAD_TYPES};

/// A single structured validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Zero-based index of the offending feature, absent for aggregate
    /// findings.
    pub feature_index: Option<usize>,
    /// The feature's `id` property, when it has one.
    pub feature_id: Option<String>,
    /// The property or member the finding is about.
    pub field: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    fn for_feature(index: usize, id: Option<&str>, field: &str, message: String) -> Self {
        Self {
            feature_index: Some(index),
            feature_id: id.map(String::from),
            field: Some(field.to_string()),
            message,
        }
    }
}

/// Outcome of validating one canonical feature collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub feature_count: usize,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    /// Distinct geometry type names encountered, in first-seen order.
    pub geometry_types: Vec<String>,
    pub missing_id_count: usize,
    pub missing_data_source_count: usize,
}

/// Validate a canonical feature collection against the road schema.
///
/// `default_data_source` is only reported in the aggregate warning for
/// features without a `dataSource`; the fallback itself is applied at
/// publish time.
pub fn validate_collection(
    collection: &FeatureCollection,
    default_data_source: &str,
) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut geometry_types: Vec<String> = Vec::new();
    let mut missing_id_count = 0;
    let mut missing_data_source_count = 0;
    let mut seen_ids = std::collections::HashSet::new();

    for (index, feature) in collection.features.iter().enumerate() {
        let id = feature.properties.id.as_deref();

        // Geometry checks. A feature with no geometry gets one error and
        // skips the remaining geometry rules.
        match feature.parsed_geometry() {
            None => {
                errors.push(ValidationIssue::for_feature(
                    index,
                    id,
                    "geometry",
                    "Feature has no geometry".into(),
                ));
            }
            Some(Err(e)) => {
                errors.push(ValidationIssue::for_feature(
                    index,
                    id,
                    "geometry",
                    e.to_string(),
                ));
            }
            Some(Ok(geometry)) => {
                let type_name = geometry.type_name().to_string();
                if !geometry_types.contains(&type_name) {
                    geometry_types.push(type_name);
                }
                if !geometry.is_line_based() {
                    errors.push(ValidationIssue::for_feature(
                        index,
                        id,
                        "geometry",
                        format!(
                            "Unsupported geometry type '{}': road features must be LineString or MultiLineString",
                            geometry.type_name()
                        ),
                    ));
                } else if let Geometry::LineString { coordinates } = &geometry {
                    // At most one envelope warning per feature.
                    for position in coordinates {
                        if !within_coverage(position) {
                            warnings.push(ValidationIssue::for_feature(
                                index,
                                id,
                                "geometry",
                                format!(
                                    "Coordinate [{}] outside the coverage envelope",
                                    position
                                        .iter()
                                        .map(f64::to_string)
                                        .collect::<Vec<_>>()
                                        .join(", ")
                                ),
                            ));
                            break;
                        }
                    }
                }
            }
        }

        // Id checks: the diff engine is id-keyed, so a missing id is a
        // hard error, and so is a duplicate within the same file.
        match id {
            None => {
                missing_id_count += 1;
                errors.push(ValidationIssue::for_feature(
                    index,
                    None,
                    "id",
                    "Feature has no id property".into(),
                ));
            }
            Some(feature_id) => {
                if !seen_ids.insert(feature_id.to_string()) {
                    errors.push(ValidationIssue::for_feature(
                        index,
                        Some(feature_id),
                        "id",
                        format!("Duplicate feature id '{feature_id}' in import file"),
                    ));
                }
            }
        }

        if let Some(road_type) = feature.properties.road_type.as_deref() {
            if !VALID_ROAD_TYPES.contains(&road_type) {
                errors.push(ValidationIssue::for_feature(
                    index,
                    id,
                    "roadType",
                    format!(
                        "Unknown roadType '{road_type}'; expected one of {VALID_ROAD_TYPES:?}"
                    ),
                ));
            }
        }

        if feature.properties.data_source.is_none() {
            missing_data_source_count += 1;
        }
    }

    // One aggregate warning for missing data sources, not one per feature.
    if missing_data_source_count > 0 {
        warnings.push(ValidationIssue {
            feature_index: None,
            feature_id: None,
            field: Some("dataSource".into()),
            message: format!(
                "{missing_data_source_count} feature(s) without dataSource will fall back to '{default_data_source}'"
            ),
        });
    }

    ValidationResult {
        valid: errors.is_empty(),
        feature_count: collection.features.len(),
        errors,
        warnings,
        geometry_types,
        missing_id_count,
        missing_data_source_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection(features: serde_json::Value) -> FeatureCollection {
        FeatureCollection::from_str(
            &json!({ "type": "FeatureCollection", "features": features }).to_string(),
        )
        .unwrap()
    }

    fn line_feature(id: &str) -> serde_json::Value {
        json!({
            "type": "Feature",
            "geometry": { "type": "LineString", "coordinates": [[121.5, 25.0], [121.6, 25.1]] },
            "properties": { "id": id, "dataSource": "survey-2026" }
        })
    }

    #[test]
    fn clean_collection_is_valid() {
        let result = validate_collection(
            &collection(json!([line_feature("A"), line_feature("B")])),
            "fallback",
        );
        assert!(result.valid);
        assert_eq!(result.feature_count, 2);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
        assert_eq!(result.geometry_types, vec!["LineString"]);
    }

    #[test]
    fn missing_id_is_one_error_and_counted() {
        let features = json!([{
            "type": "Feature",
            "geometry": { "type": "LineString", "coordinates": [[121.5, 25.0], [121.6, 25.1]] },
            "properties": { "dataSource": "survey-2026" }
        }]);
        let result = validate_collection(&collection(features), "fallback");
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field.as_deref(), Some("id"));
        assert_eq!(result.missing_id_count, 1);
    }

    #[test]
    fn duplicate_id_is_an_error() {
        let result = validate_collection(
            &collection(json!([line_feature("A"), line_feature("A")])),
            "fallback",
        );
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("Duplicate feature id 'A'"));
    }

    #[test]
    fn missing_geometry_skips_remaining_geometry_checks() {
        let features = json!([{
            "type": "Feature",
            "properties": { "id": "A", "dataSource": "s" }
        }]);
        let result = validate_collection(&collection(features), "fallback");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field.as_deref(), Some("geometry"));
        assert!(result.geometry_types.is_empty());
    }

    #[test]
    fn non_road_geometry_is_an_error() {
        let features = json!([{
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [121.5, 25.0] },
            "properties": { "id": "A", "dataSource": "s" }
        }]);
        let result = validate_collection(&collection(features), "fallback");
        assert!(!result.valid);
        assert!(result.errors[0].message.contains("Point"));
        assert_eq!(result.geometry_types, vec!["Point"]);
    }

    #[test]
    fn unknown_road_type_is_an_error() {
        let features = json!([{
            "type": "Feature",
            "geometry": { "type": "LineString", "coordinates": [[121.5, 25.0], [121.6, 25.1]] },
            "properties": { "id": "A", "roadType": "hyperlane", "dataSource": "s" }
        }]);
        let result = validate_collection(&collection(features), "fallback");
        assert!(!result.valid);
        assert_eq!(result.errors[0].field.as_deref(), Some("roadType"));
    }

    #[test]
    fn missing_data_source_is_one_aggregate_warning() {
        let features = json!([
            {
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": [[121.5, 25.0], [121.6, 25.1]] },
                "properties": { "id": "A" }
            },
            {
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": [[121.5, 25.0], [121.6, 25.1]] },
                "properties": { "id": "B" }
            }
        ]);
        let result = validate_collection(&collection(features), "survey-import");
        assert!(result.valid);
        assert_eq!(result.missing_data_source_count, 2);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("2 feature(s)"));
        assert!(result.warnings[0].message.contains("survey-import"));
    }

    #[test]
    fn out_of_envelope_coordinate_warns_at_most_once_per_feature() {
        let features = json!([{
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": [[10.0, 25.0], [11.0, 25.0], [121.5, 25.0]]
            },
            "properties": { "id": "A", "dataSource": "s" }
        }]);
        let result = validate_collection(&collection(features), "fallback");
        assert!(result.valid, "envelope findings are warnings, not errors");
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].feature_index, Some(0));
    }

    #[test]
    fn geometry_types_are_deduplicated_in_order() {
        let features = json!([
            line_feature("A"),
            {
                "type": "Feature",
                "geometry": { "type": "MultiLineString", "coordinates": [[[121.5, 25.0], [121.6, 25.1]]] },
                "properties": { "id": "B", "dataSource": "s" }
            },
            line_feature("C")
        ]);
        let result = validate_collection(&collection(features), "fallback");
        assert_eq!(result.geometry_types, vec!["LineString", "MultiLineString"]);
    }
}
