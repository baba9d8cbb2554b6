//! Change classification between an import file and the scoped current
//! dataset.
//!
//! Strictly read-only: the publisher re-derives its own write plan from
//! the same predicate. Scalar fields are compared only when the import
//! feature asserts them; an absent property never means "cleared".
//! A per-feature comparison failure is absorbed -- the feature counts
//! as unchanged and the outcome's `degraded_count` records that the
//! comparison was lossy, so an interactive preview stays available.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geometry::{tolerant_eq, Geometry};
use crate::roads::{RoadFeature, RoadProperties};

/// Comparison view of one current in-scope record: the scalar fields
/// the change predicate reads, plus the geometry as GeoJSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentRoad {
    pub road_id: String,
    pub name: Option<String>,
    pub road_type: Option<String>,
    pub lanes: Option<i64>,
    pub direction: Option<String>,
    pub region: Option<String>,
    pub geometry: Option<serde_json::Value>,
}

/// An import feature materialized in the added/updated lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffFeature {
    pub id: String,
    pub properties: RoadProperties,
    pub geometry: Option<serde_json::Value>,
}

/// A current record that would be deactivated by a regional refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeactivationCandidate {
    pub road_id: String,
    pub name: Option<String>,
    pub region: Option<String>,
}

/// Summary counters for a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub scope_current_count: usize,
    pub import_count: usize,
    pub added_count: usize,
    pub updated_count: usize,
    pub deactivated_count: usize,
}

/// Classification of every import feature against the scoped dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffOutcome {
    pub added: Vec<DiffFeature>,
    pub updated: Vec<DiffFeature>,
    /// Materialized only under regional refresh; empty otherwise.
    pub deactivated: Vec<DeactivationCandidate>,
    /// Unchanged features are counted, not materialized, to bound the
    /// preview payload.
    pub unchanged_count: usize,
    /// Features whose comparison failed and were conservatively counted
    /// as unchanged.
    pub degraded_count: usize,
    pub stats: DiffStats,
}

/// Classify `import` against `current`.
///
/// Import features without an id are skipped (validation already flags
/// them). Deactivation candidates are computed regardless of
/// `regional_refresh` but only materialized and counted when it is set:
/// the default mode is additive and never implies deletion by omission.
pub fn diff_features(
    import: &[RoadFeature],
    current: &[CurrentRoad],
    regional_refresh: bool,
) -> DiffOutcome {
    let lookup: HashMap<&str, &CurrentRoad> = current
        .iter()
        .map(|record| (record.road_id.as_str(), record))
        .collect();

    let import_ids: HashSet<&str> = import
        .iter()
        .filter_map(|f| f.properties.id.as_deref())
        .collect();

    let mut added = Vec::new();
    let mut updated = Vec::new();
    let mut unchanged_count = 0;
    let mut degraded_count = 0;

    for feature in import {
        let Some(id) = feature.properties.id.as_deref() else {
            continue;
        };
        match lookup.get(id) {
            None => added.push(materialize(id, feature)),
            Some(record) => match has_changes(feature, record) {
                Ok(true) => updated.push(materialize(id, feature)),
                Ok(false) => unchanged_count += 1,
                Err(e) => {
                    tracing::warn!(road_id = id, error = %e, "Feature comparison degraded");
                    unchanged_count += 1;
                    degraded_count += 1;
                }
            },
        }
    }

    let candidates: Vec<DeactivationCandidate> = current
        .iter()
        .filter(|record| !import_ids.contains(record.road_id.as_str()))
        .map(|record| DeactivationCandidate {
            road_id: record.road_id.clone(),
            name: record.name.clone(),
            region: record.region.clone(),
        })
        .collect();
    let deactivated = if regional_refresh { candidates } else { Vec::new() };

    let stats = DiffStats {
        scope_current_count: current.len(),
        import_count: import.len(),
        added_count: added.len(),
        updated_count: updated.len(),
        deactivated_count: deactivated.len(),
    };

    DiffOutcome {
        added,
        updated,
        deactivated,
        unchanged_count,
        degraded_count,
        stats,
    }
}

/// The change predicate: any asserted scalar mismatch or geometry
/// difference means the feature updates its current record.
pub fn has_changes(feature: &RoadFeature, current: &CurrentRoad) -> Result<bool, CoreError> {
    let props = &feature.properties;

    if asserted_differs(&props.name, &current.name)
        || asserted_differs(&props.road_type, &current.road_type)
        || asserted_differs(&props.region, &current.region)
        || asserted_differs(&props.lanes, &current.lanes)
        || asserted_differs(&props.direction, &current.direction)
    {
        return Ok(true);
    }

    if let (Some(import_geom), Some(current_geom)) = (&feature.geometry, &current.geometry) {
        let import_geom = Geometry::from_value(import_geom)?;
        let current_geom = Geometry::from_value(current_geom)?;
        if !tolerant_eq(&import_geom, &current_geom) {
            return Ok(true);
        }
    }

    Ok(false)
}

/// An asserted (Some) import value differing from the current value.
fn asserted_differs<T: PartialEq>(imported: &Option<T>, current: &Option<T>) -> bool {
    match imported {
        Some(value) => current.as_ref() != Some(value),
        None => false,
    }
}

fn materialize(id: &str, feature: &RoadFeature) -> DiffFeature {
    DiffFeature {
        id: id.to_string(),
        properties: feature.properties.clone(),
        geometry: feature.geometry.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn import_feature(id: &str, name: Option<&str>, coords: &[[f64; 2]]) -> RoadFeature {
        let mut properties = json!({ "id": id });
        if let Some(name) = name {
            properties["name"] = json!(name);
        }
        serde_json::from_value(json!({
            "type": "Feature",
            "geometry": { "type": "LineString", "coordinates": coords },
            "properties": properties
        }))
        .unwrap()
    }

    fn current_road(id: &str, name: Option<&str>, coords: &[[f64; 2]]) -> CurrentRoad {
        CurrentRoad {
            road_id: id.to_string(),
            name: name.map(String::from),
            road_type: Some("local".into()),
            lanes: Some(2),
            direction: Some("both".into()),
            region: None,
            geometry: Some(json!({ "type": "LineString", "coordinates": coords })),
        }
    }

    const COORDS: &[[f64; 2]] = &[[121.5, 25.0], [121.6, 25.1]];

    #[test]
    fn classifies_added_updated_and_deactivated() {
        // Scope {A(name=x), B(name=y)}, import {A(name=x'), C(name=z)}.
        let current = vec![
            current_road("A", Some("x"), COORDS),
            current_road("B", Some("y"), COORDS),
        ];
        let import = vec![
            import_feature("A", Some("x-prime"), COORDS),
            import_feature("C", Some("z"), COORDS),
        ];

        let outcome = diff_features(&import, &current, true);
        assert_eq!(outcome.updated.len(), 1);
        assert_eq!(outcome.updated[0].id, "A");
        assert_eq!(outcome.added.len(), 1);
        assert_eq!(outcome.added[0].id, "C");
        assert_eq!(outcome.unchanged_count, 0);
        assert_eq!(outcome.deactivated.len(), 1);
        assert_eq!(outcome.deactivated[0].road_id, "B");
        assert_eq!(
            outcome.stats,
            DiffStats {
                scope_current_count: 2,
                import_count: 2,
                added_count: 1,
                updated_count: 1,
                deactivated_count: 1,
            }
        );
    }

    #[test]
    fn additive_mode_never_deactivates() {
        let current = vec![
            current_road("A", Some("x"), COORDS),
            current_road("B", Some("y"), COORDS),
        ];
        let import = vec![import_feature("A", Some("x"), COORDS)];

        let outcome = diff_features(&import, &current, false);
        assert!(outcome.deactivated.is_empty());
        assert_eq!(outcome.stats.deactivated_count, 0);
        assert_eq!(outcome.unchanged_count, 1);
    }

    #[test]
    fn exact_match_import_is_all_unchanged() {
        let current: Vec<CurrentRoad> = (0..4)
            .map(|i| current_road(&format!("R{i}"), Some("Main"), COORDS))
            .collect();
        let import: Vec<RoadFeature> = (0..4)
            .map(|i| import_feature(&format!("R{i}"), Some("Main"), COORDS))
            .collect();

        let outcome = diff_features(&import, &current, false);
        assert!(outcome.added.is_empty());
        assert!(outcome.updated.is_empty());
        assert!(outcome.deactivated.is_empty());
        assert_eq!(outcome.unchanged_count, 4);
        assert_eq!(outcome.degraded_count, 0);
    }

    #[test]
    fn absent_property_is_not_asserted() {
        // Import carries no name; current has one. Not a change.
        let current = vec![current_road("A", Some("Existing"), COORDS)];
        let import = vec![import_feature("A", None, COORDS)];

        let outcome = diff_features(&import, &current, false);
        assert_eq!(outcome.unchanged_count, 1);
        assert!(outcome.updated.is_empty());
    }

    #[test]
    fn geometry_within_tolerance_is_unchanged() {
        let current = vec![current_road("A", Some("x"), COORDS)];
        let shifted: &[[f64; 2]] = &[[121.500001, 25.000001], [121.600001, 25.100001]];
        let import = vec![import_feature("A", Some("x"), shifted)];

        let outcome = diff_features(&import, &current, false);
        assert_eq!(outcome.unchanged_count, 1);
    }

    #[test]
    fn geometry_over_tolerance_is_updated() {
        let current = vec![current_road("A", Some("x"), COORDS)];
        let moved: &[[f64; 2]] = &[[121.5001, 25.0], [121.6, 25.1]];
        let import = vec![import_feature("A", Some("x"), moved)];

        let outcome = diff_features(&import, &current, false);
        assert_eq!(outcome.updated.len(), 1);
    }

    #[test]
    fn stored_linestring_matches_imported_multilinestring() {
        let current = vec![current_road("A", None, &[[0.0, 0.0], [1.0, 1.0]])];
        let feature: RoadFeature = serde_json::from_value(json!({
            "type": "Feature",
            "geometry": {
                "type": "MultiLineString",
                "coordinates": [[[0.0, 0.0], [1.0, 1.0]]]
            },
            "properties": { "id": "A" }
        }))
        .unwrap();

        let outcome = diff_features(&[feature], &current, false);
        assert_eq!(outcome.unchanged_count, 1);
        assert!(outcome.updated.is_empty());
    }

    #[test]
    fn comparison_failure_is_counted_unchanged_and_degraded() {
        let mut record = current_road("A", Some("x"), COORDS);
        record.geometry = Some(json!({ "type": "LineString", "coordinates": "garbage" }));
        let import = vec![import_feature("A", Some("x"), COORDS)];

        let outcome = diff_features(&import, &[record], false);
        assert!(outcome.updated.is_empty());
        assert_eq!(outcome.unchanged_count, 1);
        assert_eq!(outcome.degraded_count, 1);
    }

    #[test]
    fn features_without_id_are_skipped() {
        let feature: RoadFeature = serde_json::from_value(json!({
            "type": "Feature",
            "geometry": { "type": "LineString", "coordinates": COORDS },
            "properties": {}
        }))
        .unwrap();

        let outcome = diff_features(&[feature], &[], false);
        assert!(outcome.added.is_empty());
        assert_eq!(outcome.stats.import_count, 1);
    }

    #[test]
    fn missing_geometry_on_either_side_skips_geometry_comparison() {
        let mut record = current_road("A", Some("x"), COORDS);
        record.geometry = None;
        let import = vec![import_feature("A", Some("x"), COORDS)];

        let outcome = diff_features(&import, &[record], false);
        assert_eq!(outcome.unchanged_count, 1);
    }
}
