//! Atomic publish of a configured draft version.
//!
//! Ordering invariant: the snapshot of the scoped dataset is written
//! and fsynced before any row is mutated. All writes — inserts,
//! asserted-field updates, regional-refresh deactivations, archiving
//! the previous published version, and the status flip — happen in one
//! transaction, so a failure at any point leaves the dataset untouched
//! and the version still draft.
//!
//! The write plan is keyed on presence, not on the diff: every import
//! feature whose id exists in the scope gets its asserted fields
//! re-applied, geometry refreshed when supplied, and `updated_at`
//! bumped, even when the diff classified it unchanged or its comparison
//! degraded. Sub-tolerance geometry refinements land; a record whose
//! stored geometry no longer parses is still repaired by the next
//! import that carries a valid one. The diff is reporting only.

use std::collections::HashSet;

use serde::Serialize;

use roadgrid_core::compare::{diff_features, CurrentRoad};
use roadgrid_core::error::CoreError;
use roadgrid_core::roads::{RoadFeature, DEFAULT_DIRECTION, DEFAULT_LANES, DEFAULT_ROAD_TYPE};
use roadgrid_core::scope::ImportScope;
use roadgrid_core::status::VersionStatus;
use roadgrid_core::types::{DbId, Timestamp};
use roadgrid_db::models::road_asset::{NewRoadAsset, RoadAssetPatch};
use roadgrid_db::repositories::{ImportVersionRepo, RoadAssetRepo};

use crate::error::ServiceResult;
use crate::snapshot;
use crate::ImportService;

/// Outcome of a publish: the applied write counts and the snapshot that
/// can undo them.
#[derive(Debug, Clone, Serialize)]
pub struct PublishResult {
    pub version_id: DbId,
    pub version_number: i64,
    pub added_count: usize,
    pub updated_count: usize,
    pub deactivated_count: u64,
    pub unchanged_count: usize,
    pub degraded_count: usize,
    pub snapshot_path: String,
    pub published_at: Option<Timestamp>,
}

/// One planned row write for a publish.
#[derive(Debug, Clone)]
enum AssetWrite {
    Insert(NewRoadAsset),
    Update {
        road_id: String,
        patch: RoadAssetPatch,
    },
}

impl ImportService {
    /// Publish a draft version into the authoritative dataset.
    pub async fn publish_version(
        &self,
        version_id: DbId,
        published_by: Option<&str>,
    ) -> ServiceResult<PublishResult> {
        let version = self.get_version(version_id).await?;
        if VersionStatus::parse(&version.status)? != VersionStatus::Draft {
            return Err(CoreError::InvalidState(format!(
                "only draft versions can be published; version {} is {}",
                version_id, version.status
            ))
            .into());
        }
        let scope = ImportScope::parse(&version.import_scope)?;

        let collection = self.load_collection(&version.file_path).await?;

        // One scoped read serves the snapshot, the write plan, and the
        // diff, so they cannot disagree about the pre-publish state.
        let records = RoadAssetRepo::list_active_in_scope(&self.pool, &scope).await?;
        let snapshot_path = snapshot::write_snapshot(self.storage(), &records).await?;

        let current: Vec<CurrentRoad> = records
            .iter()
            .map(|record| CurrentRoad {
                road_id: record.road_id.clone(),
                name: record.name.clone(),
                road_type: Some(record.road_type.clone()),
                lanes: Some(record.lanes),
                direction: Some(record.direction.clone()),
                region: record.region.clone(),
                geometry: record
                    .geometry
                    .as_deref()
                    .and_then(|raw| serde_json::from_str(raw).ok()),
            })
            .collect();

        let outcome = diff_features(&collection.features, &current, version.regional_refresh);

        let current_ids: HashSet<&str> = records.iter().map(|r| r.road_id.as_str()).collect();
        let writes = plan_writes(&collection.features, &current_ids, &version.default_data_source);

        let mut tx = self.pool.begin().await?;

        for write in &writes {
            match write {
                AssetWrite::Insert(input) => RoadAssetRepo::insert_active(&mut tx, input).await?,
                AssetWrite::Update { road_id, patch } => {
                    RoadAssetRepo::update_asserted(&mut tx, road_id, patch).await?;
                }
            }
        }

        let deactivated_count = if version.regional_refresh {
            let present_ids: Vec<String> = collection
                .features
                .iter()
                .filter_map(|f| f.properties.id.clone())
                .collect();
            RoadAssetRepo::deactivate_absent_in_scope(&mut tx, &scope, &present_ids).await?
        } else {
            0
        };

        ImportVersionRepo::archive_published(&mut tx, version_id).await?;
        let published = ImportVersionRepo::mark_published(
            &mut tx,
            version_id,
            published_by,
            Some(&snapshot_path.to_string_lossy()),
        )
        .await?
        .ok_or(CoreError::NotFound {
            entity: "import version",
            id: version_id,
        })?;

        tx.commit().await?;

        tracing::info!(
            version_id,
            version_number = published.version_number,
            writes = writes.len(),
            added = outcome.added.len(),
            updated = outcome.updated.len(),
            deactivated = deactivated_count,
            degraded = outcome.degraded_count,
            snapshot = %snapshot_path.display(),
            "Published import version"
        );

        Ok(PublishResult {
            version_id,
            version_number: published.version_number,
            added_count: outcome.added.len(),
            updated_count: outcome.updated.len(),
            deactivated_count,
            unchanged_count: outcome.unchanged_count,
            degraded_count: outcome.degraded_count,
            snapshot_path: snapshot_path.to_string_lossy().into_owned(),
            published_at: published.published_at,
        })
    }
}

/// Build the row writes for a publish: insert for unseen ids, an
/// asserted-field update for every seen id. Features without an id are
/// skipped (validation already flags them).
fn plan_writes(
    features: &[RoadFeature],
    current_ids: &HashSet<&str>,
    default_data_source: &str,
) -> Vec<AssetWrite> {
    features
        .iter()
        .filter_map(|feature| {
            let id = feature.properties.id.as_deref()?;
            Some(if current_ids.contains(id) {
                AssetWrite::Update {
                    road_id: id.to_string(),
                    patch: asserted_patch(feature),
                }
            } else {
                AssetWrite::Insert(new_asset(id, feature, default_data_source))
            })
        })
        .collect()
}

/// Build the insert payload for an unseen feature, applying the
/// attribute defaults and the version's fallback data source.
fn new_asset(id: &str, feature: &RoadFeature, default_data_source: &str) -> NewRoadAsset {
    let props = &feature.properties;
    NewRoadAsset {
        road_id: id.to_string(),
        name: props.name.clone(),
        road_type: props
            .road_type
            .clone()
            .unwrap_or_else(|| DEFAULT_ROAD_TYPE.to_string()),
        lanes: props.lanes.unwrap_or(DEFAULT_LANES),
        direction: props
            .direction
            .clone()
            .unwrap_or_else(|| DEFAULT_DIRECTION.to_string()),
        region: props.region.clone(),
        data_source: Some(
            props
                .data_source
                .clone()
                .unwrap_or_else(|| default_data_source.to_string()),
        ),
        geometry: feature.geometry.as_ref().map(|g| g.to_string()),
    }
}

/// Build the update payload for a seen feature. Only asserted
/// properties are carried; the fallback data source is not applied to
/// updates, so an existing record never has its source overwritten by a
/// default.
fn asserted_patch(feature: &RoadFeature) -> RoadAssetPatch {
    let props = &feature.properties;
    RoadAssetPatch {
        name: props.name.clone(),
        road_type: props.road_type.clone(),
        lanes: props.lanes,
        direction: props.direction.clone(),
        region: props.region.clone(),
        data_source: props.data_source.clone(),
        geometry: feature.geometry.as_ref().map(|g| g.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn road_feature(value: serde_json::Value) -> RoadFeature {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn added_feature_gets_defaults_and_fallback_source() {
        let feature = road_feature(json!({
            "type": "Feature",
            "geometry": { "type": "LineString", "coordinates": [[121.5, 25.0], [121.6, 25.1]] },
            "properties": { "id": "R-1", "name": "Main St" }
        }));

        let asset = new_asset("R-1", &feature, "survey-2026");
        assert_eq!(asset.road_id, "R-1");
        assert_eq!(asset.road_type, DEFAULT_ROAD_TYPE);
        assert_eq!(asset.lanes, DEFAULT_LANES);
        assert_eq!(asset.direction, DEFAULT_DIRECTION);
        assert_eq!(asset.data_source.as_deref(), Some("survey-2026"));
        assert!(asset.geometry.as_deref().unwrap().contains("LineString"));
    }

    #[test]
    fn added_feature_keeps_its_own_attributes() {
        let feature = road_feature(json!({
            "type": "Feature",
            "geometry": null,
            "properties": {
                "id": "R-2",
                "roadType": "arterial",
                "lanes": 6,
                "direction": "oneway",
                "dataSource": "lidar"
            }
        }));

        let asset = new_asset("R-2", &feature, "survey-2026");
        assert_eq!(asset.road_type, "arterial");
        assert_eq!(asset.lanes, 6);
        assert_eq!(asset.direction, "oneway");
        assert_eq!(asset.data_source.as_deref(), Some("lidar"));
        assert!(asset.geometry.is_none());
    }

    #[test]
    fn patch_carries_only_asserted_fields() {
        let feature = road_feature(json!({
            "type": "Feature",
            "geometry": null,
            "properties": { "id": "R-3", "lanes": 4 }
        }));

        let patch = asserted_patch(&feature);
        assert_eq!(patch.lanes, Some(4));
        assert!(patch.name.is_none());
        assert!(patch.road_type.is_none());
        // The fallback data source never reaches updates.
        assert!(patch.data_source.is_none());
        assert!(patch.geometry.is_none());
    }

    #[test]
    fn plan_splits_on_presence_in_scope() {
        let features = vec![
            road_feature(json!({
                "type": "Feature",
                "geometry": null,
                "properties": { "id": "seen" }
            })),
            road_feature(json!({
                "type": "Feature",
                "geometry": null,
                "properties": { "id": "unseen" }
            })),
            road_feature(json!({
                "type": "Feature",
                "geometry": null,
                "properties": {}
            })),
        ];
        let current_ids: HashSet<&str> = ["seen"].into_iter().collect();

        let writes = plan_writes(&features, &current_ids, "survey");
        assert_eq!(writes.len(), 2);
        assert!(matches!(&writes[0], AssetWrite::Update { road_id, .. } if road_id == "seen"));
        assert!(matches!(&writes[1], AssetWrite::Insert(input) if input.road_id == "unseen"));
    }

    #[test]
    fn seen_feature_is_written_even_when_scalars_are_identical() {
        // The diff would classify this unchanged; the write plan still
        // re-applies it so updated_at refreshes and sub-tolerance
        // geometry refinements land.
        let features = vec![road_feature(json!({
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": [[121.500001, 25.000001], [121.600001, 25.100001]]
            },
            "properties": { "id": "R-1", "name": "Main St" }
        }))];
        let current_ids: HashSet<&str> = ["R-1"].into_iter().collect();

        let writes = plan_writes(&features, &current_ids, "survey");
        assert_eq!(writes.len(), 1);
        assert!(matches!(
            &writes[0],
            AssetWrite::Update { patch, .. }
                if patch.geometry.as_deref().unwrap().contains("121.500001")
        ));
    }

    #[test]
    fn valid_replacement_geometry_is_planned_for_a_seen_id() {
        // A stored geometry the comparison cannot parse degrades the
        // diff for this id; the write plan does not compare at all, so
        // the import's valid geometry still lands in the patch.
        let features = vec![road_feature(json!({
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": [[121.5, 25.0], [121.6, 25.1]]
            },
            "properties": { "id": "R-9", "name": "Main St" }
        }))];
        let current_ids: HashSet<&str> = ["R-9"].into_iter().collect();

        let writes = plan_writes(&features, &current_ids, "survey");
        assert_eq!(writes.len(), 1);
        assert!(matches!(
            &writes[0],
            AssetWrite::Update { road_id, patch }
                if road_id == "R-9" && patch.geometry.as_deref().unwrap().contains("LineString")
        ));
    }
}
