//! Point-in-time snapshots of the scoped dataset.
//!
//! A snapshot captures every active in-scope record — not merely the
//! diffed subset — as a GeoJSON FeatureCollection. It is written once,
//! fsynced before the publisher mutates anything, and is the sole
//! source of truth for rollback.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use roadgrid_db::models::road_asset::{RoadAssetRecord, RoadAssetRestore};

use crate::error::ServiceResult;
use crate::storage::ImportStorage;

/// One feature inside a snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotFeature {
    #[serde(rename = "type")]
    feature_type: String,
    geometry: Option<serde_json::Value>,
    properties: SnapshotProperties,
}

/// Road attributes captured for one snapshot feature. Property names
/// match the import schema so snapshots read like any other canonical
/// collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotProperties {
    id: String,
    name: Option<String>,
    #[serde(rename = "roadType")]
    road_type: String,
    lanes: i64,
    direction: String,
    status: String,
    region: Option<String>,
    #[serde(rename = "dataSource")]
    data_source: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotCollection {
    #[serde(rename = "type")]
    collection_type: String,
    features: Vec<SnapshotFeature>,
}

/// Serialize the scoped dataset to a fresh immutable snapshot file.
///
/// The file is flushed and fsynced before the path is returned; the
/// publisher must not mutate anything until this completes.
pub async fn write_snapshot(
    storage: &ImportStorage,
    records: &[RoadAssetRecord],
) -> ServiceResult<PathBuf> {
    let features = records
        .iter()
        .map(|record| SnapshotFeature {
            feature_type: "Feature".into(),
            geometry: record
                .geometry
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok()),
            properties: SnapshotProperties {
                id: record.road_id.clone(),
                name: record.name.clone(),
                road_type: record.road_type.clone(),
                lanes: record.lanes,
                direction: record.direction.clone(),
                status: record.status.clone(),
                region: record.region.clone(),
                data_source: record.data_source.clone(),
            },
        })
        .collect();
    let collection = SnapshotCollection {
        collection_type: "FeatureCollection".into(),
        features,
    };

    let path = storage.allocate_snapshot_path().await?;
    let mut file = tokio::fs::File::create(&path).await?;
    file.write_all(&serde_json::to_vec(&collection)?).await?;
    file.sync_all().await?;

    tracing::info!(path = %path.display(), records = records.len(), "Wrote snapshot");
    Ok(path)
}

/// Read a snapshot file back into full-overwrite restore payloads.
pub async fn read_snapshot(path: &Path) -> ServiceResult<Vec<RoadAssetRestore>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let collection: SnapshotCollection = serde_json::from_str(&raw)?;
    Ok(collection
        .features
        .into_iter()
        .map(|feature| RoadAssetRestore {
            road_id: feature.properties.id,
            name: feature.properties.name,
            road_type: feature.properties.road_type,
            lanes: feature.properties.lanes,
            direction: feature.properties.direction,
            status: feature.properties.status,
            region: feature.properties.region,
            data_source: feature.properties.data_source,
            geometry: feature.geometry.map(|g| g.to_string()),
        })
        .collect())
}
