//! Authoritative road asset model and write DTOs.
//!
//! The geometry column is PostGIS; queries read it as GeoJSON text via
//! `ST_AsGeoJSON` and write it via `ST_GeomFromGeoJSON`, so the model
//! carries geometry as an optional JSON string.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use roadgrid_core::types::{DbId, Timestamp};

/// A row from the `road_assets` table, geometry rendered as GeoJSON.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RoadAssetRecord {
    pub id: DbId,
    /// External feature id, unique across the table. The diff engine and
    /// the publisher key on this, not on the surrogate `id`.
    pub road_id: String,
    pub name: Option<String>,
    pub road_type: String,
    pub lanes: i64,
    pub direction: String,
    pub status: String,
    pub region: Option<String>,
    pub data_source: Option<String>,
    pub valid_from: Option<Timestamp>,
    pub valid_to: Option<Timestamp>,
    /// `ST_AsGeoJSON(geometry)` output; `None` only if the row was
    /// stored without a geometry.
    pub geometry: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a new active road asset during publish. All fields
/// are already defaulted by the publisher; geometry is GeoJSON text.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRoadAsset {
    pub road_id: String,
    pub name: Option<String>,
    pub road_type: String,
    pub lanes: i64,
    pub direction: String,
    pub region: Option<String>,
    pub data_source: Option<String>,
    pub geometry: Option<String>,
}

/// DTO for updating only the fields an import feature asserted.
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoadAssetPatch {
    pub name: Option<String>,
    pub road_type: Option<String>,
    pub lanes: Option<i64>,
    pub direction: Option<String>,
    pub region: Option<String>,
    pub data_source: Option<String>,
    pub geometry: Option<String>,
}

/// Full-row upsert payload used by rollback: the snapshot is ground
/// truth, so every field overwrites, including `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadAssetRestore {
    pub road_id: String,
    pub name: Option<String>,
    pub road_type: String,
    pub lanes: i64,
    pub direction: String,
    pub status: String,
    pub region: Option<String>,
    pub data_source: Option<String>,
    pub geometry: Option<String>,
}
