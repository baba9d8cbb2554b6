//! Import version entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use roadgrid_core::types::{DbId, Timestamp};

/// A row from the `import_versions` table.
///
/// `status` and `file_type` are stored as their canonical strings; the
/// typed enums in `roadgrid_core::status` parse them at the service
/// boundary.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImportVersion {
    pub id: DbId,
    /// Strictly increasing across the whole table, allocated from a
    /// dedicated sequence so deleted drafts never free a number.
    pub version_number: i64,
    pub status: String,
    pub file_name: String,
    pub file_type: String,
    /// Path of the file the pipeline currently operates on: the original
    /// upload until configuration, the canonical GeoJSON afterwards.
    pub file_path: String,
    pub layer_name: Option<String>,
    pub source_crs: Option<String>,
    /// Canonical scope selector text (`full`, `region:<name>`, `bbox:...`).
    pub import_scope: String,
    pub default_data_source: String,
    pub regional_refresh: bool,
    pub file_size_mb: f64,
    pub feature_count: i32,
    pub uploaded_by: String,
    pub uploaded_at: Timestamp,
    pub published_by: Option<String>,
    pub published_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
    pub snapshot_path: Option<String>,
}

/// DTO for inserting a new draft version.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateImportVersion {
    pub file_name: String,
    pub file_type: String,
    pub file_path: String,
    pub file_size_mb: f64,
    pub uploaded_by: String,
}

/// DTO for the configuration step. `import_scope` carries the canonical
/// selector text of an already-parsed scope.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigureImportVersion {
    pub layer_name: Option<String>,
    pub source_crs: Option<String>,
    pub import_scope: String,
    pub default_data_source: String,
    pub regional_refresh: bool,
}
