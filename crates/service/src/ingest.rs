//! Configuration and CRS normalization.
//!
//! Turns an uploaded file into canonical GeoJSON in EPSG:4326 via the
//! external converter, parses the scope selector exactly once, and
//! recounts features from the canonical file.

use serde::Deserialize;

use roadgrid_convert::{LayerInfo, CANONICAL_CRS};
use roadgrid_core::error::CoreError;
use roadgrid_core::roads::FeatureCollection;
use roadgrid_core::scope::ImportScope;
use roadgrid_core::status::{FileType, VersionStatus};
use roadgrid_core::types::DbId;
use roadgrid_db::models::import_version::{ConfigureImportVersion, ImportVersion};
use roadgrid_db::repositories::ImportVersionRepo;

use crate::error::ServiceResult;
use crate::ImportService;

/// Configuration for a draft version.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigureRequest {
    /// Layer to extract from a packaged-vector file; ignored for
    /// GeoJSON uploads.
    pub layer_name: Option<String>,
    /// Declared source CRS (e.g. `EPSG:3826`); when absent the
    /// converter trusts the file's own declaration.
    pub source_crs: Option<String>,
    /// Scope selector text: `full`, `region:<name>`, or
    /// `bbox:minX,minY,maxX,maxY`.
    pub import_scope: String,
    /// Fallback `dataSource` applied at publish time to features that
    /// carry none.
    pub default_data_source: String,
    /// Full-replacement semantics: records omitted from the import are
    /// deactivated at publish. Defaults to false (additive mode).
    pub regional_refresh: Option<bool>,
}

impl ImportService {
    /// Configure a draft version and normalize its file to canonical
    /// GeoJSON.
    ///
    /// A malformed scope selector is rejected here, at the boundary,
    /// rather than silently matching nothing later. Converter failures
    /// are hard errors and are not retried: the operator fixes the
    /// input and re-uploads.
    pub async fn configure(
        &self,
        version_id: DbId,
        request: &ConfigureRequest,
    ) -> ServiceResult<ImportVersion> {
        let version = self.get_version(version_id).await?;
        if VersionStatus::parse(&version.status)? != VersionStatus::Draft {
            return Err(CoreError::InvalidState(format!(
                "only draft versions can be configured; version {} is {}",
                version_id, version.status
            ))
            .into());
        }

        let scope = ImportScope::parse(&request.import_scope)?;

        let version = ImportVersionRepo::update_configuration(
            &self.pool,
            version_id,
            &ConfigureImportVersion {
                layer_name: request.layer_name.clone(),
                source_crs: request.source_crs.clone(),
                import_scope: scope.to_selector(),
                default_data_source: request.default_data_source.clone(),
                regional_refresh: request.regional_refresh.unwrap_or(false),
            },
        )
        .await?
        .ok_or(CoreError::NotFound {
            entity: "import version",
            id: version_id,
        })?;

        let canonical_path = self.normalize_to_canonical(&version).await?;

        // Recount features from the canonical file.
        let raw = tokio::fs::read_to_string(&canonical_path).await?;
        let collection = FeatureCollection::from_str(&raw)?;
        let feature_count = i32::try_from(collection.features.len()).unwrap_or(i32::MAX);

        let version = ImportVersionRepo::set_active_file(
            &self.pool,
            version_id,
            &canonical_path.to_string_lossy(),
            feature_count,
        )
        .await?
        .ok_or(CoreError::NotFound {
            entity: "import version",
            id: version_id,
        })?;

        tracing::info!(
            version_id,
            scope = %scope,
            feature_count,
            regional_refresh = version.regional_refresh,
            "Configured import version"
        );
        Ok(version)
    }

    /// List the layers of a version's packaged-vector upload.
    pub async fn list_layers(&self, version_id: DbId) -> ServiceResult<Vec<LayerInfo>> {
        let version = self.get_version(version_id).await?;
        if FileType::parse(&version.file_type)? != FileType::PackagedVector {
            return Err(CoreError::InvalidState(format!(
                "version {version_id} is a GeoJSON upload and has no layer index"
            ))
            .into());
        }
        // Always inspect the original upload; `file_path` points at the
        // canonical GeoJSON once the version has been configured.
        let source = self.storage().original_path(version.id, &version.file_name);
        let layers = self.converter.list_layers(&source).await?;
        Ok(layers)
    }

    /// Produce the canonical GeoJSON for a version, converting or
    /// reprojecting when needed. Returns the canonical file path.
    ///
    /// Conversion always starts from the original upload, so
    /// reconfiguring a version re-converts from scratch instead of
    /// running the converter over its own previous output.
    async fn normalize_to_canonical(
        &self,
        version: &ImportVersion,
    ) -> ServiceResult<std::path::PathBuf> {
        let source = self.storage().original_path(version.id, &version.file_name);
        let needs_conversion = match FileType::parse(&version.file_type)? {
            FileType::PackagedVector => true,
            // Canonical-CRS GeoJSON passes through untouched; a declared
            // non-canonical CRS forces a reprojection pass.
            FileType::GeoJson => version
                .source_crs
                .as_deref()
                .is_some_and(|crs| !crs.eq_ignore_ascii_case(CANONICAL_CRS)),
        };

        if !needs_conversion {
            return Ok(source);
        }

        let dest = self.storage().canonical_path(version.id);
        self.converter
            .convert_to_geojson(
                &source,
                &dest,
                version.layer_name.as_deref(),
                version.source_crs.as_deref(),
            )
            .await?;
        Ok(dest)
    }
}
