//! Validation runs and their on-disk cache.

use roadgrid_core::types::DbId;
use roadgrid_core::validation::{validate_collection, ValidationResult};

use crate::error::ServiceResult;
use crate::ImportService;

impl ImportService {
    /// Validate a version's canonical feature collection.
    ///
    /// The result is returned as data — a failed validation is not an
    /// error — and cached in the version's directory for later reads.
    /// The service does not gate publishing on this result; enforcing
    /// validate-before-publish is the caller's policy.
    pub async fn validate_version(&self, version_id: DbId) -> ServiceResult<ValidationResult> {
        let version = self.get_version(version_id).await?;
        let collection = self.load_collection(&version.file_path).await?;
        let result = validate_collection(&collection, &version.default_data_source);

        let cache_path = self.storage().validation_path(version_id);
        if let Some(parent) = cache_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&cache_path, serde_json::to_vec_pretty(&result)?).await?;

        tracing::info!(
            version_id,
            valid = result.valid,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "Validated import version"
        );
        Ok(result)
    }

    /// Read the cached validation result, if one exists.
    pub async fn load_cached_validation(
        &self,
        version_id: DbId,
    ) -> ServiceResult<Option<ValidationResult>> {
        let path = self.storage().validation_path(version_id);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read and parse a canonical feature collection from disk.
    pub(crate) async fn load_collection(
        &self,
        file_path: &str,
    ) -> ServiceResult<roadgrid_core::roads::FeatureCollection> {
        let raw = tokio::fs::read_to_string(file_path).await?;
        Ok(roadgrid_core::roads::FeatureCollection::from_str(&raw)?)
    }
}
