//! Draft creation and version CRUD.

use roadgrid_core::error::CoreError;
use roadgrid_core::status::{FileType, VersionStatus};
use roadgrid_core::types::DbId;
use roadgrid_db::models::import_version::{CreateImportVersion, ImportVersion};
use roadgrid_db::repositories::ImportVersionRepo;

use crate::error::ServiceResult;
use crate::ImportService;

impl ImportService {
    /// Create a draft version from an uploaded file.
    ///
    /// Allocates the next version number, stores the original bytes in
    /// the version's exclusive directory, and persists a draft row with
    /// a zero feature count (counted later, once the file is canonical).
    pub async fn create_draft(
        &self,
        file_bytes: &[u8],
        file_name: &str,
        uploaded_by: &str,
    ) -> ServiceResult<ImportVersion> {
        let file_type = FileType::from_file_name(file_name);
        #[allow(clippy::cast_precision_loss)]
        let file_size_mb = file_bytes.len() as f64 / (1024.0 * 1024.0);

        // The row is created first so its id names the storage
        // directory; the upload lands there immediately after.
        let version = ImportVersionRepo::create(
            &self.pool,
            &CreateImportVersion {
                file_name: file_name.to_string(),
                file_type: file_type.as_str().to_string(),
                file_path: String::new(),
                file_size_mb,
                uploaded_by: uploaded_by.to_string(),
            },
        )
        .await?;

        let stored = self
            .storage()
            .write_original(version.id, file_name, file_bytes)
            .await?;
        let version = ImportVersionRepo::set_active_file(
            &self.pool,
            version.id,
            &stored.to_string_lossy(),
            0,
        )
        .await?
        .ok_or(CoreError::NotFound {
            entity: "import version",
            id: version.id,
        })?;

        tracing::info!(
            version_id = version.id,
            version_number = version.version_number,
            file_name,
            file_type = %file_type,
            "Created draft import version"
        );
        Ok(version)
    }

    /// List all versions, newest first.
    pub async fn list_versions(&self) -> ServiceResult<Vec<ImportVersion>> {
        Ok(ImportVersionRepo::list(&self.pool).await?)
    }

    /// Fetch one version.
    pub async fn get_version(&self, version_id: DbId) -> ServiceResult<ImportVersion> {
        ImportVersionRepo::find_by_id(&self.pool, version_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "import version",
                    id: version_id,
                }
                .into()
            })
    }

    /// Delete a draft version and its files. Published and archived
    /// versions are part of the audit trail and cannot be deleted.
    pub async fn delete_version(&self, version_id: DbId) -> ServiceResult<()> {
        let version = self.get_version(version_id).await?;
        if VersionStatus::parse(&version.status)? != VersionStatus::Draft {
            return Err(CoreError::InvalidState(format!(
                "only draft versions can be deleted; version {} is {}",
                version_id, version.status
            ))
            .into());
        }

        self.storage().remove_version_dir(version_id).await?;
        ImportVersionRepo::delete(&self.pool, version_id).await?;
        tracing::info!(version_id, "Deleted draft import version");
        Ok(())
    }
}
