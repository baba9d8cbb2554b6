//! Rollback to a previously published version's dataset state.
//!
//! A version's own snapshot captures the dataset *before* it published,
//! so the state a version left behind lives in the snapshot of the
//! publish that superseded it. Rolling back to a version therefore
//! restores the currently published version's snapshot, then archives
//! that version and marks the target published again, all in one
//! transaction.

use serde::Serialize;

use roadgrid_core::error::CoreError;
use roadgrid_core::status::VersionStatus;
use roadgrid_core::types::{DbId, Timestamp};
use roadgrid_db::models::import_version::ImportVersion;
use roadgrid_db::repositories::{ImportVersionRepo, RoadAssetRepo};

use crate::error::ServiceResult;
use crate::snapshot;
use crate::ImportService;

/// Outcome of a rollback.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackResult {
    pub version_id: DbId,
    pub version_number: i64,
    pub restored_count: usize,
    /// The snapshot file that was restored: the one captured by the
    /// publish that superseded the target.
    pub snapshot_path: String,
    pub published_at: Option<Timestamp>,
}

impl ImportService {
    /// Restore the dataset to the state `version_id` published, and
    /// re-publish that version.
    ///
    /// Restores are full-row upserts keyed on `road_id`. Records created
    /// after the restored snapshot was taken are not touched: a publish
    /// into a disjoint scope survives a rollback of this one.
    pub async fn rollback_to_version(&self, version_id: DbId) -> ServiceResult<RollbackResult> {
        let target = self.get_version(version_id).await?;
        let current = ImportVersionRepo::find_published(&self.pool).await?;
        let snapshot_path = select_restore_snapshot(&target, current.as_ref())?;

        let path = std::path::Path::new(&snapshot_path);
        if !tokio::fs::try_exists(path).await? {
            return Err(CoreError::InvalidState(format!(
                "snapshot file to restore for version {version_id} is missing: {snapshot_path}"
            ))
            .into());
        }

        let records = snapshot::read_snapshot(path).await?;

        let mut tx = self.pool.begin().await?;
        for record in &records {
            RoadAssetRepo::restore_record(&mut tx, record).await?;
        }
        ImportVersionRepo::archive_published(&mut tx, version_id).await?;
        // Re-publish without touching published_by or the target's own
        // snapshot path.
        let republished = ImportVersionRepo::mark_published(&mut tx, version_id, None, None)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "import version",
                id: version_id,
            })?;
        tx.commit().await?;

        tracing::info!(
            version_id,
            version_number = republished.version_number,
            restored = records.len(),
            snapshot = %snapshot_path,
            "Rolled back to import version"
        );

        Ok(RollbackResult {
            version_id,
            version_number: republished.version_number,
            restored_count: records.len(),
            snapshot_path,
            published_at: republished.published_at,
        })
    }
}

/// Pick the snapshot file that reproduces the target's published state.
///
/// The target must be archived (it was published once and has since
/// been superseded), and something must currently be published to take
/// the restore snapshot from. The target's own snapshot is never the
/// answer: it predates the target's publish.
pub(crate) fn select_restore_snapshot(
    target: &ImportVersion,
    current: Option<&ImportVersion>,
) -> Result<String, CoreError> {
    if VersionStatus::parse(&target.status)? != VersionStatus::Archived {
        return Err(CoreError::InvalidState(format!(
            "only archived versions can be rolled back to; version {} is {}",
            target.id, target.status
        )));
    }
    let current = current.ok_or_else(|| {
        CoreError::InvalidState(
            "no version is currently published, so there is no snapshot to restore".into(),
        )
    })?;
    let path = current.snapshot_path.as_deref().ok_or_else(|| {
        CoreError::InvalidState(format!(
            "published version {} has no snapshot to restore from",
            current.id
        ))
    })?;
    Ok(path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn version(id: DbId, status: &str, snapshot_path: Option<&str>) -> ImportVersion {
        ImportVersion {
            id,
            version_number: id,
            status: status.into(),
            file_name: "roads.geojson".into(),
            file_type: "geojson".into(),
            file_path: "/data/imports/versions/1/canonical.geojson".into(),
            layer_name: None,
            source_crs: None,
            import_scope: "full".into(),
            default_data_source: "survey".into(),
            regional_refresh: false,
            file_size_mb: 1.0,
            feature_count: 5,
            uploaded_by: "ops".into(),
            uploaded_at: chrono::Utc::now(),
            published_by: Some("ops".into()),
            published_at: Some(chrono::Utc::now()),
            archived_at: None,
            snapshot_path: snapshot_path.map(String::from),
        }
    }

    #[test]
    fn restores_the_superseding_snapshot_not_the_targets_own() {
        let target = version(1, "archived", Some("/snapshots/pre-v1.geojson"));
        let current = version(2, "published", Some("/snapshots/pre-v2.geojson"));

        let path = select_restore_snapshot(&target, Some(&current)).unwrap();
        // Pre-v2 is the state v1 published; pre-v1 predates it.
        assert_eq!(path, "/snapshots/pre-v2.geojson");
    }

    #[test]
    fn never_published_target_is_rejected() {
        let target = version(1, "draft", None);
        let current = version(2, "published", Some("/snapshots/pre-v2.geojson"));
        assert_matches!(
            select_restore_snapshot(&target, Some(&current)),
            Err(CoreError::InvalidState(_))
        );
    }

    #[test]
    fn currently_published_target_is_rejected() {
        // A published version is already the live state; there is
        // nothing to roll back.
        let target = version(2, "published", Some("/snapshots/pre-v2.geojson"));
        let current = version(2, "published", Some("/snapshots/pre-v2.geojson"));
        assert_matches!(
            select_restore_snapshot(&target, Some(&current)),
            Err(CoreError::InvalidState(_))
        );
    }

    #[test]
    fn missing_published_version_is_rejected() {
        let target = version(1, "archived", Some("/snapshots/pre-v1.geojson"));
        assert_matches!(
            select_restore_snapshot(&target, None),
            Err(CoreError::InvalidState(_))
        );
    }

    #[test]
    fn published_version_without_snapshot_is_rejected() {
        let target = version(1, "archived", Some("/snapshots/pre-v1.geojson"));
        let current = version(2, "published", None);
        assert_matches!(
            select_restore_snapshot(&target, Some(&current)),
            Err(CoreError::InvalidState(_))
        );
    }
}
