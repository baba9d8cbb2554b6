//! Read-only diff preview between an import version and the scoped
//! current dataset.

use serde::Serialize;

use roadgrid_core::compare::{diff_features, DiffOutcome};
use roadgrid_core::scope::ImportScope;
use roadgrid_core::types::DbId;
use roadgrid_db::repositories::RoadAssetRepo;

use crate::error::ServiceResult;
use crate::ImportService;

/// A diff preview: classification outcome plus the scope it ran under.
#[derive(Debug, Clone, Serialize)]
pub struct DiffResult {
    /// Canonical selector text the diff was scoped to.
    pub scope: String,
    pub regional_refresh: bool,
    #[serde(flatten)]
    pub outcome: DiffOutcome,
}

impl ImportService {
    /// Classify every import feature against the current scoped
    /// dataset. Strictly read-only: nothing is written, and the preview
    /// is not isolated from concurrent publishes.
    pub async fn generate_diff(&self, version_id: DbId) -> ServiceResult<DiffResult> {
        let version = self.get_version(version_id).await?;
        let scope = ImportScope::parse(&version.import_scope)?;

        let collection = self.load_collection(&version.file_path).await?;
        let current = RoadAssetRepo::current_roads_in_scope(&self.pool, &scope).await?;

        let outcome = diff_features(&collection.features, &current, version.regional_refresh);
        if outcome.degraded_count > 0 {
            tracing::warn!(
                version_id,
                degraded = outcome.degraded_count,
                "Diff preview degraded for some features"
            );
        }
        tracing::info!(
            version_id,
            scope = %scope,
            added = outcome.stats.added_count,
            updated = outcome.stats.updated_count,
            deactivated = outcome.stats.deactivated_count,
            unchanged = outcome.unchanged_count,
            "Generated diff preview"
        );

        Ok(DiffResult {
            scope: scope.to_selector(),
            regional_refresh: version.regional_refresh,
            outcome,
        })
    }
}
