//! Repository for the `import_versions` table.

use sqlx::PgPool;

use roadgrid_core::types::DbId;

use crate::models::import_version::{ConfigureImportVersion, CreateImportVersion, ImportVersion};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, version_number, status, file_name, file_type, file_path, \
    layer_name, source_crs, import_scope, default_data_source, regional_refresh, \
    file_size_mb, feature_count, uploaded_by, uploaded_at, published_by, published_at, \
    archived_at, snapshot_path";

/// Provides CRUD and lifecycle operations for import versions.
pub struct ImportVersionRepo;

impl ImportVersionRepo {
    // ── Standard CRUD ────────────────────────────────────────────────

    /// Insert a new draft version, allocating the next version number
    /// from the dedicated sequence. Sequence allocation means deleted
    /// drafts never free a number, keeping version numbers strictly
    /// increasing across the lifetime of the table.
    pub async fn create(
        pool: &PgPool,
        input: &CreateImportVersion,
    ) -> Result<ImportVersion, sqlx::Error> {
        let query = format!(
            "INSERT INTO import_versions
                (version_number, status, file_name, file_type, file_path, file_size_mb, uploaded_by)
             VALUES (nextval('import_version_number_seq'), 'draft', $1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportVersion>(&query)
            .bind(&input.file_name)
            .bind(&input.file_type)
            .bind(&input.file_path)
            .bind(input.file_size_mb)
            .bind(&input.uploaded_by)
            .fetch_one(pool)
            .await
    }

    /// Find a version by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ImportVersion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM import_versions WHERE id = $1");
        sqlx::query_as::<_, ImportVersion>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all versions, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<ImportVersion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM import_versions ORDER BY version_number DESC");
        sqlx::query_as::<_, ImportVersion>(&query)
            .fetch_all(pool)
            .await
    }

    /// Permanently delete a version row. The service layer enforces the
    /// draft-only rule and removes the version's files first.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM import_versions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Configuration & canonical file ───────────────────────────────

    /// Apply the configuration step to a version.
    pub async fn update_configuration(
        pool: &PgPool,
        id: DbId,
        input: &ConfigureImportVersion,
    ) -> Result<Option<ImportVersion>, sqlx::Error> {
        let query = format!(
            "UPDATE import_versions SET
                layer_name = $2,
                source_crs = $3,
                import_scope = $4,
                default_data_source = $5,
                regional_refresh = $6
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportVersion>(&query)
            .bind(id)
            .bind(&input.layer_name)
            .bind(&input.source_crs)
            .bind(&input.import_scope)
            .bind(&input.default_data_source)
            .bind(input.regional_refresh)
            .fetch_optional(pool)
            .await
    }

    /// Point the version at the file the pipeline should operate on —
    /// the stored upload at draft time, the canonical GeoJSON after
    /// configuration — and record the recomputed feature count.
    pub async fn set_active_file(
        pool: &PgPool,
        id: DbId,
        file_path: &str,
        feature_count: i32,
    ) -> Result<Option<ImportVersion>, sqlx::Error> {
        let query = format!(
            "UPDATE import_versions SET file_path = $2, feature_count = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportVersion>(&query)
            .bind(id)
            .bind(file_path)
            .bind(feature_count)
            .fetch_optional(pool)
            .await
    }

    // ── Publish lifecycle ────────────────────────────────────────────

    /// Find the currently published version, if any.
    pub async fn find_published(pool: &PgPool) -> Result<Option<ImportVersion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM import_versions WHERE status = 'published'");
        sqlx::query_as::<_, ImportVersion>(&query)
            .fetch_optional(pool)
            .await
    }

    /// Archive whichever version currently holds published status,
    /// except the given one. Part of the publish/rollback transaction;
    /// combined with the partial unique index on `status = 'published'`
    /// this keeps at most one version published at any time.
    pub async fn archive_published(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        except_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE import_versions SET status = 'archived', archived_at = NOW() \
             WHERE status = 'published' AND id <> $1",
        )
        .bind(except_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Mark a version published, recording who, when, and the snapshot
    /// path (kept unchanged when `snapshot_path` is `None`, as on
    /// rollback re-publish).
    pub async fn mark_published(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        published_by: Option<&str>,
        snapshot_path: Option<&str>,
    ) -> Result<Option<ImportVersion>, sqlx::Error> {
        let query = format!(
            "UPDATE import_versions SET
                status = 'published',
                published_by = COALESCE($2, published_by),
                published_at = NOW(),
                archived_at = NULL,
                snapshot_path = COALESCE($3, snapshot_path)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportVersion>(&query)
            .bind(id)
            .bind(published_by)
            .bind(snapshot_path)
            .fetch_optional(&mut **tx)
            .await
    }
}
