//! Repository for the `import_jobs` table.

use sqlx::PgPool;

use roadgrid_core::types::DbId;

use crate::models::import_job::ImportJob;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, version_id, job_type, status, progress, started_at, \
    completed_at, error_message, result_summary, created_at, updated_at";

/// Provides lifecycle operations for import jobs.
pub struct ImportJobRepo;

impl ImportJobRepo {
    /// Create a pending job for a version.
    pub async fn create(
        pool: &PgPool,
        version_id: DbId,
        job_type: &str,
    ) -> Result<ImportJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO import_jobs (version_id, job_type, status, progress)
             VALUES ($1, $2, 'pending', 0)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(version_id)
            .bind(job_type)
            .fetch_one(pool)
            .await
    }

    /// Find a job by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ImportJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM import_jobs WHERE id = $1");
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all jobs for a version, newest first.
    pub async fn list_by_version(
        pool: &PgPool,
        version_id: DbId,
    ) -> Result<Vec<ImportJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM import_jobs WHERE version_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(version_id)
            .fetch_all(pool)
            .await
    }

    /// Move a job to running. `started_at` is set only on the first
    /// transition; terminal jobs are left untouched.
    pub async fn mark_running(pool: &PgPool, id: DbId) -> Result<Option<ImportJob>, sqlx::Error> {
        let query = format!(
            "UPDATE import_jobs SET
                status = 'running',
                started_at = COALESCE(started_at, NOW()),
                updated_at = NOW()
             WHERE id = $1 AND status IN ('pending', 'running')
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Update progress (clamped 0–100) on a running job.
    pub async fn update_progress(
        pool: &PgPool,
        id: DbId,
        progress: i16,
    ) -> Result<Option<ImportJob>, sqlx::Error> {
        let query = format!(
            "UPDATE import_jobs SET
                progress = LEAST(100, GREATEST(0, $2::smallint)),
                updated_at = NOW()
             WHERE id = $1 AND status = 'running'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(id)
            .bind(progress)
            .fetch_optional(pool)
            .await
    }

    /// Complete a job with an optional result summary.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        result_summary: Option<&serde_json::Value>,
    ) -> Result<Option<ImportJob>, sqlx::Error> {
        let query = format!(
            "UPDATE import_jobs SET
                status = 'completed',
                progress = 100,
                completed_at = NOW(),
                result_summary = COALESCE($2, result_summary),
                updated_at = NOW()
             WHERE id = $1 AND status IN ('pending', 'running')
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(id)
            .bind(result_summary)
            .fetch_optional(pool)
            .await
    }

    /// Fail a job with an error message.
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        error_message: &str,
    ) -> Result<Option<ImportJob>, sqlx::Error> {
        let query = format!(
            "UPDATE import_jobs SET
                status = 'failed',
                completed_at = NOW(),
                error_message = $2,
                updated_at = NOW()
             WHERE id = $1 AND status IN ('pending', 'running')
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(id)
            .bind(error_message)
            .fetch_optional(pool)
            .await
    }
}
