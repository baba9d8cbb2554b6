//! Tracked long-running operations.
//!
//! Every heavy pipeline stage — validation, publish, rollback — can run
//! under a job row that records status, progress, a result summary on
//! success, and the error message on failure. Job state transitions are
//! guarded in SQL: a terminal job never moves again, so a stale worker
//! cannot resurrect it.

use serde_json::json;

use roadgrid_core::error::CoreError;
use roadgrid_core::status::JobType;
use roadgrid_core::types::DbId;
use roadgrid_db::models::import_job::ImportJob;
use roadgrid_db::repositories::ImportJobRepo;

use crate::error::{ServiceError, ServiceResult};
use crate::ImportService;

impl ImportService {
    /// Create a pending job for a version.
    pub async fn create_job(&self, version_id: DbId, job_type: JobType) -> ServiceResult<ImportJob> {
        // Surface a missing version as NotFound instead of an FK error.
        self.get_version(version_id).await?;
        let job = ImportJobRepo::create(&self.pool, version_id, job_type.as_str()).await?;
        tracing::info!(job_id = job.id, version_id, job_type = %job_type, "Created import job");
        Ok(job)
    }

    pub async fn get_job(&self, job_id: DbId) -> ServiceResult<ImportJob> {
        ImportJobRepo::find_by_id(&self.pool, job_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "import job",
                    id: job_id,
                }
                .into()
            })
    }

    pub async fn list_jobs(&self, version_id: DbId) -> ServiceResult<Vec<ImportJob>> {
        Ok(ImportJobRepo::list_by_version(&self.pool, version_id).await?)
    }

    pub async fn mark_job_running(&self, job_id: DbId) -> ServiceResult<ImportJob> {
        self.expect_transition(job_id, ImportJobRepo::mark_running(&self.pool, job_id).await?)
            .await
    }

    /// Report progress on a running job; values are clamped to 0–100.
    pub async fn update_job_progress(&self, job_id: DbId, progress: i16) -> ServiceResult<ImportJob> {
        self.expect_transition(
            job_id,
            ImportJobRepo::update_progress(&self.pool, job_id, progress).await?,
        )
        .await
    }

    pub async fn complete_job(
        &self,
        job_id: DbId,
        result_summary: Option<&serde_json::Value>,
    ) -> ServiceResult<ImportJob> {
        self.expect_transition(
            job_id,
            ImportJobRepo::complete(&self.pool, job_id, result_summary).await?,
        )
        .await
    }

    pub async fn fail_job(&self, job_id: DbId, error_message: &str) -> ServiceResult<ImportJob> {
        self.expect_transition(
            job_id,
            ImportJobRepo::fail(&self.pool, job_id, error_message).await?,
        )
        .await
    }

    // ── Tracked pipeline runs ────────────────────────────────────────

    /// Run validation for a version under a job, summarizing the counts.
    pub async fn run_validation_job(&self, version_id: DbId) -> ServiceResult<ImportJob> {
        let job = self.create_job(version_id, JobType::Validation).await?;
        self.mark_job_running(job.id).await?;
        match self.validate_version(version_id).await {
            Ok(result) => {
                let summary = json!({
                    "valid": result.valid,
                    "featureCount": result.feature_count,
                    "errorCount": result.errors.len(),
                    "warningCount": result.warnings.len(),
                });
                self.complete_job(job.id, Some(&summary)).await
            }
            Err(e) => self.record_failure(job.id, e).await,
        }
    }

    /// Run a publish for a version under a job, summarizing the write
    /// counts and the snapshot path.
    pub async fn run_publish_job(
        &self,
        version_id: DbId,
        published_by: Option<&str>,
    ) -> ServiceResult<ImportJob> {
        let job = self.create_job(version_id, JobType::Publish).await?;
        self.mark_job_running(job.id).await?;
        match self.publish_version(version_id, published_by).await {
            Ok(result) => {
                let summary = json!({
                    "addedCount": result.added_count,
                    "updatedCount": result.updated_count,
                    "deactivatedCount": result.deactivated_count,
                    "unchangedCount": result.unchanged_count,
                    "degradedCount": result.degraded_count,
                    "snapshotPath": result.snapshot_path,
                });
                self.complete_job(job.id, Some(&summary)).await
            }
            Err(e) => self.record_failure(job.id, e).await,
        }
    }

    /// Run a rollback to a version under a job.
    pub async fn run_rollback_job(&self, version_id: DbId) -> ServiceResult<ImportJob> {
        let job = self.create_job(version_id, JobType::Rollback).await?;
        self.mark_job_running(job.id).await?;
        match self.rollback_to_version(version_id).await {
            Ok(result) => {
                let summary = json!({
                    "restoredCount": result.restored_count,
                    "snapshotPath": result.snapshot_path,
                });
                self.complete_job(job.id, Some(&summary)).await
            }
            Err(e) => self.record_failure(job.id, e).await,
        }
    }

    /// Persist a pipeline failure on the job, then propagate it.
    async fn record_failure(&self, job_id: DbId, error: ServiceError) -> ServiceResult<ImportJob> {
        let message = error.to_string();
        if let Err(fail_error) = self.fail_job(job_id, &message).await {
            tracing::error!(job_id, error = %fail_error, "Could not record job failure");
        }
        Err(error)
    }

    /// A guarded transition that returned no row: the job is either
    /// missing or already terminal.
    async fn expect_transition(
        &self,
        job_id: DbId,
        updated: Option<ImportJob>,
    ) -> ServiceResult<ImportJob> {
        if let Some(job) = updated {
            return Ok(job);
        }
        match ImportJobRepo::find_by_id(&self.pool, job_id).await? {
            Some(job) => Err(CoreError::InvalidState(format!(
                "job {} is {} and cannot transition",
                job_id, job.status
            ))
            .into()),
            None => Err(CoreError::NotFound {
                entity: "import job",
                id: job_id,
            }
            .into()),
        }
    }
}
