//! Import job entity model for long-running operation bookkeeping.

use serde::Serialize;
use sqlx::FromRow;

use roadgrid_core::types::{DbId, Timestamp};

/// A row from the `import_jobs` table.
///
/// Lifecycle: pending → running → {completed | failed}. `started_at` is
/// set once when the job first enters running; terminal transitions set
/// `completed_at` and optionally `error_message` / `result_summary`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImportJob {
    pub id: DbId,
    pub version_id: DbId,
    pub job_type: String,
    pub status: String,
    /// 0–100.
    pub progress: i16,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub result_summary: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
