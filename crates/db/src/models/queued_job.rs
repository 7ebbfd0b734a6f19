//! Rows of the `queued_jobs` table.

use flexrunner_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::StatusId;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueuedJobRow {
    pub id: DbId,
    pub job_type: String,
    pub queue: String,
    pub payload: serde_json::Value,
    pub status_id: StatusId,
    pub attempts: i32,
    pub output: Option<String>,
    pub error_message: Option<String>,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for enqueueing a job.
#[derive(Debug, Clone)]
pub struct CreateQueuedJob {
    pub job_type: String,
    pub queue: String,
    pub payload: serde_json::Value,
}
