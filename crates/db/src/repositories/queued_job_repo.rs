//! Repository for the `queued_jobs` table.

use flexrunner_core::types::DbId;
use sqlx::PgPool;

use crate::models::queued_job::{CreateQueuedJob, QueuedJobRow};
use crate::models::status::QueuedJobStatus;

const COLUMNS: &str = "\
    id, job_type, queue, payload, status_id, attempts, output, error_message, \
    claimed_at, completed_at, created_at, updated_at";

pub struct QueuedJobRepo;

impl QueuedJobRepo {
    /// Insert a pending job and return its id.
    pub async fn push(pool: &PgPool, dto: &CreateQueuedJob) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO queued_jobs (job_type, queue, payload, status_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(&dto.job_type)
        .bind(&dto.queue)
        .bind(&dto.payload)
        .bind(QueuedJobStatus::Pending.id())
        .fetch_one(pool)
        .await
    }

    /// Atomically claim the oldest pending job on one of `queues`.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never
    /// claim the same row.
    pub async fn claim_next(
        pool: &PgPool,
        queues: &[String],
    ) -> Result<Option<QueuedJobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE queued_jobs \
             SET status_id = $1, claimed_at = NOW(), attempts = attempts + 1 \
             WHERE id = ( \
                 SELECT id FROM queued_jobs \
                 WHERE status_id = $2 AND queue = ANY($3) \
                 ORDER BY created_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueuedJobRow>(&query)
            .bind(QueuedJobStatus::Running.id())
            .bind(QueuedJobStatus::Pending.id())
            .bind(queues)
            .fetch_optional(pool)
            .await
    }

    pub async fn complete(pool: &PgPool, id: DbId, output: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE queued_jobs SET status_id = $2, output = $3, completed_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(QueuedJobStatus::Completed.id())
        .bind(output)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        error_message: &str,
        output: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE queued_jobs SET status_id = $2, error_message = $3, output = $4, \
                completed_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(QueuedJobStatus::Failed.id())
        .bind(error_message)
        .bind(output)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<QueuedJobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM queued_jobs WHERE id = $1");
        sqlx::query_as::<_, QueuedJobRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
