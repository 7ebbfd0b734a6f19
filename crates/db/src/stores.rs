//! Postgres implementations of the core log store and job queue traits.

use async_trait::async_trait;
use flexrunner_core::execution_log::{
    ExecutionLog, ExecutionLogStore, ExecutionOutcome, LogStoreError, NewExecutionLog,
};
use flexrunner_core::runner::{JobQueue, QueueError, QueuedJob};
use flexrunner_core::types::DbId;
use sqlx::PgPool;

use crate::models::command_log::{CommandLogRow, CreateCommandLog};
use crate::models::queued_job::CreateQueuedJob;
use crate::repositories::{CommandLogRepo, QueuedJobRepo};

/// Name of the only queue connection this backend serves.
pub const DATABASE_CONNECTION: &str = "database";

fn backend(e: impl std::fmt::Display) -> LogStoreError {
    LogStoreError::Backend(e.to_string())
}

fn to_log(row: CommandLogRow) -> Result<ExecutionLog, LogStoreError> {
    ExecutionLog::try_from(row).map_err(backend)
}

/// Execution logs in the `command_logs` table.
#[derive(Debug, Clone)]
pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExecutionLogStore for PgLogStore {
    async fn create_running(&self, new: NewExecutionLog) -> Result<ExecutionLog, LogStoreError> {
        let row = CommandLogRepo::create_running(&self.pool, &CreateCommandLog::from(new))
            .await
            .map_err(backend)?;
        to_log(row)
    }

    async fn finalize(
        &self,
        id: DbId,
        outcome: ExecutionOutcome,
    ) -> Result<ExecutionLog, LogStoreError> {
        let updated = CommandLogRepo::finalize(&self.pool, id, &outcome)
            .await
            .map_err(backend)?;

        let row = CommandLogRepo::find_by_id(&self.pool, id)
            .await
            .map_err(backend)?
            .ok_or(LogStoreError::NotFound(id))?;
        if !updated {
            return Err(LogStoreError::AlreadyFinalized(id));
        }
        to_log(row)
    }

    async fn find(&self, id: DbId) -> Result<Option<ExecutionLog>, LogStoreError> {
        CommandLogRepo::find_by_id(&self.pool, id)
            .await
            .map_err(backend)?
            .map(to_log)
            .transpose()
    }
}

/// Job queue backed by the `queued_jobs` table.
///
/// Only the `database` connection exists; jobs naming any other
/// connection are refused.
#[derive(Debug, Clone)]
pub struct PgJobQueue {
    pool: PgPool,
}

impl PgJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn push(&self, job: QueuedJob) -> Result<String, QueueError> {
        if let Some(connection) = job.connection.as_deref() {
            if connection != DATABASE_CONNECTION {
                return Err(QueueError::UnknownConnection(connection.to_string()));
            }
        }

        let dto = CreateQueuedJob {
            job_type: job.job,
            queue: job.queue,
            payload: serde_json::Value::Object(job.payload),
        };
        let id = QueuedJobRepo::push(&self.pool, &dto)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;
        Ok(id.to_string())
    }
}
