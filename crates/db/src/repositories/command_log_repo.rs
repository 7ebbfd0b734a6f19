//! Repository for the `command_logs` table.

use flexrunner_core::execution_log::{ExecutionOutcome, ExecutionStatus};
use flexrunner_core::types::{ActorId, DbId};
use sqlx::PgPool;

use crate::models::command_log::{CommandLogRow, CreateCommandLog};

/// Column list for `command_logs` SELECT queries, including joined status name.
const COLUMNS: &str = "\
    cl.id, cl.actor_id, cl.command_name, cl.command_slug, cl.command_type, \
    cl.category, cl.inputs, cl.output, \
    cl.status_id, es.name AS status_name, \
    cl.duration, cl.started_at, cl.completed_at, cl.error_message, \
    cl.created_at, cl.updated_at";

/// Join clause used in all read queries to include the status name.
const JOIN: &str = "\
    command_logs cl \
    JOIN execution_statuses es ON cl.status_id = es.id";

pub struct CommandLogRepo;

impl CommandLogRepo {
    /// Insert a row in `running` status with `started_at = now()`.
    pub async fn create_running(
        pool: &PgPool,
        dto: &CreateCommandLog,
    ) -> Result<CommandLogRow, sqlx::Error> {
        let id: DbId = sqlx::query_scalar(
            "INSERT INTO command_logs \
                (actor_id, command_name, command_slug, command_type, category, inputs, \
                 status_id, started_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, now()) \
             RETURNING id",
        )
        .bind(dto.actor_id)
        .bind(&dto.command_name)
        .bind(&dto.command_slug)
        .bind(&dto.command_type)
        .bind(&dto.category)
        .bind(&dto.inputs)
        .bind(ExecutionStatus::Running.id())
        .fetch_one(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Apply the terminal update, only if the row is still running.
    ///
    /// Returns `false` when no running row with that id exists.
    pub async fn finalize(
        pool: &PgPool,
        id: DbId,
        outcome: &ExecutionOutcome,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE command_logs SET \
                status_id = $2, \
                output = $3, \
                duration = $4, \
                error_message = $5, \
                completed_at = now() \
             WHERE id = $1 AND status_id = $6",
        )
        .bind(id)
        .bind(outcome.status.id())
        .bind(&outcome.output)
        .bind(outcome.duration)
        .bind(&outcome.error_message)
        .bind(ExecutionStatus::Running.id())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<CommandLogRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {JOIN} WHERE cl.id = $1");
        sqlx::query_as::<_, CommandLogRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Most recent logs for one actor.
    pub async fn list_for_actor(
        pool: &PgPool,
        actor_id: ActorId,
        limit: i64,
    ) -> Result<Vec<CommandLogRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {JOIN} \
             WHERE cl.actor_id = $1 \
             ORDER BY cl.created_at DESC, cl.id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, CommandLogRow>(&query)
            .bind(actor_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Delete completed logs created more than `days` days ago. Running rows
    /// are kept. Returns the number of rows removed.
    pub async fn delete_older_than(pool: &PgPool, days: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM command_logs \
             WHERE created_at < now() - make_interval(days => $1) \
               AND status_id IN ($2, $3)",
        )
        .bind(days)
        .bind(ExecutionStatus::Success.id())
        .bind(ExecutionStatus::Failed.id())
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
