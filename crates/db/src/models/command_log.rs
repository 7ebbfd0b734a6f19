//! Rows of the `command_logs` table.

use flexrunner_core::catalog::ExecutorType;
use flexrunner_core::execution_log::{ExecutionLog, ExecutionStatus, NewExecutionLog};
use flexrunner_core::types::{ActorId, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::StatusId;

/// A row from `command_logs`, including the joined status name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CommandLogRow {
    pub id: DbId,
    pub actor_id: ActorId,
    pub command_name: String,
    pub command_slug: String,
    pub command_type: String,
    pub category: String,
    pub inputs: serde_json::Value,
    pub output: Option<String>,
    pub status_id: StatusId,
    /// Joined from `execution_statuses.name`.
    pub status_name: String,
    pub duration: Option<f64>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A stored row that no longer maps onto the domain model.
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("command log {id} has unknown status id {status_id}")]
    UnknownStatus { id: DbId, status_id: StatusId },

    #[error("command log {id} has unknown command type {command_type:?}")]
    UnknownCommandType { id: DbId, command_type: String },
}

impl TryFrom<CommandLogRow> for ExecutionLog {
    type Error = RowError;

    fn try_from(row: CommandLogRow) -> Result<Self, Self::Error> {
        let status = ExecutionStatus::from_id(row.status_id).ok_or(RowError::UnknownStatus {
            id: row.id,
            status_id: row.status_id,
        })?;
        let command_type =
            ExecutorType::parse(&row.command_type).ok_or_else(|| RowError::UnknownCommandType {
                id: row.id,
                command_type: row.command_type.clone(),
            })?;

        Ok(ExecutionLog {
            id: row.id,
            actor_id: row.actor_id,
            command_name: row.command_name,
            command_slug: row.command_slug,
            command_type,
            category: row.category,
            inputs: row.inputs,
            output: row.output,
            status,
            duration: row.duration,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// DTO for inserting a running log row.
#[derive(Debug, Clone)]
pub struct CreateCommandLog {
    pub actor_id: ActorId,
    pub command_name: String,
    pub command_slug: String,
    pub command_type: String,
    pub category: String,
    pub inputs: serde_json::Value,
}

impl From<NewExecutionLog> for CreateCommandLog {
    fn from(new: NewExecutionLog) -> Self {
        Self {
            actor_id: new.actor_id,
            command_name: new.command_name,
            command_slug: new.command_slug,
            command_type: new.command_type.as_str().to_string(),
            category: new.category,
            inputs: new.inputs,
        }
    }
}
