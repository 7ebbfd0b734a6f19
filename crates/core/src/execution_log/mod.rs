//! Execution log records and the store they are persisted through.
//!
//! A record is created `running` immediately before an executor is invoked
//! and receives exactly one terminal update (`success` or `failed`). The
//! core never deletes records.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{CommandDefinition, ExecutorType};
use crate::inputs::SubmittedInputs;
use crate::runner::ExecutionResult;
use crate::types::{ActorId, DbId, Timestamp};

pub use memory::MemoryLogStore;

/// Status ID type matching SMALLINT in the `execution_statuses` table.
pub type StatusId = i16;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status. Discriminants match the `execution_statuses` seed rows.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending = 1,
    Running = 2,
    Success = 3,
    Failed = 4,
}

impl ExecutionStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(Self::Pending),
            2 => Some(Self::Running),
            3 => Some(Self::Success),
            4 => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Status only moves forward: pending -> running -> success | failed.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Success)
                | (Self::Running, Self::Failed)
        )
    }
}

impl From<ExecutionStatus> for StatusId {
    fn from(value: ExecutionStatus) -> Self {
        value as StatusId
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One persisted command invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionLog {
    pub id: DbId,
    pub actor_id: ActorId,
    pub command_name: String,
    pub command_slug: String,
    pub command_type: ExecutorType,
    pub category: String,
    /// Snapshot of the submitted inputs.
    pub inputs: Value,
    pub output: Option<String>,
    pub status: ExecutionStatus,
    /// Seconds; `None` until completion.
    pub duration: Option<f64>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ExecutionLog {
    pub fn is_running(&self) -> bool {
        self.status == ExecutionStatus::Running
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn was_successful(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    pub fn has_failed(&self) -> bool {
        self.status == ExecutionStatus::Failed
    }

    /// Human-readable duration: `0s`, `250ms`, `12.35s`, `2m 5s`.
    pub fn formatted_duration(&self) -> String {
        format_duration(self.duration.unwrap_or(0.0))
    }
}

pub fn format_duration(secs: f64) -> String {
    if secs == 0.0 || !secs.is_finite() {
        return "0s".to_string();
    }
    if secs < 1.0 {
        return format!("{}ms", (secs * 1000.0).round() as i64);
    }
    if secs < 60.0 {
        return format!("{}s", round2(secs));
    }
    let whole = secs.trunc() as i64;
    format!("{}m {}s", whole / 60, whole % 60)
}

/// Round to two decimals, printing without trailing zeros.
fn round2(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{rounded:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Insert payload for a new `running` record.
#[derive(Debug, Clone)]
pub struct NewExecutionLog {
    pub actor_id: ActorId,
    pub command_name: String,
    pub command_slug: String,
    pub command_type: ExecutorType,
    pub category: String,
    pub inputs: Value,
}

impl NewExecutionLog {
    pub fn for_command(
        actor_id: ActorId,
        category: &str,
        command: &CommandDefinition,
        inputs: &SubmittedInputs,
    ) -> Self {
        Self {
            actor_id,
            command_name: command.name.clone(),
            command_slug: command.slug.clone(),
            command_type: command.executor_type(),
            category: category.to_string(),
            inputs: Value::Object(inputs.clone()),
        }
    }
}

/// The single terminal update applied to a running record.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    pub output: Option<String>,
    pub duration: f64,
    pub error_message: Option<String>,
}

impl ExecutionOutcome {
    pub fn from_result(result: &ExecutionResult) -> Self {
        let status = if result.success {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failed
        };
        Self {
            status,
            output: Some(result.output.clone()),
            duration: result.duration_secs,
            error_message: if result.success {
                None
            } else {
                result.error.clone()
            },
        }
    }

    /// Forced failure after the executor blew up or the normal update failed.
    pub fn aborted(message: impl Into<String>, duration: f64) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            output: None,
            duration,
            error_message: Some(message.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LogStoreError {
    #[error("Execution log {0} not found")]
    NotFound(DbId),

    /// The record already received its terminal update.
    #[error("Execution log {0} is already finalized")]
    AlreadyFinalized(DbId),

    #[error("Log store error: {0}")]
    Backend(String),
}

/// Persistence for execution logs.
#[async_trait]
pub trait ExecutionLogStore: Send + Sync {
    /// Insert a record in `running` status with `started_at` set.
    async fn create_running(&self, new: NewExecutionLog) -> Result<ExecutionLog, LogStoreError>;

    /// Apply the terminal update. Fails with [`LogStoreError::AlreadyFinalized`]
    /// when the record is no longer running.
    async fn finalize(
        &self,
        id: DbId,
        outcome: ExecutionOutcome,
    ) -> Result<ExecutionLog, LogStoreError>;

    async fn find(&self, id: DbId) -> Result<Option<ExecutionLog>, LogStoreError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ids_match_seed_rows() {
        assert_eq!(ExecutionStatus::Pending.id(), 1);
        assert_eq!(ExecutionStatus::Running.id(), 2);
        assert_eq!(ExecutionStatus::Success.id(), 3);
        assert_eq!(ExecutionStatus::Failed.id(), 4);
        for status in [
            ExecutionStatus::Pending,
            ExecutionStatus::Running,
            ExecutionStatus::Success,
            ExecutionStatus::Failed,
        ] {
            assert_eq!(ExecutionStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(ExecutionStatus::from_id(5), None);
    }

    #[test]
    fn status_is_monotonic() {
        use ExecutionStatus::*;
        assert!(Pending.can_transition_to(Running));
        assert!(Running.can_transition_to(Success));
        assert!(Running.can_transition_to(Failed));
        assert!(!Success.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Running));
        assert!(!Running.can_transition_to(Pending));
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(0.0), "0s");
        assert_eq!(format_duration(0.25), "250ms");
        assert_eq!(format_duration(12.345), "12.35s");
        assert_eq!(format_duration(3.0), "3s");
        assert_eq!(format_duration(125.7), "2m 5s");
    }

    #[test]
    fn outcome_drops_error_on_success() {
        let mut result = ExecutionResult::failure("boom", 0.5);
        assert_eq!(
            ExecutionOutcome::from_result(&result).error_message.as_deref(),
            Some("boom")
        );

        result.success = true;
        let outcome = ExecutionOutcome::from_result(&result);
        assert_eq!(outcome.status, ExecutionStatus::Success);
        assert_eq!(outcome.error_message, None);
    }
}
