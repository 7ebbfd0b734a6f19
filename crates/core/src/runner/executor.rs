//! Unified executor interface and the normalized result every executor returns.
//!
//! [`CommandExecutor`] is implemented by the four concrete executors and by
//! [`Executor`], the closed enum the dispatcher selects from by type tag.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::job::BackgroundJobExecutor;
use super::scripted::ScriptedCommandExecutor;
use super::service::CustomServiceExecutor;
use super::shell::ShellExecutor;
use crate::catalog::{CommandDefinition, ExecutorType};
use crate::inputs::SubmittedInputs;
use crate::types::{ActorId, DbId};

/// Who is running the command and which log record tracks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    pub log_id: DbId,
    pub actor_id: ActorId,
}

/// Normalized outcome of one execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default)]
    pub output: String,
    /// Wall-clock seconds around the underlying action. Zero when the
    /// action never started.
    #[serde(rename = "duration", default)]
    pub duration_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Opaque value returned by a custom service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Extra keys supplied by a structured service result.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            success: true,
            output: output.into(),
            duration_secs,
            ..Self::default()
        }
    }

    pub fn failure(error: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            duration_secs,
            ..Self::default()
        }
    }

    /// Failure before anything ran: empty output, zero duration.
    pub fn rejected(error: impl Into<String>) -> Self {
        Self::failure(error, 0.0)
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }
}

/// Contract shared by every executor.
///
/// `execute` never fails: anything that goes wrong is reported through a
/// result with `success == false` and an `error` message.
pub trait CommandExecutor: Send + Sync {
    fn executor_type(&self) -> ExecutorType;

    /// Whether `command` can be run by this executor right now.
    fn validate_command(
        &self,
        command: &CommandDefinition,
    ) -> impl Future<Output = bool> + Send;

    fn execute(
        &self,
        command: &CommandDefinition,
        inputs: &SubmittedInputs,
        context: &ExecutionContext,
    ) -> impl Future<Output = ExecutionResult> + Send;
}

/// The closed set of executors.
pub enum Executor {
    ScriptedCommand(ScriptedCommandExecutor),
    BackgroundJob(BackgroundJobExecutor),
    Shell(ShellExecutor),
    CustomService(CustomServiceExecutor),
}

impl CommandExecutor for Executor {
    fn executor_type(&self) -> ExecutorType {
        match self {
            Self::ScriptedCommand(e) => e.executor_type(),
            Self::BackgroundJob(e) => e.executor_type(),
            Self::Shell(e) => e.executor_type(),
            Self::CustomService(e) => e.executor_type(),
        }
    }

    async fn validate_command(&self, command: &CommandDefinition) -> bool {
        match self {
            Self::ScriptedCommand(e) => e.validate_command(command).await,
            Self::BackgroundJob(e) => e.validate_command(command).await,
            Self::Shell(e) => e.validate_command(command).await,
            Self::CustomService(e) => e.validate_command(command).await,
        }
    }

    async fn execute(
        &self,
        command: &CommandDefinition,
        inputs: &SubmittedInputs,
        context: &ExecutionContext,
    ) -> ExecutionResult {
        match self {
            Self::ScriptedCommand(e) => e.execute(command, inputs, context).await,
            Self::BackgroundJob(e) => e.execute(command, inputs, context).await,
            Self::Shell(e) => e.execute(command, inputs, context).await,
            Self::CustomService(e) => e.execute(command, inputs, context).await,
        }
    }
}

impl From<ScriptedCommandExecutor> for Executor {
    fn from(value: ScriptedCommandExecutor) -> Self {
        Self::ScriptedCommand(value)
    }
}

impl From<BackgroundJobExecutor> for Executor {
    fn from(value: BackgroundJobExecutor) -> Self {
        Self::BackgroundJob(value)
    }
}

impl From<ShellExecutor> for Executor {
    fn from(value: ShellExecutor) -> Self {
        Self::Shell(value)
    }
}

impl From<CustomServiceExecutor> for Executor {
    fn from(value: CustomServiceExecutor) -> Self {
        Self::CustomService(value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
