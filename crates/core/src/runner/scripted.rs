//! Scripted-command executor: named actions run through the host
//! application's command runner.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;

use super::arguments::{prepare_arguments, to_argv};
use super::error::RunnerError;
use super::executor::{CommandExecutor, ExecutionContext, ExecutionResult};
use super::output::OutputBuffer;
use super::subprocess;
use crate::catalog::{CommandAction, CommandDefinition, ExecutorType};
use crate::inputs::SubmittedInputs;

/// The host application's command runner.
#[async_trait]
pub trait HostCommandRunner: Send + Sync {
    /// Names of the commands the host currently exposes.
    async fn available_commands(&self) -> Result<Vec<String>, RunnerError>;

    /// Run `command` with `args`, writing combined output into `output`.
    /// Returns the exit status.
    async fn run(
        &self,
        command: &str,
        args: &[String],
        output: &mut OutputBuffer,
    ) -> Result<i32, RunnerError>;
}

/// Runs host commands as `<program> <command> <args...>` and lists them
/// with `<program> list --raw`.
#[derive(Debug, Clone)]
pub struct ConsoleRunner {
    program: PathBuf,
    working_directory: PathBuf,
    timeout: Duration,
}

impl ConsoleRunner {
    pub fn new(program: impl Into<PathBuf>, working_directory: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            working_directory: working_directory.into(),
            timeout,
        }
    }
}

#[async_trait]
impl HostCommandRunner for ConsoleRunner {
    async fn available_commands(&self) -> Result<Vec<String>, RunnerError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["list", "--raw"]);
        let out =
            subprocess::run_command(&mut cmd, self.timeout, Some(&self.working_directory)).await?;
        if !out.success() {
            return Err(RunnerError::Listing(format!(
                "exit code {}: {}",
                out.exit_code,
                out.stderr.trim()
            )));
        }
        Ok(parse_listing(&out.stdout))
    }

    async fn run(
        &self,
        command: &str,
        args: &[String],
        output: &mut OutputBuffer,
    ) -> Result<i32, RunnerError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg(command).args(args);
        let out =
            subprocess::run_command(&mut cmd, self.timeout, Some(&self.working_directory)).await?;
        output.push_str(&out.stdout);
        output.push_str(&out.stderr);
        if out.truncated {
            output.line(subprocess::TRUNCATION_NOTICE);
        }
        Ok(out.exit_code)
    }
}

/// First whitespace-separated token of each non-empty line.
fn parse_listing(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

pub struct ScriptedCommandExecutor {
    runner: Arc<dyn HostCommandRunner>,
}

impl ScriptedCommandExecutor {
    pub fn new(runner: Arc<dyn HostCommandRunner>) -> Self {
        Self { runner }
    }
}

impl CommandExecutor for ScriptedCommandExecutor {
    fn executor_type(&self) -> ExecutorType {
        ExecutorType::ScriptedCommand
    }

    async fn validate_command(&self, command: &CommandDefinition) -> bool {
        let CommandAction::ScriptedCommand { command: name } = &command.action else {
            return false;
        };
        // Asked on every call; the host's command set can change at runtime.
        match self.runner.available_commands().await {
            Ok(available) => available.iter().any(|c| c == name),
            Err(e) => {
                tracing::warn!(command = %name, error = %e, "Could not list host commands");
                false
            }
        }
    }

    async fn execute(
        &self,
        command: &CommandDefinition,
        inputs: &SubmittedInputs,
        context: &ExecutionContext,
    ) -> ExecutionResult {
        let CommandAction::ScriptedCommand { command: name } = &command.action else {
            return ExecutionResult::rejected(format!(
                "{} is not a scripted command",
                command.slug
            ));
        };

        let argv = to_argv(&prepare_arguments(&command.inputs, inputs));
        tracing::debug!(log_id = context.log_id, command = %name, ?argv, "Running host command");

        let mut output = OutputBuffer::new();
        let start = Instant::now();
        let status = self.runner.run(name, &argv, &mut output).await;
        let duration = start.elapsed().as_secs_f64();

        match status {
            Ok(0) => ExecutionResult::success(output.into_string(), duration).with_exit_code(0),
            Ok(code) => ExecutionResult::failure(format!("Command failed with exit code {code}"), duration)
                .with_output(output.into_string())
                .with_exit_code(code),
            Err(e) => ExecutionResult::failure(e.to_string(), duration).with_output(output.into_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
