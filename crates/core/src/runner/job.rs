//! Background-job executor and the registry of job handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use super::executor::{CommandExecutor, ExecutionContext, ExecutionResult};
use super::output::OutputBuffer;
use super::queue::{JobQueue, QueuedJob};
use crate::catalog::{CommandAction, CommandDefinition, ExecutorType, InputField};
use crate::inputs::SubmittedInputs;
use crate::settings::QueueSettings;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),

    #[error("{0}")]
    Failed(String),
}

/// Code that runs a job type, either inline or from the queue worker.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(
        &self,
        payload: &SubmittedInputs,
        output: &mut OutputBuffer,
    ) -> Result<(), JobError>;
}

/// Job handlers keyed by job type.
#[derive(Clone, Default)]
pub struct JobRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, job: impl Into<String>, handler: Arc<dyn JobHandler>) -> &mut Self {
        self.handlers.insert(job.into(), handler);
        self
    }

    pub fn get(&self, job: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job).cloned()
    }

    pub fn contains(&self, job: &str) -> bool {
        self.handlers.contains_key(job)
    }

    pub fn job_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

/// Declared field name to submitted value, skipping absent and `null`
/// values. Empty strings are kept.
pub fn prepare_job_payload(fields: &[InputField], inputs: &SubmittedInputs) -> SubmittedInputs {
    fields
        .iter()
        .filter_map(|field| match inputs.get(&field.name) {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => Some((field.name.clone(), value.clone())),
        })
        .collect()
}

#[derive(Clone)]
pub struct BackgroundJobExecutor {
    registry: Arc<JobRegistry>,
    queue: Arc<dyn JobQueue>,
    settings: QueueSettings,
}

impl BackgroundJobExecutor {
    pub fn new(registry: Arc<JobRegistry>, queue: Arc<dyn JobQueue>, settings: QueueSettings) -> Self {
        Self {
            registry,
            queue,
            settings,
        }
    }

    /// Run the job handler inline instead of enqueueing it.
    pub async fn dispatch_sync(
        &self,
        command: &CommandDefinition,
        inputs: &SubmittedInputs,
    ) -> ExecutionResult {
        let CommandAction::BackgroundJob { job, .. } = &command.action else {
            return not_a_job(command);
        };
        let Some(handler) = self.registry.get(job) else {
            return ExecutionResult::rejected(unregistered(job));
        };

        let payload = prepare_job_payload(&command.inputs, inputs);
        let mut output = OutputBuffer::new();
        let start = Instant::now();
        let outcome = handler.handle(&payload, &mut output).await;
        let duration = start.elapsed().as_secs_f64();

        match outcome {
            Ok(()) if output.is_empty() => {
                ExecutionResult::success(format!("Job {job} executed successfully (sync)"), duration)
            }
            Ok(()) => ExecutionResult::success(output.into_string(), duration),
            Err(e) => ExecutionResult::failure(e.to_string(), duration).with_output(output.into_string()),
        }
    }
}

fn unregistered(job: &str) -> String {
    format!("Job type {job} is not registered.")
}

fn not_a_job(command: &CommandDefinition) -> ExecutionResult {
    ExecutionResult::rejected(format!("{} is not a background job", command.slug))
}

impl CommandExecutor for BackgroundJobExecutor {
    fn executor_type(&self) -> ExecutorType {
        ExecutorType::BackgroundJob
    }

    async fn validate_command(&self, command: &CommandDefinition) -> bool {
        match &command.action {
            CommandAction::BackgroundJob { job, .. } => self.registry.contains(job),
            _ => false,
        }
    }

    async fn execute(
        &self,
        command: &CommandDefinition,
        inputs: &SubmittedInputs,
        context: &ExecutionContext,
    ) -> ExecutionResult {
        let CommandAction::BackgroundJob {
            job,
            queue,
            connection,
        } = &command.action
        else {
            return not_a_job(command);
        };

        let start = Instant::now();
        if !self.registry.contains(job) {
            return ExecutionResult::failure(unregistered(job), start.elapsed().as_secs_f64());
        }

        let queued = QueuedJob {
            job: job.clone(),
            payload: prepare_job_payload(&command.inputs, inputs),
            queue: queue.clone().unwrap_or_else(|| self.settings.queue.clone()),
            connection: connection.clone().or_else(|| self.settings.connection.clone()),
        };
        let pushed = self.queue.push(queued).await;
        let duration = start.elapsed().as_secs_f64();

        match pushed {
            Ok(job_id) => {
                tracing::info!(log_id = context.log_id, job = %job, job_id = %job_id, "Job queued");
                let mut result = ExecutionResult::success(
                    format!("Job {job} queued successfully with ID: {job_id}"),
                    duration,
                );
                result.job_id = Some(job_id);
                result
            }
            Err(e) => ExecutionResult::failure(e.to_string(), duration),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
