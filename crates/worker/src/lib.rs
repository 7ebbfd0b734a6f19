//! Queue worker.
//!
//! Polls `queued_jobs` every `poll_interval` and runs claimed jobs through
//! the [`JobRegistry`]. Uses `SELECT FOR UPDATE SKIP LOCKED` via
//! [`QueuedJobRepo::claim_next`] so several workers can share a queue.
//!
//! A claimed row always gets a terminal write attempt: handler panics become
//! failures, and a failed `complete` falls back to `fail`. Rows left
//! `running` because the database itself went away are not reclaimed.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use flexrunner_core::runner::{panic_message, JobError, JobRegistry, OutputBuffer};
use flexrunner_core::settings::DEFAULT_QUEUE;
use flexrunner_db::models::queued_job::QueuedJobRow;
use flexrunner_db::repositories::QueuedJobRepo;
use flexrunner_db::DbPool;
use futures::FutureExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Default polling interval for the worker loop.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, thiserror::Error)]
#[error("{var} must be {expected}, got {value:?}")]
pub struct WorkerConfigError {
    pub var: &'static str,
    pub expected: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
    /// Queues claimed from, in no particular priority.
    pub queues: Vec<String>,
}

impl WorkerConfig {
    /// | Env Var                    | Default   |
    /// |----------------------------|-----------|
    /// | `WORKER_POLL_INTERVAL_MS`  | `1000`    |
    /// | `WORKER_QUEUES`            | `default` |
    pub fn from_env() -> Result<Self, WorkerConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, WorkerConfigError> {
        let poll_ms = match lookup("WORKER_POLL_INTERVAL_MS").filter(|v| !v.trim().is_empty()) {
            None => DEFAULT_POLL_INTERVAL_MS,
            Some(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(WorkerConfigError {
                    var: "WORKER_POLL_INTERVAL_MS",
                    expected: "a positive integer",
                    value,
                })?,
        };

        let mut queues: Vec<String> = lookup("WORKER_QUEUES")
            .unwrap_or_default()
            .split(',')
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        if queues.is_empty() {
            queues.push(DEFAULT_QUEUE.to_string());
        }

        Ok(Self {
            poll_interval: Duration::from_millis(poll_ms),
            queues,
        })
    }
}

/// What running one claimed job produced.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed { output: String },
    Failed { error: String, output: String },
}

/// Run the handler registered for `job_type` against a stored payload.
pub async fn run_job(registry: &JobRegistry, job_type: &str, payload: &Value) -> JobOutcome {
    let Some(handler) = registry.get(job_type) else {
        return JobOutcome::Failed {
            error: format!("Job type {job_type} is not registered."),
            output: String::new(),
        };
    };
    let Some(payload) = payload.as_object() else {
        return JobOutcome::Failed {
            error: JobError::InvalidPayload("expected a JSON object".into()).to_string(),
            output: String::new(),
        };
    };

    let mut output = OutputBuffer::new();
    let handled = AssertUnwindSafe(handler.handle(payload, &mut output))
        .catch_unwind()
        .await;
    match handled {
        Ok(Ok(())) => JobOutcome::Completed {
            output: output.into_string(),
        },
        Ok(Err(e)) => JobOutcome::Failed {
            error: e.to_string(),
            output: output.into_string(),
        },
        Err(panic) => JobOutcome::Failed {
            error: format!("Unexpected error: {}", panic_message(panic.as_ref())),
            output: output.into_string(),
        },
    }
}

/// A single long-lived task draining the configured queues.
pub struct JobWorker {
    pool: DbPool,
    registry: Arc<JobRegistry>,
    config: WorkerConfig,
}

impl JobWorker {
    pub fn new(pool: DbPool, registry: Arc<JobRegistry>, config: WorkerConfig) -> Self {
        Self {
            pool,
            registry,
            config,
        }
    }

    /// Run the poll loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            queues = ?self.config.queues,
            "Job worker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Job worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.drain().await {
                        tracing::error!(error = %e, "Worker cycle failed");
                    }
                }
            }
        }
    }

    /// Claim and run jobs until the queues are empty.
    async fn drain(&self) -> Result<(), sqlx::Error> {
        while let Some(job) = QueuedJobRepo::claim_next(&self.pool, &self.config.queues).await? {
            self.process(job).await?;
        }
        Ok(())
    }

    async fn process(&self, job: QueuedJobRow) -> Result<(), sqlx::Error> {
        tracing::info!(
            job_id = job.id,
            job_type = %job.job_type,
            queue = %job.queue,
            attempts = job.attempts,
            "Job claimed",
        );

        match run_job(&self.registry, &job.job_type, &job.payload).await {
            JobOutcome::Completed { output } => {
                if let Err(e) = QueuedJobRepo::complete(&self.pool, job.id, &output).await {
                    tracing::error!(job_id = job.id, error = %e, "Could not mark job completed");
                    let error = format!("Failed to record job completion: {e}");
                    QueuedJobRepo::fail(&self.pool, job.id, &error, &output).await?;
                    return Ok(());
                }
                tracing::info!(job_id = job.id, "Job completed");
            }
            JobOutcome::Failed { error, output } => {
                QueuedJobRepo::fail(&self.pool, job.id, &error, &output).await?;
                tracing::warn!(job_id = job.id, error = %error, "Job failed");
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use flexrunner_core::inputs::SubmittedInputs;
    use flexrunner_core::runner::JobHandler;
    use serde_json::json;

    use super::*;

    struct Echo;

    #[async_trait]
    impl JobHandler for Echo {
        async fn handle(
            &self,
            payload: &SubmittedInputs,
            output: &mut OutputBuffer,
        ) -> Result<(), JobError> {
            let name = payload
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| JobError::InvalidPayload("name is required".into()))?;
            output.line(format!("hello {name}"));
            Ok(())
        }
    }

    /// Writes a line, then panics.
    struct Crashes;

    #[async_trait]
    impl JobHandler for Crashes {
        async fn handle(
            &self,
            _payload: &SubmittedInputs,
            output: &mut OutputBuffer,
        ) -> Result<(), JobError> {
            output.line("starting");
            panic!("disk on fire");
        }
    }

    fn registry() -> JobRegistry {
        let mut registry = JobRegistry::new();
        registry.register("echo", Arc::new(Echo));
        registry.register("crash", Arc::new(Crashes));
        registry
    }

    fn config(pairs: &[(&str, &str)]) -> Result<WorkerConfig, WorkerConfigError> {
        let env: HashMap<&str, &str> = pairs.iter().copied().collect();
        WorkerConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn config_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.queues, ["default"]);
    }

    #[test]
    fn config_reads_queues_and_interval() {
        let config = config(&[
            ("WORKER_POLL_INTERVAL_MS", "250"),
            ("WORKER_QUEUES", "high, default,"),
        ])
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.queues, ["high", "default"]);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = config(&[("WORKER_POLL_INTERVAL_MS", "0")]).unwrap_err();
        assert_eq!(err.var, "WORKER_POLL_INTERVAL_MS");
    }

    #[tokio::test]
    async fn registered_job_completes_with_output() {
        let outcome = run_job(&registry(), "echo", &json!({"name": "ops"})).await;
        assert_eq!(
            outcome,
            JobOutcome::Completed {
                output: "hello ops\n".into()
            }
        );
    }

    #[tokio::test]
    async fn handler_error_fails_the_job() {
        let outcome = run_job(&registry(), "echo", &json!({})).await;
        assert_matches::assert_matches!(
            outcome,
            JobOutcome::Failed { error, .. } if error == "Invalid job payload: name is required"
        );
    }

    #[tokio::test]
    async fn panicking_handler_fails_the_job_and_keeps_output() {
        let outcome = run_job(&registry(), "crash", &json!({})).await;
        assert_eq!(
            outcome,
            JobOutcome::Failed {
                error: "Unexpected error: disk on fire".into(),
                output: "starting\n".into(),
            }
        );
    }

    #[tokio::test]
    async fn unknown_type_and_bad_payload_fail() {
        let outcome = run_job(&registry(), "missing", &json!({})).await;
        assert_matches::assert_matches!(outcome, JobOutcome::Failed { error, .. } if error.contains("not registered"));

        let outcome = run_job(&registry(), "echo", &json!([1, 2])).await;
        assert_matches::assert_matches!(outcome, JobOutcome::Failed { error, .. } if error.starts_with("Invalid job payload"));
    }
}
