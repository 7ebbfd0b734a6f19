//! Queue backend abstraction for background jobs.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::inputs::SubmittedInputs;

/// A job handed to the queue backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    /// Registered job type.
    pub job: String,
    pub payload: SubmittedInputs,
    pub queue: String,
    pub connection: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue connection {0} is not configured")]
    UnknownConnection(String),

    #[error("Queue backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue `job` and return the backend's job id.
    async fn push(&self, job: QueuedJob) -> Result<String, QueueError>;
}

/// In-process FIFO queue. Ids are UUIDv7 strings.
#[derive(Debug, Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<VecDeque<(String, QueuedJob)>>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the oldest job, if any.
    pub async fn pop(&self) -> Option<(String, QueuedJob)> {
        self.jobs.lock().await.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn push(&self, job: QueuedJob) -> Result<String, QueueError> {
        let id = uuid::Uuid::now_v7().to_string();
        self.jobs.lock().await.push_back((id.clone(), job));
        Ok(id)
    }
}
