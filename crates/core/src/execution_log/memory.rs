//! In-process log store. Backs tests and single-node deployments without
//! a database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    ExecutionLog, ExecutionLogStore, ExecutionOutcome, ExecutionStatus, LogStoreError,
    NewExecutionLog,
};
use crate::types::DbId;

#[derive(Debug, Default)]
pub struct MemoryLogStore {
    next_id: AtomicI64,
    logs: RwLock<BTreeMap<DbId, ExecutionLog>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record, oldest first.
    pub async fn all(&self) -> Vec<ExecutionLog> {
        self.logs.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.logs.read().await.len()
    }
}

#[async_trait]
impl ExecutionLogStore for MemoryLogStore {
    async fn create_running(&self, new: NewExecutionLog) -> Result<ExecutionLog, LogStoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let log = ExecutionLog {
            id,
            actor_id: new.actor_id,
            command_name: new.command_name,
            command_slug: new.command_slug,
            command_type: new.command_type,
            category: new.category,
            inputs: new.inputs,
            output: None,
            status: ExecutionStatus::Running,
            duration: None,
            started_at: Some(now),
            completed_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        self.logs.write().await.insert(id, log.clone());
        Ok(log)
    }

    async fn finalize(
        &self,
        id: DbId,
        outcome: ExecutionOutcome,
    ) -> Result<ExecutionLog, LogStoreError> {
        let mut logs = self.logs.write().await;
        let log = logs.get_mut(&id).ok_or(LogStoreError::NotFound(id))?;
        if !log.status.can_transition_to(outcome.status) {
            return Err(LogStoreError::AlreadyFinalized(id));
        }

        let now = Utc::now();
        log.status = outcome.status;
        log.output = outcome.output;
        log.duration = Some(outcome.duration);
        log.error_message = outcome.error_message;
        log.completed_at = Some(now);
        log.updated_at = now;
        Ok(log.clone())
    }

    async fn find(&self, id: DbId) -> Result<Option<ExecutionLog>, LogStoreError> {
        Ok(self.logs.read().await.get(&id).cloned())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
