//! Job handlers that need the database.

use async_trait::async_trait;
use flexrunner_core::inputs::SubmittedInputs;
use flexrunner_core::runner::{JobError, JobHandler, OutputBuffer};
use sqlx::PgPool;

use crate::repositories::CommandLogRepo;

/// Job type of [`PruneCommandLogsJob`] as referenced from catalogs.
pub const PRUNE_COMMAND_LOGS: &str = "flexrunner.prune_command_logs";

/// Deletes finished execution logs older than `days` days.
#[derive(Debug, Clone)]
pub struct PruneCommandLogsJob {
    pool: PgPool,
}

impl PruneCommandLogsJob {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Read the positive `days` value from a job payload. Numeric strings are
/// accepted.
pub fn retention_days(payload: &SubmittedInputs) -> Result<i32, JobError> {
    let value = payload
        .get("days")
        .ok_or_else(|| JobError::InvalidPayload("days is required".into()))?;

    let days = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|d| d.is_finite() && *d >= 1.0 && *d <= i32::MAX as f64)
    .ok_or_else(|| JobError::InvalidPayload(format!("days must be a positive number, got {value}")))?;

    Ok(days.trunc() as i32)
}

#[async_trait]
impl JobHandler for PruneCommandLogsJob {
    async fn handle(
        &self,
        payload: &SubmittedInputs,
        output: &mut OutputBuffer,
    ) -> Result<(), JobError> {
        let days = retention_days(payload)?;
        let removed = CommandLogRepo::delete_older_than(&self.pool, days)
            .await
            .map_err(|e| JobError::Failed(e.to_string()))?;

        tracing::info!(days, removed, "Pruned command logs");
        output.line(format!("Deleted {removed} command logs older than {days} days"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn payload(value: serde_json::Value) -> SubmittedInputs {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn days_accepts_numbers_and_numeric_strings() {
        assert_eq!(retention_days(&payload(json!({"days": 90}))).unwrap(), 90);
        assert_eq!(retention_days(&payload(json!({"days": "30"}))).unwrap(), 30);
    }

    #[test]
    fn days_must_be_present_and_positive() {
        assert_matches!(retention_days(&payload(json!({}))), Err(JobError::InvalidPayload(_)));
        assert_matches!(
            retention_days(&payload(json!({"days": 0}))),
            Err(JobError::InvalidPayload(_))
        );
        assert_matches!(
            retention_days(&payload(json!({"days": "soon"}))),
            Err(JobError::InvalidPayload(_))
        );
    }
}
