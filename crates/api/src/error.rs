use flexrunner_core::catalog::ExecutorType;
use flexrunner_core::error::CoreError;
use flexrunner_core::execution_log::LogStoreError;
use flexrunner_core::types::DbId;

use crate::config::ConfigError;

/// Errors returned by the dispatcher before or around an execution.
///
/// Failures inside an executor are not errors at this level; they come back
/// as an unsuccessful result with a failed log record.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `flexrunner_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No executor is registered for the command's type.
    #[error("No executor registered for command type {0}")]
    InvalidType(ExecutorType),

    /// The executor panicked or the log could not be finalized. The log, if
    /// it could still be written, is marked failed.
    #[error("Execution {log_id} aborted: {message}")]
    ExecutionAborted { log_id: DbId, message: String },

    #[error(transparent)]
    LogStore(#[from] LogStoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience type alias for dispatcher return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Core(core) => match core {
                CoreError::NotFound { .. } => "NOT_FOUND",
                CoreError::Validation(_) => "VALIDATION_FAILED",
                CoreError::Forbidden(_) => "FORBIDDEN",
                CoreError::InvalidConfiguration(_) => "INTERNAL_ERROR",
            },
            AppError::InvalidType(_) => "INVALID_TYPE",
            AppError::ExecutionAborted { .. } => "EXECUTION_ABORTED",
            AppError::LogStore(LogStoreError::NotFound(_)) => "NOT_FOUND",
            AppError::LogStore(_) | AppError::Config(_) => "INTERNAL_ERROR",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_variant() {
        let not_found = AppError::from(CoreError::NotFound {
            entity: "command",
            key: "maintenance/nope".into(),
        });
        assert_eq!(not_found.code(), "NOT_FOUND");
        assert_eq!(AppError::InvalidType(ExecutorType::Shell).code(), "INVALID_TYPE");
        assert_eq!(
            AppError::from(CoreError::Forbidden("execute".into())).code(),
            "FORBIDDEN"
        );
        assert_eq!(AppError::from(LogStoreError::NotFound(4)).code(), "NOT_FOUND");
        assert_eq!(
            AppError::from(LogStoreError::Backend("down".into())).code(),
            "INTERNAL_ERROR"
        );
        assert_eq!(
            AppError::ExecutionAborted {
                log_id: 1,
                message: "boom".into()
            }
            .code(),
            "EXECUTION_ABORTED"
        );
    }
}
