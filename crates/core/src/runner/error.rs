//! Errors raised inside executors. They never escape [`super::CommandExecutor::execute`];
//! each is turned into a failed [`super::ExecutionResult`].

use std::any::Any;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The host command runner does not know the requested command.
    #[error("Command {0} is not available")]
    UnknownCommand(String),

    /// The process exceeded its timeout and was killed.
    #[error("Process timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Spawning or talking to the child process failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The host runner's command listing could not be read.
    #[error("Could not list available commands: {0}")]
    Listing(String),
}

impl RunnerError {
    pub fn timeout(elapsed: Duration) -> Self {
        Self::Timeout {
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Text carried by a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked without a message".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
