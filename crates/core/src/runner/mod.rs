//! Command executors.
//!
//! Four executor kinds share the [`CommandExecutor`] contract: scripted
//! commands run through the host command runner, background jobs pushed to
//! a queue, gated shell command lines, and custom service methods. All
//! subprocess handling lives here and performs no database access.

pub mod arguments;
pub mod error;
pub mod executor;
pub mod gate;
pub mod job;
pub mod output;
pub mod queue;
pub mod scripted;
pub mod service;
pub mod shell;
pub mod subprocess;

pub use error::{panic_message, RunnerError};
pub use executor::{CommandExecutor, ExecutionContext, ExecutionResult, Executor};
pub use gate::{GateDecision, ShellGate};
pub use job::{BackgroundJobExecutor, JobError, JobHandler, JobRegistry};
pub use output::OutputBuffer;
pub use queue::{JobQueue, MemoryJobQueue, QueueError, QueuedJob};
pub use scripted::{ConsoleRunner, HostCommandRunner, ScriptedCommandExecutor};
pub use service::{
    CustomServiceExecutor, ServiceError, ServiceHandler, ServiceRegistry, ServiceReturn,
    StructuredResult,
};
pub use shell::ShellExecutor;
