//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod command_log_repo;
pub mod queued_job_repo;

pub use command_log_repo::CommandLogRepo;
pub use queued_job_repo::QueuedJobRepo;
