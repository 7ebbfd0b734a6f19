//! Flex runner domain logic.
//!
//! Command catalog, input validation, executors, the shell security gate,
//! and the execution log model. Nothing in this crate touches the database
//! directly; persistence goes through [`execution_log::ExecutionLogStore`]
//! and [`runner::JobQueue`].

pub mod auth;
pub mod catalog;
pub mod error;
pub mod execution_log;
pub mod inputs;
pub mod runner;
pub mod settings;
pub mod types;
pub mod validation;
