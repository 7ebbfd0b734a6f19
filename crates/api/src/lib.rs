//! The exposed flex runner operations: configuration, the dispatcher that
//! drives an invocation from lookup to its final log record, and the
//! application state that wires executors to their collaborators.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod state;
