//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching the
//! database row and the DTOs used for inserts.

pub mod command_log;
pub mod queued_job;
pub mod status;
