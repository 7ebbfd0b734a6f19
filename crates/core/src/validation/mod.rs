//! Input validation against a command's field declarations.
//!
//! Pure logic, no side effects: the same call always yields the same
//! error map, which makes it safe to expose for client-side pre-checks.

pub mod evaluator;

pub use evaluator::{validate_inputs, InputErrors};
