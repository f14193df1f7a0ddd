//! CLI command implementations.
//!
//! Each command returns `Ok(true)` on full success and `Ok(false)` when it
//! finished but something needs attention (exit code 2).

pub mod discover;
pub mod render;
pub mod run;
pub mod tabulate;

pub type CommandResult = Result<bool, Box<dyn std::error::Error>>;
