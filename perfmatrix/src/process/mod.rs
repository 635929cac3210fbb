//! External process invocation.
//!
//! This module provides:
//! - `CommandSpec`, a structured program + argument list that never passes
//!   through a shell
//! - The `ProcessRunner` seam and its tokio-backed implementation

mod command;
mod runner;

pub use command::{shell_quote, CommandSpec};
pub use runner::{ExitOutcome, ProcessRunner, StdoutSink, SystemProcessRunner};
