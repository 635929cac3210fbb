//! Testing utilities for perfmatrix pipelines.
//!
//! This module provides:
//! - A scripted process runner that fakes tool output
//! - Temporary workspace fixtures (tests only)

#[cfg(test)]
mod fixtures;
mod runner;

#[cfg(test)]
pub use fixtures::TestWorkspace;
pub use runner::{FailureRule, ScriptedRunner};
