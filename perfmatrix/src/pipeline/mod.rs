//! Pipeline sequencing and run results.
//!
//! This module provides:
//! - The benchmark and profile stage groups
//! - The controller that sequences them
//! - Failure tolerance modes and run summaries

mod controller;
mod failure_tolerance;
mod groups;
mod summary;


pub use controller::PipelineController;
pub use failure_tolerance::{FailureCollector, FailureMode, FailureRecord};
pub use groups::{BenchmarkGroup, ProfileGroup};
pub use summary::{GroupReport, RunSummary};
