//! # Perfmatrix
//!
//! Builds one C program under a matrix of compiler optimization levels,
//! benchmarks every build in a single comparative run, and profiles each
//! build on its own.
//!
//! - **Benchmark group**: generate input, build all variants, time them with
//!   one benchmarking tool invocation, keep `<exe>_perf.md`
//! - **Profile group**: generate a smaller input, then per variant build with
//!   debug info, profile, annotate, keep `<exe>_<label>.out` and `.txt`
//! - **Cleanup**: binaries, per-variant output and generated signals never
//!   outlive their group
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use perfmatrix::prelude::*;
//!
//! let config = PipelineConfiguration::new()
//!     .with_target("./build")
//!     .with_executable("filt")
//!     .with_variants([OptLevel::O0, OptLevel::O2]);
//!
//! let summary = PipelineController::new(config, Arc::new(SystemProcessRunner::new()))
//!     .run()
//!     .await?;
//! std::process::exit(summary.exit_code());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod process;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{ArtifactCleaner, ArtifactScope, CleanupReport};
    pub use crate::config::{BenchmarkSettings, PipelineConfiguration, SignalSettings, ToolSpec};
    pub use crate::core::{ArtifactLayout, GroupKind, GroupStatus, OptLevel, Variant, VariantMatrix};
    pub use crate::errors::{
        BuildFailure, BuildMatrixFailure, ConfigurationError, IoFailure, PerfMatrixError,
        ReportError, ToolInvocationFailure,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{GroupReport, PipelineController, RunSummary};
    pub use crate::process::{CommandSpec, ProcessRunner, StdoutSink, SystemProcessRunner};
    pub use crate::stages::{Stage, StageContext};
    pub use std::sync::Arc;
}
