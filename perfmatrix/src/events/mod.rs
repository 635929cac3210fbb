//! Pipeline lifecycle events.
//!
//! Stages report progress through an `EventSink` handed to them in the
//! stage context. Event names are grouped by prefix.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A stage group started.
pub const GROUP_STARTED: &str = "group.started";
/// A stage group was switched off.
pub const GROUP_SKIPPED: &str = "group.skipped";
/// A stage group finished, successfully or not.
pub const GROUP_COMPLETED: &str = "group.completed";
/// Input signals were generated.
pub const SIGNALS_GENERATED: &str = "signals.generated";
/// A variant compiled.
pub const BUILD_COMPLETED: &str = "build.completed";
/// A variant failed to compile.
pub const BUILD_FAILED: &str = "build.failed";
/// The benchmarking tool is about to run.
pub const BENCHMARK_STARTED: &str = "benchmark.started";
/// The timing report was written and verified.
pub const BENCHMARK_COMPLETED: &str = "benchmark.completed";
/// A variant's trace and annotated report were produced.
pub const PROFILE_COMPLETED: &str = "profile.completed";
/// A variant could not be profiled; the loop continues.
pub const PROFILE_FAILED: &str = "profile.failed";
/// A cleanup scope finished.
pub const CLEANUP_COMPLETED: &str = "cleanup.completed";
