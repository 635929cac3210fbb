//! Stage trait and the stages a run is built from.
//!
//! Leaf stages (`signal`, `build`, `benchmark`, `profile`) are plain async
//! functions over a `StageContext`. The stage groups the controller sequences
//! implement `Stage`.

pub mod benchmark;
pub mod build;
pub mod profile;
mod report;
pub mod signal;

pub use benchmark::{benchmark_command, command_template, run_benchmark};
pub use build::{build, build_command, build_matrix, BinaryArtifact};
pub use profile::{annotator_command, profile_one, profiler_command, ProfileArtifact};
pub use report::{BenchmarkReport, BenchmarkRow};
pub use signal::{
    ensure_signal_input, generate_signals, prepare_signals, signal_command, SignalFiles,
};

use crate::config::PipelineConfiguration;
use crate::core::{ArtifactLayout, GroupKind, VariantMatrix};
use crate::events::{EventSink, NoOpEventSink};
use crate::pipeline::GroupReport;
use crate::process::ProcessRunner;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Trait for the stage groups a pipeline run is made of.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Returns which group this stage is.
    fn kind(&self) -> GroupKind;

    /// Returns false if the configuration switches this stage off.
    fn is_enabled(&self, config: &PipelineConfiguration) -> bool;

    /// Executes the stage. Cleanup has run by the time this returns.
    async fn execute(&self, ctx: &StageContext) -> GroupReport;
}

/// Shared, read-only state handed to every stage.
#[derive(Debug, Clone)]
pub struct StageContext {
    config: Arc<PipelineConfiguration>,
    runner: Arc<dyn ProcessRunner>,
    events: Arc<dyn EventSink>,
    layout: ArtifactLayout,
    matrix: VariantMatrix,
}

impl StageContext {
    /// Creates a context. The layout and matrix are derived once here.
    #[must_use]
    pub fn new(config: Arc<PipelineConfiguration>, runner: Arc<dyn ProcessRunner>) -> Self {
        let layout = config.layout();
        let matrix = config.matrix();
        Self {
            config,
            runner,
            events: Arc::new(NoOpEventSink),
            layout,
            matrix,
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfiguration {
        &self.config
    }

    /// Returns the process runner.
    #[must_use]
    pub fn runner(&self) -> &dyn ProcessRunner {
        self.runner.as_ref()
    }

    /// Returns the event sink.
    #[must_use]
    pub fn events(&self) -> &dyn EventSink {
        self.events.as_ref()
    }

    /// Returns the artifact layout.
    #[must_use]
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Returns the variant matrix.
    #[must_use]
    pub fn matrix(&self) -> &VariantMatrix {
        &self.matrix
    }
}
