//! Sequencing the stage groups of one run.

use super::{BenchmarkGroup, GroupReport, ProfileGroup, RunSummary};
use crate::config::PipelineConfiguration;
use crate::errors::PerfMatrixError;
use crate::events::{self, EventSink, NoOpEventSink};
use crate::process::ProcessRunner;
use crate::stages::{Stage, StageContext};
use std::sync::Arc;
use tracing::{info, warn};

/// Runs the benchmark group, then the profile group.
///
/// Groups are independent: a failed benchmark group does not stop profiling.
/// A configuration or shared-input failure stops everything after it.
#[derive(Debug)]
pub struct PipelineController {
    config: Arc<PipelineConfiguration>,
    runner: Arc<dyn ProcessRunner>,
    events: Arc<dyn EventSink>,
    stages: Vec<Box<dyn Stage>>,
}

impl PipelineController {
    /// Creates a controller with the default groups.
    #[must_use]
    pub fn new(config: PipelineConfiguration, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            config: Arc::new(config),
            runner,
            events: Arc::new(NoOpEventSink),
            stages: vec![Box::new(BenchmarkGroup), Box::new(ProfileGroup)],
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

    /// Validates the configuration, then runs every enabled group in order.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if validation fails. No process is launched
    /// in that case. Every other failure is recorded in the summary.
    pub async fn run(&self) -> Result<RunSummary, PerfMatrixError> {
        self.config.validate()?;

        let ctx = StageContext::new(Arc::clone(&self.config), Arc::clone(&self.runner))
            .with_events(Arc::clone(&self.events));
        let mut summary = RunSummary::new();
        info!(
            run_id = %summary.run_id,
            target = %self.config.target.display(),
            executable = %self.config.executable,
            variants = %ctx.matrix().label_list(),
            "Pipeline started"
        );

        for stage in &self.stages {
            let report = if !stage.is_enabled(&self.config) {
                GroupReport::skipped(stage.kind(), "disabled")
            } else if summary.aborted() {
                warn!(group = stage.name(), "Skipping group, run aborted");
                GroupReport::skipped(stage.kind(), "run aborted")
            } else {
                summary.push(stage.execute(&ctx).await);
                continue;
            };

            info!(group = stage.name(), reason = ?report.skip_reason, "Group skipped");
            self.events
                .emit(
                    events::GROUP_SKIPPED,
                    Some(serde_json::json!({
                        "group": stage.kind(),
                        "reason": report.skip_reason,
                    })),
                )
                .await;
            summary.push(report);
        }

        let summary = summary.finish();
        info!(
            run_id = %summary.run_id,
            exit_code = summary.exit_code(),
            "Pipeline finished"
        );
        Ok(summary)
    }
}
