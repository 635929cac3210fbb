//! The two stage groups a run is made of.
//!
//! Each group owns an `ArtifactScope` for its whole body, so its transient
//! files are gone by the time `execute` returns, however the group ended.

use super::{FailureCollector, FailureMode, FailureRecord, GroupReport};
use crate::cancellation::{self, ArtifactScope};
use crate::config::PipelineConfiguration;
use crate::core::{GroupKind, GroupStatus};
use crate::errors::PerfMatrixError;
use crate::events;
use crate::observability::SpanTimer;
use crate::stages::{build_matrix, prepare_signals, profile_one, run_benchmark, Stage, StageContext};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Signal generation, matrix build and one benchmarking tool run.
#[derive(Debug, Default, Clone, Copy)]
pub struct BenchmarkGroup;

impl BenchmarkGroup {
    async fn run_in_scope(
        ctx: &StageContext,
        scope: &ArtifactScope,
        report: &mut GroupReport,
    ) -> Result<(), PerfMatrixError> {
        let config = ctx.config();
        remove_stale(&[ctx.layout().perf_report()]);
        let signals = prepare_signals(ctx, config.signal.bench_samples, scope).await?;

        scope.register_all(ctx.matrix().transient_files());
        build_matrix(ctx, false, config.parallel_builds).await?;

        let benchmark = run_benchmark(ctx, signals.input()).await?;
        report.reports.push(benchmark.path.clone());
        report.benchmark = Some(benchmark);
        Ok(())
    }
}

#[async_trait]
impl Stage for BenchmarkGroup {
    fn name(&self) -> &str {
        "benchmark"
    }

    fn kind(&self) -> GroupKind {
        GroupKind::Benchmark
    }

    fn is_enabled(&self, config: &PipelineConfiguration) -> bool {
        !config.skip_benchmark
    }

    async fn execute(&self, ctx: &StageContext) -> GroupReport {
        let timer = SpanTimer::start(self.name());
        group_started(ctx, self.kind()).await;

        let mut report = GroupReport::new(self.kind());
        let mut collector = FailureCollector::new(FailureMode::FailFast);
        let scope = ArtifactScope::new("benchmark group");

        let outcome = Self::run_in_scope(ctx, &scope, &mut report).await;
        report.cleanup = scope.finish();

        if let Err(e) = outcome {
            error!(group = self.name(), error = %e, "Group failed");
            report.aborts_run = e.aborts_run();
            collector.record_failure(FailureRecord::from_error(self.name(), &e));
        }

        report.fatal = collector.has_fatal();
        report.status = if report.fatal {
            GroupStatus::Fail
        } else {
            GroupStatus::Ok
        };
        report.failures = collector.into_failures();
        report.duration_ms = timer.finish();
        group_completed(ctx, &report).await;
        report
    }
}

/// Signal generation, then a debug build, profile and annotation per variant.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileGroup;

impl ProfileGroup {
    async fn run_in_scope(
        &self,
        ctx: &StageContext,
        scope: &ArtifactScope,
        collector: &mut FailureCollector,
        report: &mut GroupReport,
    ) {
        let config = ctx.config();
        remove_stale(&ctx.matrix().profile_files());
        let signals = match prepare_signals(ctx, config.signal.profile_samples, scope).await {
            Ok(signals) => signals,
            Err(e) => {
                error!(group = self.name(), error = %e, "Cannot prepare profiling input");
                report.aborts_run = e.aborts_run();
                collector.record_failure(FailureRecord::from_error(self.name(), &e).fatal());
                return;
            }
        };

        for variant in ctx.matrix() {
            match profile_one(ctx, variant, signals.input()).await {
                Ok(artifact) => {
                    collector.record_completion(variant.label());
                    report.reports.push(artifact.trace.clone());
                    report.reports.push(artifact.report.clone());
                    report.profiles.push(artifact);
                }
                Err(e) if e.aborts_run() => {
                    error!(variant = variant.label(), error = %e, "Profiling aborted");
                    report.aborts_run = true;
                    collector.record_failure(
                        FailureRecord::from_error(self.name(), &e)
                            .for_variant(variant.label())
                            .fatal(),
                    );
                    return;
                }
                Err(e) => {
                    collector.record_failure(
                        FailureRecord::from_error(self.name(), &e).for_variant(variant.label()),
                    );
                }
            }
        }
    }
}

#[async_trait]
impl Stage for ProfileGroup {
    fn name(&self) -> &str {
        "profile"
    }

    fn kind(&self) -> GroupKind {
        GroupKind::Profile
    }

    fn is_enabled(&self, config: &PipelineConfiguration) -> bool {
        !config.skip_profile
    }

    async fn execute(&self, ctx: &StageContext) -> GroupReport {
        let timer = SpanTimer::start(self.name());
        group_started(ctx, self.kind()).await;

        let mut report = GroupReport::new(self.kind());
        let mut collector = FailureCollector::new(FailureMode::ContinueOnFailure);
        let scope = ArtifactScope::new("profile group");

        self.run_in_scope(ctx, &scope, &mut collector, &mut report).await;
        report.cleanup = scope.finish();

        let failed = collector.failures().len();
        if failed > 0 && !collector.has_fatal() {
            warn!(
                failed,
                profiled = collector.completed().len(),
                "Some variants could not be profiled"
            );
        }

        report.fatal = collector.has_fatal();
        report.status = if report.fatal || collector.completed().is_empty() {
            GroupStatus::Fail
        } else {
            GroupStatus::Ok
        };
        report.failures = collector.into_failures();
        report.duration_ms = timer.finish();
        group_completed(ctx, &report).await;
        report
    }
}

/// Reports from an earlier run must not survive a group that aborts early.
fn remove_stale(paths: &[PathBuf]) {
    let stale = cancellation::remove(paths);
    if !stale.removed.is_empty() {
        info!(files = stale.removed.len(), "Removed stale reports");
    }
}

async fn group_started(ctx: &StageContext, kind: GroupKind) {
    info!(group = %kind, variants = %ctx.matrix().label_list(), "Group started");
    ctx.events()
        .emit(
            events::GROUP_STARTED,
            Some(serde_json::json!({ "group": kind, "variants": ctx.matrix().labels() })),
        )
        .await;
}

async fn group_completed(ctx: &StageContext, report: &GroupReport) {
    ctx.events()
        .emit(
            events::CLEANUP_COMPLETED,
            Some(serde_json::json!({
                "group": report.kind,
                "removed": report.cleanup.removed.len(),
                "failed": report.cleanup.failed.len(),
            })),
        )
        .await;
    if !report.cleanup.is_clean() {
        warn!(group = %report.kind, failed = report.cleanup.failed.len(), "Some artifacts could not be removed");
    }

    info!(
        group = %report.kind,
        status = %report.status,
        duration_ms = report.duration_ms,
        "Group finished"
    );
    ctx.events()
        .emit(
            events::GROUP_COMPLETED,
            Some(serde_json::json!({
                "group": report.kind,
                "status": report.status,
                "duration_ms": report.duration_ms,
                "failures": report.failures.len(),
            })),
        )
        .await;
}
