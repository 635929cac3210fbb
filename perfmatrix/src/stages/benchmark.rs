//! Timing every variant in one benchmarking tool invocation.
//!
//! The tool is handed a single command template with a `{label}` parameter
//! and the comma-separated label list, so all variants are measured under the
//! same conditions and land in one comparative report.

use super::{BenchmarkReport, StageContext};
use crate::cancellation;
use crate::config::PipelineConfiguration;
use crate::core::{ArtifactLayout, VariantMatrix, LABEL_PARAMETER, LABEL_PLACEHOLDER};
use crate::errors::ToolInvocationFailure;
use crate::events;
use crate::process::{shell_quote, CommandSpec, StdoutSink};
use std::path::Path;
use tracing::{info, warn};

/// The command template run for every label.
///
/// The benchmarking tool runs this through its own shell, so every path is
/// quoted. The `{label}` placeholder survives quoting.
#[must_use]
pub fn command_template(layout: &ArtifactLayout, input: &Path) -> String {
    [
        layout.binary_template(),
        input.to_path_buf(),
        layout.output_template(),
    ]
    .iter()
    .map(|p| shell_quote(&p.to_string_lossy()))
    .collect::<Vec<_>>()
    .join(" ")
}

/// The benchmarking tool invocation for the whole matrix.
#[must_use]
pub fn benchmark_command(
    config: &PipelineConfiguration,
    layout: &ArtifactLayout,
    matrix: &VariantMatrix,
    input: &Path,
) -> CommandSpec {
    let settings = &config.benchmark;
    settings
        .tool
        .command()
        .arg("--warmup")
        .arg(settings.warmup.to_string())
        .arg("--runs")
        .arg(settings.runs.to_string())
        .arg("--parameter-list")
        .arg(LABEL_PARAMETER)
        .arg(matrix.label_list())
        .arg("--command-name")
        .arg(LABEL_PLACEHOLDER)
        .arg("--export-markdown")
        .arg(layout.perf_report())
        .arg(command_template(layout, input))
}

/// Benchmarks every built variant against `input`.
///
/// Any report left by an earlier run is removed first. If the tool fails or
/// its report does not hold exactly one row per variant, the report is
/// removed again so a failed run never leaves one behind.
///
/// # Errors
///
/// Returns the tool failure, or `InvalidOutput` for an unreadable or
/// mismatched report.
pub async fn run_benchmark(
    ctx: &StageContext,
    input: &Path,
) -> Result<BenchmarkReport, ToolInvocationFailure> {
    let layout = ctx.layout();
    let matrix = ctx.matrix();
    let report_path = layout.perf_report();
    let stale = cancellation::remove(&[&report_path]);
    if !stale.removed.is_empty() {
        info!(path = %report_path.display(), "Removed stale report");
    }

    let command = benchmark_command(ctx.config(), layout, matrix, input);
    ctx.events()
        .emit(
            events::BENCHMARK_STARTED,
            Some(serde_json::json!({
                "variants": matrix.labels(),
                "runs": ctx.config().benchmark.runs,
            })),
        )
        .await;
    info!(variants = %matrix.label_list(), "Benchmarking");

    let result = ctx
        .runner()
        .run(&command, StdoutSink::Inherit)
        .await
        .and_then(|_| {
            BenchmarkReport::read(&report_path)
                .and_then(|report| report.verify_labels(&matrix.labels()).map(|()| report))
                .map_err(|e| ToolInvocationFailure::invalid_output(command.render(), e.to_string()))
        });

    match result {
        Ok(report) => {
            if let Some(fastest) = report.fastest() {
                info!(
                    fastest = %fastest.label,
                    mean = fastest.mean,
                    unit = %report.unit,
                    report = %report_path.display(),
                    "Benchmark finished"
                );
            }
            ctx.events()
                .emit(
                    events::BENCHMARK_COMPLETED,
                    Some(serde_json::json!({
                        "report": report_path.display().to_string(),
                        "rows": report.rows.len(),
                    })),
                )
                .await;
            Ok(report)
        }
        Err(failure) => {
            warn!(error = %failure.kind, "Benchmark failed, discarding report");
            cancellation::remove(&[&report_path]);
            Err(failure)
        }
    }
}
