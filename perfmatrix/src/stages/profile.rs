//! Profiling one variant at a time.
//!
//! Each variant is rebuilt with debug information, run under the instruction
//! profiler, and its trace annotated into a text report. The binary and its
//! output data are gone before the next variant starts. The trace and the
//! report are the persistent artifacts.

use super::{build, StageContext};
use crate::cancellation::{self, ArtifactScope};
use crate::config::PipelineConfiguration;
use crate::core::Variant;
use crate::errors::{IoFailure, PerfMatrixError, ToolInvocationFailure};
use crate::events;
use crate::process::{CommandSpec, StdoutSink};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The persistent output of profiling one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileArtifact {
    /// Variant label.
    pub label: String,
    /// Raw profiler trace.
    pub trace: PathBuf,
    /// Human-readable annotated report.
    pub report: PathBuf,
}

/// The profiler invocation for `variant` reading `input`.
#[must_use]
pub fn profiler_command(config: &PipelineConfiguration, variant: &Variant, input: &Path) -> CommandSpec {
    let mut out_file = std::ffi::OsString::from("--callgrind-out-file=");
    out_file.push(variant.trace());
    config
        .profiler
        .command()
        .arg(out_file)
        .arg(variant.binary())
        .arg(input)
        .arg(variant.output())
}

/// The annotator invocation for `variant`'s trace. Its stdout is the report.
#[must_use]
pub fn annotator_command(config: &PipelineConfiguration, variant: &Variant) -> CommandSpec {
    config.annotator.command().arg(variant.trace())
}

/// Builds, profiles and annotates one variant.
///
/// Leftover traces or reports for this variant are removed first. On failure
/// any partial trace or report is removed as well, and the binary and output
/// data go in every case.
///
/// # Errors
///
/// Returns `Build` if the debug build fails, `ToolInvocation` if the
/// profiler or annotator fails, and `Io` if the report cannot be written.
pub async fn profile_one(
    ctx: &StageContext,
    variant: &Variant,
    input: &Path,
) -> Result<ProfileArtifact, PerfMatrixError> {
    let label = variant.label();
    let scope = ArtifactScope::new(format!("profile {label}"));
    scope.register_all(variant.transient_files());
    scope.register(variant.trace());
    scope.register(variant.annotated_report());

    let stale = cancellation::remove(&[variant.trace(), variant.annotated_report()]);
    if !stale.removed.is_empty() {
        info!(variant = label, files = stale.removed.len(), "Removed stale profile output");
    }

    match profile_in_scope(ctx, variant, input).await {
        Ok(artifact) => {
            scope.keep(variant.trace());
            scope.keep(variant.annotated_report());
            scope.finish();
            info!(variant = label, report = %artifact.report.display(), "Profiled");
            ctx.events()
                .emit(
                    events::PROFILE_COMPLETED,
                    Some(serde_json::json!({
                        "label": label,
                        "trace": artifact.trace.display().to_string(),
                        "report": artifact.report.display().to_string(),
                    })),
                )
                .await;
            Ok(artifact)
        }
        Err(e) => {
            let cleanup = scope.finish();
            warn!(
                variant = label,
                error = %e,
                removed = cleanup.removed.len(),
                "Profiling failed"
            );
            ctx.events()
                .emit(
                    events::PROFILE_FAILED,
                    Some(serde_json::json!({ "label": label, "error_type": e.error_type() })),
                )
                .await;
            Err(e)
        }
    }
}

async fn profile_in_scope(
    ctx: &StageContext,
    variant: &Variant,
    input: &Path,
) -> Result<ProfileArtifact, PerfMatrixError> {
    build(ctx, variant, true).await?;

    let profiler = profiler_command(ctx.config(), variant, input);
    ctx.runner().run(&profiler, StdoutSink::Discard).await?;
    if !variant.trace().is_file() {
        return Err(ToolInvocationFailure::invalid_output(
            profiler.render(),
            format!("profiler did not write {}", variant.trace().display()),
        )
        .into());
    }

    let annotator = annotator_command(ctx.config(), variant);
    let annotated = ctx.runner().run(&annotator, StdoutSink::Capture).await?;
    std::fs::write(variant.annotated_report(), annotated.stdout)
        .map_err(|e| IoFailure::access("write", variant.annotated_report(), e))?;

    Ok(ProfileArtifact {
        label: variant.label().to_string(),
        trace: variant.trace().to_path_buf(),
        report: variant.annotated_report().to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OptLevel;
    use crate::testing::{ScriptedRunner, TestWorkspace};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn variant(ctx: &StageContext, level: OptLevel) -> Variant {
        Variant::new(level, ctx.layout())
    }

    #[test]
    fn test_profiler_and_annotator_commands() {
        let config = PipelineConfiguration::new()
            .with_target("/w")
            .with_executable("filt");
        let v = Variant::new(OptLevel::O3, &config.layout());

        assert_eq!(
            profiler_command(&config, &v, Path::new("/s/ts_sine.dat")).render(),
            "valgrind --tool=callgrind --callgrind-out-file=/w/filt_O3.out /w/filt_O3 /s/ts_sine.dat /w/filt_O3.dat"
        );
        assert_eq!(
            annotator_command(&config, &v).render(),
            "callgrind_annotate /w/filt_O3.out"
        );
    }

    #[tokio::test]
    async fn test_profile_keeps_only_trace_and_report() {
        let ws = TestWorkspace::new();
        let runner = Arc::new(ScriptedRunner::new());
        let ctx = ws.context(ws.config(), runner.clone());
        let input = ws.write_signal("sine");
        let v = variant(&ctx, OptLevel::O2);

        let artifact = profile_one(&ctx, &v, &input).await.unwrap();

        assert!(artifact.trace.is_file());
        assert!(std::fs::read_to_string(&artifact.report)
            .unwrap()
            .contains("Ir"));
        assert!(!v.binary().exists());
        assert!(!v.output().exists());
        assert!(runner.invocations_of("gcc")[0].has_arg("-g"));
    }

    #[tokio::test]
    async fn test_annotator_failure_removes_partial_output() {
        let ws = TestWorkspace::new();
        let runner = Arc::new(ScriptedRunner::new().fail_on("callgrind_annotate", &[]));
        let ctx = ws.context(ws.config(), runner);
        let input = ws.write_signal("sine");
        let v = variant(&ctx, OptLevel::O0);

        let err = profile_one(&ctx, &v, &input).await.unwrap_err();

        assert!(matches!(err, PerfMatrixError::ToolInvocation(_)));
        assert!(!v.trace().exists());
        assert!(!v.annotated_report().exists());
        assert!(!v.binary().exists());
    }

    #[tokio::test]
    async fn test_build_failure_skips_profiler() {
        let ws = TestWorkspace::new();
        let runner = Arc::new(ScriptedRunner::new().fail_on("gcc", &["-O0"]));
        let ctx = ws.context(ws.config(), runner.clone());
        let input = ws.write_signal("sine");
        let v = variant(&ctx, OptLevel::O0);

        let err = profile_one(&ctx, &v, &input).await.unwrap_err();

        assert!(matches!(err, PerfMatrixError::Build(_)));
        assert!(runner.invocations_of("valgrind").is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_report_is_io_failure() {
        let ws = TestWorkspace::new();
        let runner = Arc::new(ScriptedRunner::new());
        let ctx = ws.context(ws.config(), runner);
        let input = ws.write_signal("sine");
        let v = variant(&ctx, OptLevel::O0);
        std::fs::create_dir(v.annotated_report()).unwrap();

        let err = profile_one(&ctx, &v, &input).await.unwrap_err();

        assert!(matches!(err, PerfMatrixError::Io(IoFailure::Access { .. })));
        assert!(err.aborts_run());
        assert!(!v.trace().exists());
        assert!(!v.binary().exists());
    }

    #[tokio::test]
    async fn test_stale_trace_is_replaced() {
        let ws = TestWorkspace::new();
        let runner = Arc::new(ScriptedRunner::new().fail_on("valgrind", &[]));
        let ctx = ws.context(ws.config(), runner);
        let input = ws.write_signal("sine");
        let v = variant(&ctx, OptLevel::O2);
        std::fs::write(v.trace(), "stale").unwrap();

        assert!(profile_one(&ctx, &v, &input).await.is_err());
        assert!(!v.trace().exists());
    }
}
