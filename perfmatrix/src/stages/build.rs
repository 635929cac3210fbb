//! Compiling variants.

use super::StageContext;
use crate::config::PipelineConfiguration;
use crate::core::{ArtifactLayout, Variant};
use crate::errors::{BuildFailure, BuildMatrixFailure, ToolInvocationFailure};
use crate::events;
use crate::process::{CommandSpec, StdoutSink};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A binary that was compiled and found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryArtifact {
    /// Variant label.
    pub label: &'static str,
    /// Path of the binary.
    pub path: PathBuf,
    /// Whether debug information was requested.
    pub debug: bool,
}

impl BinaryArtifact {
    /// Path of the binary.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The compiler invocation for one variant.
///
/// Base flags come first, then the debug flags when `with_debug` is set, then
/// the optimization flag, output and source.
#[must_use]
pub fn build_command(
    config: &PipelineConfiguration,
    layout: &ArtifactLayout,
    variant: &Variant,
    with_debug: bool,
) -> CommandSpec {
    let mut cmd = config.compiler.command();
    if with_debug {
        cmd = cmd.args(&config.debug_flags);
    }
    cmd.arg(variant.level().compiler_flag())
        .arg("-o")
        .arg(variant.binary())
        .arg(layout.source())
}

/// Compiles one variant.
///
/// # Errors
///
/// Returns a `BuildFailure` if the compiler fails or exits cleanly without
/// producing the binary.
pub async fn build(
    ctx: &StageContext,
    variant: &Variant,
    with_debug: bool,
) -> Result<BinaryArtifact, BuildFailure> {
    let label = variant.label();
    let command = build_command(ctx.config(), ctx.layout(), variant, with_debug);

    let result = ctx
        .runner()
        .run(&command, StdoutSink::Discard)
        .await
        .and_then(|outcome| {
            if variant.binary().is_file() {
                Ok(outcome)
            } else {
                Err(ToolInvocationFailure::invalid_output(
                    command.render(),
                    format!("compiler did not produce {}", variant.binary().display()),
                ))
            }
        });

    match result {
        Ok(outcome) => {
            info!(variant = label, duration_ms = outcome.duration_ms, "Built");
            ctx.events()
                .emit(
                    events::BUILD_COMPLETED,
                    Some(serde_json::json!({
                        "label": label,
                        "debug": with_debug,
                        "duration_ms": outcome.duration_ms,
                    })),
                )
                .await;
            Ok(BinaryArtifact {
                label,
                path: variant.binary().to_path_buf(),
                debug: with_debug,
            })
        }
        Err(source) => {
            warn!(variant = label, error = %source.kind, "Build failed");
            ctx.events()
                .emit(
                    events::BUILD_FAILED,
                    Some(serde_json::json!({ "label": label, "command": source.command })),
                )
                .await;
            Err(BuildFailure::new(label, source))
        }
    }
}

/// Compiles every variant of the matrix.
///
/// All variants are attempted even after one fails, so the error lists every
/// broken label. Artifacts come back in matrix order.
///
/// # Errors
///
/// Returns a `BuildMatrixFailure` if any variant failed.
pub async fn build_matrix(
    ctx: &StageContext,
    with_debug: bool,
    parallel: bool,
) -> Result<Vec<BinaryArtifact>, BuildMatrixFailure> {
    let matrix = ctx.matrix();
    let results = if parallel {
        join_all(matrix.iter().map(|variant| build(ctx, variant, with_debug))).await
    } else {
        let mut results = Vec::with_capacity(matrix.len());
        for variant in matrix {
            results.push(build(ctx, variant, with_debug).await);
        }
        results
    };

    let mut artifacts = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(artifact) => artifacts.push(artifact),
            Err(failure) => failures.push(failure),
        }
    }

    if failures.is_empty() {
        Ok(artifacts)
    } else {
        Err(BuildMatrixFailure {
            failures,
            total: matrix.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OptLevel;
    use crate::errors::ToolFailureKind;
    use crate::testing::{ScriptedRunner, TestWorkspace};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_build_command_layout() {
        let config = PipelineConfiguration::new()
            .with_target("/w")
            .with_executable("filt");
        let layout = config.layout();
        let variant = Variant::new(OptLevel::O2, &layout);

        let release = build_command(&config, &layout, &variant, false);
        assert_eq!(
            release.render(),
            "gcc -Wall -Werror -march=native -msoft-float -std=c99 -pedantic -O2 -o /w/filt_O2 /w/filt.c"
        );

        let debug = build_command(&config, &layout, &variant, true);
        assert!(debug.has_arg("-g"));
        assert!(!release.has_arg("-g"));
    }

    #[tokio::test]
    async fn test_build_produces_binary() {
        let ws = TestWorkspace::new();
        let runner = Arc::new(ScriptedRunner::new());
        let ctx = ws.context(ws.config(), runner);
        let variant = ctx.matrix().iter().next().unwrap().clone();

        let artifact = build(&ctx, &variant, true).await.unwrap();

        assert_eq!(artifact.label, "O0");
        assert!(artifact.debug);
        assert!(artifact.path().is_file());
    }

    #[tokio::test]
    async fn test_compiler_exit_without_binary_is_failure() {
        let ws = TestWorkspace::new();
        let runner = Arc::new(ScriptedRunner::new().without_compiler_output());
        let ctx = ws.context(ws.config(), runner);
        let variant = ctx.matrix().iter().next().unwrap().clone();

        let failure = build(&ctx, &variant, false).await.unwrap_err();

        assert_eq!(failure.label, "O0");
        assert!(matches!(
            failure.source.kind,
            ToolFailureKind::InvalidOutput { .. }
        ));
    }

    #[tokio::test]
    async fn test_matrix_reports_every_failed_label() {
        let ws = TestWorkspace::new();
        let runner = Arc::new(ScriptedRunner::new().fail_on("gcc", &["-O2"]));
        let config = ws
            .config()
            .with_variants([OptLevel::O0, OptLevel::O2, OptLevel::O3]);
        let ctx = ws.context(config, runner.clone());

        let failure = build_matrix(&ctx, false, true).await.unwrap_err();

        assert_eq!(failure.labels(), vec!["O2"]);
        assert_eq!(failure.total, 3);
        assert_eq!(runner.invocations_of("gcc").len(), 3);
    }

    #[tokio::test]
    async fn test_sequential_matrix_keeps_order() {
        let ws = TestWorkspace::new();
        let runner = Arc::new(ScriptedRunner::new());
        let config = ws.config().with_variants([OptLevel::O3, OptLevel::O0]);
        let ctx = ws.context(config, runner.clone());

        let artifacts = build_matrix(&ctx, false, false).await.unwrap();

        let labels: Vec<_> = artifacts.iter().map(|a| a.label).collect();
        assert_eq!(labels, vec!["O3", "O0"]);
        let flags: Vec<_> = runner
            .invocations_of("gcc")
            .iter()
            .map(|cmd| cmd.has_arg("-O3"))
            .collect();
        assert_eq!(flags, vec![true, false]);
    }
}
