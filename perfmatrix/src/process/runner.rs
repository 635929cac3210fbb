//! The process runner seam.
//!
//! Every external tool the pipeline drives goes through `ProcessRunner`, so
//! tests can swap the operating system out for a scripted double.

use super::CommandSpec;
use crate::errors::ToolInvocationFailure;
use async_trait::async_trait;
use std::fmt::Debug;
use std::process::Stdio;
use std::time::Instant;
use tracing::debug;

/// Where a subprocess's standard output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdoutSink {
    /// Thrown away.
    Discard,
    /// Shared with this process.
    Inherit,
    /// Collected into `ExitOutcome::stdout`.
    Capture,
}

/// A successful invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitOutcome {
    /// Exit code (always zero for a returned outcome).
    pub code: i32,
    /// Standard output, empty unless the sink was `Capture`.
    pub stdout: String,
    /// Captured standard error. Tools often log progress here.
    pub stderr: String,
    /// Wall-clock duration of the invocation in milliseconds.
    pub duration_ms: f64,
}

/// Runs one external command to completion.
///
/// A nonzero exit or a failed launch is returned as a
/// `ToolInvocationFailure`; the caller decides how far it propagates.
#[async_trait]
pub trait ProcessRunner: Send + Sync + Debug {
    /// Runs `command`, waiting until it exits.
    async fn run(
        &self,
        command: &CommandSpec,
        stdout: StdoutSink,
    ) -> Result<ExitOutcome, ToolInvocationFailure>;
}

/// Runs commands as real child processes.
///
/// Children are killed if the awaiting future is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl SystemProcessRunner {
    /// Creates a new system process runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        stdout: StdoutSink,
    ) -> Result<ExitOutcome, ToolInvocationFailure> {
        let rendered = command.render();
        let mut cmd = command.to_tokio();
        cmd.stdin(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match &stdout {
            StdoutSink::Discard => {
                cmd.stdout(Stdio::null());
            }
            StdoutSink::Inherit => {
                cmd.stdout(Stdio::inherit());
            }
            StdoutSink::Capture => {
                cmd.stdout(Stdio::piped());
            }
        }

        debug!(command = %rendered, "Launching");
        let start = Instant::now();
        let output = cmd
            .output()
            .await
            .map_err(|e| ToolInvocationFailure::launch(&rendered, e.to_string()))?;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ToolInvocationFailure::exit(
                rendered,
                output.status.code(),
                stderr,
            ));
        }

        debug!(command = %rendered, duration_ms, "Finished");
        Ok(ExitOutcome {
            code: output.status.code().unwrap_or(0),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
            duration_ms,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::errors::ToolFailureKind;

    #[tokio::test]
    async fn test_success_captures_stderr() {
        let runner = SystemProcessRunner::new();
        let cmd = CommandSpec::new("sh").args(["-c", "echo oops >&2"]);

        let outcome = runner.run(&cmd, StdoutSink::Discard).await.unwrap();

        assert_eq!(outcome.code, 0);
        assert_eq!(outcome.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let runner = SystemProcessRunner::new();
        let cmd = CommandSpec::new("sh").args(["-c", "echo bad >&2; exit 3"]);

        let err = runner.run(&cmd, StdoutSink::Discard).await.unwrap_err();

        assert_eq!(err.kind, ToolFailureKind::NonZeroExit { code: Some(3) });
        assert_eq!(err.stderr.trim(), "bad");
        assert!(err.command.starts_with("sh -c"));
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_failure() {
        let runner = SystemProcessRunner::new();
        let cmd = CommandSpec::new("perfmatrix-definitely-not-a-program");

        let err = runner.run(&cmd, StdoutSink::Discard).await.unwrap_err();

        assert!(matches!(err.kind, ToolFailureKind::LaunchFailed { .. }));
    }

    #[tokio::test]
    async fn test_stdout_captured_only_on_request() {
        let runner = SystemProcessRunner::new();
        let cmd = CommandSpec::new("sh").args(["-c", "echo annotated"]);

        let captured = runner.run(&cmd, StdoutSink::Capture).await.unwrap();
        let discarded = runner.run(&cmd, StdoutSink::Discard).await.unwrap();

        assert_eq!(captured.stdout.trim(), "annotated");
        assert!(discarded.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_arguments_are_not_shell_expanded() {
        let runner = SystemProcessRunner::new();
        let cmd = CommandSpec::new("printf").args(["%s", "$(echo injected)"]);

        let outcome = runner.run(&cmd, StdoutSink::Capture).await.unwrap();

        assert_eq!(outcome.stdout, "$(echo injected)");
    }
}
