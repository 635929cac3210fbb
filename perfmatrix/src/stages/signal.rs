//! Input signal preparation.
//!
//! The generator is an external program. It is run with the configured
//! sample rate and count and must leave `ts_<kind>.dat` files behind in the
//! signal directory. With signal generation skipped, the input file has to
//! exist already and is never deleted.

use super::StageContext;
use crate::cancellation::ArtifactScope;
use crate::config::PipelineConfiguration;
use crate::errors::{IoFailure, PerfMatrixError};
use crate::events;
use crate::process::{CommandSpec, StdoutSink};
use std::path::{Path, PathBuf};
use tracing::info;

/// Signal files available to one stage group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalFiles {
    input: PathBuf,
    generated: Vec<PathBuf>,
}

impl SignalFiles {
    /// The file every variant reads.
    #[must_use]
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Files this run created. Empty when pre-existing files were used.
    #[must_use]
    pub fn generated(&self) -> &[PathBuf] {
        &self.generated
    }
}

/// The generator invocation for `num_samples` samples.
#[must_use]
pub fn signal_command(config: &PipelineConfiguration, num_samples: u32) -> CommandSpec {
    let signal = &config.signal;
    signal
        .generator
        .command()
        .arg("--sample-rate")
        .arg(signal.sample_rate.to_string())
        .arg("--num-samples")
        .arg(num_samples.to_string())
        .current_dir(&signal.directory)
}

/// Runs the generator, registering its files with `scope` before launch.
///
/// # Errors
///
/// Returns `ToolInvocation` if the generator fails and `Io` if it exits
/// cleanly without writing the input file.
pub async fn generate_signals(
    ctx: &StageContext,
    num_samples: u32,
    scope: &ArtifactScope,
) -> Result<SignalFiles, PerfMatrixError> {
    let config = ctx.config();
    let generated = config.signal.generated_paths();
    scope.register_all(generated.iter().cloned());

    let command = signal_command(config, num_samples);
    info!(
        samples = num_samples,
        sample_rate = config.signal.sample_rate,
        "Generating test signals"
    );
    ctx.runner().run(&command, StdoutSink::Discard).await?;

    let input = config.signal.input_path();
    if !input.is_file() {
        return Err(IoFailure::missing(input).into());
    }

    ctx.events()
        .emit(
            events::SIGNALS_GENERATED,
            Some(serde_json::json!({
                "samples": num_samples,
                "files": generated.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            })),
        )
        .await;

    Ok(SignalFiles { input, generated })
}

/// Uses an input file that is already on disk.
///
/// # Errors
///
/// Returns `IoFailure::MissingInput` if the file does not exist.
pub fn ensure_signal_input(config: &PipelineConfiguration) -> Result<SignalFiles, IoFailure> {
    let input = config.signal.input_path();
    if !input.is_file() {
        return Err(IoFailure::missing(input));
    }
    info!(input = %input.display(), "Using existing test signal");
    Ok(SignalFiles {
        input,
        generated: Vec::new(),
    })
}

/// Generates signals or falls back to existing ones, per `skip_signal_gen`.
///
/// # Errors
///
/// See `generate_signals` and `ensure_signal_input`.
pub async fn prepare_signals(
    ctx: &StageContext,
    num_samples: u32,
    scope: &ArtifactScope,
) -> Result<SignalFiles, PerfMatrixError> {
    if ctx.config().skip_signal_gen {
        Ok(ensure_signal_input(ctx.config())?)
    } else {
        generate_signals(ctx, num_samples, scope).await
    }
}
