//! perfmatrix command-line entry point.

use anyhow::{Context, Result};
use clap::Parser;
use perfmatrix::cli::Cli;
use perfmatrix::events::LoggingEventSink;
use perfmatrix::observability::init_logging;
use perfmatrix::pipeline::PipelineController;
use perfmatrix::process::SystemProcessRunner;
use std::process::ExitCode;
use std::sync::Arc;

/// Exit code for errors that stop the run before any group starts.
const EXIT_SETUP_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "perfmatrix failed");
            eprintln!("Error: {err:#}");
            ExitCode::from(EXIT_SETUP_ERROR)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = cli.to_configuration()?;

    let controller = PipelineController::new(config, Arc::new(SystemProcessRunner::new()))
        .with_events(Arc::new(LoggingEventSink::default()));
    let summary = controller.run().await?;

    println!("{summary}");
    if let Some(path) = &cli.summary_json {
        let json = summary.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("writing run summary to {}", path.display()))?;
    }

    Ok(ExitCode::from(u8::try_from(summary.exit_code()).unwrap_or(1)))
}
