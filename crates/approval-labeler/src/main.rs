//! CLI entry point for approval-labeler
//!
//! Run `approval-labeler --help` for usage information.

use std::process::ExitCode;

use anyhow::{Context, Result};
use approval_labeler::outputs::{emit_error, emit_warning};
use approval_labeler::run::MISSING_NUMBER_WARNING;
use approval_labeler::{run, Config, GitHubClient, RunOutcome};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize tracing; stdout is reserved for workflow commands
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    match try_main(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Run failed");
            emit_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn try_main(config: &Config) -> Result<()> {
    tracing::debug!(?config, "Loaded configuration");

    let client = GitHubClient::new(&config.api_url, config.token()?)?;

    match run(config, &client).await? {
        RunOutcome::Completed(outputs) => outputs
            .write(config.output_file())
            .context("Failed to write step outputs")?,
        RunOutcome::Skipped => emit_warning(MISSING_NUMBER_WARNING),
    }

    Ok(())
}
