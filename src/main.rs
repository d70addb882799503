//! tasker - CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tasker::{load_config, run_config, TaskRegistry};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Executes a series of tasks from a JSON config file.
#[derive(Parser)]
#[command(name = "tasker", version, about)]
struct Cli {
    /// Path to the JSON file containing the tasks to execute
    config: PathBuf,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tasker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let registry = TaskRegistry::builtin();

    info!("Loading config file {}...", cli.config.display());
    let mut config = load_config(&cli.config, &registry)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    info!("Running configuration...");
    if !run_config(&mut config) {
        return Ok(ExitCode::FAILURE);
    }

    info!("Done!");
    Ok(ExitCode::SUCCESS)
}
