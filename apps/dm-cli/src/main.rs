mod build;
mod config;
mod error;
mod report;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;

use dm_env::UpdaterRegistry;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::build::build_engine;
use crate::config::load_config;
use crate::error::CliResult;

#[derive(Parser)]
#[command(name = "dm-cli")]
#[command(about = "Dynamic model runner - steps component models against an environment", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a run configuration
    Validate {
        /// Path to the run YAML file
        config_path: PathBuf,
    },
    /// Build the model and step it
    Run {
        /// Path to the run YAML file
        config_path: PathBuf,
        /// Override the configured iteration count
        #[arg(long)]
        iterations: Option<u64>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Run {
            config_path,
            iterations,
            json,
        } => cmd_run(&config_path, iterations, json),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_validate(config_path: &Path) -> CliResult<()> {
    println!("Validating run config: {}", config_path.display());
    let config = load_config(config_path)?;
    let built = build_engine(&config, &UpdaterRegistry::default())?;
    println!(
        "✓ Config is valid ({} components, {} sensors)",
        built.ids.len(),
        config.sensors.len()
    );
    Ok(())
}

fn cmd_run(config_path: &Path, iterations: Option<u64>, json: bool) -> CliResult<()> {
    let config = load_config(config_path)?;
    let total = iterations.unwrap_or(config.iterations);
    let mut built = build_engine(&config, &UpdaterRegistry::default())?;
    let engine = &mut built.engine;

    info!(
        config = %config_path.display(),
        iterations = total,
        dt = config.time_step,
        "run started"
    );
    let start = Instant::now();
    let mut failures = Vec::new();
    let mut remaining = total;
    while remaining > 0 {
        let chunk = remaining.min(config.report_every);
        let report = engine.execute_model(chunk).inspect_err(|err| {
            if let Some(partial) = err.partial_report() {
                warn!(
                    completed = total - remaining + partial.iterations,
                    skipped_failures = failures.len() + partial.failures.len(),
                    "run stopped by the environment"
                );
            }
        })?;
        failures.extend(report.failures);
        remaining -= chunk;
        if !json {
            println!("{}", report::progress_line(engine));
        }
    }
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        failures = failures.len(),
        "run finished"
    );

    let summary = report::summarize(engine, &failures);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        report::print_summary(&summary);
    }
    Ok(())
}
