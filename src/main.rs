// petribench - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. Configuration loading and command-line overrides
// 3. Logging initialisation (debug mode support)
// 4. The batch run and its summary

use clap::Parser;
use petribench::app::backend::NativeBackend;
use petribench::app::driver::Driver;
use petribench::platform::config::{self, PlatformPaths};
use petribench::util;
use std::path::PathBuf;
use std::process::ExitCode;

/// petribench - batch conformance checking of discovered process models.
///
/// For every event log in the logs directory and every approach directory
/// under the models directory, checks the approach's Petri net for soundness,
/// computes fitness, precision, f-score, generalization and simplicity, and
/// appends them to the process's result table. Approaches already present in
/// a table are skipped.
#[derive(Parser, Debug)]
#[command(name = "petribench", version, about)]
struct Cli {
    /// Configuration file (default: ./petribench.toml, then the platform
    /// config directory).
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Directory with one event log per process.
    #[arg(long = "logs")]
    logs: Option<PathBuf>,

    /// Directory with one subdirectory of models per approach.
    #[arg(long = "models")]
    models: Option<PathBuf>,

    /// Directory receiving one result table per process.
    #[arg(long = "results")]
    results: Option<PathBuf>,

    /// Worker threads (0 = one per CPU).
    #[arg(short = 'j', long = "workers")]
    workers: Option<usize>,

    /// Also write the run summary as JSON to this file.
    #[arg(long = "summary")]
    summary: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let platform_paths = PlatformPaths::resolve();
    let (mut bench_config, config_warnings) =
        match config::load_config(cli.config.as_deref(), &platform_paths) {
            Ok(loaded) => loaded,
            Err(e) => {
                util::logging::init(cli.debug, None);
                tracing::error!(error = %e, "Cannot load configuration");
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        };

    util::logging::init(cli.debug, bench_config.log_level.as_deref());
    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Configuration warning");
    }

    // Command-line overrides
    if let Some(logs) = cli.logs {
        bench_config.logs_root = logs;
    }
    if let Some(models) = cli.models {
        bench_config.models_root = models;
    }
    if let Some(results) = cli.results {
        bench_config.results_root = results;
    }
    if let Some(workers) = cli.workers {
        match config::validate_worker_threads(workers) {
            Ok(workers) => bench_config.worker_threads = workers,
            Err(e) => {
                tracing::error!(error = %e, "Invalid --workers value");
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    tracing::info!(
        version = util::constants::APP_VERSION,
        logs = %bench_config.logs_root.display(),
        models = %bench_config.models_root.display(),
        results = %bench_config.results_root.display(),
        "petribench starting"
    );

    let backend = NativeBackend::from_config(&bench_config);
    let driver = Driver::new(bench_config, backend);

    let summary = match driver.run() {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("{summary}");

    if let Some(path) = cli.summary {
        if let Err(e) = summary.write_json(&path) {
            // The result tables are already written; report and carry on.
            tracing::error!(error = %e, "Cannot write run summary");
            eprintln!("Warning: {e}");
        }
    }

    ExitCode::SUCCESS
}
