// petribench - app/driver.rs
//
// Batch driver: discovers logs and approaches, imports each log once and
// dispatches one analyzer unit per approach onto a bounded worker pool.
//
// Architecture:
//   - Logs are imported sequentially on the calling thread in sorted order.
//     Units for a log are spawned as soon as it is imported; the driver moves
//     on to the next log without waiting for them.
//   - Each imported log is shared by its units through an `Arc` and dropped
//     once the last of them finishes.
//   - Units report back over an mpsc channel. The run returns only after the
//     pool scope has joined every unit.
//   - A log that fails to import is recorded and skipped; the run continues.

use crate::app::analyzer::{analyze_approach, Unit, UnitOutcome, UnitStatus};
use crate::app::backend::ConformanceBackend;
use crate::core::discovery::{self, DiscoveryConfig};
use crate::core::results::ResultStore;
use crate::platform::config::BenchConfig;
use crate::util::error::PetriBenchError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::Instant;

/// A log that could not be imported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogFailure {
    pub process: String,
    pub path: PathBuf,
    pub error: String,
}

/// Everything that happened during one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub logs: usize,
    pub approaches: usize,
    pub recorded: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub failed: usize,
    pub log_failures: Vec<LogFailure>,
    /// Non-fatal discovery warnings.
    pub warnings: Vec<String>,
    /// One entry per dispatched unit, sorted by process then approach.
    pub outcomes: Vec<UnitOutcome>,
}

impl RunSummary {
    /// Write the summary as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), PetriBenchError> {
        let io_error = |source: std::io::Error| PetriBenchError::Io {
            path: path.to_path_buf(),
            operation: "write run summary",
            source,
        };
        let file = File::create(path).map_err(io_error)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| io_error(e.into()))?;
        tracing::info!(path = %path.display(), "Run summary written");
        Ok(())
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} logs x {} approaches: {} recorded, {} skipped, {} rejected, {} failed, \
             {} log import failures ({:.1}s)",
            self.logs,
            self.approaches,
            self.recorded,
            self.skipped,
            self.rejected,
            self.failed,
            self.log_failures.len(),
            self.elapsed_ms as f64 / 1000.0,
        )
    }
}

/// Runs the whole log x approach matrix for one configuration.
pub struct Driver<B: ConformanceBackend> {
    config: BenchConfig,
    backend: B,
    store: ResultStore,
}

impl<B: ConformanceBackend> Driver<B> {
    pub fn new(config: BenchConfig, backend: B) -> Self {
        let store = ResultStore::new(config.results_root.clone());
        Self {
            config,
            backend,
            store,
        }
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Analyse every (log, approach) pair.
    ///
    /// Only missing roots and pool start-up are fatal; everything else is
    /// reported in the summary.
    pub fn run(&self) -> Result<RunSummary, PetriBenchError> {
        let started_at = Utc::now();
        let start = Instant::now();

        let discovery_config = DiscoveryConfig {
            log_patterns: self.config.log_patterns.clone(),
            model_extension: self.config.model_extension.clone(),
        };
        let (logs, mut warnings) =
            discovery::discover_logs(&self.config.logs_root, &discovery_config)?;
        let (approaches, approach_warnings) =
            discovery::discover_approaches(&self.config.models_root)?;
        warnings.extend(approach_warnings);
        for warning in &warnings {
            tracing::warn!(warning = %warning, "Discovery warning");
        }

        tracing::info!(
            logs = logs.len(),
            approaches = approaches.len(),
            workers = self.config.worker_threads,
            "Run started"
        );
        if approaches.is_empty() {
            tracing::warn!(
                root = %self.config.models_root.display(),
                "No approach directories found"
            );
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads)
            .thread_name(|i| format!("petribench-worker-{i}"))
            .build()
            .map_err(|source| PetriBenchError::ThreadPool { source })?;

        let (tx, rx) = mpsc::channel::<UnitOutcome>();
        let mut log_failures = Vec::new();

        pool.in_place_scope(|scope| {
            for log_file in &logs {
                let process = &log_file.process_name;
                tracing::info!(
                    process = %process,
                    file = %log_file.path.display(),
                    "Importing event log"
                );

                let log = match self.backend.import_log(&log_file.path) {
                    Ok(log) => Arc::new(log),
                    Err(e) => {
                        tracing::error!(
                            process = %process,
                            error = %e,
                            "Cannot import event log, skipping process"
                        );
                        log_failures.push(LogFailure {
                            process: process.clone(),
                            path: log_file.path.clone(),
                            error: e.to_string(),
                        });
                        continue;
                    }
                };

                for approach in &approaches {
                    let unit = Unit {
                        process: process.clone(),
                        approach: approach.clone(),
                        model_path: discovery::model_path(
                            &self.config.models_root,
                            approach,
                            process,
                            &discovery_config.model_extension,
                        ),
                    };
                    let log = Arc::clone(&log);
                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        let outcome = analyze_approach(&self.backend, &self.store, &*log, &unit);
                        if tx.send(outcome).is_err() {
                            tracing::warn!(
                                process = %unit.process,
                                approach = %unit.approach,
                                "Outcome receiver dropped"
                            );
                        }
                    });
                }
            }
        });
        drop(tx);

        let mut outcomes: Vec<UnitOutcome> = rx.into_iter().collect();
        outcomes.sort_by(|a, b| (&a.process, &a.approach).cmp(&(&b.process, &b.approach)));

        let count = |wanted: fn(&UnitStatus) -> bool| {
            outcomes.iter().filter(|o| wanted(&o.status)).count()
        };
        let recorded = count(|s| matches!(s, UnitStatus::Recorded { .. }));
        let skipped = count(|s| matches!(s, UnitStatus::Skipped));
        let rejected = count(|s| matches!(s, UnitStatus::Rejected { .. }));
        let failed = count(|s| matches!(s, UnitStatus::Failed { .. }));

        let summary = RunSummary {
            started_at,
            elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            logs: logs.len(),
            approaches: approaches.len(),
            recorded,
            skipped,
            rejected,
            failed,
            log_failures,
            warnings,
            outcomes,
        };

        tracing::info!(summary = %summary, "Run complete");
        Ok(summary)
    }
}
