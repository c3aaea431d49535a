// petribench - app/analyzer.rs
//
// One (process, approach) unit of work:
//
//   skip check -> import model -> soundness gate -> metrics -> append row
//
// Every failure ends the unit with a terminal status; nothing propagates to
// sibling units or the driver. Panics inside a unit are caught and reported
// as failures too.

use crate::app::backend::ConformanceBackend;
use crate::core::model::MetricRecord;
use crate::core::results::{Appended, ResultStore};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Instant;

/// The (process, approach) pair a unit analyses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unit {
    pub process: String,
    pub approach: String,
    pub model_path: PathBuf,
}

/// Terminal state of a unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
    /// A row for this approach already exists; nothing was done.
    Skipped,

    /// The model is not a sound workflow net. No row was written.
    Rejected { reason: String },

    /// Metrics were computed and appended.
    Recorded { record: MetricRecord },

    /// Import, persistence or an unexpected panic ended the unit.
    Failed { error: String },
}

impl UnitStatus {
    /// Short lowercase name used in logs and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Rejected { .. } => "rejected",
            Self::Recorded { .. } => "recorded",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Result of one unit, sent back to the driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitOutcome {
    pub process: String,
    pub approach: String,
    #[serde(flatten)]
    pub status: UnitStatus,
    pub elapsed_ms: u64,
}

/// Run one unit to a terminal state.
pub fn analyze_approach<B: ConformanceBackend>(
    backend: &B,
    store: &ResultStore,
    log: &B::Log,
    unit: &Unit,
) -> UnitOutcome {
    let start = Instant::now();

    let status = panic::catch_unwind(AssertUnwindSafe(|| run_unit(backend, store, log, unit)))
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            tracing::error!(
                process = %unit.process,
                approach = %unit.approach,
                panic = %message,
                "Analysis panicked"
            );
            UnitStatus::Failed {
                error: format!("analysis panicked: {message}"),
            }
        });

    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    tracing::debug!(
        process = %unit.process,
        approach = %unit.approach,
        status = status.label(),
        elapsed_ms,
        "Unit finished"
    );

    UnitOutcome {
        process: unit.process.clone(),
        approach: unit.approach.clone(),
        status,
        elapsed_ms,
    }
}

fn run_unit<B: ConformanceBackend>(
    backend: &B,
    store: &ResultStore,
    log: &B::Log,
    unit: &Unit,
) -> UnitStatus {
    let (process, approach) = (unit.process.as_str(), unit.approach.as_str());

    match store.is_already_analyzed(process, approach) {
        Ok(true) => {
            tracing::info!(process, approach, "Already analyzed, skipping");
            return UnitStatus::Skipped;
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!(process, approach, error = %e, "Cannot read result table");
            return UnitStatus::Failed {
                error: e.to_string(),
            };
        }
    }

    tracing::info!(process, approach, model = %unit.model_path.display(), "Analyzing approach");

    let model = match backend.import_model(&unit.model_path) {
        Ok(model) => model,
        Err(e) => {
            tracing::error!(process, approach, error = %e, "Cannot import model");
            return UnitStatus::Failed {
                error: e.to_string(),
            };
        }
    };

    if let Err(reason) = backend.check_sound(&model) {
        tracing::warn!(process, approach, reason = %reason, "Model is not sound, skipping");
        return UnitStatus::Rejected {
            reason: reason.to_string(),
        };
    }

    let metrics = backend.compute_metrics(log, &model);
    let record = MetricRecord::new(approach, metrics);

    match store.append(process, &record) {
        Ok(Appended::Written) => {}
        Ok(Appended::AlreadyPresent) => {
            tracing::info!(process, approach, "Recorded by another unit meanwhile, skipping");
            return UnitStatus::Skipped;
        }
        Err(e) => {
            tracing::error!(process, approach, error = %e, "Cannot record metrics");
            return UnitStatus::Failed {
                error: e.to_string(),
            };
        }
    }

    tracing::info!(
        process,
        approach,
        fitness = record.fitness,
        precision = record.precision,
        f_score = record.f_score,
        generalization = record.generalization,
        simplicity = record.simplicity,
        "Metrics recorded"
    );
    UnitStatus::Recorded { record }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Metrics;
    use crate::util::error::{ImportError, SoundnessError};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Models are the file stem of the model path; behaviour is keyed on it.
    #[derive(Default)]
    struct ScriptedBackend {
        metric_calls: AtomicUsize,
        /// Writes a row named after the model while metrics are computed.
        concurrent_writer: Option<ResultStore>,
    }

    impl ConformanceBackend for ScriptedBackend {
        type Log = ();
        type Model = String;

        fn import_log(&self, _path: &Path) -> Result<(), ImportError> {
            Ok(())
        }

        fn import_model(&self, path: &Path) -> Result<String, ImportError> {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if stem == "missing" {
                return Err(ImportError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Ok(stem)
        }

        fn check_sound(&self, model: &String) -> Result<(), SoundnessError> {
            if model == "unsound" {
                Err(SoundnessError::Unbounded)
            } else {
                Ok(())
            }
        }

        fn compute_metrics(&self, _log: &(), model: &String) -> Metrics {
            self.metric_calls.fetch_add(1, Ordering::SeqCst);
            if model == "explode" {
                panic!("metric evaluator crashed");
            }
            let metrics = Metrics {
                fitness: 0.9,
                precision: 0.8,
                generalization: 0.5,
                simplicity: 0.4,
            };
            if let Some(writer) = &self.concurrent_writer {
                writer.append("p1", &MetricRecord::new(model, metrics)).unwrap();
            }
            metrics
        }
    }

    fn unit(approach: &str, model: &str) -> Unit {
        Unit {
            process: "p1".to_string(),
            approach: approach.to_string(),
            model_path: PathBuf::from(format!("{model}.pnml")),
        }
    }

    #[test]
    fn test_sound_model_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path());
        let backend = ScriptedBackend::default();

        let outcome = analyze_approach(&backend, &store, &(), &unit("a", "good"));
        let UnitStatus::Recorded { record } = &outcome.status else {
            panic!("expected Recorded, got {:?}", outcome.status);
        };
        assert_eq!(record.name, "a");
        assert!((record.f_score - 0.847).abs() < 1e-3);
        assert_eq!(store.records("p1").unwrap(), vec![record.clone()]);
    }

    #[test]
    fn test_recorded_approach_is_skipped_without_work() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path());
        let backend = ScriptedBackend::default();

        analyze_approach(&backend, &store, &(), &unit("a", "good"));
        let outcome = analyze_approach(&backend, &store, &(), &unit("a", "good"));

        assert_eq!(outcome.status, UnitStatus::Skipped);
        assert_eq!(backend.metric_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.records("p1").unwrap().len(), 1);
    }

    #[test]
    fn test_row_written_during_metrics_turns_unit_into_skip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path());
        let backend = ScriptedBackend {
            concurrent_writer: Some(ResultStore::new(dir.path())),
            ..Default::default()
        };

        let outcome = analyze_approach(&backend, &store, &(), &unit("a", "a"));
        assert_eq!(outcome.status, UnitStatus::Skipped);
        assert_eq!(store.records("p1").unwrap().len(), 1);
    }

    #[test]
    fn test_unsound_model_is_rejected_and_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path());
        let backend = ScriptedBackend::default();

        let outcome = analyze_approach(&backend, &store, &(), &unit("b", "unsound"));
        assert!(matches!(outcome.status, UnitStatus::Rejected { .. }));
        assert_eq!(backend.metric_calls.load(Ordering::SeqCst), 0);
        assert!(store.records("p1").unwrap().is_empty());
    }

    #[test]
    fn test_import_failure_is_failed() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path());
        let backend = ScriptedBackend::default();

        let outcome = analyze_approach(&backend, &store, &(), &unit("c", "missing"));
        let UnitStatus::Failed { error } = &outcome.status else {
            panic!("expected Failed, got {:?}", outcome.status);
        };
        assert!(error.contains("missing.pnml"));
        assert!(store.records("p1").unwrap().is_empty());
    }

    #[test]
    fn test_panic_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path());
        let backend = ScriptedBackend::default();

        let outcome = analyze_approach(&backend, &store, &(), &unit("d", "explode"));
        let UnitStatus::Failed { error } = &outcome.status else {
            panic!("expected Failed, got {:?}", outcome.status);
        };
        assert!(error.contains("metric evaluator crashed"));

        // The store stays usable after the panic.
        let outcome = analyze_approach(&backend, &store, &(), &unit("a", "good"));
        assert!(matches!(outcome.status, UnitStatus::Recorded { .. }));
    }

    #[test]
    fn test_outcome_serialises_with_status_tag() {
        let outcome = UnitOutcome {
            process: "p1".to_string(),
            approach: "b".to_string(),
            status: UnitStatus::Rejected {
                reason: "net is unbounded".to_string(),
            },
            elapsed_ms: 3,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["reason"], "net is unbounded");
        assert_eq!(json["approach"], "b");
    }
}
