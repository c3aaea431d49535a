// petribench - app/backend.rs
//
// The seam between the batch pipeline and the conformance algorithms.
//
// The analyzer and driver only see `ConformanceBackend`; `NativeBackend`
// wires it to the importers, soundness gate and alignment-based metrics in
// `core`. Tests substitute scripted backends.

use crate::core::alignment::AlignmentConfig;
use crate::core::import::{self, ImportConfig};
use crate::core::metrics;
use crate::core::model::{EventLog, Metrics, PetriNet};
use crate::core::soundness::{self, SoundnessConfig};
use crate::platform::config::BenchConfig;
use crate::util::error::{ImportError, SoundnessError};
use std::path::Path;

/// Import, soundness and metric operations used by the pipeline.
///
/// One log is shared by every unit of its process, so it must be `Sync`.
/// A model is created and consumed inside a single unit.
pub trait ConformanceBackend: Send + Sync {
    type Log: Send + Sync + 'static;
    type Model;

    fn import_log(&self, path: &Path) -> Result<Self::Log, ImportError>;

    fn import_model(&self, path: &Path) -> Result<Self::Model, ImportError>;

    /// `Ok(())` if the model is a sound workflow net.
    fn check_sound(&self, model: &Self::Model) -> Result<(), SoundnessError>;

    fn compute_metrics(&self, log: &Self::Log, model: &Self::Model) -> Metrics;
}

/// Backend built on the `core` algorithms.
#[derive(Debug, Clone, Default)]
pub struct NativeBackend {
    pub import: ImportConfig,
    pub soundness: SoundnessConfig,
    pub alignment: AlignmentConfig,
}

impl NativeBackend {
    pub fn from_config(config: &BenchConfig) -> Self {
        Self {
            import: ImportConfig {
                silent_label_patterns: config.silent_label_patterns.clone(),
            },
            soundness: SoundnessConfig {
                max_states: config.max_states,
            },
            alignment: AlignmentConfig {
                max_states: config.max_alignment_states,
            },
        }
    }
}

impl ConformanceBackend for NativeBackend {
    type Log = EventLog;
    type Model = PetriNet;

    fn import_log(&self, path: &Path) -> Result<EventLog, ImportError> {
        import::import_log(path)
    }

    fn import_model(&self, path: &Path) -> Result<PetriNet, ImportError> {
        import::import_model(path, &self.import)
    }

    fn check_sound(&self, model: &PetriNet) -> Result<(), SoundnessError> {
        soundness::check_sound(model, &self.soundness)
    }

    fn compute_metrics(&self, log: &EventLog, model: &PetriNet) -> Metrics {
        metrics::compute(log, model, &self.alignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_carries_limits_and_patterns() {
        let config = BenchConfig {
            max_states: 1234,
            max_alignment_states: 5678,
            silent_label_patterns: vec!["silent_*".to_string()],
            ..BenchConfig::default()
        };
        let backend = NativeBackend::from_config(&config);
        assert_eq!(backend.soundness.max_states, 1234);
        assert_eq!(backend.alignment.max_states, 5678);
        assert_eq!(backend.import.silent_label_patterns, vec!["silent_*"]);
    }

    #[test]
    fn test_native_backend_scores_sequence_net() {
        let backend = NativeBackend::default();
        let net = crate::core::model::tests::sequence_net(&["a", "b"]);
        let log = EventLog::new("p1", vec![vec!["a".to_string(), "b".to_string()]]);

        assert!(backend.check_sound(&net).is_ok());
        let metrics = backend.compute_metrics(&log, &net);
        assert!((metrics.fitness - 1.0).abs() < 1e-9);
        assert!((metrics.precision - 1.0).abs() < 1e-9);
    }
}
