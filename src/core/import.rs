// petribench - core/import.rs
//
// XES event log and PNML Petri net import.
//
// Parsing is delegated to the `process_mining` crate; this module converts
// its UUID-keyed structures into the dense, index-based model used by the
// analysis code and fills in the conventions the files leave implicit:
//   - an event's activity is its `concept:name` attribute,
//   - a transition is silent when the PNML marks it invisible or leaves its
//     label empty; configured label patterns can opt further names in,
//   - a missing initial/final marking defaults to one token on the unique
//     source/sink place.

use crate::core::model::{EventLog, PetriNet, Trace};
use crate::util::constants;
use crate::util::error::ImportError;
use process_mining::petri_net::import_pnml::import_pnml_from_path;
use process_mining::petri_net::petri_net_struct::ArcType;
use process_mining::{import_xes_file, XESImportOptions};
use std::collections::HashMap;
use std::path::Path;

/// Options applied when importing a Petri net.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Transition labels matching any of these glob patterns are silent.
    /// Empty labels are always silent.
    pub silent_label_patterns: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            silent_label_patterns: constants::DEFAULT_SILENT_LABEL_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

// =============================================================================
// Event logs
// =============================================================================

/// Import an XES (or gzipped XES) event log.
///
/// Events without a string `concept:name` are dropped from their trace.
pub fn import_log(path: &Path) -> Result<EventLog, ImportError> {
    let path_str = checked_path(path)?;
    let xes = import_xes_file(path_str, XESImportOptions::default()).map_err(|e| {
        ImportError::Xes {
            path: path.to_path_buf(),
            reason: format!("{e:?}"),
        }
    })?;

    let mut dropped = 0usize;
    let traces: Vec<Trace> = xes
        .traces
        .iter()
        .map(|trace| {
            trace
                .events
                .iter()
                .filter_map(|event| {
                    let activity = event
                        .attributes
                        .iter()
                        .find(|a| a.key == constants::ACTIVITY_KEY)
                        .and_then(|a| a.value.try_as_string())
                        .map(|s| s.to_string());
                    if activity.is_none() {
                        dropped += 1;
                    }
                    activity
                })
                .collect()
        })
        .collect();

    if dropped > 0 {
        tracing::warn!(
            file = %path.display(),
            events = dropped,
            "Events without an activity name were ignored"
        );
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::debug!(file = %path.display(), traces = traces.len(), "Event log imported");
    Ok(EventLog::new(name, traces))
}

// =============================================================================
// Petri nets
// =============================================================================

/// Import a PNML Petri net with its initial and final marking.
pub fn import_model(path: &Path, config: &ImportConfig) -> Result<PetriNet, ImportError> {
    let path_string = checked_path(path)?.to_string();
    let pnml = import_pnml_from_path(&path_string).map_err(|e| ImportError::Pnml {
        path: path.to_path_buf(),
        reason: format!("{e:?}"),
    })?;

    let silent = compile_patterns(&config.silent_label_patterns);
    let invalid = |reason: String| ImportError::InvalidNet {
        path: path.to_path_buf(),
        reason,
    };

    let mut net = PetriNet::new();

    // HashMap iteration order is random; sort ids so indices are stable.
    let mut place_ids: Vec<_> = pnml.places.keys().copied().collect();
    place_ids.sort();
    let mut place_index = HashMap::new();
    for id in place_ids {
        place_index.insert(id, net.add_place(id.to_string()));
    }

    let mut transition_ids: Vec<_> = pnml.transitions.keys().copied().collect();
    transition_ids.sort();
    let mut transition_index = HashMap::new();
    for id in transition_ids {
        let label = pnml.transitions[&id]
            .label
            .as_deref()
            .filter(|l| !is_silent_label(l, &silent));
        transition_index.insert(id, net.add_transition(id.to_string(), label));
    }

    for arc in &pnml.arcs {
        let weight = arc.weight as u32;
        match arc.from_to {
            ArcType::PlaceTransition(place_id, transition_id) => {
                let (Some(&p), Some(&t)) = (
                    place_index.get(&place_id),
                    transition_index.get(&transition_id),
                ) else {
                    return Err(invalid(format!(
                        "arc {place_id} -> {transition_id} references an unknown node"
                    )));
                };
                net.add_input_arc(p, t, weight);
            }
            ArcType::TransitionPlace(transition_id, place_id) => {
                let (Some(&t), Some(&p)) = (
                    transition_index.get(&transition_id),
                    place_index.get(&place_id),
                ) else {
                    return Err(invalid(format!(
                        "arc {transition_id} -> {place_id} references an unknown node"
                    )));
                };
                net.add_output_arc(t, p, weight);
            }
        }
    }

    match &pnml.initial_marking {
        Some(marking) => {
            for (place, tokens) in marking {
                let Some(&p) = place_index.get(&place.get_uuid()) else {
                    return Err(invalid("initial marking references an unknown place".into()));
                };
                net.initial_marking[p] = *tokens as u32;
            }
        }
        None => {
            if let &[source] = net.source_places().as_slice() {
                net.initial_marking = net.singleton_marking(source);
            }
        }
    }

    match pnml.final_markings.as_ref().and_then(|m| m.first()) {
        Some(marking) => {
            for (place, tokens) in marking {
                let Some(&p) = place_index.get(&place.get_uuid()) else {
                    return Err(invalid("final marking references an unknown place".into()));
                };
                net.final_marking[p] = *tokens as u32;
            }
        }
        None => {
            if let &[sink] = net.sink_places().as_slice() {
                net.final_marking = net.singleton_marking(sink);
            }
        }
    }

    tracing::debug!(
        file = %path.display(),
        places = net.place_count(),
        transitions = net.transition_count(),
        arcs = net.arc_count(),
        "Petri net imported"
    );
    Ok(net)
}

// =============================================================================
// Helpers
// =============================================================================

/// The parser takes string paths; reject missing files and non-UTF-8 paths
/// up front so the error names the actual problem.
fn checked_path(path: &Path) -> Result<&str, ImportError> {
    if !path.is_file() {
        return Err(ImportError::NotFound {
            path: path.to_path_buf(),
        });
    }
    path.to_str().ok_or_else(|| ImportError::InvalidPath {
        path: path.to_path_buf(),
    })
}

/// Compile glob patterns; invalid ones are logged and skipped.
fn compile_patterns(patterns: &[String]) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::warn!(pattern = p, error = %e, "Invalid silent label pattern, skipping");
                None
            }
        })
        .collect()
}

fn is_silent_label(label: &str, silent: &[glob::Pattern]) -> bool {
    label.trim().is_empty() || silent.iter().any(|p| p.matches(label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    #[test]
    fn test_silent_label_patterns() {
        let silent = compile_patterns(&["tau".to_string(), "tau_*".to_string()]);
        assert!(is_silent_label("", &silent));
        assert!(is_silent_label("tau", &silent));
        assert!(is_silent_label("tau_12", &silent));
        assert!(!is_silent_label("Register request", &silent));
        assert!(!is_silent_label("taught", &silent));
    }

    #[test]
    fn test_default_config_only_silences_empty_labels() {
        let silent = compile_patterns(&ImportConfig::default().silent_label_patterns);
        assert!(is_silent_label(" ", &silent));
        assert!(!is_silent_label("tau", &silent));
        assert!(!is_silent_label("skip_check", &silent));
        assert!(!is_silent_label("loop_back", &silent));
    }

    #[test]
    fn test_labelled_skip_transition_stays_visible() {
        let pnml = fs::read_to_string(fixture("sequence_abc.pnml"))
            .unwrap()
            .replace("<text>b</text>", "<text>skip_check</text>");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skip.pnml");
        fs::write(&path, pnml).unwrap();

        let net = import_model(&path, &ImportConfig::default()).unwrap();
        assert!(net.transitions.iter().all(|t| !t.is_silent()));
        assert!(net
            .transitions
            .iter()
            .any(|t| t.label.as_deref() == Some("skip_check")));

        let log = EventLog::new(
            "skip",
            vec![vec!["a".to_string(), "skip_check".to_string(), "c".to_string()]],
        );
        let metrics = crate::core::metrics::compute(&log, &net, &Default::default());
        assert!((metrics.fitness - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_configured_pattern_silences_matching_label() {
        let pnml = fs::read_to_string(fixture("sequence_abc.pnml"))
            .unwrap()
            .replace("<text>b</text>", "<text>tau_1</text>");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tau.pnml");
        fs::write(&path, pnml).unwrap();

        let config = ImportConfig {
            silent_label_patterns: vec!["tau_*".to_string()],
        };
        let net = import_model(&path, &config).unwrap();
        assert_eq!(net.transitions.iter().filter(|t| t.is_silent()).count(), 1);
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let compiled = compile_patterns(&["[".to_string(), "tau".to_string()]);
        assert_eq!(compiled.len(), 1);
    }

    #[test]
    fn test_missing_model_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = import_model(&dir.path().join("absent.pnml"), &ImportConfig::default());
        assert!(matches!(result, Err(ImportError::NotFound { .. })));
    }

    #[test]
    fn test_missing_log_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = import_log(&dir.path().join("absent.xes"));
        assert!(matches!(result, Err(ImportError::NotFound { .. })));
    }

    #[test]
    fn test_malformed_model_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pnml");
        fs::write(&path, "this is not pnml <<<").unwrap();
        assert!(import_model(&path, &ImportConfig::default()).is_err());
    }
}
