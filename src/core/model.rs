// petribench - core/model.rs
//
// Core data model types: event logs, Petri nets with markings, and metric
// records. Pure data definitions plus the firing rule; no I/O.
//
// These types are the shared vocabulary across all layers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Event log
// =============================================================================

/// A single case: the ordered activity names of its events.
pub type Trace = Vec<String>;

/// An imported event log reduced to what conformance checking needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    /// Log name (file name the log was imported from).
    pub name: String,

    /// Traces in file order.
    pub traces: Vec<Trace>,
}

/// A distinct activity sequence and the number of traces sharing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub activities: Trace,
    pub count: usize,
}

impl EventLog {
    pub fn new(name: impl Into<String>, traces: Vec<Trace>) -> Self {
        Self {
            name: name.into(),
            traces,
        }
    }

    /// Total number of traces.
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Distinct trace variants in lexicographic order of their activities.
    ///
    /// Evaluators align each variant once and weight it by `count`.
    pub fn variants(&self) -> Vec<Variant> {
        let mut counts: BTreeMap<&Trace, usize> = BTreeMap::new();
        for trace in &self.traces {
            *counts.entry(trace).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .map(|(activities, count)| Variant {
                activities: activities.clone(),
                count,
            })
            .collect()
    }
}

// =============================================================================
// Petri net
// =============================================================================

/// Token count per place, indexed like `PetriNet::places`.
pub type Marking = Vec<u32>;

/// A weighted arc endpoint: (place index, weight).
pub type ArcEnd = (usize, u32);

/// A place of the net.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    /// Identifier from the source file, used in diagnostics only.
    pub name: String,
}

/// A transition with its pre- and post-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Identifier from the source file, used in diagnostics only.
    pub name: String,

    /// Activity label. `None` marks a silent (tau) transition.
    pub label: Option<String>,

    /// Input places with arc weights.
    pub inputs: Vec<ArcEnd>,

    /// Output places with arc weights.
    pub outputs: Vec<ArcEnd>,
}

impl Transition {
    pub fn is_silent(&self) -> bool {
        self.label.is_none()
    }

    /// Label for log messages: the activity, or the identifier for silent
    /// transitions.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// An accepting Petri net: structure plus initial and final marking.
///
/// Places and transitions are addressed by dense indices so markings can be
/// plain vectors and hashed cheaply during state-space search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PetriNet {
    pub places: Vec<Place>,
    pub transitions: Vec<Transition>,
    pub initial_marking: Marking,
    pub final_marking: Marking,
}

impl PetriNet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a place; returns its index. Markings grow with the place set.
    pub fn add_place(&mut self, name: impl Into<String>) -> usize {
        self.places.push(Place { name: name.into() });
        self.initial_marking.push(0);
        self.final_marking.push(0);
        self.places.len() - 1
    }

    /// Add a transition; returns its index.
    pub fn add_transition(&mut self, name: impl Into<String>, label: Option<&str>) -> usize {
        self.transitions.push(Transition {
            name: name.into(),
            label: label.map(str::to_string),
            inputs: Vec::new(),
            outputs: Vec::new(),
        });
        self.transitions.len() - 1
    }

    /// Add a place -> transition arc. Parallel arcs accumulate their weight.
    pub fn add_input_arc(&mut self, place: usize, transition: usize, weight: u32) {
        Self::push_arc(&mut self.transitions[transition].inputs, place, weight);
    }

    /// Add a transition -> place arc. Parallel arcs accumulate their weight.
    pub fn add_output_arc(&mut self, transition: usize, place: usize, weight: u32) {
        Self::push_arc(&mut self.transitions[transition].outputs, place, weight);
    }

    fn push_arc(ends: &mut Vec<ArcEnd>, place: usize, weight: u32) {
        match ends.iter_mut().find(|(p, _)| *p == place) {
            Some((_, w)) => *w += weight,
            None => ends.push((place, weight)),
        }
    }

    pub fn place_count(&self) -> usize {
        self.places.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Number of arcs in the net.
    pub fn arc_count(&self) -> usize {
        self.transitions
            .iter()
            .map(|t| t.inputs.len() + t.outputs.len())
            .sum()
    }

    /// True if `transition` is enabled in `marking`.
    pub fn is_enabled(&self, marking: &[u32], transition: usize) -> bool {
        self.transitions[transition]
            .inputs
            .iter()
            .all(|&(p, w)| marking[p] >= w)
    }

    /// Indices of all transitions enabled in `marking`.
    pub fn enabled_transitions<'a>(
        &'a self,
        marking: &'a [u32],
    ) -> impl Iterator<Item = usize> + 'a {
        (0..self.transitions.len()).filter(move |&t| self.is_enabled(marking, t))
    }

    /// Fire `transition` in `marking`, returning the successor marking.
    /// The caller must ensure the transition is enabled.
    pub fn fire(&self, marking: &[u32], transition: usize) -> Marking {
        let t = &self.transitions[transition];
        let mut next = marking.to_vec();
        for &(p, w) in &t.inputs {
            next[p] -= w;
        }
        for &(p, w) in &t.outputs {
            next[p] += w;
        }
        next
    }

    /// Number of arcs touching each place: (incoming, outgoing).
    pub fn place_degrees(&self) -> Vec<(usize, usize)> {
        let mut degrees = vec![(0usize, 0usize); self.places.len()];
        for t in &self.transitions {
            for &(p, _) in &t.outputs {
                degrees[p].0 += 1;
            }
            for &(p, _) in &t.inputs {
                degrees[p].1 += 1;
            }
        }
        degrees
    }

    /// Places without incoming arcs.
    pub fn source_places(&self) -> Vec<usize> {
        self.place_degrees()
            .iter()
            .enumerate()
            .filter(|(_, (incoming, _))| *incoming == 0)
            .map(|(p, _)| p)
            .collect()
    }

    /// Places without outgoing arcs.
    pub fn sink_places(&self) -> Vec<usize> {
        self.place_degrees()
            .iter()
            .enumerate()
            .filter(|(_, (_, outgoing))| *outgoing == 0)
            .map(|(p, _)| p)
            .collect()
    }

    /// A marking with a single token in `place`.
    pub fn singleton_marking(&self, place: usize) -> Marking {
        let mut marking = vec![0; self.places.len()];
        marking[place] = 1;
        marking
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// The four conformance metrics of one model against one log.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    pub fitness: f64,
    pub precision: f64,
    pub generalization: f64,
    pub simplicity: f64,
}

/// Harmonic mean of fitness and precision.
///
/// Defined as 0 when both are 0 so every record carries a concrete value.
pub fn f_score(fitness: f64, precision: f64) -> f64 {
    let sum = fitness + precision;
    if sum <= 0.0 {
        return 0.0;
    }
    2.0 * fitness * precision / sum
}

/// One row of a result table.
///
/// Field order matches the fixed column order of the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Approach name.
    pub name: String,
    pub fitness: f64,
    pub precision: f64,
    #[serde(rename = "f-score")]
    pub f_score: f64,
    pub generalization: f64,
    pub simplicity: f64,
}

impl MetricRecord {
    /// Attach an approach name to computed metrics and derive the F-score.
    pub fn new(name: impl Into<String>, metrics: Metrics) -> Self {
        Self {
            name: name.into(),
            fitness: metrics.fitness,
            precision: metrics.precision,
            f_score: f_score(metrics.fitness, metrics.precision),
            generalization: metrics.generalization,
            simplicity: metrics.simplicity,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// `start -> a -> b -> end` with a single source and sink.
    pub(crate) fn sequence_net(labels: &[&str]) -> PetriNet {
        let mut net = PetriNet::new();
        let mut prev = net.add_place("source");
        for (i, label) in labels.iter().enumerate() {
            let t = net.add_transition(format!("t{i}"), Some(label));
            let next = net.add_place(format!("p{}", i + 1));
            net.add_input_arc(prev, t, 1);
            net.add_output_arc(t, next, 1);
            prev = next;
        }
        net.initial_marking = net.singleton_marking(0);
        net.final_marking = net.singleton_marking(prev);
        net
    }

    fn trace(activities: &[&str]) -> Trace {
        activities.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_f_score_scenario_value() {
        let f = f_score(0.9, 0.8);
        assert!((f - 0.847).abs() < 0.001, "got {f}");
    }

    #[test]
    fn test_f_score_zero_policy() {
        assert_eq!(f_score(0.0, 0.0), 0.0);
        assert_eq!(f_score(0.0, 0.7), 0.0);
    }

    #[test]
    fn test_f_score_harmonic_bound() {
        let samples = [0.05, 0.2, 0.33, 0.5, 0.75, 0.9, 1.0];
        for &fit in &samples {
            for &prec in &samples {
                let f = f_score(fit, prec);
                assert!(f >= fit.min(prec) - 1e-12, "{f} < min({fit}, {prec})");
                assert!(f <= fit.max(prec) + 1e-12, "{f} > max({fit}, {prec})");
            }
        }
    }

    #[test]
    fn test_metric_record_derives_f_score() {
        let record = MetricRecord::new(
            "approach_a",
            Metrics {
                fitness: 1.0,
                precision: 0.5,
                generalization: 0.4,
                simplicity: 0.6,
            },
        );
        assert_eq!(record.name, "approach_a");
        assert!((record.f_score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_variants_are_counted_and_sorted() {
        let log = EventLog::new(
            "log.xes",
            vec![trace(&["b"]), trace(&["a", "b"]), trace(&["b"])],
        );
        let variants = log.variants();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].activities, trace(&["a", "b"]));
        assert_eq!(variants[0].count, 1);
        assert_eq!(variants[1].count, 2);
    }

    #[test]
    fn test_firing_rule() {
        let net = sequence_net(&["a", "b"]);
        let m0 = net.initial_marking.clone();
        assert!(net.is_enabled(&m0, 0));
        assert!(!net.is_enabled(&m0, 1));
        let m1 = net.fire(&m0, 0);
        assert_eq!(m1, vec![0, 1, 0]);
        assert_eq!(net.enabled_transitions(&m1).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_parallel_arcs_accumulate_weight() {
        let mut net = PetriNet::new();
        let p = net.add_place("p");
        let t = net.add_transition("t", None);
        net.add_input_arc(p, t, 1);
        net.add_input_arc(p, t, 2);
        assert_eq!(net.transitions[t].inputs, vec![(p, 3)]);
        assert_eq!(net.arc_count(), 1);
    }

    #[test]
    fn test_source_and_sink_places() {
        let net = sequence_net(&["a", "b", "c"]);
        assert_eq!(net.source_places(), vec![0]);
        assert_eq!(net.sink_places(), vec![3]);
    }
}
