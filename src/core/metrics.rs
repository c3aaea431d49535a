// petribench - core/metrics.rs
//
// Conformance metrics of an accepting Petri net against an event log:
//   - fitness: alignment-based average trace fitness,
//   - precision: alignment-based ETConformance (escaping edges after every
//     log prefix),
//   - generalization: transition firing frequencies over optimal alignments,
//   - simplicity: inverse arc degree, log-independent.
//
// Alignments of the complete traces are computed once per variant
// (`align_log`) and shared by fitness and generalization.

use crate::core::alignment::{self, Alignment, AlignmentConfig};
use crate::core::model::{EventLog, Marking, Metrics, PetriNet, Trace, Variant};
use crate::util::constants;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// A log variant together with its optimal alignment, if one was found.
#[derive(Debug, Clone)]
pub struct AlignedVariant {
    pub variant: Variant,
    pub alignment: Option<Alignment>,
}

/// Optimal alignments of every variant of a log.
#[derive(Debug, Clone)]
pub struct AlignedLog {
    pub variants: Vec<AlignedVariant>,

    /// Visible moves on the cheapest complete model run; `None` if the final
    /// marking is unreachable.
    pub best_worst_cost: Option<u64>,
}

impl AlignedLog {
    /// Number of traces whose alignment could not be computed.
    pub fn unaligned_traces(&self) -> usize {
        self.variants
            .iter()
            .filter(|v| v.alignment.is_none())
            .map(|v| v.variant.count)
            .sum()
    }
}

/// Compute all four metrics of `net` against `log`.
pub fn compute(log: &EventLog, net: &PetriNet, config: &AlignmentConfig) -> Metrics {
    let aligned = align_log(log, net, config);
    let unaligned = aligned.unaligned_traces();
    if unaligned > 0 {
        tracing::warn!(
            log = %log.name,
            traces = unaligned,
            "Some traces could not be aligned; they count as unfit"
        );
    }

    Metrics {
        fitness: fitness(&aligned),
        precision: precision(log, net, config),
        generalization: generalization(net, &aligned),
        simplicity: simplicity(net),
    }
}

/// Align every variant of `log` against `net`.
pub fn align_log(log: &EventLog, net: &PetriNet, config: &AlignmentConfig) -> AlignedLog {
    let best_worst_cost = alignment::best_worst_cost(net, config);
    let variants = log
        .variants()
        .into_iter()
        .map(|variant| {
            let alignment = alignment::align_trace(net, &variant.activities, config);
            AlignedVariant { variant, alignment }
        })
        .collect();
    AlignedLog {
        variants,
        best_worst_cost,
    }
}

// =============================================================================
// Fitness
// =============================================================================

/// Average trace fitness over all traces of the log.
///
/// Trace fitness is `1 - deviations / (|trace| + best_worst_cost)`; a trace
/// without an alignment scores 0. An empty log scores 0.
pub fn fitness(aligned: &AlignedLog) -> f64 {
    let best_worst = aligned.best_worst_cost.unwrap_or(0);
    let mut total_traces = 0usize;
    let mut sum = 0.0;

    for av in &aligned.variants {
        total_traces += av.variant.count;
        let trace_fitness = match &av.alignment {
            None => 0.0,
            Some(a) => {
                let denominator = av.variant.activities.len() as u64 + best_worst;
                if denominator == 0 {
                    1.0
                } else {
                    (1.0 - a.deviations() as f64 / denominator as f64).max(0.0)
                }
            }
        };
        sum += trace_fitness * av.variant.count as f64;
    }

    if total_traces == 0 {
        return 0.0;
    }
    sum / total_traces as f64
}

// =============================================================================
// Precision
// =============================================================================

/// Activities observed after a prefix, and how many traces share the prefix.
#[derive(Debug, Default)]
struct PrefixStats {
    next: BTreeSet<String>,
    count: usize,
}

/// Non-empty proper prefixes of all traces with their follow-up activities.
fn log_prefixes(variants: &[Variant]) -> BTreeMap<Trace, PrefixStats> {
    let mut prefixes: BTreeMap<Trace, PrefixStats> = BTreeMap::new();
    for variant in variants {
        let activities = &variant.activities;
        for i in 1..activities.len() {
            let stats = prefixes.entry(activities[..i].to_vec()).or_default();
            stats.next.insert(activities[i].clone());
            stats.count += variant.count;
        }
    }
    prefixes
}

/// Alignment-based ETConformance precision.
///
/// For every prefix the model markings reached by its optimal alignments are
/// collected; the visible activities eventually enabled there (through silent
/// transitions) that never follow the prefix in the log are escaping edges.
/// Prefixes that cannot be aligned are skipped. A log without prefixes
/// scores 1.
pub fn precision(log: &EventLog, net: &PetriNet, config: &AlignmentConfig) -> f64 {
    let prefixes = log_prefixes(&log.variants());
    let mut escaping_total = 0usize;
    let mut enabled_total = 0usize;
    let mut unfit = 0usize;

    for (prefix, stats) in &prefixes {
        let Some(markings) = alignment::prefix_markings(net, prefix, config) else {
            unfit += stats.count;
            continue;
        };
        let mut enabled: BTreeSet<String> = BTreeSet::new();
        for marking in &markings {
            enabled.extend(eventually_enabled_visible(net, marking, config.max_states));
        }
        let escaping = enabled.difference(&stats.next).count();
        enabled_total += enabled.len() * stats.count;
        escaping_total += escaping * stats.count;
    }

    if unfit > 0 {
        tracing::debug!(log = %log.name, prefixes = unfit, "Unaligned prefixes skipped");
    }

    if enabled_total == 0 {
        return 1.0;
    }
    1.0 - escaping_total as f64 / enabled_total as f64
}

/// Labels of visible transitions enabled in `marking` or in any marking
/// reachable from it through silent transitions only.
fn eventually_enabled_visible(net: &PetriNet, marking: &Marking, limit: usize) -> BTreeSet<String> {
    let mut labels = BTreeSet::new();
    let mut seen: HashSet<Marking> = HashSet::from([marking.clone()]);
    let mut queue = VecDeque::from([marking.clone()]);

    while let Some(current) = queue.pop_front() {
        for t in net.enabled_transitions(&current) {
            match &net.transitions[t].label {
                Some(label) => {
                    labels.insert(label.clone());
                }
                None => {
                    let next = net.fire(&current, t);
                    if seen.len() < limit && seen.insert(next.clone()) {
                        queue.push_back(next);
                    }
                }
            }
        }
    }
    labels
}

// =============================================================================
// Generalization
// =============================================================================

/// `1 - Σ_t 1/sqrt(n_t) / |T|`, where `n_t` counts firings of transition `t`
/// over the alignments of all traces. Unfired transitions contribute 1.
///
/// Firings come from the optimal alignments, model moves included, not from
/// token-based replay. Values can therefore differ from replay-based tools
/// on logs that skip activities.
pub fn generalization(net: &PetriNet, aligned: &AlignedLog) -> f64 {
    if net.transition_count() == 0 {
        return 1.0;
    }

    let mut occurrences = vec![0usize; net.transition_count()];
    for av in &aligned.variants {
        if let Some(a) = &av.alignment {
            for t in a.fired_transitions() {
                occurrences[t] += av.variant.count;
            }
        }
    }

    let inverse_sqrt_sum: f64 = occurrences
        .iter()
        .map(|&n| if n == 0 { 1.0 } else { 1.0 / (n as f64).sqrt() })
        .sum();
    1.0 - inverse_sqrt_sum / net.transition_count() as f64
}

// =============================================================================
// Simplicity
// =============================================================================

/// Arc-degree simplicity: `1 / (1 + max(mean_degree - k, 0))` over all places
/// and transitions.
pub fn simplicity(net: &PetriNet) -> f64 {
    let mut degrees: Vec<usize> = net
        .place_degrees()
        .into_iter()
        .map(|(incoming, outgoing)| incoming + outgoing)
        .collect();
    degrees.extend(
        net.transitions
            .iter()
            .map(|t| t.inputs.len() + t.outputs.len()),
    );

    let mean = if degrees.is_empty() {
        0.0
    } else {
        degrees.iter().sum::<usize>() as f64 / degrees.len() as f64
    };
    1.0 / (1.0 + (mean - constants::SIMPLICITY_DEGREE_OFFSET).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::tests::sequence_net;

    fn log(traces: &[&[&str]]) -> EventLog {
        EventLog::new(
            "test.xes",
            traces
                .iter()
                .map(|t| t.iter().map(|a| a.to_string()).collect())
                .collect(),
        )
    }

    /// source -> tau -> hub, a/b loop on hub, hub -> tau -> sink.
    fn flower_net() -> PetriNet {
        let mut net = PetriNet::new();
        let source = net.add_place("source");
        let hub = net.add_place("hub");
        let sink = net.add_place("sink");
        let start = net.add_transition("start", None);
        let a = net.add_transition("ta", Some("a"));
        let b = net.add_transition("tb", Some("b"));
        let end = net.add_transition("end", None);
        net.add_input_arc(source, start, 1);
        net.add_output_arc(start, hub, 1);
        for t in [a, b] {
            net.add_input_arc(hub, t, 1);
            net.add_output_arc(t, hub, 1);
        }
        net.add_input_arc(hub, end, 1);
        net.add_output_arc(end, sink, 1);
        net.initial_marking = net.singleton_marking(source);
        net.final_marking = net.singleton_marking(sink);
        net
    }

    fn config() -> AlignmentConfig {
        AlignmentConfig::default()
    }

    #[test]
    fn test_perfect_replay_has_fitness_one() {
        let net = sequence_net(&["a", "b", "c"]);
        let log = log(&[&["a", "b", "c"], &["a", "b", "c"]]);
        let aligned = align_log(&log, &net, &config());
        assert_eq!(fitness(&aligned), 1.0);
    }

    #[test]
    fn test_partial_fitness_is_averaged_per_trace() {
        let net = sequence_net(&["a", "b", "c"]);
        // [a, c]: 1 deviation / (2 + 3) -> 0.8; [a, b, c] -> 1.0
        let log = log(&[&["a", "c"], &["a", "b", "c"]]);
        let aligned = align_log(&log, &net, &config());
        assert!((fitness(&aligned) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_empty_log_has_zero_fitness() {
        let net = sequence_net(&["a"]);
        let aligned = align_log(&EventLog::default(), &net, &config());
        assert_eq!(fitness(&aligned), 0.0);
    }

    #[test]
    fn test_sequence_model_is_precise() {
        let net = sequence_net(&["a", "b"]);
        let log = log(&[&["a", "b"]]);
        assert_eq!(precision(&log, &net, &config()), 1.0);
    }

    #[test]
    fn test_flower_model_is_less_precise_than_sequence() {
        let log = log(&[&["a", "b"]]);
        let flower = precision(&log, &flower_net(), &config());
        let sequence = precision(&log, &sequence_net(&["a", "b"]), &config());
        // After "a" the flower enables {a, b}; only "b" is observed.
        assert!((flower - 0.5).abs() < 1e-12, "got {flower}");
        assert!(flower < sequence);
    }

    #[test]
    fn test_generalization_from_firing_counts() {
        let net = sequence_net(&["a"]);
        let log = log(&[&["a"], &["a"], &["a"], &["a"]]);
        let aligned = align_log(&log, &net, &config());
        // one transition fired 4 times: 1 - (1/2) / 1
        assert!((generalization(&net, &aligned) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_generalization_counts_unfired_transitions_as_one() {
        let net = flower_net();
        let log = log(&[&["a"]]);
        let aligned = align_log(&log, &net, &config());
        // start, a, end fire once each; b never fires: 1 - 4/4
        assert!(generalization(&net, &aligned).abs() < 1e-12);
    }

    #[test]
    fn test_generalization_counts_model_moves_as_firings() {
        let net = sequence_net(&["a", "b"]);
        let log = log(&[&["a"], &["a"], &["a"], &["a"]]);
        let aligned = align_log(&log, &net, &config());
        // b is never observed but fires as a model move in every alignment:
        // 1 - (1/2 + 1/2) / 2
        assert!((generalization(&net, &aligned) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_simplicity_of_sequence() {
        let net = sequence_net(&["a", "b"]);
        // place degrees 1, 2, 1; transition degrees 2, 2 -> mean 1.6
        assert!((simplicity(&net) - 1.0 / 2.6).abs() < 1e-12);
    }

    #[test]
    fn test_simplicity_of_empty_net_is_one() {
        assert_eq!(simplicity(&PetriNet::new()), 1.0);
    }

    #[test]
    fn test_compute_combines_all_metrics() {
        let net = sequence_net(&["a", "b"]);
        let log = log(&[&["a", "b"]]);
        let metrics = compute(&log, &net, &config());
        assert_eq!(metrics.fitness, 1.0);
        assert_eq!(metrics.precision, 1.0);
        assert!(metrics.generalization >= 0.0 && metrics.generalization <= 1.0);
        assert!((metrics.simplicity - 1.0 / 2.6).abs() < 1e-12);
    }
}
