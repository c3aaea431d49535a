// petribench - core/soundness.rs
//
// Workflow-net soundness analysis.
//
// Two phases, each returning on the first violation found:
//   1. Structure: a unique source place marked by the initial marking, a
//      unique sink place marked by the final marking, and every node on a
//      path from source to sink.
//   2. Behaviour: breadth-first exploration of the reachability graph from
//      the initial marking, checking boundedness (no marking strictly covers
//      an ancestor on its discovery path), proper completion, absence of
//      dead transitions, and option to complete (the final marking is
//      reachable from every reachable marking).
//
// The exploration is capped by `SoundnessConfig::max_states`; a net whose
// state space exceeds the cap is rejected rather than analysed forever.

use crate::core::model::{Marking, PetriNet};
use crate::util::error::SoundnessError;
use std::collections::{HashMap, VecDeque};

/// Limits applied to a soundness check.
#[derive(Debug, Clone)]
pub struct SoundnessConfig {
    /// Maximum number of distinct reachable markings to explore.
    pub max_states: usize,
}

impl Default for SoundnessConfig {
    fn default() -> Self {
        Self {
            max_states: crate::util::constants::DEFAULT_MAX_STATES,
        }
    }
}

/// Check that `net` is a sound workflow net.
pub fn check_sound(net: &PetriNet, config: &SoundnessConfig) -> Result<(), SoundnessError> {
    let (_, sink) = check_workflow_structure(net)?;
    check_behaviour(net, sink, config)
}

// =============================================================================
// Structure
// =============================================================================

fn not_wf(reason: impl Into<String>) -> SoundnessError {
    SoundnessError::NotWorkflowNet {
        reason: reason.into(),
    }
}

/// Returns (source, sink) place indices of a well-formed workflow net.
fn check_workflow_structure(net: &PetriNet) -> Result<(usize, usize), SoundnessError> {
    if net.place_count() == 0 {
        return Err(not_wf("net has no places"));
    }

    let sources = net.source_places();
    let sinks = net.sink_places();
    let &[source] = sources.as_slice() else {
        return Err(not_wf(format!(
            "expected exactly one source place, found {}",
            sources.len()
        )));
    };
    let &[sink] = sinks.as_slice() else {
        return Err(not_wf(format!(
            "expected exactly one sink place, found {}",
            sinks.len()
        )));
    };

    if net.initial_marking != net.singleton_marking(source) {
        return Err(not_wf("initial marking is not one token on the source place"));
    }
    if net.final_marking != net.singleton_marking(sink) {
        return Err(not_wf("final marking is not one token on the sink place"));
    }

    let forward = reachable_nodes(net, source, Direction::Forward);
    let backward = reachable_nodes(net, sink, Direction::Backward);

    for (p, place) in net.places.iter().enumerate() {
        if !forward.places[p] || !backward.places[p] {
            return Err(not_wf(format!(
                "place '{}' is not on a path from source to sink",
                place.name
            )));
        }
    }
    for (t, transition) in net.transitions.iter().enumerate() {
        if !forward.transitions[t] || !backward.transitions[t] {
            return Err(not_wf(format!(
                "transition '{}' is not on a path from source to sink",
                transition.display_name()
            )));
        }
    }

    Ok((source, sink))
}

#[derive(Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

struct Visited {
    places: Vec<bool>,
    transitions: Vec<bool>,
}

/// Graph reachability over the bipartite place/transition graph.
fn reachable_nodes(net: &PetriNet, start: usize, direction: Direction) -> Visited {
    let mut visited = Visited {
        places: vec![false; net.place_count()],
        transitions: vec![false; net.transition_count()],
    };
    let mut queue = VecDeque::from([start]);
    visited.places[start] = true;

    while let Some(place) = queue.pop_front() {
        for (t, transition) in net.transitions.iter().enumerate() {
            let (from, to) = match direction {
                Direction::Forward => (&transition.inputs, &transition.outputs),
                Direction::Backward => (&transition.outputs, &transition.inputs),
            };
            if visited.transitions[t] || !from.iter().any(|&(p, _)| p == place) {
                continue;
            }
            visited.transitions[t] = true;
            for &(p, _) in to {
                if !visited.places[p] {
                    visited.places[p] = true;
                    queue.push_back(p);
                }
            }
        }
    }
    visited
}

// =============================================================================
// Behaviour
// =============================================================================

fn check_behaviour(
    net: &PetriNet,
    sink: usize,
    config: &SoundnessConfig,
) -> Result<(), SoundnessError> {
    let mut index: HashMap<Marking, usize> = HashMap::new();
    let mut markings: Vec<Marking> = Vec::new();
    let mut parents: Vec<Option<usize>> = Vec::new();
    // Reverse edges of the reachability graph, for the co-reachability pass.
    let mut predecessors: Vec<Vec<usize>> = Vec::new();
    let mut fired = vec![false; net.transition_count()];

    index.insert(net.initial_marking.clone(), 0);
    markings.push(net.initial_marking.clone());
    parents.push(None);
    predecessors.push(Vec::new());

    let mut queue = VecDeque::from([0usize]);
    while let Some(state) = queue.pop_front() {
        let current = markings[state].clone();
        let enabled: Vec<usize> = net.enabled_transitions(&current).collect();
        for t in enabled {
            fired[t] = true;
            let next = net.fire(&current, t);

            if let Some(&known) = index.get(&next) {
                predecessors[known].push(state);
                continue;
            }

            if next[sink] > 0 && next != net.final_marking {
                return Err(SoundnessError::ImproperCompletion);
            }
            if covers_ancestor(&next, state, &markings, &parents) {
                return Err(SoundnessError::Unbounded);
            }
            if markings.len() >= config.max_states {
                return Err(SoundnessError::StateLimitExceeded {
                    limit: config.max_states,
                });
            }

            let id = markings.len();
            index.insert(next.clone(), id);
            markings.push(next);
            parents.push(Some(state));
            predecessors.push(vec![state]);
            queue.push_back(id);
        }
    }

    if let Some(t) = fired.iter().position(|f| !f) {
        return Err(SoundnessError::DeadTransition {
            transition: net.transitions[t].display_name().to_string(),
        });
    }

    let Some(&final_state) = index.get(&net.final_marking) else {
        return Err(SoundnessError::NoOptionToComplete);
    };
    let mut co_reachable = vec![false; markings.len()];
    co_reachable[final_state] = true;
    let mut queue = VecDeque::from([final_state]);
    while let Some(state) = queue.pop_front() {
        for &pred in &predecessors[state] {
            if !co_reachable[pred] {
                co_reachable[pred] = true;
                queue.push_back(pred);
            }
        }
    }
    if co_reachable.iter().any(|c| !c) {
        return Err(SoundnessError::NoOptionToComplete);
    }

    tracing::trace!(states = markings.len(), "Soundness check passed");
    Ok(())
}

/// True if `marking` strictly covers the marking of `state` or any of its
/// ancestors on the BFS tree (Karp-Miller style unboundedness witness).
fn covers_ancestor(
    marking: &[u32],
    mut state: usize,
    markings: &[Marking],
    parents: &[Option<usize>],
) -> bool {
    loop {
        let ancestor = &markings[state];
        if marking.iter().zip(ancestor).all(|(m, a)| m >= a) && marking != ancestor.as_slice() {
            return true;
        }
        match parents[state] {
            Some(parent) => state = parent,
            None => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::tests::sequence_net;

    fn check(net: &PetriNet) -> Result<(), SoundnessError> {
        check_sound(net, &SoundnessConfig::default())
    }

    /// source -> split -> (a || b) -> join -> sink
    fn parallel_net() -> PetriNet {
        let mut net = PetriNet::new();
        let source = net.add_place("source");
        let pa = net.add_place("pa");
        let pb = net.add_place("pb");
        let qa = net.add_place("qa");
        let qb = net.add_place("qb");
        let sink = net.add_place("sink");
        let split = net.add_transition("split", None);
        let a = net.add_transition("ta", Some("a"));
        let b = net.add_transition("tb", Some("b"));
        let join = net.add_transition("join", None);
        net.add_input_arc(source, split, 1);
        net.add_output_arc(split, pa, 1);
        net.add_output_arc(split, pb, 1);
        net.add_input_arc(pa, a, 1);
        net.add_output_arc(a, qa, 1);
        net.add_input_arc(pb, b, 1);
        net.add_output_arc(b, qb, 1);
        net.add_input_arc(qa, join, 1);
        net.add_input_arc(qb, join, 1);
        net.add_output_arc(join, sink, 1);
        net.initial_marking = net.singleton_marking(source);
        net.final_marking = net.singleton_marking(sink);
        net
    }

    #[test]
    fn test_sequence_is_sound() {
        assert_eq!(check(&sequence_net(&["a", "b", "c"])), Ok(()));
    }

    #[test]
    fn test_parallel_split_join_is_sound() {
        assert_eq!(check(&parallel_net()), Ok(()));
    }

    #[test]
    fn test_two_sources_is_not_workflow_net() {
        let mut net = sequence_net(&["a"]);
        let extra = net.add_place("orphan");
        net.add_input_arc(extra, 0, 1);
        assert!(matches!(
            check(&net),
            Err(SoundnessError::NotWorkflowNet { .. })
        ));
    }

    #[test]
    fn test_wrong_initial_marking_is_rejected() {
        let mut net = sequence_net(&["a"]);
        net.initial_marking = vec![2, 0];
        assert!(matches!(
            check(&net),
            Err(SoundnessError::NotWorkflowNet { .. })
        ));
    }

    #[test]
    fn test_and_split_xor_join_is_improper() {
        // split puts tokens in pa and pb; both a and b move to sink directly.
        let mut net = PetriNet::new();
        let source = net.add_place("source");
        let pa = net.add_place("pa");
        let pb = net.add_place("pb");
        let sink = net.add_place("sink");
        let split = net.add_transition("split", None);
        let a = net.add_transition("ta", Some("a"));
        let b = net.add_transition("tb", Some("b"));
        net.add_input_arc(source, split, 1);
        net.add_output_arc(split, pa, 1);
        net.add_output_arc(split, pb, 1);
        net.add_input_arc(pa, a, 1);
        net.add_output_arc(a, sink, 1);
        net.add_input_arc(pb, b, 1);
        net.add_output_arc(b, sink, 1);
        net.initial_marking = net.singleton_marking(source);
        net.final_marking = net.singleton_marking(sink);
        assert_eq!(check(&net), Err(SoundnessError::ImproperCompletion));
    }

    #[test]
    fn test_xor_split_and_join_deadlocks() {
        // source -> a -> pa, source -> b -> pb, join needs both pa and pb.
        let mut net = PetriNet::new();
        let source = net.add_place("source");
        let pa = net.add_place("pa");
        let pb = net.add_place("pb");
        let sink = net.add_place("sink");
        let a = net.add_transition("ta", Some("a"));
        let b = net.add_transition("tb", Some("b"));
        let join = net.add_transition("join", None);
        net.add_input_arc(source, a, 1);
        net.add_output_arc(a, pa, 1);
        net.add_input_arc(source, b, 1);
        net.add_output_arc(b, pb, 1);
        net.add_input_arc(pa, join, 1);
        net.add_input_arc(pb, join, 1);
        net.add_output_arc(join, sink, 1);
        net.initial_marking = net.singleton_marking(source);
        net.final_marking = net.singleton_marking(sink);
        // join can never fire: it is the first violation found.
        assert_eq!(
            check(&net),
            Err(SoundnessError::DeadTransition {
                transition: "join".to_string()
            })
        );
    }

    #[test]
    fn test_token_generator_is_unbounded() {
        // a loops on p1 while also producing tokens into p2.
        let mut net = PetriNet::new();
        let source = net.add_place("source");
        let p1 = net.add_place("p1");
        let p2 = net.add_place("p2");
        let sink = net.add_place("sink");
        let start = net.add_transition("start", None);
        let a = net.add_transition("ta", Some("a"));
        let end = net.add_transition("end", None);
        net.add_input_arc(source, start, 1);
        net.add_output_arc(start, p1, 1);
        net.add_input_arc(p1, a, 1);
        net.add_output_arc(a, p1, 1);
        net.add_output_arc(a, p2, 1);
        net.add_input_arc(p1, end, 1);
        net.add_input_arc(p2, end, 1);
        net.add_output_arc(end, sink, 1);
        net.initial_marking = net.singleton_marking(source);
        net.final_marking = net.singleton_marking(sink);
        assert_eq!(check(&net), Err(SoundnessError::Unbounded));
    }

    #[test]
    fn test_state_limit_is_enforced() {
        let net = parallel_net();
        let config = SoundnessConfig { max_states: 2 };
        assert_eq!(
            check_sound(&net, &config),
            Err(SoundnessError::StateLimitExceeded { limit: 2 })
        );
    }
}
