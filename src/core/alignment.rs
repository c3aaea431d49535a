// petribench - core/alignment.rs
//
// Optimal alignments between a trace and an accepting Petri net.
//
// The search runs Dijkstra over the synchronous product: a state is a
// (marking, trace position) pair and the moves are
//   - synchronous: fire a transition labelled like the next event,
//   - model: fire any enabled transition without consuming an event,
//   - log: consume the next event without firing anything.
// Costs follow the standard alignment cost function: synchronous moves are
// free, silent model moves cost `TAU_MOVE_COST`, and log moves and visible
// model moves cost `STD_MOVE_COST`.
//
// Every search is capped at `AlignmentConfig::max_states` product states;
// hitting the cap yields `None` rather than an unbounded search.

use crate::core::model::{Marking, PetriNet};
use crate::util::constants::{STD_MOVE_COST, SYNC_MOVE_COST, TAU_MOVE_COST};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Limits applied to every alignment search.
#[derive(Debug, Clone)]
pub struct AlignmentConfig {
    /// Maximum number of product states created per search.
    pub max_states: usize,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            max_states: crate::util::constants::DEFAULT_MAX_ALIGNMENT_STATES,
        }
    }
}

/// One step of an alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Event `event` matched by firing `transition`.
    Sync { transition: usize, event: usize },
    /// `transition` fired without a matching event.
    Model { transition: usize },
    /// Event `event` has no counterpart in the model.
    Log { event: usize },
}

/// An optimal alignment and its total cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub cost: u64,
    pub moves: Vec<Move>,
}

impl Alignment {
    /// Number of non-silent deviations (log moves and visible model moves).
    pub fn deviations(&self) -> u64 {
        self.cost / STD_MOVE_COST
    }

    /// Transitions fired by the model side of the alignment, in order.
    pub fn fired_transitions(&self) -> impl Iterator<Item = usize> + '_ {
        self.moves.iter().filter_map(|m| match *m {
            Move::Sync { transition, .. } | Move::Model { transition } => Some(transition),
            Move::Log { .. } => None,
        })
    }
}

/// Align `trace` against `net`, ending in the net's final marking.
///
/// Returns `None` when the final marking is unreachable or the search
/// exceeds the configured state cap.
pub fn align_trace(net: &PetriNet, trace: &[String], config: &AlignmentConfig) -> Option<Alignment> {
    let len = trace.len();
    let outcome = search(net, trace, config, false, |marking, position| {
        position == len && marking == net.final_marking.as_slice()
    })?;
    let goal = *outcome.goals.first()?;
    Some(Alignment {
        cost: outcome.cost,
        moves: outcome.space.path_to(goal),
    })
}

/// Markings reached by all optimal alignments of `prefix` that stop right
/// after its last event, without requiring the final marking.
pub fn prefix_markings(
    net: &PetriNet,
    prefix: &[String],
    config: &AlignmentConfig,
) -> Option<Vec<Marking>> {
    let len = prefix.len();
    let outcome = search(net, prefix, config, true, |_, position| position == len)?;
    let mut markings: Vec<Marking> = outcome
        .goals
        .iter()
        .map(|&id| outcome.space.nodes[id].0.clone())
        .collect();
    markings.sort();
    markings.dedup();
    Some(markings)
}

/// Number of visible model moves on the cheapest run from the initial to
/// the final marking (the deviations of aligning the empty trace).
pub fn best_worst_cost(net: &PetriNet, config: &AlignmentConfig) -> Option<u64> {
    align_trace(net, &[], config).map(|a| a.deviations())
}

// =============================================================================
// Search
// =============================================================================

type ProductState = (Marking, usize);

struct SearchSpace {
    ids: HashMap<ProductState, usize>,
    nodes: Vec<ProductState>,
    costs: Vec<u64>,
    back: Vec<Option<(usize, Move)>>,
}

impl SearchSpace {
    fn new(start: ProductState) -> Self {
        let mut ids = HashMap::new();
        ids.insert(start.clone(), 0);
        Self {
            ids,
            nodes: vec![start],
            costs: vec![0],
            back: vec![None],
        }
    }

    fn path_to(&self, mut id: usize) -> Vec<Move> {
        let mut moves = Vec::new();
        while let Some((prev, mv)) = self.back[id] {
            moves.push(mv);
            id = prev;
        }
        moves.reverse();
        moves
    }
}

struct SearchOutcome {
    cost: u64,
    goals: Vec<usize>,
    space: SearchSpace,
}

/// Dijkstra over the synchronous product of `net` and `trace`.
///
/// With `collect_ties` every goal state popped at the optimal cost is
/// returned; otherwise the search stops at the first goal.
fn search<G>(
    net: &PetriNet,
    trace: &[String],
    config: &AlignmentConfig,
    collect_ties: bool,
    is_goal: G,
) -> Option<SearchOutcome>
where
    G: Fn(&[u32], usize) -> bool,
{
    let mut space = SearchSpace::new((net.initial_marking.clone(), 0));
    let mut closed: Vec<bool> = vec![false];
    let mut open = BinaryHeap::new();
    open.push(Reverse((0u64, 0usize)));

    let mut best: Option<u64> = None;
    let mut goals: Vec<usize> = Vec::new();

    while let Some(Reverse((cost, id))) = open.pop() {
        if closed[id] || cost > space.costs[id] {
            continue;
        }
        if best.is_some_and(|b| cost > b) {
            break;
        }
        closed[id] = true;

        let (marking, position) = space.nodes[id].clone();
        if is_goal(&marking, position) {
            best = Some(cost);
            goals.push(id);
            if !collect_ties {
                break;
            }
            continue;
        }

        let mut successors: Vec<(ProductState, u64, Move)> = Vec::new();
        if position < trace.len() {
            successors.push((
                (marking.clone(), position + 1),
                STD_MOVE_COST,
                Move::Log { event: position },
            ));
        }
        for t in net.enabled_transitions(&marking) {
            let next = net.fire(&marking, t);
            match net.transitions[t].label.as_deref() {
                None => successors.push((
                    (next, position),
                    TAU_MOVE_COST,
                    Move::Model { transition: t },
                )),
                Some(label) => {
                    if position < trace.len() && trace[position] == label {
                        successors.push((
                            (next.clone(), position + 1),
                            SYNC_MOVE_COST,
                            Move::Sync {
                                transition: t,
                                event: position,
                            },
                        ));
                    }
                    successors.push((
                        (next, position),
                        STD_MOVE_COST,
                        Move::Model { transition: t },
                    ));
                }
            }
        }

        for (state, step, mv) in successors {
            let next_cost = cost + step;
            match space.ids.get(&state) {
                Some(&known) => {
                    if !closed[known] && next_cost < space.costs[known] {
                        space.costs[known] = next_cost;
                        space.back[known] = Some((id, mv));
                        open.push(Reverse((next_cost, known)));
                    }
                }
                None => {
                    if space.nodes.len() >= config.max_states {
                        tracing::debug!(
                            limit = config.max_states,
                            trace_len = trace.len(),
                            "Alignment search exceeded state limit"
                        );
                        return None;
                    }
                    let new_id = space.nodes.len();
                    space.ids.insert(state.clone(), new_id);
                    space.nodes.push(state);
                    space.costs.push(next_cost);
                    space.back.push(Some((id, mv)));
                    closed.push(false);
                    open.push(Reverse((next_cost, new_id)));
                }
            }
        }
    }

    let cost = best?;
    Some(SearchOutcome { cost, goals, space })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::tests::sequence_net;

    fn trace(activities: &[&str]) -> Vec<String> {
        activities.iter().map(|a| a.to_string()).collect()
    }

    fn config() -> AlignmentConfig {
        AlignmentConfig::default()
    }

    #[test]
    fn test_perfect_trace_has_zero_cost() {
        let net = sequence_net(&["a", "b", "c"]);
        let alignment = align_trace(&net, &trace(&["a", "b", "c"]), &config()).unwrap();
        assert_eq!(alignment.cost, 0);
        assert_eq!(alignment.moves.len(), 3);
        assert!(alignment
            .moves
            .iter()
            .all(|m| matches!(m, Move::Sync { .. })));
    }

    #[test]
    fn test_missing_event_costs_one_model_move() {
        let net = sequence_net(&["a", "b", "c"]);
        let alignment = align_trace(&net, &trace(&["a", "c"]), &config()).unwrap();
        assert_eq!(alignment.cost, STD_MOVE_COST);
        assert_eq!(alignment.deviations(), 1);
        assert!(alignment.moves.contains(&Move::Model { transition: 1 }));
        assert_eq!(alignment.fired_transitions().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_extra_event_costs_one_log_move() {
        let net = sequence_net(&["a", "b"]);
        let alignment = align_trace(&net, &trace(&["a", "x", "b"]), &config()).unwrap();
        assert_eq!(alignment.deviations(), 1);
        assert!(alignment.moves.contains(&Move::Log { event: 1 }));
    }

    #[test]
    fn test_silent_transitions_cost_tau() {
        // source -> tau -> p1 -> a -> sink
        let mut net = PetriNet::new();
        let source = net.add_place("source");
        let p1 = net.add_place("p1");
        let sink = net.add_place("sink");
        let tau = net.add_transition("tau", None);
        let a = net.add_transition("ta", Some("a"));
        net.add_input_arc(source, tau, 1);
        net.add_output_arc(tau, p1, 1);
        net.add_input_arc(p1, a, 1);
        net.add_output_arc(a, sink, 1);
        net.initial_marking = net.singleton_marking(source);
        net.final_marking = net.singleton_marking(sink);

        let alignment = align_trace(&net, &trace(&["a"]), &config()).unwrap();
        assert_eq!(alignment.cost, TAU_MOVE_COST);
        assert_eq!(alignment.deviations(), 0);
    }

    #[test]
    fn test_best_worst_cost_counts_visible_transitions() {
        let net = sequence_net(&["a", "b", "c"]);
        assert_eq!(best_worst_cost(&net, &config()), Some(3));
    }

    #[test]
    fn test_unreachable_final_marking_yields_none() {
        let mut net = sequence_net(&["a"]);
        net.final_marking = vec![0, 2];
        assert!(align_trace(&net, &trace(&["a"]), &config()).is_none());
    }

    #[test]
    fn test_prefix_markings_stop_after_prefix() {
        let net = sequence_net(&["a", "b", "c"]);
        let markings = prefix_markings(&net, &trace(&["a"]), &config()).unwrap();
        assert_eq!(markings, vec![vec![0, 1, 0, 0]]);
    }

    #[test]
    fn test_state_limit_yields_none() {
        let net = sequence_net(&["a", "b", "c"]);
        let tight = AlignmentConfig { max_states: 2 };
        assert!(align_trace(&net, &trace(&["a", "b", "c"]), &tight).is_none());
    }
}
