// cpg-core/src/runtime/navigation.rs
// ============================================================================
// Module: Navigation Decider (C10)
// Description: Chooses among an EligibleSpace's candidate actions.
// Purpose: Produce a deterministic NavigationDecision for one orchestration
//          cycle.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Selection is a fixed, deterministic pipeline: empty space waits; a single
//! candidate proceeds outright; an exclusive traversable edge preempts
//! everything else; otherwise candidates are sorted by `(weight desc, rank
//! asc, declaration order)` and either every parallel-incoming candidate is
//! selected together, or the single highest-priority candidate wins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::CandidateAction;
use crate::core::DecisionType;
use crate::core::EdgeKind;
use crate::core::EligibleSpace;
use crate::core::NavigationDecision;
use crate::core::NodeId;
use crate::core::ProcessGraph;
use crate::core::SafeSummary;
use crate::core::SelectionCriteria;
use crate::core::Timestamp;

/// Decides among an `EligibleSpace`'s candidate actions.
pub struct NavigationDecider;

impl NavigationDecider {
    /// Decides the navigation outcome for `space` against `graph`.
    #[must_use]
    pub fn decide(graph: &ProcessGraph, space: &EligibleSpace, now: Timestamp) -> NavigationDecision {
        if space.is_empty() {
            return NavigationDecision {
                decision_type: DecisionType::Wait,
                selected_actions: Vec::new(),
                alternatives_considered: Vec::new(),
                selection_criteria: SelectionCriteria::NoOptions,
                selection_reason: "no candidate actions this cycle".to_string(),
                decided_at: now,
                summary: Some(SafeSummary::new("no_options", Vec::new())),
            };
        }

        if let Some(only) = single_candidate(space) {
            if graph.is_terminal(&only.node_id) {
                return NavigationDecision {
                    decision_type: DecisionType::Complete,
                    selected_actions: vec![only.clone()],
                    alternatives_considered: Vec::new(),
                    selection_criteria: SelectionCriteria::SingleOption,
                    selection_reason: format!("terminal node {} satisfied its preconditions", only.node_id),
                    decided_at: now,
                    summary: None,
                };
            }
            return NavigationDecision {
                decision_type: DecisionType::Proceed,
                selected_actions: vec![only.clone()],
                alternatives_considered: Vec::new(),
                selection_criteria: SelectionCriteria::SingleOption,
                selection_reason: "exactly one candidate action".to_string(),
                decided_at: now,
                summary: None,
            };
        }

        let declaration_order = node_declaration_order(graph);

        if let Some(exclusive) = exclusive_candidate(graph, space, &declaration_order) {
            let alternatives = space
                .candidate_actions
                .iter()
                .filter(|candidate| **candidate != exclusive)
                .cloned()
                .collect();
            return NavigationDecision {
                decision_type: DecisionType::Proceed,
                selected_actions: vec![exclusive],
                alternatives_considered: alternatives,
                selection_criteria: SelectionCriteria::Exclusive,
                selection_reason: "exclusive edge preempts all other candidates".to_string(),
                decided_at: now,
                summary: None,
            };
        }

        let mut ranked: Vec<&CandidateAction> = space.candidate_actions.iter().collect();
        ranked.sort_by(|left, right| rank_candidate(graph, &declaration_order, left, right));

        let parallel: Vec<CandidateAction> = ranked
            .iter()
            .filter(|candidate| candidate_is_parallel(graph, candidate))
            .map(|candidate| (**candidate).clone())
            .collect();

        if !parallel.is_empty() {
            let alternatives = ranked
                .iter()
                .filter(|candidate| !parallel.contains(candidate))
                .map(|candidate| (**candidate).clone())
                .collect();
            return NavigationDecision {
                decision_type: DecisionType::Proceed,
                selected_actions: parallel,
                alternatives_considered: alternatives,
                selection_criteria: SelectionCriteria::Parallel,
                selection_reason: "multiple candidates activated by parallel edges".to_string(),
                decided_at: now,
                summary: None,
            };
        }

        let winner = (*ranked[0]).clone();
        let alternatives = ranked[1..].iter().map(|candidate| (**candidate).clone()).collect();
        NavigationDecision {
            decision_type: DecisionType::Proceed,
            selected_actions: vec![winner],
            alternatives_considered: alternatives,
            selection_criteria: SelectionCriteria::HighestPriority,
            selection_reason: "highest priority among remaining candidates".to_string(),
            decided_at: now,
            summary: None,
        }
    }
}

fn single_candidate(space: &EligibleSpace) -> Option<&CandidateAction> {
    if space.candidate_actions.len() == 1 {
        space.candidate_actions.first()
    } else {
        None
    }
}

fn exclusive_candidate(
    graph: &ProcessGraph,
    space: &EligibleSpace,
    declaration_order: &BTreeMap<NodeId, usize>,
) -> Option<CandidateAction> {
    let mut exclusive_candidates: Vec<&CandidateAction> = space
        .candidate_actions
        .iter()
        .filter(|candidate| {
            candidate
                .incoming_edge_id
                .as_ref()
                .and_then(|edge_id| graph.find_edge(edge_id))
                .is_some_and(|edge| edge.priority.exclusive)
        })
        .collect();
    if exclusive_candidates.is_empty() {
        return None;
    }
    exclusive_candidates.sort_by(|left, right| rank_candidate(graph, declaration_order, left, right));
    exclusive_candidates.first().map(|candidate| (**candidate).clone())
}

fn candidate_is_parallel(graph: &ProcessGraph, candidate: &CandidateAction) -> bool {
    candidate
        .incoming_edge_id
        .as_ref()
        .and_then(|edge_id| graph.find_edge(edge_id))
        .is_some_and(|edge| edge.execution.kind == EdgeKind::Parallel)
}

fn node_declaration_order(graph: &ProcessGraph) -> BTreeMap<NodeId, usize> {
    graph
        .nodes()
        .iter()
        .enumerate()
        .map(|(position, node)| (node.id.clone(), position))
        .collect()
}

fn rank_candidate(
    graph: &ProcessGraph,
    declaration_order: &BTreeMap<NodeId, usize>,
    left: &CandidateAction,
    right: &CandidateAction,
) -> std::cmp::Ordering {
    let left_priority = left
        .incoming_edge_id
        .as_ref()
        .and_then(|edge_id| graph.find_edge(edge_id))
        .map(|edge| edge.priority);
    let right_priority = right
        .incoming_edge_id
        .as_ref()
        .and_then(|edge_id| graph.find_edge(edge_id))
        .map(|edge| edge.priority);

    let left_weight = left_priority.map_or(0, |priority| priority.weight);
    let right_weight = right_priority.map_or(0, |priority| priority.weight);
    let left_rank = left_priority.map_or(0, |priority| priority.rank);
    let right_rank = right_priority.map_or(0, |priority| priority.rank);

    right_weight
        .cmp(&left_weight)
        .then_with(|| left_rank.cmp(&right_rank))
        .then_with(|| {
            let left_position = declaration_order.get(&left.node_id).copied().unwrap_or(usize::MAX);
            let right_position = declaration_order.get(&right.node_id).copied().unwrap_or(usize::MAX);
            left_position.cmp(&right_position)
        })
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]
    use super::*;
    use std::collections::BTreeSet;

    use crate::core::Action;
    use crate::core::ActionConfig;
    use crate::core::ActionType;
    use crate::core::Edge;
    use crate::core::EdgeId;
    use crate::core::EdgeKind;
    use crate::core::EventConfig;
    use crate::core::EventTriggers;
    use crate::core::ExceptionRoutes;
    use crate::core::ExecutionSemantics;
    use crate::core::GraphId;
    use crate::core::GraphStatus;
    use crate::core::GraphVersion;
    use crate::core::GuardConditions;
    use crate::core::HandlerRef;
    use crate::core::JoinType;
    use crate::core::Node;
    use crate::core::Preconditions;
    use crate::core::Priority;

    fn node(id: &str) -> Node {
        Node {
            id: NodeId::new(id),
            name: id.to_string(),
            description: String::new(),
            version: 1,
            preconditions: Preconditions::default(),
            policy_gates: Vec::new(),
            business_rules: Vec::new(),
            action: Action {
                action_type: ActionType::Decision,
                handler_ref: HandlerRef::new("noop"),
                config: ActionConfig::default(),
            },
            event_config: EventConfig::default(),
            exception_routes: ExceptionRoutes::default(),
        }
    }

    fn edge(id: &str, source: &str, target: &str, weight: i64, rank: i64) -> Edge {
        Edge {
            id: EdgeId::new(id),
            name: id.to_string(),
            description: String::new(),
            source: NodeId::new(source),
            target: NodeId::new(target),
            guard: GuardConditions::default(),
            execution: ExecutionSemantics {
                kind: EdgeKind::Sequential,
                join_type: JoinType::All,
            },
            priority: Priority {
                weight,
                rank,
                exclusive: false,
            },
            event_triggers: EventTriggers::default(),
            compensation: None,
        }
    }

    fn candidate_space(actions: Vec<CandidateAction>, now: Timestamp) -> EligibleSpace {
        EligibleSpace {
            eligible_nodes: Vec::new(),
            traversable_edges: Vec::new(),
            candidate_actions: actions,
            evaluated_at: now,
        }
    }

    #[test]
    fn highest_priority_wins_on_weight_then_rank() {
        let graph = ProcessGraph::new(
            GraphId::new("g"),
            GraphVersion::new(1),
            "g",
            "",
            GraphStatus::Published,
            vec![node("a"), node("b"), node("c")],
            vec![edge("a-b", "a", "b", 5, 0), edge("a-c", "a", "c", 10, 0)],
            BTreeSet::from([NodeId::new("a")]),
            BTreeSet::new(),
            BTreeMap::new(),
        )
        .expect("graph should validate");

        let space = candidate_space(
            vec![
                CandidateAction {
                    node_id: NodeId::new("b"),
                    incoming_edge_id: Some(EdgeId::new("a-b")),
                },
                CandidateAction {
                    node_id: NodeId::new("c"),
                    incoming_edge_id: Some(EdgeId::new("a-c")),
                },
            ],
            Timestamp::Logical(1),
        );

        let decision = NavigationDecider::decide(&graph, &space, Timestamp::Logical(2));
        assert_eq!(decision.decision_type, DecisionType::Proceed);
        assert_eq!(decision.selection_criteria, SelectionCriteria::HighestPriority);
        assert_eq!(decision.selected_actions.len(), 1);
        assert_eq!(decision.selected_actions[0].node_id, NodeId::new("c"));
    }

    #[test]
    fn exclusive_edge_preempts_higher_weight_alternative() {
        let graph = ProcessGraph::new(
            GraphId::new("g"),
            GraphVersion::new(1),
            "g",
            "",
            GraphStatus::Published,
            vec![node("n1"), node("n2"), node("n3")],
            vec![
                edge("n1-n2", "n1", "n2", 100, 0),
                {
                    let mut exclusive = edge("n1-n3", "n1", "n3", 10, 0);
                    exclusive.priority.exclusive = true;
                    exclusive
                },
            ],
            BTreeSet::from([NodeId::new("n1")]),
            BTreeSet::new(),
            BTreeMap::new(),
        )
        .expect("graph should validate");

        let to_n2 = CandidateAction {
            node_id: NodeId::new("n2"),
            incoming_edge_id: Some(EdgeId::new("n1-n2")),
        };
        let to_n3 = CandidateAction {
            node_id: NodeId::new("n3"),
            incoming_edge_id: Some(EdgeId::new("n1-n3")),
        };
        let space = candidate_space(vec![to_n2.clone(), to_n3.clone()], Timestamp::Logical(1));

        let decision = NavigationDecider::decide(&graph, &space, Timestamp::Logical(2));
        assert_eq!(decision.decision_type, DecisionType::Proceed);
        assert_eq!(decision.selection_criteria, SelectionCriteria::Exclusive);
        assert_eq!(decision.selected_actions, vec![to_n3]);
        assert!(decision.alternatives_considered.contains(&to_n2));
    }

    #[test]
    fn empty_space_waits() {
        let graph = ProcessGraph::new(
            GraphId::new("g"),
            GraphVersion::new(1),
            "g",
            "",
            GraphStatus::Published,
            vec![node("a")],
            vec![],
            BTreeSet::from([NodeId::new("a")]),
            BTreeSet::new(),
            BTreeMap::new(),
        )
        .expect("graph should validate");
        let space = candidate_space(Vec::new(), Timestamp::Logical(1));
        let decision = NavigationDecider::decide(&graph, &space, Timestamp::Logical(2));
        assert_eq!(decision.decision_type, DecisionType::Wait);
        assert_eq!(decision.selection_criteria, SelectionCriteria::NoOptions);
    }
}
