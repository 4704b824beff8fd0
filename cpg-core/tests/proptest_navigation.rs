// cpg-core/tests/proptest_navigation.rs
// ============================================================================
// Module: Navigation Decider Property-Based Tests
// Description: Property tests for candidate selection determinism and
//              priority ordering.
// Purpose: Detect panics and invariant violations across wide input ranges.
// ============================================================================

//! Property-based tests for `NavigationDecider::decide`'s ranking invariant.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use cpg_core::Action;
use cpg_core::ActionConfig;
use cpg_core::ActionType;
use cpg_core::CandidateAction;
use cpg_core::DecisionType;
use cpg_core::Edge;
use cpg_core::EdgeId;
use cpg_core::EdgeKind;
use cpg_core::EligibleSpace;
use cpg_core::EventConfig;
use cpg_core::EventTriggers;
use cpg_core::ExceptionRoutes;
use cpg_core::ExecutionSemantics;
use cpg_core::GraphId;
use cpg_core::GraphStatus;
use cpg_core::GraphVersion;
use cpg_core::GuardConditions;
use cpg_core::HandlerRef;
use cpg_core::JoinType;
use cpg_core::Node;
use cpg_core::NodeId;
use cpg_core::Preconditions;
use cpg_core::Priority;
use cpg_core::ProcessGraph;
use cpg_core::SelectionCriteria;
use cpg_core::Timestamp;
use cpg_core::runtime::NavigationDecider;
use proptest::prelude::*;

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

fn edge(id: &str, target: &str, weight: i64, rank: i64) -> Edge {
    Edge {
        id: EdgeId::new(id),
        name: id.to_string(),
        description: String::new(),
        source: NodeId::new("root"),
        target: NodeId::new(target),
        guard: GuardConditions::default(),
        execution: ExecutionSemantics {
            kind: EdgeKind::Sequential,
            join_type: JoinType::All,
        },
        priority: Priority { weight, rank, exclusive: false },
        event_triggers: EventTriggers::default(),
        compensation: None,
    }
}

/// Builds a fan-out graph: `root` plus one non-terminal target per
/// `(weight, rank)` pair, connected by a sequential, non-exclusive edge
/// carrying that priority. All targets remain candidates, so selection must
/// fall through to the weight/rank/declaration-order ranking pass.
fn fan_out_graph(priorities: &[(i64, i64)]) -> (ProcessGraph, EligibleSpace) {
    let mut nodes = vec![node("root")];
    let mut edges = Vec::with_capacity(priorities.len());
    let mut candidates = Vec::with_capacity(priorities.len());
    for (index, (weight, rank)) in priorities.iter().enumerate() {
        let target_id = format!("target-{index}");
        nodes.push(node(&target_id));
        let edge_id = format!("root-{target_id}");
        edges.push(edge(&edge_id, &target_id, *weight, *rank));
        candidates.push(CandidateAction {
            node_id: NodeId::new(target_id),
            incoming_edge_id: Some(EdgeId::new(edge_id)),
        });
    }
    let graph = ProcessGraph::new(
        GraphId::new("g"),
        GraphVersion::new(1),
        "g",
        "",
        GraphStatus::Published,
        nodes,
        edges,
        BTreeSet::from([NodeId::new("root")]),
        BTreeSet::new(),
        BTreeMap::new(),
    )
    .expect("fan-out graph should validate");

    let space = EligibleSpace {
        eligible_nodes: Vec::new(),
        traversable_edges: Vec::new(),
        candidate_actions: candidates,
        evaluated_at: Timestamp::Logical(1),
    };
    (graph, space)
}

fn priority_strategy() -> impl Strategy<Value = (i64, i64)> {
    ((-100_i64..100), (-100_i64..100))
}

proptest! {
    #[test]
    fn decide_is_deterministic_across_repeated_runs(
        priorities in prop::collection::vec(priority_strategy(), 2..8)
    ) {
        let (graph, space) = fan_out_graph(&priorities);
        let first = NavigationDecider::decide(&graph, &space, Timestamp::Logical(2));
        let second = NavigationDecider::decide(&graph, &space, Timestamp::Logical(2));
        prop_assert_eq!(first.decision_type, second.decision_type);
        prop_assert_eq!(first.selection_criteria, second.selection_criteria);
        prop_assert_eq!(first.selected_actions, second.selected_actions);
        prop_assert_eq!(first.alternatives_considered, second.alternatives_considered);
    }

    #[test]
    fn decide_picks_highest_weight_then_lowest_rank_then_declaration_order(
        priorities in prop::collection::vec(priority_strategy(), 2..8)
    ) {
        let (graph, space) = fan_out_graph(&priorities);
        let decision = NavigationDecider::decide(&graph, &space, Timestamp::Logical(2));
        prop_assert_eq!(decision.decision_type, DecisionType::Proceed);
        prop_assert_eq!(decision.selection_criteria, SelectionCriteria::HighestPriority);
        prop_assert_eq!(decision.selected_actions.len(), 1);

        let winner_index = priorities
            .iter()
            .enumerate()
            .min_by(|(left_index, (left_weight, left_rank)), (right_index, (right_weight, right_rank))| {
                right_weight
                    .cmp(left_weight)
                    .then_with(|| left_rank.cmp(right_rank))
                    .then_with(|| left_index.cmp(right_index))
            })
            .map(|(index, _)| index)
            .expect("priorities is non-empty");

        prop_assert_eq!(
            decision.selected_actions[0].node_id,
            NodeId::new(format!("target-{winner_index}"))
        );
    }
}
