// cpg-core/src/runtime/coordinator.rs
// ============================================================================
// Module: Execution Coordinator (C6)
// Description: Tracks parallel branches created by PARALLEL edges and
//              evaluates join conditions (ALL / ANY / N_OF_M) at their
//              convergence nodes.
// Purpose: Let the Instance Orchestrator know when a fan-out has produced
//          enough completed branches for its join node to proceed.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! A join lives at whichever node one or more `PARALLEL` inbound edges
//! target. `ALL` requires every branch spawned from those edges to have
//! completed; `ANY` requires one; `N_OF_M` requires a configured count, or a
//! strict majority (`floor(total / 2) + 1`) when the count is unconfigured
//! (the "majority by default" resolution recorded in DESIGN.md). A branch that has failed or been cancelled still counts
//! toward `total` but never toward `satisfied`, so a join whose remaining
//! live branches can no longer reach the threshold is reported as
//! unreachable rather than silently waiting forever.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::BranchId;
use crate::core::BranchStatus;
use crate::core::EdgeId;
use crate::core::InstanceError;
use crate::core::JoinType;
use crate::core::NodeId;
use crate::core::ProcessGraph;
use crate::core::ProcessInstance;

/// The outcome of evaluating a join at one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinEvaluation {
    /// The join's convergence node.
    pub node_id: NodeId,
    /// The join discipline in effect.
    pub join_type: JoinType,
    /// Number of completed branches required to satisfy the join.
    pub required: usize,
    /// Number of branches that have completed so far.
    pub satisfied: usize,
    /// Total number of branches spawned into this join (completed, running,
    /// failed, or cancelled).
    pub total: usize,
    /// `true` once `satisfied >= required`.
    pub is_satisfied: bool,
    /// `true` once the still-live (non-terminal-failed) branches can no
    /// longer reach `required`, meaning the join will never satisfy.
    pub is_unreachable: bool,
}

/// Tracks parallel branches and evaluates their joins.
pub struct ExecutionCoordinator;

impl ExecutionCoordinator {
    /// Allocates a new branch for a just-activated `PARALLEL` edge.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidState`] if the instance is not
    /// running.
    pub fn activate_branch(
        instance: &mut ProcessInstance,
        origin_edge_id: EdgeId,
        current_node_id: NodeId,
    ) -> Result<BranchId, InstanceError> {
        instance.allocate_branch(origin_edge_id, current_node_id)
    }

    /// Advances a tracked branch's position and status.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::NodeNotFound`] if no branch with `branch_id`
    /// exists.
    pub fn advance_branch(
        instance: &mut ProcessInstance,
        branch_id: &BranchId,
        current_node_id: NodeId,
        status: BranchStatus,
    ) -> Result<(), InstanceError> {
        instance.advance_branch(branch_id, current_node_id, status)
    }

    /// Evaluates the join at `node_id`, if any `PARALLEL` edge targets it.
    /// Returns `None` when `node_id` has no parallel inbound edges, since
    /// there is nothing to join.
    #[must_use]
    pub fn evaluate_join(graph: &ProcessGraph, instance: &ProcessInstance, node_id: &NodeId) -> Option<JoinEvaluation> {
        let inbound: Vec<_> = graph
            .inbound_edges(node_id)
            .iter()
            .filter(|edge| edge.execution.kind == crate::core::EdgeKind::Parallel)
            .collect();
        if inbound.is_empty() {
            return None;
        }

        let join_type = inbound[0].execution.join_type;
        let origin_edge_ids: BTreeSet<EdgeId> = inbound.iter().map(|edge| edge.id.clone()).collect();
        let branches = instance.branches_for_origins(&origin_edge_ids);

        let total = branches.len();
        let satisfied = branches
            .iter()
            .filter(|branch| branch.status == BranchStatus::Completed)
            .count();
        let live = branches
            .iter()
            .filter(|branch| matches!(branch.status, BranchStatus::Pending | BranchStatus::Running))
            .count();

        let required = match join_type {
            JoinType::All => total.max(inbound.len()),
            JoinType::Any => 1,
            JoinType::NOfM { required: Some(required) } => usize::try_from(required).unwrap_or(usize::MAX),
            JoinType::NOfM { required: None } => total / 2 + 1,
        };

        let is_satisfied = satisfied >= required;
        let is_unreachable = !is_satisfied && satisfied + live < required;

        Some(JoinEvaluation {
            node_id: node_id.clone(),
            join_type,
            required,
            satisfied,
            total,
            is_satisfied,
            is_unreachable,
        })
    }
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
    use std::collections::BTreeMap;
    use std::collections::BTreeSet as Set;

    use crate::core::Action;
    use crate::core::ActionConfig;
    use crate::core::ActionType;
    use crate::core::Edge;
    use crate::core::EdgeKind;
    use crate::core::EventConfig;
    use crate::core::EventTriggers;
    use crate::core::ExceptionRoutes;
    use crate::core::ExecutionContext;
    use crate::core::ExecutionSemantics;
    use crate::core::GraphId;
    use crate::core::GraphStatus;
    use crate::core::GraphVersion;
    use crate::core::GuardConditions;
    use crate::core::HandlerRef;
    use crate::core::InstanceId;
    use crate::core::Node;
    use crate::core::Preconditions;
    use crate::core::Priority;
    use crate::core::Timestamp;

    fn plain_node(id: &str) -> Node {
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

    fn parallel_edge(id: &str, source: &str, target: &str, join_type: JoinType) -> Edge {
        Edge {
            id: EdgeId::new(id),
            name: id.to_string(),
            description: String::new(),
            source: NodeId::new(source),
            target: NodeId::new(target),
            guard: GuardConditions::default(),
            execution: ExecutionSemantics {
                kind: EdgeKind::Parallel,
                join_type,
            },
            priority: Priority { weight: 0, rank: 0, exclusive: false },
            event_triggers: EventTriggers::default(),
            compensation: None,
        }
    }

    fn graph_with_fan_in(join_type: JoinType) -> ProcessGraph {
        ProcessGraph::new(
            GraphId::new("g"),
            GraphVersion::new(1),
            "g",
            "",
            GraphStatus::Published,
            vec![plain_node("a"), plain_node("b"), plain_node("c"), plain_node("join")],
            vec![
                parallel_edge("a-join", "a", "join", join_type),
                parallel_edge("b-join", "b", "join", join_type),
                parallel_edge("c-join", "c", "join", join_type),
            ],
            Set::from([NodeId::new("a"), NodeId::new("b"), NodeId::new("c")]),
            Set::from([NodeId::new("join")]),
            BTreeMap::new(),
        )
        .expect("graph should validate")
    }

    fn fresh_instance() -> ProcessInstance {
        ProcessInstance::start(
            InstanceId::new("inst-1"),
            GraphId::new("g"),
            GraphVersion::new(1),
            None,
            Timestamp::Logical(1),
            ExecutionContext::default(),
        )
    }

    #[test]
    fn all_join_requires_every_branch_completed() {
        let graph = graph_with_fan_in(JoinType::All);
        let mut instance = fresh_instance();
        let branch_a = ExecutionCoordinator::activate_branch(&mut instance, EdgeId::new("a-join"), NodeId::new("a")).expect("allocate");
        let branch_b = ExecutionCoordinator::activate_branch(&mut instance, EdgeId::new("b-join"), NodeId::new("b")).expect("allocate");
        let branch_c = ExecutionCoordinator::activate_branch(&mut instance, EdgeId::new("c-join"), NodeId::new("c")).expect("allocate");

        ExecutionCoordinator::advance_branch(&mut instance, &branch_a, NodeId::new("a"), BranchStatus::Completed).expect("advance");
        let evaluation = ExecutionCoordinator::evaluate_join(&graph, &instance, &NodeId::new("join")).expect("join present");
        assert!(!evaluation.is_satisfied);

        ExecutionCoordinator::advance_branch(&mut instance, &branch_b, NodeId::new("b"), BranchStatus::Completed).expect("advance");
        ExecutionCoordinator::advance_branch(&mut instance, &branch_c, NodeId::new("c"), BranchStatus::Completed).expect("advance");
        let evaluation = ExecutionCoordinator::evaluate_join(&graph, &instance, &NodeId::new("join")).expect("join present");
        assert!(evaluation.is_satisfied);
        assert_eq!(evaluation.required, 3);
    }

    #[test]
    fn n_of_m_defaults_to_majority_when_unconfigured() {
        let graph = graph_with_fan_in(JoinType::NOfM { required: None });
        let mut instance = fresh_instance();
        let branch_a = ExecutionCoordinator::activate_branch(&mut instance, EdgeId::new("a-join"), NodeId::new("a")).expect("allocate");
        ExecutionCoordinator::activate_branch(&mut instance, EdgeId::new("b-join"), NodeId::new("b")).expect("allocate");
        ExecutionCoordinator::activate_branch(&mut instance, EdgeId::new("c-join"), NodeId::new("c")).expect("allocate");

        ExecutionCoordinator::advance_branch(&mut instance, &branch_a, NodeId::new("a"), BranchStatus::Completed).expect("advance");
        let evaluation = ExecutionCoordinator::evaluate_join(&graph, &instance, &NodeId::new("join")).expect("join present");
        assert_eq!(evaluation.required, 2);
        assert!(!evaluation.is_satisfied);
        assert!(!evaluation.is_unreachable);
    }

    #[test]
    fn join_becomes_unreachable_when_too_many_branches_fail() {
        let graph = graph_with_fan_in(JoinType::All);
        let mut instance = fresh_instance();
        let branch_a = ExecutionCoordinator::activate_branch(&mut instance, EdgeId::new("a-join"), NodeId::new("a")).expect("allocate");
        let branch_b = ExecutionCoordinator::activate_branch(&mut instance, EdgeId::new("b-join"), NodeId::new("b")).expect("allocate");
        ExecutionCoordinator::activate_branch(&mut instance, EdgeId::new("c-join"), NodeId::new("c")).expect("allocate");

        ExecutionCoordinator::advance_branch(&mut instance, &branch_a, NodeId::new("a"), BranchStatus::Failed).expect("advance");
        ExecutionCoordinator::advance_branch(&mut instance, &branch_b, NodeId::new("b"), BranchStatus::Failed).expect("advance");
        let evaluation = ExecutionCoordinator::evaluate_join(&graph, &instance, &NodeId::new("join")).expect("join present");
        assert!(evaluation.is_unreachable);
    }
}
