// cpg-core/src/core/eligibility.rs
// ============================================================================
// Module: Eligibility Data Shapes (C4, C5, C9)
// Description: NodeEvaluation, EdgeEvaluation, CandidateAction, EligibleSpace.
// Purpose: Carry the per-cycle evaluation results the Navigation Decider
//          chooses among.
// Dependencies: serde, crate::core::{graph, identifiers, time}
// ============================================================================

//! ## Overview
//! These types are the output of the Node Evaluator (C4) and Edge Evaluator
//! (C5), assembled by the Eligibility Evaluator (C9) into one
//! [`EligibleSpace`] per cycle.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::graph::PolicyOutcome;
use crate::core::identifiers::EdgeId;
use crate::core::identifiers::NodeId;
use crate::core::identifiers::PolicyGateId;
use crate::core::identifiers::RuleId;
use crate::core::time::Timestamp;

/// Result of evaluating one policy gate against a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyCheckResult {
    /// The gate checked.
    pub policy_gate_id: PolicyGateId,
    /// The outcome the policy evaluator returned.
    pub outcome: PolicyOutcome,
    /// The outcome the gate requires to pass.
    pub required_outcome: PolicyOutcome,
    /// Whether `outcome` satisfies the gate. `false` whenever `outcome` is
    /// `Denied`, or `ReviewRequired` and `required_outcome` differs.
    pub passed: bool,
    /// Arbitrary structured detail from the policy evaluator.
    pub details: Option<Value>,
}

/// Result of evaluating one business rule referenced by a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCheckResult {
    /// The rule evaluated.
    pub rule_id: RuleId,
    /// The category label declared on the node's rule reference.
    pub category: String,
    /// Named outputs returned by the rule evaluator.
    pub outputs: BTreeMap<String, Value>,
    /// Present when the evaluator surfaced a failure for this rule; absorbed
    /// here rather than propagated as a hard error.
    pub error: Option<String>,
}

/// The Node Evaluator's (C4) output for one node in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEvaluation {
    /// The node evaluated.
    pub node_id: NodeId,
    /// Whether the node is currently available for selection.
    pub available: bool,
    /// Whether both precondition lists passed.
    pub preconditions_passed: bool,
    /// Whether every policy gate passed.
    pub policies_passed: bool,
    /// Every policy gate result, collected in full even after the first
    /// blocking one, to produce readable traces.
    pub policy_results: Vec<PolicyCheckResult>,
    /// Every business rule result, in declaration order.
    pub rule_results: Vec<RuleCheckResult>,
    /// Rule outputs merged in declaration order; a later rule's output for
    /// the same key overwrites an earlier one.
    pub rule_outputs: BTreeMap<String, Value>,
    /// Redacted reason the node is unavailable, set iff `!available`.
    pub blocked_reason: Option<String>,
}

/// The Edge Evaluator's (C5) output for one edge in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeEvaluation {
    /// The edge evaluated.
    pub edge_id: EdgeId,
    /// Whether every guard sub-check passed.
    pub traversable: bool,
    /// Whether all context conditions held.
    pub context_passed: bool,
    /// Whether all rule-outcome conditions held.
    pub rule_outcome_passed: bool,
    /// Whether all policy-outcome conditions held.
    pub policy_outcome_passed: bool,
    /// Whether all event conditions held.
    pub event_passed: bool,
    /// Redacted reason the edge is not traversable, set iff `!traversable`.
    pub blocked_reason: Option<String>,
}

/// A `(node, optional activating edge)` pair eligible for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateAction {
    /// The node that would be executed.
    pub node_id: NodeId,
    /// The edge that made this node a candidate, absent for entry nodes.
    pub incoming_edge_id: Option<EdgeId>,
}

/// The full set of actions the orchestrator could take right now, assembled
/// by the Eligibility Evaluator (C9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibleSpace {
    /// Every node evaluation considered this cycle.
    pub eligible_nodes: Vec<NodeEvaluation>,
    /// Every edge evaluation considered this cycle.
    pub traversable_edges: Vec<EdgeEvaluation>,
    /// The cross product of eligible nodes and their activating edges.
    pub candidate_actions: Vec<CandidateAction>,
    /// When this space was evaluated.
    pub evaluated_at: Timestamp,
}

impl EligibleSpace {
    /// Returns whether there is nothing to select from.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidate_actions.is_empty()
    }
}
