// cpg-core/src/runtime/eligibility_evaluator.rs
// ============================================================================
// Module: Eligibility Evaluator (C9)
// Description: Assembles the full EligibleSpace for one orchestration cycle
//              from the Node Evaluator and Edge Evaluator.
// Purpose: Determine every node worth evaluating this cycle and the
//          candidate (node, edge) actions the Navigation Decider chooses
//          among.
// Dependencies: crate::core, crate::runtime::{node_evaluator, edge_evaluator}
// ============================================================================

//! ## Overview
//! The frontier evaluated each cycle is: entry nodes (on a fresh instance),
//! every node whose latest execution is `Completed` (so its outbound edges
//! can be re-checked), every node subscribed to an event present on the
//! context, and every currently active node. Active nodes are evaluated and
//! included in `eligible_nodes` for tracing visibility, but deliberately
//! excluded from `candidate_actions`: an in-flight execution has nothing new
//! to decide until it resolves. This is a documented simplification, not an
//! oversight (see DESIGN.md).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::core::CandidateAction;
use crate::core::EdgeEvaluation;
use crate::core::EligibleSpace;
use crate::core::NodeEvaluation;
use crate::core::NodeId;
use crate::core::ProcessGraph;
use crate::core::ProcessInstance;
use crate::core::RuntimeContext;
use crate::core::Timestamp;
use crate::runtime::edge_evaluator::EdgeEvaluator;
use crate::runtime::node_evaluator::NodeEvaluator;

/// Assembles the `EligibleSpace` for one orchestration cycle.
pub struct EligibilityEvaluator {
    node_evaluator: NodeEvaluator,
}

impl EligibilityEvaluator {
    /// Builds an eligibility evaluator over a configured [`NodeEvaluator`].
    #[must_use]
    pub const fn new(node_evaluator: NodeEvaluator) -> Self {
        Self { node_evaluator }
    }

    /// Computes the `EligibleSpace` for `instance` on `graph` at `now`.
    #[must_use]
    pub fn evaluate(
        &self,
        graph: &ProcessGraph,
        instance: &ProcessInstance,
        context: &RuntimeContext,
        now: Timestamp,
    ) -> EligibleSpace {
        let flattened = context.flattened();
        let edge_evaluator = EdgeEvaluator::new(self.node_evaluator.expressions());

        let mut node_evals: BTreeMap<NodeId, NodeEvaluation> = BTreeMap::new();
        let mut traversable_edges: Vec<EdgeEvaluation> = Vec::new();
        let mut candidate_actions: Vec<CandidateAction> = Vec::new();
        let mut seen_candidates: BTreeSet<(NodeId, Option<String>)> = BTreeSet::new();

        let mut push_candidate = |node_id: NodeId, incoming_edge_id: Option<String>, actions: &mut Vec<CandidateAction>| {
            if seen_candidates.insert((node_id.clone(), incoming_edge_id.clone())) {
                actions.push(CandidateAction {
                    node_id,
                    incoming_edge_id: incoming_edge_id.map(Into::into),
                });
            }
        };

        let mut eval_node = |node_id: &NodeId, cache: &mut BTreeMap<NodeId, NodeEvaluation>| -> Option<NodeEvaluation> {
            if let Some(existing) = cache.get(node_id) {
                return Some(existing.clone());
            }
            let node = graph.find_node(node_id)?;
            let evaluation = self.node_evaluator.evaluate(node, &flattened);
            cache.insert(node_id.clone(), evaluation.clone());
            Some(evaluation)
        };

        let fresh = instance.history().is_empty();

        if fresh {
            for entry in graph.entry_node_ids() {
                if let Some(evaluation) = eval_node(entry, &mut node_evals) {
                    if evaluation.available {
                        push_candidate(entry.clone(), None, &mut candidate_actions);
                    }
                }
            }
        } else {
            let completed_node_ids: BTreeSet<NodeId> = graph
                .nodes()
                .iter()
                .map(|node| &node.id)
                .filter(|node_id| instance.has_executed_node(node_id))
                .cloned()
                .collect();

            for source in &completed_node_ids {
                let Some(source_eval) = eval_node(source, &mut node_evals) else {
                    continue;
                };
                for edge in graph.outbound_edges(source) {
                    let edge_eval = edge_evaluator.evaluate(
                        edge,
                        &flattened,
                        &source_eval.rule_results,
                        &source_eval.policy_results,
                        &context.received_events,
                    );
                    let traversable = edge_eval.traversable;
                    traversable_edges.push(edge_eval);
                    if traversable && !instance.active_node_ids().contains(&edge.target) {
                        if let Some(target_eval) = eval_node(&edge.target, &mut node_evals) {
                            if target_eval.available {
                                push_candidate(edge.target.clone(), Some(edge.id.to_string()), &mut candidate_actions);
                            }
                        }
                    }
                }
            }

            for event in &context.received_events {
                for node_id in graph.nodes_subscribed_to(&event.event_type) {
                    if instance.active_node_ids().contains(node_id) {
                        continue;
                    }
                    if let Some(target_eval) = eval_node(node_id, &mut node_evals) {
                        if target_eval.available {
                            push_candidate(node_id.clone(), None, &mut candidate_actions);
                        }
                    }
                }
            }
        }

        for edge_id in instance.pending_edge_ids() {
            let Some(edge) = graph.find_edge(edge_id) else { continue };
            if instance.active_node_ids().contains(&edge.target) {
                continue;
            }
            if let Some(target_eval) = eval_node(&edge.target, &mut node_evals) {
                if target_eval.available {
                    push_candidate(edge.target.clone(), Some(edge_id.to_string()), &mut candidate_actions);
                }
            }
        }

        for node_id in instance.pending_node_ids() {
            if instance.active_node_ids().contains(node_id) {
                continue;
            }
            if let Some(target_eval) = eval_node(node_id, &mut node_evals) {
                if target_eval.available {
                    push_candidate(node_id.clone(), None, &mut candidate_actions);
                }
            }
        }

        for active in instance.active_node_ids() {
            eval_node(active, &mut node_evals);
        }

        EligibleSpace {
            eligible_nodes: node_evals.into_values().collect(),
            traversable_edges,
            candidate_actions,
            evaluated_at: now,
        }
    }
}
