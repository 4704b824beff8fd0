// cpg-core/src/runtime/compensation.rs
// ============================================================================
// Module: Compensation Handler (C7)
// Description: Selects a CompensationAction for a failed node execution.
// Purpose: Translate a node failure into one deterministic remediation,
//          rollback, alternate, escalation, skip, or fail decision.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Selection tries, in order: the failed node's remediation routes, then its
//! escalation routes, then any inbound edge's compensation semantics, then
//! the node's action-level retry budget, and finally falls back to `FAIL`.
//! A `RETRY` candidate, whether from a route or from the action's own
//! budget, is only accepted while the per-`(instance, node)` retry counter
//! is still under that candidate's ceiling; once exhausted the search moves
//! on to the next candidate rather than failing immediately, so a node with
//! both a capped route retry and a broader escalation route degrades
//! gracefully. The counter is cleared whenever the node later succeeds or
//! the instance reaches a terminal state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;

use crate::core::CompensationAction;
use crate::core::CompensationStrategy;
use crate::core::EdgeCompensationStrategy;
use crate::core::ExceptionType;
use crate::core::InstanceId;
use crate::core::Node;
use crate::core::NodeId;
use crate::core::ProcessGraph;
use crate::interfaces::ExpressionEvaluator;

/// Selects compensation actions for failed node executions, tracking a
/// per-`(instance, node)` retry counter across calls.
pub struct CompensationHandler {
    expressions: Arc<dyn ExpressionEvaluator>,
    retry_counts: Mutex<BTreeMap<(InstanceId, NodeId), u32>>,
}

impl CompensationHandler {
    /// Builds a compensation handler over the expression port, used to
    /// evaluate edge-level compensation conditions.
    #[must_use]
    pub fn new(expressions: Arc<dyn ExpressionEvaluator>) -> Self {
        Self {
            expressions,
            retry_counts: Mutex::new(BTreeMap::new()),
        }
    }

    /// Clears the retry counter for `(instance_id, node_id)`, called after a
    /// successful execution or once the owning instance reaches a terminal
    /// state.
    pub fn clear(&self, instance_id: &InstanceId, node_id: &NodeId) {
        if let Ok(mut counts) = self.retry_counts.lock() {
            counts.remove(&(instance_id.clone(), node_id.clone()));
        }
    }

    /// Decides the compensation action for a failure of `node` in
    /// `instance_id`, classified as `exception_type`, against `context`.
    #[must_use]
    pub fn decide(
        &self,
        graph: &ProcessGraph,
        instance_id: &InstanceId,
        node: &Node,
        exception_type: &ExceptionType,
        context: &BTreeMap<String, Value>,
    ) -> CompensationAction {
        for route in &node.exception_routes.remediation {
            if !route.matches(exception_type) {
                continue;
            }
            if let Some(action) = self.build_route_action(instance_id, &node.id, route, "node remediation route matched") {
                return action;
            }
        }

        for route in &node.exception_routes.escalation {
            if !route.matches(exception_type) {
                continue;
            }
            if let Some(action) = self.build_route_action(instance_id, &node.id, route, "node escalation route matched") {
                return action;
            }
        }

        for edge in graph.inbound_edges(&node.id) {
            let Some(compensation) = &edge.compensation else {
                continue;
            };
            let condition_holds = compensation
                .condition
                .as_ref()
                .is_none_or(|expression| self.expressions.evaluate(expression, context).is_true());
            if !condition_holds {
                continue;
            }
            if let Some(action) = self.build_edge_action(instance_id, &node.id, compensation, edge) {
                return action;
            }
        }

        let retry_count = node.action.config.retry_count;
        if retry_count > 0 {
            if let Some(attempt) = self.try_increment(instance_id, &node.id, retry_count) {
                return CompensationAction {
                    strategy: CompensationStrategy::Retry,
                    target_node_id: None,
                    target_edge_id: None,
                    retry_attempt: Some(attempt),
                    reason: "action-level retry budget".to_string(),
                };
            }
        }

        CompensationAction::fail("no remediation, escalation, edge compensation, or retry budget applied")
    }

    fn build_route_action(
        &self,
        instance_id: &InstanceId,
        node_id: &NodeId,
        route: &crate::core::ExceptionRoute,
        reason: &str,
    ) -> Option<CompensationAction> {
        match route.strategy {
            CompensationStrategy::Retry => {
                let ceiling = route.max_retries.unwrap_or(0);
                let attempt = self.try_increment(instance_id, node_id, ceiling)?;
                Some(CompensationAction {
                    strategy: CompensationStrategy::Retry,
                    target_node_id: None,
                    target_edge_id: None,
                    retry_attempt: Some(attempt),
                    reason: reason.to_string(),
                })
            }
            other => Some(CompensationAction {
                strategy: other,
                target_node_id: route.target_node_id.clone(),
                target_edge_id: None,
                retry_attempt: None,
                reason: reason.to_string(),
            }),
        }
    }

    fn build_edge_action(
        &self,
        instance_id: &InstanceId,
        node_id: &NodeId,
        compensation: &crate::core::CompensationSemantics,
        edge: &crate::core::Edge,
    ) -> Option<CompensationAction> {
        match compensation.strategy {
            EdgeCompensationStrategy::Retry => {
                let attempt = self.try_increment(instance_id, node_id, compensation.max_retries)?;
                Some(CompensationAction {
                    strategy: CompensationStrategy::Retry,
                    target_node_id: None,
                    target_edge_id: Some(edge.id.clone()),
                    retry_attempt: Some(attempt),
                    reason: "inbound edge compensation retry".to_string(),
                })
            }
            EdgeCompensationStrategy::Rollback => Some(CompensationAction {
                strategy: CompensationStrategy::Rollback,
                target_node_id: None,
                target_edge_id: compensation.compensating_edge_id.clone().or_else(|| Some(edge.id.clone())),
                retry_attempt: None,
                reason: "inbound edge compensation rollback".to_string(),
            }),
            EdgeCompensationStrategy::Alternate => Some(CompensationAction {
                strategy: CompensationStrategy::Skip,
                target_node_id: None,
                target_edge_id: Some(edge.id.clone()),
                retry_attempt: None,
                reason: "inbound edge alternate compensation mapped to skip".to_string(),
            }),
            EdgeCompensationStrategy::Escalate => Some(CompensationAction {
                strategy: CompensationStrategy::Escalate,
                target_node_id: Some(edge.source.clone()),
                target_edge_id: compensation.compensating_edge_id.clone(),
                retry_attempt: None,
                reason: "inbound edge compensation escalation".to_string(),
            }),
        }
    }

    /// Increments and returns the retry attempt count for `(instance_id,
    /// node_id)` if still under `ceiling`, else returns `None` without
    /// mutating the counter.
    fn try_increment(&self, instance_id: &InstanceId, node_id: &NodeId, ceiling: u32) -> Option<u32> {
        let mut counts = self.retry_counts.lock().ok()?;
        let key = (instance_id.clone(), node_id.clone());
        let current = counts.get(&key).copied().unwrap_or(0);
        if current >= ceiling {
            return None;
        }
        let attempt = current + 1;
        counts.insert(key, attempt);
        Some(attempt)
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
    use std::collections::BTreeSet;

    use crate::core::Action;
    use crate::core::ActionConfig;
    use crate::core::ActionType;
    use crate::core::EventConfig;
    use crate::core::ExceptionRoute;
    use crate::core::ExceptionRoutes;
    use crate::core::FeelExpression;
    use crate::core::GraphId;
    use crate::core::GraphStatus;
    use crate::core::GraphVersion;
    use crate::core::HandlerRef;
    use crate::core::Preconditions;
    use crate::interfaces::ExpressionOutcome;

    struct AlwaysTrue;
    impl ExpressionEvaluator for AlwaysTrue {
        fn evaluate(&self, _expr: &FeelExpression, _ctx: &BTreeMap<String, Value>) -> ExpressionOutcome {
            ExpressionOutcome::ok(Value::Bool(true))
        }
    }

    fn node_with_remediation_retry(max_retries: u32) -> Node {
        Node {
            id: NodeId::new("n1"),
            name: "n1".to_string(),
            description: String::new(),
            version: 1,
            preconditions: Preconditions::default(),
            policy_gates: Vec::new(),
            business_rules: Vec::new(),
            action: Action {
                action_type: ActionType::SystemInvocation,
                handler_ref: HandlerRef::new("noop"),
                config: ActionConfig::default(),
            },
            event_config: EventConfig::default(),
            exception_routes: ExceptionRoutes {
                remediation: vec![ExceptionRoute {
                    pattern: ExceptionType::new("TIMEOUT"),
                    strategy: CompensationStrategy::Retry,
                    max_retries: Some(max_retries),
                    target_node_id: None,
                }],
                escalation: vec![ExceptionRoute {
                    pattern: ExceptionType::new("*"),
                    strategy: CompensationStrategy::Escalate,
                    max_retries: None,
                    target_node_id: Some(NodeId::new("escalation-target")),
                }],
            },
        }
    }

    fn empty_graph() -> ProcessGraph {
        ProcessGraph::new(
            GraphId::new("g"),
            GraphVersion::new(1),
            "g",
            "",
            GraphStatus::Published,
            vec![node_with_remediation_retry(1)],
            vec![],
            BTreeSet::from([NodeId::new("n1")]),
            BTreeSet::new(),
            std::collections::BTreeMap::new(),
        )
        .expect("graph should validate")
    }

    #[test]
    fn retries_until_ceiling_then_falls_through_to_escalation() {
        let handler = CompensationHandler::new(Arc::new(AlwaysTrue));
        let graph = empty_graph();
        let node = node_with_remediation_retry(1);
        let instance_id = InstanceId::new("inst-1");
        let exception_type = ExceptionType::new("TIMEOUT");

        let first = handler.decide(&graph, &instance_id, &node, &exception_type, &BTreeMap::new());
        assert_eq!(first.strategy, CompensationStrategy::Retry);
        assert_eq!(first.retry_attempt, Some(1));

        let second = handler.decide(&graph, &instance_id, &node, &exception_type, &BTreeMap::new());
        assert_eq!(second.strategy, CompensationStrategy::Escalate);
        assert_eq!(second.target_node_id, Some(NodeId::new("escalation-target")));
    }

    #[test]
    fn clear_resets_retry_counter() {
        let handler = CompensationHandler::new(Arc::new(AlwaysTrue));
        let graph = empty_graph();
        let node = node_with_remediation_retry(1);
        let instance_id = InstanceId::new("inst-1");
        let exception_type = ExceptionType::new("TIMEOUT");

        let _ = handler.decide(&graph, &instance_id, &node, &exception_type, &BTreeMap::new());
        handler.clear(&instance_id, &node.id);
        let after_clear = handler.decide(&graph, &instance_id, &node, &exception_type, &BTreeMap::new());
        assert_eq!(after_clear.strategy, CompensationStrategy::Retry);
        assert_eq!(after_clear.retry_attempt, Some(1));
    }
}
