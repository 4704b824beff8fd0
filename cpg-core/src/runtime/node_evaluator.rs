// cpg-core/src/runtime/node_evaluator.rs
// ============================================================================
// Module: Node Evaluator (C4)
// Description: Evaluates a node's preconditions, policy gates, and business
//              rules against a RuntimeContext.
// Purpose: Produce one NodeEvaluation per node per cycle, feeding the
//          Eligibility Evaluator (C9).
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Evaluation order is fixed: preconditions, then policy gates, then business
//! rules. A node is `available` only when both precondition lists pass and
//! every policy gate passes; rule outputs are still collected even when the
//! node is unavailable, so traces show what the rules would have produced.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::core::FeelExpression;
use crate::core::Node;
use crate::core::NodeEvaluation;
use crate::core::PolicyCheckResult;
use crate::core::RuleCheckResult;
use crate::interfaces::ExpressionEvaluator;
use crate::interfaces::PolicyEvaluator;
use crate::interfaces::RuleEvaluator;

/// Evaluates nodes against a flattened runtime context.
pub struct NodeEvaluator {
    expressions: Arc<dyn ExpressionEvaluator>,
    policies: Arc<dyn PolicyEvaluator>,
    rules: Arc<dyn RuleEvaluator>,
}

impl NodeEvaluator {
    /// Builds a node evaluator over the three evaluation ports.
    #[must_use]
    pub fn new(
        expressions: Arc<dyn ExpressionEvaluator>,
        policies: Arc<dyn PolicyEvaluator>,
        rules: Arc<dyn RuleEvaluator>,
    ) -> Self {
        Self {
            expressions,
            policies,
            rules,
        }
    }

    /// Returns the expression evaluator this node evaluator was built with,
    /// for reuse by the Edge Evaluator within the same cycle.
    #[must_use]
    pub fn expressions(&self) -> &dyn ExpressionEvaluator {
        self.expressions.as_ref()
    }

    /// Evaluates `node` against `context`.
    #[must_use]
    pub fn evaluate(&self, node: &Node, context: &BTreeMap<String, Value>) -> NodeEvaluation {
        let preconditions_passed = self.all_hold(&node.preconditions.client_context, context)
            && self.all_hold(&node.preconditions.domain_context, context);

        let mut policy_results = Vec::with_capacity(node.policy_gates.len());
        for gate in &node.policy_gates {
            let result = self.policies.evaluate(&gate.policy_gate_id, context);
            let passed = !result.blocks(gate.required_outcome);
            policy_results.push(PolicyCheckResult {
                policy_gate_id: gate.policy_gate_id.clone(),
                outcome: result.outcome,
                required_outcome: gate.required_outcome,
                passed,
                details: result.details,
            });
        }
        let policies_passed = policy_results.iter().all(|result| result.passed);

        let mut rule_results = Vec::with_capacity(node.business_rules.len());
        let mut rule_outputs = BTreeMap::new();
        for rule_ref in &node.business_rules {
            let outcome = self.rules.evaluate(&rule_ref.rule_id, context);
            for (key, value) in &outcome.outputs {
                rule_outputs.insert(key.clone(), value.clone());
            }
            rule_results.push(RuleCheckResult {
                rule_id: rule_ref.rule_id.clone(),
                category: rule_ref.category.clone(),
                outputs: outcome.outputs,
                error: outcome.error,
            });
        }

        let available = preconditions_passed && policies_passed;
        let blocked_reason = if available {
            None
        } else {
            Some(self.blocked_reason(preconditions_passed, &policy_results))
        };

        NodeEvaluation {
            node_id: node.id.clone(),
            available,
            preconditions_passed,
            policies_passed,
            policy_results,
            rule_results,
            rule_outputs,
            blocked_reason,
        }
    }

    fn all_hold(&self, expressions: &[FeelExpression], context: &BTreeMap<String, Value>) -> bool {
        expressions
            .iter()
            .all(|expression| self.expressions.evaluate(expression, context).is_true())
    }

    fn blocked_reason(&self, preconditions_passed: bool, policy_results: &[PolicyCheckResult]) -> String {
        if !preconditions_passed {
            return "PRECONDITIONS_NOT_MET".to_string();
        }
        let failed: Vec<String> = policy_results
            .iter()
            .filter(|result| !result.passed)
            .map(|result| result.policy_gate_id.to_string())
            .collect();
        format!("POLICY_GATES_FAILED: {}", failed.join(", "))
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
    use crate::core::BusinessRuleRef;
    use crate::core::EventConfig;
    use crate::core::ExceptionRoutes;
    use crate::core::Preconditions;
    use crate::core::{Action, ActionConfig, ActionType};
    use crate::core::{HandlerRef, NodeId, PolicyGateId, PolicyGateRef, PolicyOutcome, RuleId};
    use crate::interfaces::ExpressionOutcome;
    use crate::interfaces::PolicyResult;
    use crate::interfaces::RuleOutcome;

    struct AlwaysTrue;
    impl ExpressionEvaluator for AlwaysTrue {
        fn evaluate(&self, _expr: &FeelExpression, _ctx: &BTreeMap<String, Value>) -> ExpressionOutcome {
            ExpressionOutcome::ok(Value::Bool(true))
        }
    }

    struct AlwaysDenied;
    impl PolicyEvaluator for AlwaysDenied {
        fn evaluate(&self, _id: &PolicyGateId, _ctx: &BTreeMap<String, Value>) -> PolicyResult {
            PolicyResult {
                outcome: PolicyOutcome::Denied,
                details: None,
            }
        }
    }

    struct NoopRules;
    impl RuleEvaluator for NoopRules {
        fn evaluate(&self, _id: &RuleId, _ctx: &BTreeMap<String, Value>) -> RuleOutcome {
            RuleOutcome {
                outputs: BTreeMap::new(),
                error: None,
            }
        }
    }

    fn node_with_gate() -> Node {
        Node {
            id: NodeId::new("n1"),
            name: "n1".to_string(),
            description: String::new(),
            version: 1,
            preconditions: Preconditions::default(),
            policy_gates: vec![PolicyGateRef {
                policy_gate_id: PolicyGateId::new("gate-1"),
                required_outcome: PolicyOutcome::Allowed,
            }],
            business_rules: vec![BusinessRuleRef {
                rule_id: RuleId::new("rule-1"),
                category: "cat".to_string(),
            }],
            action: Action {
                action_type: ActionType::Decision,
                handler_ref: HandlerRef::new("noop"),
                config: ActionConfig::default(),
            },
            event_config: EventConfig::default(),
            exception_routes: ExceptionRoutes::default(),
        }
    }

    #[test]
    fn denied_policy_gate_blocks_availability() {
        let evaluator = NodeEvaluator::new(Arc::new(AlwaysTrue), Arc::new(AlwaysDenied), Arc::new(NoopRules));
        let evaluation = evaluator.evaluate(&node_with_gate(), &BTreeMap::new());
        assert!(!evaluation.available);
        assert!(!evaluation.policies_passed);
        assert_eq!(evaluation.blocked_reason.as_deref(), Some("POLICY_GATES_FAILED: gate-1"));
    }
}
