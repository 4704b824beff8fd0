// cpg-core/src/runtime/edge_evaluator.rs
// ============================================================================
// Module: Edge Evaluator (C5)
// Description: Evaluates an edge's guard conditions against a RuntimeContext
//              and the source node's rule/policy results.
// Purpose: Produce one EdgeEvaluation per candidate edge per cycle, feeding
//          the Eligibility Evaluator (C9).
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! A guard's four sub-checks are independent and all must pass for an edge
//! to be traversable: plain context conditions, rule-outcome conditions
//! (checked against the source node's already-computed rule outputs, never
//! re-evaluated here), policy-outcome conditions (checked against the source
//! node's already-computed policy results), and event conditions (checked
//! against the instance's received events).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;

use crate::core::Edge;
use crate::core::EdgeEvaluation;
use crate::core::EventCondition;
use crate::core::PolicyCheckResult;
use crate::core::ReceivedEvent;
use crate::core::RuleCheckResult;
use crate::interfaces::ExpressionEvaluator;

/// Evaluates edges against a flattened runtime context plus the source
/// node's already-computed rule and policy results.
pub struct EdgeEvaluator<'a> {
    expressions: &'a dyn ExpressionEvaluator,
}

impl<'a> EdgeEvaluator<'a> {
    /// Builds an edge evaluator over the expression port.
    #[must_use]
    pub const fn new(expressions: &'a dyn ExpressionEvaluator) -> Self {
        Self { expressions }
    }

    /// Evaluates `edge` against `context`, the source node's `rule_results`
    /// and `policy_results`, and `received_events`.
    #[must_use]
    pub fn evaluate(
        &self,
        edge: &Edge,
        context: &BTreeMap<String, Value>,
        rule_results: &[RuleCheckResult],
        policy_results: &[PolicyCheckResult],
        received_events: &[ReceivedEvent],
    ) -> EdgeEvaluation {
        let context_passed = edge
            .guard
            .context_conditions
            .iter()
            .all(|expression| self.expressions.evaluate(expression, context).is_true());

        let rule_outcome_passed = edge.guard.rule_outcome_conditions.iter().all(|(rule_id, expression)| {
            let Some(rule_result) = rule_results.iter().find(|result| &result.rule_id == rule_id) else {
                return false;
            };
            if rule_result.error.is_some() {
                return false;
            }
            let enriched = enrich_with_rule_outputs(context, &rule_result.outputs);
            self.expressions.evaluate(expression, &enriched).is_true()
        });

        let policy_outcome_passed = edge
            .guard
            .policy_outcome_conditions
            .iter()
            .all(|(gate_id, required)| {
                policy_results
                    .iter()
                    .find(|result| &result.policy_gate_id == gate_id)
                    .is_some_and(|result| result.outcome == *required)
            });

        let event_passed = edge
            .guard
            .event_conditions
            .iter()
            .all(|condition| self.event_condition_holds(condition, context, received_events));

        let traversable = context_passed && rule_outcome_passed && policy_outcome_passed && event_passed;
        let blocked_reason = if traversable {
            None
        } else {
            Some(self.blocked_reason(context_passed, rule_outcome_passed, policy_outcome_passed, event_passed))
        };

        EdgeEvaluation {
            edge_id: edge.id.clone(),
            traversable,
            context_passed,
            rule_outcome_passed,
            policy_outcome_passed,
            event_passed,
            blocked_reason,
        }
    }

    fn event_condition_holds(
        &self,
        condition: &EventCondition,
        context: &BTreeMap<String, Value>,
        received_events: &[ReceivedEvent],
    ) -> bool {
        let matching = received_events
            .iter()
            .filter(|event| event.event_type == condition.event_type);
        let occurrence = match &condition.correlation {
            Some(expression) => matching.into_iter().find(|event| {
                let enriched = enrich_with_event_payload(context, &event.payload);
                self.expressions.evaluate(expression, &enriched).is_true()
            }),
            None => matching.into_iter().next(),
        };
        if condition.must_have_occurred {
            occurrence.is_some()
        } else {
            occurrence.is_none()
        }
    }

    fn blocked_reason(
        &self,
        context_passed: bool,
        rule_outcome_passed: bool,
        policy_outcome_passed: bool,
        event_passed: bool,
    ) -> String {
        let mut failed = Vec::new();
        if !context_passed {
            failed.push("CONTEXT");
        }
        if !rule_outcome_passed {
            failed.push("RULE_OUTCOME");
        }
        if !policy_outcome_passed {
            failed.push("POLICY_OUTCOME");
        }
        if !event_passed {
            failed.push("EVENT");
        }
        format!("GUARD_FAILED: {}", failed.join(", "))
    }
}

fn enrich_with_rule_outputs(
    context: &BTreeMap<String, Value>,
    rule_outputs: &BTreeMap<String, Value>,
) -> BTreeMap<String, Value> {
    let mut enriched = context.clone();
    for (key, value) in rule_outputs {
        enriched.insert(format!("ruleOutputs.{key}"), value.clone());
    }
    enriched
}

fn enrich_with_event_payload(context: &BTreeMap<String, Value>, payload: &Value) -> BTreeMap<String, Value> {
    let mut enriched = context.clone();
    enriched.insert("event.payload".to_string(), payload.clone());
    enriched
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
    use crate::core::EdgeKind;
    use crate::core::EventTriggers;
    use crate::core::EventType;
    use crate::core::ExecutionSemantics;
    use crate::core::FeelExpression;
    use crate::core::GuardConditions;
    use crate::core::JoinType;
    use crate::core::NodeId;
    use crate::core::Priority;
    use crate::core::EdgeId;
    use crate::core::EventId;
    use crate::core::Timestamp;
    use crate::interfaces::ExpressionOutcome;

    struct AlwaysFalse;
    impl ExpressionEvaluator for AlwaysFalse {
        fn evaluate(&self, _expr: &FeelExpression, _ctx: &BTreeMap<String, Value>) -> ExpressionOutcome {
            ExpressionOutcome::ok(Value::Bool(false))
        }
    }

    fn edge_with_event_condition(must_have_occurred: bool) -> Edge {
        Edge {
            id: EdgeId::new("e1"),
            name: "e1".to_string(),
            description: String::new(),
            source: NodeId::new("a"),
            target: NodeId::new("b"),
            guard: GuardConditions {
                event_conditions: vec![EventCondition {
                    event_type: EventType::new("approved"),
                    must_have_occurred,
                    correlation: None,
                }],
                ..GuardConditions::default()
            },
            execution: ExecutionSemantics {
                kind: EdgeKind::Sequential,
                join_type: JoinType::All,
            },
            priority: Priority {
                weight: 0,
                rank: 0,
                exclusive: false,
            },
            event_triggers: EventTriggers::default(),
            compensation: None,
        }
    }

    #[test]
    fn event_condition_requires_occurrence_when_must_have_occurred() {
        let evaluator = EdgeEvaluator::new(&AlwaysFalse);
        let evaluation = evaluator.evaluate(&edge_with_event_condition(true), &BTreeMap::new(), &[], &[], &[]);
        assert!(!evaluation.event_passed);

        let events = vec![ReceivedEvent {
            event_type: EventType::new("approved"),
            event_id: EventId::new("evt-1"),
            timestamp: Timestamp::Logical(1),
            payload: Value::Null,
        }];
        let evaluation = evaluator.evaluate(&edge_with_event_condition(true), &BTreeMap::new(), &[], &[], &events);
        assert!(evaluation.event_passed);
    }

    #[test]
    fn negative_event_condition_passes_when_absent() {
        let evaluator = EdgeEvaluator::new(&AlwaysFalse);
        let evaluation = evaluator.evaluate(&edge_with_event_condition(false), &BTreeMap::new(), &[], &[], &[]);
        assert!(evaluation.event_passed);
    }
}
