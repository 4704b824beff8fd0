// cpg-testkit/src/rules.rs
// ============================================================================
// Module: Table-Driven Rule Evaluator
// Description: A deterministic, preconfigured RuleEvaluator for tests.
// Purpose: Let a test bind a RuleId to a fixed RuleOutcome (or a closure)
//          up front, then assert on the orchestrator's behavior around it.
// Dependencies: cpg_core::interfaces, std::sync::Mutex
// ============================================================================

//! ## Overview
//! Real rule evaluation is out of scope for this crate; tests instead wire
//! up exactly the outcomes a scenario needs with [`TableRuleEvaluator`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use cpg_core::RuleId;
use cpg_core::interfaces::RuleEvaluator;
use cpg_core::interfaces::RuleOutcome;
use serde_json::Value;

/// A [`RuleEvaluator`] whose outcomes are fixed ahead of time per
/// [`RuleId`]. Rules with no registered outcome evaluate to an empty,
/// error-free [`RuleOutcome`].
#[derive(Debug, Default)]
pub struct TableRuleEvaluator {
    table: Mutex<BTreeMap<RuleId, RuleOutcome>>,
}

impl TableRuleEvaluator {
    /// Builds an evaluator with no rules registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the outcome returned for `rule_id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned by an earlier panic on
    /// another thread; this is test-only code and such poisoning always
    /// indicates a broken test.
    #[allow(clippy::unwrap_used, reason = "test-only poisoned-lock is itself a bug")]
    pub fn bind(&self, rule_id: impl Into<RuleId>, outcome: RuleOutcome) {
        self.table.lock().unwrap().insert(rule_id.into(), outcome);
    }

    /// Registers an outcome that returns a single named output.
    pub fn bind_output(&self, rule_id: impl Into<RuleId>, output_key: impl Into<String>, value: Value) {
        let mut outputs = BTreeMap::new();
        outputs.insert(output_key.into(), value);
        self.bind(rule_id, RuleOutcome { outputs, error: None });
    }
}

impl RuleEvaluator for TableRuleEvaluator {
    #[allow(clippy::unwrap_used, reason = "test-only poisoned-lock is itself a bug")]
    fn evaluate(&self, rule_id: &RuleId, _context: &BTreeMap<String, Value>) -> RuleOutcome {
        self.table
            .lock()
            .unwrap()
            .get(rule_id)
            .cloned()
            .unwrap_or(RuleOutcome { outputs: BTreeMap::new(), error: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_rule_evaluates_to_empty_outcome() {
        let evaluator = TableRuleEvaluator::new();
        let outcome = evaluator.evaluate(&RuleId::new("unknown"), &BTreeMap::new());
        assert!(outcome.outputs.is_empty());
        assert!(outcome.error.is_none());
    }

    #[test]
    fn registered_rule_returns_bound_output() {
        let evaluator = TableRuleEvaluator::new();
        evaluator.bind_output("risk-score", "score", Value::from(42));
        let outcome = evaluator.evaluate(&RuleId::new("risk-score"), &BTreeMap::new());
        assert_eq!(outcome.outputs.get("score"), Some(&Value::from(42)));
    }
}
