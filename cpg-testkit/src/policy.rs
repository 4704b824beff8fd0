// cpg-testkit/src/policy.rs
// ============================================================================
// Module: Table-Driven Policy Evaluator
// Description: A deterministic, preconfigured PolicyEvaluator for tests.
// Purpose: Let a test bind a PolicyGateId to a fixed PolicyResult up front,
//          then assert on the Execution Governor's behavior around it.
// Dependencies: cpg_core::interfaces, std::sync::Mutex
// ============================================================================

//! ## Overview
//! Mirrors [`crate::rules::TableRuleEvaluator`]'s shape for the policy
//! port. Gates with no registered result evaluate to `Allowed` with no
//! detail, matching a policy gate that simply has nothing to say.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use cpg_core::PolicyGateId;
use cpg_core::PolicyOutcome;
use cpg_core::interfaces::PolicyEvaluator;
use cpg_core::interfaces::PolicyResult;
use serde_json::Value;

/// A [`PolicyEvaluator`] whose results are fixed ahead of time per
/// [`PolicyGateId`].
#[derive(Debug, Default)]
pub struct TablePolicyEvaluator {
    table: Mutex<BTreeMap<PolicyGateId, PolicyResult>>,
}

impl TablePolicyEvaluator {
    /// Builds an evaluator with no policy gates registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the result returned for `policy_gate_id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned; test-only code, and
    /// poisoning always indicates a broken test.
    #[allow(clippy::unwrap_used, reason = "test-only poisoned-lock is itself a bug")]
    pub fn bind(&self, policy_gate_id: impl Into<PolicyGateId>, result: PolicyResult) {
        self.table.lock().unwrap().insert(policy_gate_id.into(), result);
    }

    /// Registers a bare outcome with no detail payload.
    pub fn bind_outcome(&self, policy_gate_id: impl Into<PolicyGateId>, outcome: PolicyOutcome) {
        self.bind(policy_gate_id, PolicyResult { outcome, details: None });
    }
}

impl PolicyEvaluator for TablePolicyEvaluator {
    #[allow(clippy::unwrap_used, reason = "test-only poisoned-lock is itself a bug")]
    fn evaluate(&self, policy_gate_id: &PolicyGateId, _context: &BTreeMap<String, Value>) -> PolicyResult {
        self.table
            .lock()
            .unwrap()
            .get(policy_gate_id)
            .cloned()
            .unwrap_or(PolicyResult { outcome: PolicyOutcome::Allowed, details: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_gate_defaults_to_allowed() {
        let evaluator = TablePolicyEvaluator::new();
        let result = evaluator.evaluate(&PolicyGateId::new("unknown"), &BTreeMap::new());
        assert_eq!(result.outcome, PolicyOutcome::Allowed);
    }

    #[test]
    fn registered_gate_returns_bound_outcome() {
        let evaluator = TablePolicyEvaluator::new();
        evaluator.bind_outcome("kyc-check", PolicyOutcome::Denied);
        let result = evaluator.evaluate(&PolicyGateId::new("kyc-check"), &BTreeMap::new());
        assert_eq!(result.outcome, PolicyOutcome::Denied);
        assert!(result.blocks(PolicyOutcome::Allowed));
    }
}
