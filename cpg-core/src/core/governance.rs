// cpg-core/src/core/governance.rs
// ============================================================================
// Module: Execution Governance Data Shapes (C11)
// Description: IdempotencyOutcome, AuthorizationOutcome, PolicyGateOutcome,
//              GovernanceResult.
// Purpose: Carry the Execution Governor's pre-execution check results as
//          data, so a rejection is always traceable rather than thrown.
// Dependencies: serde, crate::core::{eligibility, hashing, identifiers}
// ============================================================================

//! ## Overview
//! Governance rejection is data, not an error: every governance decision
//! must always be surfaced in a `DecisionTrace`, so the Execution Governor
//! (C11) never raises for a denial, it returns a [`GovernanceResult`] the
//! Instance Orchestrator traces either way.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::eligibility::PolicyCheckResult;
use crate::core::hashing::HashDigest;
use crate::core::identifiers::NodeId;

/// Outcome of the idempotency check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IdempotencyOutcome {
    /// Idempotency is disabled by configuration; always passes.
    Disabled,
    /// No prior execution recorded this key; the action may proceed.
    Passed {
        /// The key that will be recorded once the action dispatches.
        key: HashDigest,
    },
    /// A prior execution already recorded this exact key.
    AlreadyExecuted {
        /// The key that matched.
        key: HashDigest,
    },
}

impl IdempotencyOutcome {
    /// Whether this outcome permits the action to proceed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        !matches!(self, Self::AlreadyExecuted { .. })
    }
}

/// Outcome of the authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthorizationOutcome {
    /// Authorization is disabled by configuration; always passes.
    Disabled,
    /// The principal holds both required grants.
    Authorized,
    /// The principal is missing one or both required grants.
    Unauthorized {
        /// The specific grants that were missing.
        missing: Vec<String>,
    },
}

impl AuthorizationOutcome {
    /// Whether this outcome permits the action to proceed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        !matches!(self, Self::Unauthorized { .. })
    }
}

/// Outcome of the final policy-gate re-check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PolicyGateOutcome {
    /// Policy gate re-checking is disabled by configuration; always passes.
    Disabled,
    /// Every re-checked gate passed.
    Passed {
        /// Every gate result collected for tracing.
        results: Vec<PolicyCheckResult>,
    },
    /// At least one re-checked gate denied.
    Denied {
        /// Every gate result collected for tracing.
        results: Vec<PolicyCheckResult>,
    },
}

impl PolicyGateOutcome {
    /// Whether this outcome permits the action to proceed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        !matches!(self, Self::Denied { .. })
    }
}

/// The combined result of the Execution Governor's three checks for one
/// candidate action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceResult {
    /// The node this governance decision applies to.
    pub node_id: NodeId,
    /// Idempotency check result.
    pub idempotency: IdempotencyOutcome,
    /// Authorization check result.
    pub authorization: AuthorizationOutcome,
    /// Policy-gate check result.
    pub policy_gate: PolicyGateOutcome,
}

impl GovernanceResult {
    /// `true` iff all three checks passed.
    #[must_use]
    pub fn approved(&self) -> bool {
        self.idempotency.passed() && self.authorization.passed() && self.policy_gate.passed()
    }

    /// Redacted reasons for a rejection, suitable for a `BLOCKED` trace.
    #[must_use]
    pub fn rejection_reasons(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if let IdempotencyOutcome::AlreadyExecuted { .. } = &self.idempotency {
            reasons.push("ALREADY_EXECUTED".to_string());
        }
        if let AuthorizationOutcome::Unauthorized { missing } = &self.authorization {
            reasons.push(format!("UNAUTHORIZED: missing {}", missing.join(", ")));
        }
        if let PolicyGateOutcome::Denied { .. } = &self.policy_gate {
            reasons.push("POLICY_DENIED".to_string());
        }
        reasons
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

    #[test]
    fn approved_requires_all_three_checks_to_pass() {
        let result = GovernanceResult {
            node_id: NodeId::new("n1"),
            idempotency: IdempotencyOutcome::Disabled,
            authorization: AuthorizationOutcome::Unauthorized {
                missing: vec!["execute:SYSTEM_INVOCATION".to_string()],
            },
            policy_gate: PolicyGateOutcome::Disabled,
        };
        assert!(!result.approved());
        assert_eq!(result.rejection_reasons().len(), 1);
    }
}
