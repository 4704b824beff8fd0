// cpg-core/src/runtime/governor.rs
// ============================================================================
// Module: Execution Governor (C11)
// Description: Idempotency, authorization, and policy-gate re-checks run
//              immediately before dispatching a selected action.
// Purpose: Guarantee every side effect is traceably approved before it
//          happens.
// Dependencies: crate::core, crate::interfaces, crate::config
// ============================================================================

//! ## Overview
//! The three checks always run in the same order, idempotency,
//! authorization, policy gate, and a rejection is data
//! ([`GovernanceResult`]), never a thrown error: the Instance Orchestrator
//! (C13) traces the result either way. Each check is independently
//! disableable via [`crate::config::GovernanceConfig`], in which case it
//! always reports its `Disabled` variant and passes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;

use crate::config::GovernanceConfig;
use crate::core::AuthorizationOutcome;
use crate::core::GovernanceResult;
use crate::core::HashAlgorithm;
use crate::core::HashDigest;
use crate::core::IdempotencyOutcome;
use crate::core::InstanceId;
use crate::core::Node;
use crate::core::PolicyCheckResult;
use crate::core::PolicyGateOutcome;
use crate::core::PrincipalId;
use crate::core::hashing::hash_canonical_json;
use crate::interfaces::PolicyEvaluator;

/// The set of grants held by a principal, consulted by the authorization
/// check.
pub trait GrantProvider: Send + Sync {
    /// Returns every grant string held by `principal`.
    fn grants(&self, principal: &PrincipalId) -> BTreeSet<String>;
}

/// The wildcard grant: holding it satisfies any required grant string.
pub const WILDCARD_GRANT: &str = "*";

/// An in-process `GrantProvider` that grants everything, for tests and
/// single-tenant deployments where authorization is otherwise disabled.
pub struct AllowAllGrants;

impl GrantProvider for AllowAllGrants {
    fn grants(&self, _principal: &PrincipalId) -> BTreeSet<String> {
        BTreeSet::from([WILDCARD_GRANT.to_string()])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct IdempotencyRecordKey {
    digest: String,
}

/// Runs the three governance checks for one selected action.
pub struct ExecutionGovernor {
    config: GovernanceConfig,
    hash_algorithm: HashAlgorithm,
    grants: Arc<dyn GrantProvider>,
    policies: Arc<dyn PolicyEvaluator>,
    idempotency_ledger: Mutex<BTreeSet<IdempotencyRecordKey>>,
}

impl ExecutionGovernor {
    /// Builds a governor from configuration and the authorization/policy
    /// ports.
    #[must_use]
    pub fn new(
        config: GovernanceConfig,
        hash_algorithm: HashAlgorithm,
        grants: Arc<dyn GrantProvider>,
        policies: Arc<dyn PolicyEvaluator>,
    ) -> Self {
        Self {
            config,
            hash_algorithm,
            grants,
            policies,
            idempotency_ledger: Mutex::new(BTreeSet::new()),
        }
    }

    /// Evaluates governance for executing `node` on `instance_id`, whose
    /// execution attempt number is `execution_count` and whose governing
    /// policy-gate results (re-checked fresh) are `policy_results`.
    #[must_use]
    pub fn evaluate(
        &self,
        instance_id: &InstanceId,
        node: &Node,
        execution_count: u32,
        principal: &PrincipalId,
        context_hash: &HashDigest,
        node_context: &BTreeMap<String, Value>,
    ) -> GovernanceResult {
        let idempotency = self.check_idempotency(instance_id, node, execution_count, context_hash);
        let authorization = self.check_authorization(node, principal);
        let policy_gate = self.check_policy_gate(node, node_context);

        GovernanceResult {
            node_id: node.id.clone(),
            idempotency,
            authorization,
            policy_gate,
        }
    }

    /// Records the idempotency key once an approved action has actually
    /// dispatched, so a retried cycle observing the same key sees
    /// `AlreadyExecuted`.
    pub fn record_dispatch(&self, outcome: &IdempotencyOutcome) {
        if let IdempotencyOutcome::Passed { key } = outcome {
            if let Ok(mut ledger) = self.idempotency_ledger.lock() {
                ledger.insert(IdempotencyRecordKey {
                    digest: key.value.clone(),
                });
            }
        }
    }

    fn check_idempotency(
        &self,
        instance_id: &InstanceId,
        node: &Node,
        execution_count: u32,
        context_hash: &HashDigest,
    ) -> IdempotencyOutcome {
        if !self.config.idempotency_enabled {
            return IdempotencyOutcome::Disabled;
        }
        #[derive(serde::Serialize)]
        struct IdempotencyInput<'a> {
            instance_id: &'a InstanceId,
            node_id: &'a crate::core::NodeId,
            execution_count: u32,
            context_hash: &'a str,
        }
        let key = hash_canonical_json(
            self.hash_algorithm,
            &IdempotencyInput {
                instance_id,
                node_id: &node.id,
                execution_count,
                context_hash: &context_hash.value,
            },
        )
        .unwrap_or_else(|_| HashDigest::new(self.hash_algorithm, context_hash.value.as_bytes()));

        let already_recorded = self
            .idempotency_ledger
            .lock()
            .ok()
            .is_some_and(|ledger| ledger.contains(&IdempotencyRecordKey { digest: key.value.clone() }));

        if already_recorded {
            IdempotencyOutcome::AlreadyExecuted { key }
        } else {
            IdempotencyOutcome::Passed { key }
        }
    }

    fn check_authorization(&self, node: &Node, principal: &PrincipalId) -> AuthorizationOutcome {
        if !self.config.authorization_enabled {
            return AuthorizationOutcome::Disabled;
        }
        let required = [
            format!("execute:{:?}", node.action.action_type),
            format!("action:{}", node.action.handler_ref),
        ];
        let held = self.grants.grants(principal);
        if held.contains(WILDCARD_GRANT) {
            return AuthorizationOutcome::Authorized;
        }
        let missing: Vec<String> = required
            .into_iter()
            .filter(|grant| !held.contains(grant))
            .collect();
        if missing.is_empty() {
            AuthorizationOutcome::Authorized
        } else {
            AuthorizationOutcome::Unauthorized { missing }
        }
    }

    fn check_policy_gate(&self, node: &Node, node_context: &BTreeMap<String, Value>) -> PolicyGateOutcome {
        if !self.config.policy_gate_enabled {
            return PolicyGateOutcome::Disabled;
        }
        let mut results = Vec::with_capacity(node.policy_gates.len());
        for gate in &node.policy_gates {
            let outcome = self.policies.evaluate(&gate.policy_gate_id, node_context);
            let passed = !outcome.blocks(gate.required_outcome);
            results.push(PolicyCheckResult {
                policy_gate_id: gate.policy_gate_id.clone(),
                outcome: outcome.outcome,
                required_outcome: gate.required_outcome,
                passed,
                details: outcome.details,
            });
        }
        if results.iter().all(|result| result.passed) {
            PolicyGateOutcome::Passed { results }
        } else {
            PolicyGateOutcome::Denied { results }
        }
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
    use crate::core::Action;
    use crate::core::ActionConfig;
    use crate::core::ActionType;
    use crate::core::EventConfig;
    use crate::core::ExceptionRoutes;
    use crate::core::HandlerRef;
    use crate::core::InstanceId;
    use crate::core::NodeId;
    use crate::core::PolicyGateId;
    use crate::core::Preconditions;
    use crate::core::hashing::hash_bytes;
    use crate::interfaces::PolicyResult;
    use crate::core::PolicyOutcome;

    struct AlwaysAllowed;
    impl PolicyEvaluator for AlwaysAllowed {
        fn evaluate(&self, _id: &PolicyGateId, _ctx: &BTreeMap<String, Value>) -> PolicyResult {
            PolicyResult {
                outcome: PolicyOutcome::Allowed,
                details: None,
            }
        }
    }

    fn plain_node() -> Node {
        Node {
            id: NodeId::new("n1"),
            name: "n1".to_string(),
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

    #[test]
    fn disabled_checks_always_pass() {
        let governor = ExecutionGovernor::new(
            GovernanceConfig {
                idempotency_enabled: false,
                authorization_enabled: false,
                policy_gate_enabled: false,
            },
            HashAlgorithm::Sha256,
            Arc::new(AllowAllGrants),
            Arc::new(AlwaysAllowed),
        );
        let hash = hash_bytes(HashAlgorithm::Sha256, b"ctx");
        let result = governor.evaluate(
            &InstanceId::new("inst-1"),
            &plain_node(),
            1,
            &PrincipalId::new("p1"),
            &hash,
            &BTreeMap::new(),
        );
        assert!(result.approved());
    }

    #[test]
    fn allow_all_grants_authorizes_even_when_enabled() {
        let governor = ExecutionGovernor::new(
            GovernanceConfig {
                idempotency_enabled: false,
                authorization_enabled: true,
                policy_gate_enabled: false,
            },
            HashAlgorithm::Sha256,
            Arc::new(AllowAllGrants),
            Arc::new(AlwaysAllowed),
        );
        let hash = hash_bytes(HashAlgorithm::Sha256, b"ctx");
        let result = governor.evaluate(
            &InstanceId::new("inst-1"),
            &plain_node(),
            1,
            &PrincipalId::new("p1"),
            &hash,
            &BTreeMap::new(),
        );
        assert_eq!(result.authorization, AuthorizationOutcome::Authorized);
    }

    #[test]
    fn repeated_dispatch_of_same_key_is_rejected() {
        let governor = ExecutionGovernor::new(
            GovernanceConfig {
                idempotency_enabled: true,
                authorization_enabled: false,
                policy_gate_enabled: false,
            },
            HashAlgorithm::Sha256,
            Arc::new(AllowAllGrants),
            Arc::new(AlwaysAllowed),
        );
        let hash = hash_bytes(HashAlgorithm::Sha256, b"ctx");
        let instance_id = InstanceId::new("inst-1");
        let node = plain_node();
        let principal = PrincipalId::new("p1");

        let first = governor.evaluate(&instance_id, &node, 1, &principal, &hash, &BTreeMap::new());
        assert!(first.approved());
        governor.record_dispatch(&first.idempotency);

        let second = governor.evaluate(&instance_id, &node, 1, &principal, &hash, &BTreeMap::new());
        assert!(!second.approved());
        assert!(matches!(second.idempotency, IdempotencyOutcome::AlreadyExecuted { .. }));
    }
}
