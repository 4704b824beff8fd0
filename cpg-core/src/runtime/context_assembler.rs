// cpg-core/src/runtime/context_assembler.rs
// ============================================================================
// Module: Runtime Context Assembler (C8)
// Description: Builds a RuntimeContext from a ProcessInstance's
//              ExecutionContext for one orchestration cycle.
// Purpose: Decouple the instance's long-lived state from the read-only view
//          every evaluator and governor consumes.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Assembly is a pure copy: the instance's client/domain/accumulated-state
//! maps are copied verbatim, operational signals are derived (current time,
//! a summary of open obligations), received events are copied in arrival
//! order, and the principal and assembly timestamp are stamped on. Nothing
//! here reads wall-clock time; `now` is always supplied by the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use crate::core::PrincipalId;
use crate::core::ProcessInstance;
use crate::core::RuntimeContext;
use crate::core::Timestamp;

/// Assembles `RuntimeContext` values from a `ProcessInstance`.
pub struct ContextAssembler;

impl ContextAssembler {
    /// Assembles the runtime context for `instance` at `now`, binding
    /// `principal` for this cycle's authorization decisions.
    #[must_use]
    pub fn assemble(instance: &ProcessInstance, principal: PrincipalId, now: Timestamp) -> RuntimeContext {
        let execution_context = instance.context();
        let mut operational_signals = execution_context.operational_signals.clone();
        operational_signals.insert("now".to_string(), Self::timestamp_value(now));
        operational_signals.insert(
            "openObligationCount".to_string(),
            Value::from(execution_context.obligations.len()),
        );
        operational_signals.insert(
            "obligations".to_string(),
            json!(
                execution_context
                    .obligations
                    .iter()
                    .map(|obligation| obligation.kind.clone())
                    .collect::<Vec<_>>()
            ),
        );

        RuntimeContext {
            client_context: execution_context.client_context.clone(),
            domain_context: execution_context.domain_context.clone(),
            accumulated_state: execution_context.accumulated_state.clone(),
            operational_signals,
            received_events: execution_context.received_events.clone(),
            assembled_at: now,
            principal,
        }
    }

    fn timestamp_value(timestamp: Timestamp) -> Value {
        match timestamp {
            Timestamp::UnixMillis(millis) => Value::from(millis),
            Timestamp::Logical(tick) => Value::from(tick),
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
    use crate::core::GraphId;
    use crate::core::GraphVersion;
    use crate::core::InstanceId;

    #[test]
    fn assembly_stamps_time_and_principal_without_touching_client_context() {
        let instance = ProcessInstance::start(
            InstanceId::new("inst-1"),
            GraphId::new("g"),
            GraphVersion::new(1),
            None,
            Timestamp::Logical(1),
            crate::core::ExecutionContext::default(),
        );
        let context = ContextAssembler::assemble(&instance, PrincipalId::new("p1"), Timestamp::Logical(2));
        assert_eq!(context.principal, PrincipalId::new("p1"));
        assert_eq!(context.assembled_at, Timestamp::Logical(2));
        assert!(context.client_context.is_empty());
        assert_eq!(context.operational_signals.get("openObligationCount"), Some(&Value::from(0)));
    }
}
