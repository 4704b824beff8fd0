// cpg-core/src/core/context.rs
// ============================================================================
// Module: Runtime Context (C8 data shape)
// Description: The authoritative, immutable evaluation input assembled for
//              every decision cycle.
// Purpose: Decouple "what the instance owns" (ExecutionContext) from "what
//          one evaluation cycle is allowed to see" (RuntimeContext).
// Dependencies: serde, crate::core::{hashing, identifiers, instance, time}
// ============================================================================

//! ## Overview
//! A `RuntimeContext` is assembled fresh for every orchestration cycle by
//! the Runtime Context Assembler (C8). It is never mutated; derivative
//! helpers (`with_event`, `with_state_update`) always return a new value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::HashAlgorithm;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::NodeId;
use crate::core::identifiers::PrincipalId;
use crate::core::instance::ReceivedEvent;
use crate::core::time::Timestamp;

/// The authoritative evaluation input assembled for one orchestration cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeContext {
    /// Client-supplied context values, copied from the instance.
    pub client_context: BTreeMap<String, Value>,
    /// Domain/system context values, copied from the instance.
    pub domain_context: BTreeMap<String, Value>,
    /// State accumulated from completed node outputs, copied from the
    /// instance.
    pub accumulated_state: BTreeMap<String, Value>,
    /// Operational signals (current time, obligations summary, etc.).
    pub operational_signals: BTreeMap<String, Value>,
    /// Events received so far, in arrival order.
    pub received_events: Vec<ReceivedEvent>,
    /// When this context was assembled.
    pub assembled_at: Timestamp,
    /// The principal bound for authorization decisions in this cycle.
    pub principal: PrincipalId,
}

impl RuntimeContext {
    /// Returns a new context with `event` appended to `received_events`.
    /// Does not mutate `self`.
    #[must_use]
    pub fn with_event(&self, event: ReceivedEvent) -> Self {
        let mut received_events = self.received_events.clone();
        received_events.push(event);
        Self {
            received_events,
            ..self.clone()
        }
    }

    /// Returns a new context with `accumulated_state` updated under a key
    /// derived from `node_id`. Does not mutate `self`.
    #[must_use]
    pub fn with_state_update(&self, node_id: &NodeId, output: Value) -> Self {
        let mut accumulated_state = self.accumulated_state.clone();
        accumulated_state.insert(node_id.to_string(), output);
        Self {
            accumulated_state,
            ..self.clone()
        }
    }

    /// Returns a flattened, read-only view keyed by dotted path
    /// (`client.foo`, `domain.bar`, `state.baz`, `signal.qux`) for
    /// expression evaluators that expect a single flat map. Missing
    /// identifiers are simply absent, never inserted as null: callers
    /// (expression evaluators) are responsible for treating absence as
    /// null.
    #[must_use]
    pub fn flattened(&self) -> BTreeMap<String, Value> {
        let mut flat = BTreeMap::new();
        for (key, value) in &self.client_context {
            flat.insert(format!("client.{key}"), value.clone());
        }
        for (key, value) in &self.domain_context {
            flat.insert(format!("domain.{key}"), value.clone());
        }
        for (key, value) in &self.accumulated_state {
            flat.insert(format!("state.{key}"), value.clone());
        }
        for (key, value) in &self.operational_signals {
            flat.insert(format!("signal.{key}"), value.clone());
        }
        flat
    }

    /// Computes a stable content hash of this context, used as one input to
    /// the Execution Governor's idempotency key.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if canonicalization fails.
    pub fn content_hash(&self, algorithm: HashAlgorithm) -> Result<HashDigest, HashError> {
        hash_canonical_json(algorithm, self)
    }
}
