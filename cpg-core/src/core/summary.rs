// cpg-core/src/core/summary.rs
// ============================================================================
// Module: CPG Safe Summaries
// Description: Redacted, policy-safe summaries for WAIT/BLOCKED decisions.
// Purpose: Prevent evidence/context leakage while communicating status.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Safe summaries provide minimal, policy-safe status for callers without
//! leaking raw `ExecutionContext` values. They surface the ids of unmet
//! preconditions/policy gates and retry guidance while keeping the actual
//! evaluated values out of the public record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Safe Summary
// ============================================================================

/// Safe summary attached to `WAIT` and `BLOCKED` navigation decisions.
///
/// # Invariants
/// - Contains only redacted status data, never raw context or evidence
///   values.
/// - Strings are opaque and not normalized by this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeSummary {
    /// Summary status string, e.g. `"no_options"` or `"unauthorized"`.
    pub status: String,
    /// Identifiers (as opaque strings) of unmet preconditions, rules, or
    /// policy gates.
    pub unmet: Vec<String>,
    /// Optional retry guidance surfaced to the caller.
    pub retry_hint: Option<String>,
    /// Optional policy tags attached to the summary.
    pub policy_tags: Vec<String>,
}

impl SafeSummary {
    /// Creates a safe summary with the provided status and unmet ids.
    #[must_use]
    pub fn new(status: impl Into<String>, unmet: Vec<String>) -> Self {
        Self {
            status: status.into(),
            unmet,
            retry_hint: None,
            policy_tags: Vec::new(),
        }
    }

    /// Attaches a retry hint to the summary.
    #[must_use]
    pub fn with_retry_hint(mut self, hint: impl Into<String>) -> Self {
        self.retry_hint = Some(hint.into());
        self
    }
}
