// cpg-core/src/core/trace.rs
// ============================================================================
// Module: Decision Trace Data Shapes (C12)
// Description: DecisionTrace and its typed snapshot payloads.
// Purpose: Provide the append-only, immutable system of record for "why did
//          X happen".
// Dependencies: serde, crate::core::{compensation, decision, eligibility,
//              governance, identifiers, time}
// ============================================================================

//! ## Overview
//! A [`DecisionTrace`] is written once by the Decision Tracer (C12) for each
//! of a navigation choice, an executed action, a waiting cycle, or a
//! governance rejection. Traces are never mutated or reused; the tracer
//! (`runtime::tracer`) only appends and queries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::compensation::CompensationAction;
use crate::core::decision::NavigationDecision;
use crate::core::eligibility::EligibleSpace;
use crate::core::governance::GovernanceResult;
use crate::core::identifiers::InstanceId;
use crate::core::identifiers::NodeId;
use crate::core::identifiers::TraceId;
use crate::core::summary::SafeSummary;
use crate::core::time::Timestamp;

/// The kind of orchestration cycle a trace records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceType {
    /// A navigation choice was reached (possibly `WAIT`/`COMPLETE`).
    Navigation,
    /// An action was dispatched and completed its handler invocation.
    Execution,
    /// The cycle found no eligible actions and is waiting for events.
    Wait,
    /// A selected action was rejected by the Execution Governor.
    Blocked,
}

/// The outcome of one dispatched action, recorded on an `EXECUTION` trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The action handler returned `COMPLETED`.
    Completed {
        /// The node that completed.
        node_id: NodeId,
        /// Result payload the handler returned.
        output: Option<Value>,
    },
    /// The action handler returned `PENDING` or `WAITING`.
    Suspended {
        /// The node now suspended.
        node_id: NodeId,
    },
    /// The action handler returned `FAILED` (or timed out), and the
    /// Compensation Handler chose a strategy.
    Failed {
        /// The node that failed.
        node_id: NodeId,
        /// The error surfaced by the handler.
        error: String,
        /// The compensation strategy chosen in response.
        compensation: CompensationAction,
    },
}

/// Everything recorded for one orchestration cycle.
///
/// # Invariants
/// - Immutable and append-only: once constructed, a `DecisionTrace` is never
///   edited; the tracer only appends new records.
/// - `timestamp` is within `[instance.started_at, instance.completed_at]`
///   when the latter is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrace {
    /// Trace identity.
    pub id: TraceId,
    /// When this cycle was recorded.
    pub timestamp: Timestamp,
    /// The instance this trace belongs to.
    pub instance_id: InstanceId,
    /// What kind of cycle this trace records.
    pub trace_type: TraceType,
    /// Redacted context summary for the cycle (never raw context values).
    pub context_snapshot: SafeSummary,
    /// The eligible space computed this cycle, present for `NAVIGATION`,
    /// `WAIT`, and `BLOCKED` traces.
    pub evaluation_snapshot: Option<EligibleSpace>,
    /// The navigation decision reached this cycle, present for `NAVIGATION`
    /// and `WAIT` traces.
    pub decision_snapshot: Option<NavigationDecision>,
    /// Governance results for every action considered this cycle, present
    /// for `EXECUTION` and `BLOCKED` traces.
    pub governance_snapshot: Vec<GovernanceResult>,
    /// What actually happened, present for `EXECUTION` traces.
    pub outcome_snapshot: Option<ExecutionOutcome>,
}
