// cpg-core/src/core/compensation.rs
// ============================================================================
// Module: Compensation Data Shapes (C7)
// Description: CompensationAction, the Compensation Handler's traced choice.
// Purpose: Carry the remediation/escalation/retry/fail decision made on a
//          node execution failure, for both dispatch and tracing.
// Dependencies: serde, crate::core::{graph, identifiers}
// ============================================================================

//! ## Overview
//! [`CompensationAction`] is the Compensation Handler's (C7) output: one of
//! the strategies in [`crate::core::graph::CompensationStrategy`], carrying
//! whatever target ids the strategy needs plus a human-readable reason for
//! the trace. The handler's selection order (node remediation routes, then
//! node escalation routes, then inbound edge compensation, then action-level
//! retry, then fail) lives in `runtime::compensation`, which is the only
//! thing that constructs this type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::graph::CompensationStrategy;
use crate::core::identifiers::EdgeId;
use crate::core::identifiers::NodeId;

/// The Compensation Handler's decision for one failed node execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationAction {
    /// The chosen strategy.
    pub strategy: CompensationStrategy,
    /// Target node for `ALTERNATE`/`ESCALATE` strategies.
    pub target_node_id: Option<NodeId>,
    /// Target edge for `ROLLBACK` strategies routed through a compensating
    /// edge.
    pub target_edge_id: Option<EdgeId>,
    /// The retry attempt number, set only when `strategy == RETRY`.
    pub retry_attempt: Option<u32>,
    /// Human-readable reason recorded on the trace, e.g. which route matched.
    pub reason: String,
}

impl CompensationAction {
    /// Builds a `FAIL` decision with the given reason, used when no
    /// remediation, escalation, edge compensation, or retry configuration
    /// matches.
    #[must_use]
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            strategy: CompensationStrategy::Fail,
            target_node_id: None,
            target_edge_id: None,
            retry_attempt: None,
            reason: reason.into(),
        }
    }
}
