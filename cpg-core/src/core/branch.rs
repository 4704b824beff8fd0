// cpg-core/src/core/branch.rs
// ============================================================================
// Module: Parallel Branch Data Shape (C6)
// Description: ParallelBranch and BranchStatus.
// Purpose: Track one thread of execution created by a PARALLEL edge until
//          it is joined at a downstream node.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

//! ## Overview
//! The Execution Coordinator (C6) appends a [`ParallelBranch`] every time a
//! `PARALLEL` edge is activated, and updates its `current_node_id`/`status`
//! as the branch's execution progresses, until a join consumes it or the
//! owning instance terminates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::BranchId;
use crate::core::identifiers::EdgeId;
use crate::core::identifiers::NodeId;

/// Lifecycle status of a parallel branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    /// Allocated but not yet advanced.
    Pending,
    /// Actively progressing along the graph.
    Running,
    /// Reached a terminal point for this branch.
    Completed,
    /// Failed and will not contribute further to any join.
    Failed,
    /// Cancelled, e.g. because the owning instance was cancelled.
    Cancelled,
}

/// An active thread of execution created by a `PARALLEL` edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelBranch {
    /// Identity of the branch, conventionally `<instanceId>:<counter>`.
    pub branch_id: BranchId,
    /// The `PARALLEL` edge whose activation created this branch.
    pub origin_edge_id: EdgeId,
    /// The node this branch is currently at (or last completed).
    pub current_node_id: NodeId,
    /// Current status.
    pub status: BranchStatus,
}
