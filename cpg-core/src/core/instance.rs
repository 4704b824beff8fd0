// cpg-core/src/core/instance.rs
// ============================================================================
// Module: Process Instance Model (C2)
// Description: Mutable ProcessInstance with execution history, active
//              nodes, pending edges, and execution context.
// Purpose: Represent one running occurrence of a ProcessGraph and expose
//          safe mutators that enforce the instance invariants.
// Dependencies: serde, crate::core::{identifiers, time}
// ============================================================================

//! ## Overview
//! A `ProcessInstance` owns its [`ExecutionContext`], its `NodeExecution`
//! history, and its active node/pending edge sets exclusively; it only
//! references (never owns) the `ProcessGraph` it runs against. Every
//! mutation goes through a safe mutator that enforces the invariants of the
//! data model: `activeNodeIds` always mirrors in-flight executions,
//! `completedAt` is set iff the status is terminal, and once terminal the
//! instance never changes status again.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::branch::BranchStatus;
use crate::core::branch::ParallelBranch;
use crate::core::identifiers::BranchId;
use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::EdgeId;
use crate::core::identifiers::EventId;
use crate::core::identifiers::EventType;
use crate::core::identifiers::GraphId;
use crate::core::identifiers::GraphVersion;
use crate::core::identifiers::InstanceId;
use crate::core::identifiers::NodeId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Execution Context
// ============================================================================

/// A single received domain event, retained on the instance's context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivedEvent {
    /// The domain event type.
    pub event_type: EventType,
    /// Identity of this occurrence.
    pub event_id: EventId,
    /// When the event was received, as supplied by the caller.
    pub timestamp: Timestamp,
    /// Event payload.
    pub payload: Value,
}

/// An outstanding obligation recorded on the context (e.g. a pending
/// external commitment the instance must honor or track).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obligation {
    /// Obligation kind, host-defined.
    pub kind: String,
    /// Arbitrary structured detail.
    pub detail: Value,
}

/// An immutable snapshot of everything an evaluation needs to read about an
/// instance's accumulated state.
///
/// # Invariants
/// - Never mutated in place. Every change produces a new `ExecutionContext`
///   that atomically replaces the instance's context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecutionContext {
    /// Client-supplied context values.
    pub client_context: BTreeMap<String, Value>,
    /// Domain/system context values.
    pub domain_context: BTreeMap<String, Value>,
    /// State accumulated from completed node outputs.
    pub accumulated_state: BTreeMap<String, Value>,
    /// Operational signals (current time, obligations summary, etc.).
    pub operational_signals: BTreeMap<String, Value>,
    /// Events received so far, in arrival order.
    pub received_events: Vec<ReceivedEvent>,
    /// Outstanding obligations.
    pub obligations: Vec<Obligation>,
}

// ============================================================================
// SECTION: Node Execution
// ============================================================================

/// Lifecycle status of one attempt to execute a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeExecutionStatus {
    /// Dispatched and awaiting a synchronous result.
    InProgress,
    /// Dispatched asynchronously; awaiting a completion event.
    Waiting,
    /// Queued but not yet dispatched (e.g. awaiting a human assignee).
    Pending,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully.
    Failed,
    /// Bypassed by a compensation decision.
    Skipped,
}

impl NodeExecutionStatus {
    /// Whether this status counts as "still active" for `activeNodeIds`.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::InProgress | Self::Waiting | Self::Pending)
    }
}

/// One attempt to execute a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeExecution {
    /// The node this execution attempt is for.
    pub node_id: NodeId,
    /// Current status of this attempt.
    pub status: NodeExecutionStatus,
    /// Attempt number for this node, 1-based, used in idempotency keys.
    pub execution_count: u32,
    /// When the attempt started.
    pub started_at: Timestamp,
    /// When the attempt reached a terminal status.
    pub completed_at: Option<Timestamp>,
    /// Result payload, present once `Completed`.
    pub result: Option<Value>,
    /// Error detail, present once `Failed`.
    pub error: Option<String>,
}

// ============================================================================
// SECTION: Instance Status
// ============================================================================

/// Lifecycle status of a `ProcessInstance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Actively being evaluated and stepped.
    Running,
    /// Cooperatively paused; resumes via a full reevaluation cycle.
    Suspended,
    /// Reached a terminal node with no active work remaining.
    Completed,
    /// Failed irrecoverably.
    Failed,
    /// Cancelled by an external caller.
    Cancelled,
}

impl InstanceStatus {
    /// Whether this status is terminal (immutable once reached).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Errors raised by `ProcessInstance` mutators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstanceError {
    /// The mutator is not valid for the instance's current status.
    #[error("invalid operation for instance status {0:?}")]
    InvalidState(InstanceStatus),
    /// No execution attempt exists for the given node.
    #[error("no execution recorded for node {0}")]
    NodeNotFound(NodeId),
    /// The given edge is not a pending edge on this instance.
    #[error("edge {0} is not pending on this instance")]
    EdgeNotFound(EdgeId),
}

// ============================================================================
// SECTION: Process Instance
// ============================================================================

/// A running occurrence of a `ProcessGraph`.
///
/// A `ProcessInstance` exclusively owns its context, history, and branch
/// bookkeeping; it references its graph only by `(graph_id, graph_version)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInstance {
    id: InstanceId,
    graph_id: GraphId,
    graph_version: GraphVersion,
    correlation_id: Option<CorrelationId>,
    started_at: Timestamp,
    completed_at: Option<Timestamp>,
    status: InstanceStatus,
    context: ExecutionContext,
    history: Vec<NodeExecution>,
    active_node_ids: BTreeSet<NodeId>,
    pending_edge_ids: BTreeSet<EdgeId>,
    pending_node_ids: BTreeSet<NodeId>,
    execution_counts: BTreeMap<NodeId, u32>,
    branches: Vec<ParallelBranch>,
    branch_counter: u64,
    revision: u64,
}

impl ProcessInstance {
    /// Creates a freshly started instance in status `Running`.
    #[must_use]
    pub fn start(
        id: InstanceId,
        graph_id: GraphId,
        graph_version: GraphVersion,
        correlation_id: Option<CorrelationId>,
        started_at: Timestamp,
        context: ExecutionContext,
    ) -> Self {
        Self {
            id,
            graph_id,
            graph_version,
            correlation_id,
            started_at,
            completed_at: None,
            status: InstanceStatus::Running,
            context,
            history: Vec::new(),
            active_node_ids: BTreeSet::new(),
            pending_edge_ids: BTreeSet::new(),
            pending_node_ids: BTreeSet::new(),
            execution_counts: BTreeMap::new(),
            branches: Vec::new(),
            branch_counter: 0,
            revision: 0,
        }
    }

    /// Instance identity.
    #[must_use]
    pub const fn id(&self) -> &InstanceId {
        &self.id
    }

    /// The graph template this instance runs against.
    #[must_use]
    pub const fn graph_id(&self) -> &GraphId {
        &self.graph_id
    }

    /// The pinned graph version.
    #[must_use]
    pub const fn graph_version(&self) -> GraphVersion {
        self.graph_version
    }

    /// Caller-supplied correlation id, if any.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> InstanceStatus {
        self.status
    }

    /// When the instance started.
    #[must_use]
    pub const fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// When the instance reached a terminal status, if it has.
    #[must_use]
    pub const fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    /// The current context snapshot.
    #[must_use]
    pub const fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Full execution history, in insertion order.
    #[must_use]
    pub fn history(&self) -> &[NodeExecution] {
        &self.history
    }

    /// Node ids with an in-flight execution.
    #[must_use]
    pub const fn active_node_ids(&self) -> &BTreeSet<NodeId> {
        &self.active_node_ids
    }

    /// Edge ids activated but not yet consumed by a traversal.
    #[must_use]
    pub const fn pending_edge_ids(&self) -> &BTreeSet<EdgeId> {
        &self.pending_edge_ids
    }

    /// Node ids forced onto next cycle's candidate space regardless of their
    /// inbound edges, e.g. an `ALTERNATE`/`ESCALATE` compensation redirect.
    #[must_use]
    pub const fn pending_node_ids(&self) -> &BTreeSet<NodeId> {
        &self.pending_node_ids
    }

    /// Monotonically increasing revision, for optimistic concurrency.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the most recent execution recorded for `node_id`, if any.
    #[must_use]
    pub fn latest_execution(&self, node_id: &NodeId) -> Option<&NodeExecution> {
        self.history.iter().rev().find(|exec| &exec.node_id == node_id)
    }

    /// Returns whether `node_id` has any execution in a non-active status
    /// (i.e. `Completed`, `Failed`, or `Skipped`).
    #[must_use]
    pub fn has_executed_node(&self, node_id: &NodeId) -> bool {
        self.latest_execution(node_id)
            .is_some_and(|exec| !exec.status.is_active())
    }

    /// The attempt count already recorded for `node_id`.
    #[must_use]
    pub fn execution_count(&self, node_id: &NodeId) -> u32 {
        self.execution_counts.get(node_id).copied().unwrap_or(0)
    }

    /// Every parallel branch this instance currently tracks.
    #[must_use]
    pub fn branches(&self) -> &[ParallelBranch] {
        &self.branches
    }

    /// Allocates a new branch of the form `<instanceId>:<counter>` for a
    /// just-activated `PARALLEL` edge, marking it `Running`.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidState`] if not `Running`.
    pub fn allocate_branch(
        &mut self,
        origin_edge_id: EdgeId,
        current_node_id: NodeId,
    ) -> Result<BranchId, InstanceError> {
        self.ensure_running()?;
        self.branch_counter += 1;
        let branch_id = BranchId::new(format!("{}:{}", self.id, self.branch_counter));
        self.branches.push(ParallelBranch {
            branch_id: branch_id.clone(),
            origin_edge_id,
            current_node_id,
            status: BranchStatus::Running,
        });
        self.bump_revision();
        Ok(branch_id)
    }

    /// Advances a tracked branch to `node_id`, updating its status.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::NodeNotFound`] if no branch with this id is
    /// tracked (reused here to mean "branch not found", since branches are
    /// edge/node-shaped bookkeeping rather than a distinct id space error).
    pub fn advance_branch(
        &mut self,
        branch_id: &BranchId,
        current_node_id: NodeId,
        status: BranchStatus,
    ) -> Result<(), InstanceError> {
        let branch = self
            .branches
            .iter_mut()
            .find(|branch| &branch.branch_id == branch_id)
            .ok_or_else(|| InstanceError::NodeNotFound(current_node_id.clone()))?;
        branch.current_node_id = current_node_id;
        branch.status = status;
        self.bump_revision();
        Ok(())
    }

    /// Returns every branch whose origin edge is in `origin_edge_ids`.
    #[must_use]
    pub fn branches_for_origins(&self, origin_edge_ids: &BTreeSet<EdgeId>) -> Vec<&ParallelBranch> {
        self.branches
            .iter()
            .filter(|branch| origin_edge_ids.contains(&branch.origin_edge_id))
            .collect()
    }

    fn ensure_running(&self) -> Result<(), InstanceError> {
        if self.status == InstanceStatus::Running {
            Ok(())
        } else {
            Err(InstanceError::InvalidState(self.status))
        }
    }

    fn bump_revision(&mut self) {
        self.revision += 1;
    }

    /// Begins a new execution attempt for `node_id`, returning the 1-based
    /// attempt count assigned.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidState`] if the instance is not
    /// `Running`.
    pub fn start_node_execution(
        &mut self,
        node_id: NodeId,
        started_at: Timestamp,
    ) -> Result<u32, InstanceError> {
        self.ensure_running()?;
        let count = self.execution_count(&node_id) + 1;
        self.execution_counts.insert(node_id.clone(), count);
        self.active_node_ids.insert(node_id.clone());
        self.history.push(NodeExecution {
            node_id,
            status: NodeExecutionStatus::InProgress,
            execution_count: count,
            started_at,
            completed_at: None,
            result: None,
            error: None,
        });
        self.bump_revision();
        Ok(count)
    }

    /// Marks the node's latest in-flight execution `Waiting` or `Pending`
    /// without completing it (used for asynchronous action dispatch).
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidState`] if not `Running`, or
    /// [`InstanceError::NodeNotFound`] if no in-flight execution exists.
    pub fn mark_node_suspended(
        &mut self,
        node_id: &NodeId,
        status: NodeExecutionStatus,
    ) -> Result<(), InstanceError> {
        self.ensure_running()?;
        debug_assert!(status.is_active());
        let exec = self
            .history
            .iter_mut()
            .rev()
            .find(|exec| &exec.node_id == node_id && exec.status.is_active())
            .ok_or_else(|| InstanceError::NodeNotFound(node_id.clone()))?;
        exec.status = status;
        self.active_node_ids.insert(node_id.clone());
        self.bump_revision();
        Ok(())
    }

    /// Completes the node's latest in-flight execution with `output`.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidState`] if not `Running`, or
    /// [`InstanceError::NodeNotFound`] if no in-flight execution exists.
    pub fn complete_node_execution(
        &mut self,
        node_id: &NodeId,
        output: Option<Value>,
        completed_at: Timestamp,
    ) -> Result<(), InstanceError> {
        self.ensure_running()?;
        let exec = self
            .history
            .iter_mut()
            .rev()
            .find(|exec| &exec.node_id == node_id && exec.status.is_active())
            .ok_or_else(|| InstanceError::NodeNotFound(node_id.clone()))?;
        exec.status = NodeExecutionStatus::Completed;
        exec.completed_at = Some(completed_at);
        exec.result = output;
        self.active_node_ids.remove(node_id);
        self.bump_revision();
        Ok(())
    }

    /// Fails the node's latest in-flight execution with `error`.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidState`] if not `Running`, or
    /// [`InstanceError::NodeNotFound`] if no in-flight execution exists.
    pub fn fail_node_execution(
        &mut self,
        node_id: &NodeId,
        error: impl Into<String>,
        completed_at: Timestamp,
    ) -> Result<(), InstanceError> {
        self.ensure_running()?;
        let exec = self
            .history
            .iter_mut()
            .rev()
            .find(|exec| &exec.node_id == node_id && exec.status.is_active())
            .ok_or_else(|| InstanceError::NodeNotFound(node_id.clone()))?;
        exec.status = NodeExecutionStatus::Failed;
        exec.completed_at = Some(completed_at);
        exec.error = Some(error.into());
        self.active_node_ids.remove(node_id);
        self.bump_revision();
        Ok(())
    }

    /// Marks the node's latest in-flight execution `Skipped`.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidState`] if not `Running`, or
    /// [`InstanceError::NodeNotFound`] if no in-flight execution exists.
    pub fn skip_node_execution(
        &mut self,
        node_id: &NodeId,
        completed_at: Timestamp,
    ) -> Result<(), InstanceError> {
        self.ensure_running()?;
        let exec = self
            .history
            .iter_mut()
            .rev()
            .find(|exec| &exec.node_id == node_id && exec.status.is_active())
            .ok_or_else(|| InstanceError::NodeNotFound(node_id.clone()))?;
        exec.status = NodeExecutionStatus::Skipped;
        exec.completed_at = Some(completed_at);
        self.active_node_ids.remove(node_id);
        self.bump_revision();
        Ok(())
    }

    /// Replaces the instance's context snapshot atomically.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidState`] if the instance is terminal.
    pub fn update_context(&mut self, new_context: ExecutionContext) -> Result<(), InstanceError> {
        if self.status.is_terminal() {
            return Err(InstanceError::InvalidState(self.status));
        }
        self.context = new_context;
        self.bump_revision();
        Ok(())
    }

    /// Marks `edge_id` as pending (activated but not yet traversed).
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidState`] if not `Running`.
    pub fn activate_pending_edge(&mut self, edge_id: EdgeId) -> Result<(), InstanceError> {
        self.ensure_running()?;
        self.pending_edge_ids.insert(edge_id);
        self.bump_revision();
        Ok(())
    }

    /// Consumes a previously activated pending edge.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::EdgeNotFound`] if the edge was not pending.
    pub fn consume_pending_edge(&mut self, edge_id: &EdgeId) -> Result<(), InstanceError> {
        if !self.pending_edge_ids.remove(edge_id) {
            return Err(InstanceError::EdgeNotFound(edge_id.clone()));
        }
        self.bump_revision();
        Ok(())
    }

    /// Forces `node_id` onto next cycle's candidate space regardless of its
    /// inbound edges, used to redirect a failed execution to an alternate or
    /// escalation node.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidState`] if not `Running`.
    pub fn activate_pending_node(&mut self, node_id: NodeId) -> Result<(), InstanceError> {
        self.ensure_running()?;
        self.pending_node_ids.insert(node_id);
        self.bump_revision();
        Ok(())
    }

    /// Consumes a previously activated pending node.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::NodeNotFound`] if the node was not pending.
    pub fn consume_pending_node(&mut self, node_id: &NodeId) -> Result<(), InstanceError> {
        if !self.pending_node_ids.remove(node_id) {
            return Err(InstanceError::NodeNotFound(node_id.clone()));
        }
        self.bump_revision();
        Ok(())
    }

    /// Suspends a running instance.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidState`] if not `Running`.
    pub fn suspend(&mut self) -> Result<(), InstanceError> {
        self.ensure_running()?;
        self.status = InstanceStatus::Suspended;
        self.bump_revision();
        Ok(())
    }

    /// Resumes a suspended instance back to `Running`.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidState`] if not `Suspended`.
    pub fn resume(&mut self) -> Result<(), InstanceError> {
        if self.status != InstanceStatus::Suspended {
            return Err(InstanceError::InvalidState(self.status));
        }
        self.status = InstanceStatus::Running;
        self.bump_revision();
        Ok(())
    }

    /// Transitions the instance to `Completed`.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidState`] if already terminal.
    pub fn complete(&mut self, completed_at: Timestamp) -> Result<(), InstanceError> {
        if self.status.is_terminal() {
            return Err(InstanceError::InvalidState(self.status));
        }
        self.status = InstanceStatus::Completed;
        self.completed_at = Some(completed_at);
        self.branches.clear();
        self.pending_edge_ids.clear();
        self.pending_node_ids.clear();
        self.bump_revision();
        Ok(())
    }

    /// Transitions the instance to `Failed`.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidState`] if already terminal.
    pub fn fail(&mut self, completed_at: Timestamp) -> Result<(), InstanceError> {
        if self.status.is_terminal() {
            return Err(InstanceError::InvalidState(self.status));
        }
        self.status = InstanceStatus::Failed;
        self.completed_at = Some(completed_at);
        self.branches.clear();
        self.pending_edge_ids.clear();
        self.pending_node_ids.clear();
        self.bump_revision();
        Ok(())
    }

    /// Cancels the instance. Idempotent: calling this on an already
    /// `Cancelled` instance succeeds without changing anything.
    pub fn cancel(&mut self, completed_at: Timestamp) {
        if self.status == InstanceStatus::Cancelled {
            return;
        }
        if !self.status.is_terminal() {
            self.status = InstanceStatus::Cancelled;
            self.completed_at = Some(completed_at);
            self.branches.clear();
            self.pending_edge_ids.clear();
            self.pending_node_ids.clear();
            self.bump_revision();
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

    fn fresh_instance() -> ProcessInstance {
        ProcessInstance::start(
            InstanceId::new("inst-1"),
            GraphId::new("g"),
            GraphVersion::new(1),
            None,
            Timestamp::Logical(0),
            ExecutionContext::default(),
        )
    }

    #[test]
    fn active_node_ids_mirrors_in_flight_executions() {
        let mut instance = fresh_instance();
        instance
            .start_node_execution(NodeId::new("n1"), Timestamp::Logical(1))
            .expect("start should succeed");
        assert!(instance.active_node_ids().contains(&NodeId::new("n1")));
        instance
            .complete_node_execution(&NodeId::new("n1"), None, Timestamp::Logical(2))
            .expect("complete should succeed");
        assert!(!instance.active_node_ids().contains(&NodeId::new("n1")));
        assert!(instance.has_executed_node(&NodeId::new("n1")));
    }

    #[test]
    fn mutators_reject_terminal_instances() {
        let mut instance = fresh_instance();
        instance.complete(Timestamp::Logical(1)).expect("complete should succeed");
        assert_eq!(
            instance.start_node_execution(NodeId::new("n1"), Timestamp::Logical(2)),
            Err(InstanceError::InvalidState(InstanceStatus::Completed))
        );
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut instance = fresh_instance();
        instance.cancel(Timestamp::Logical(1));
        let revision_after_first = instance.revision();
        instance.cancel(Timestamp::Logical(2));
        assert_eq!(instance.revision(), revision_after_first);
        assert_eq!(instance.status(), InstanceStatus::Cancelled);
    }

    #[test]
    fn terminal_transition_clears_branches() {
        let mut instance = fresh_instance();
        instance
            .allocate_branch(EdgeId::new("e1"), NodeId::new("b"))
            .expect("allocate should succeed");
        assert_eq!(instance.branches().len(), 1);
        instance.complete(Timestamp::Logical(1)).expect("complete should succeed");
        assert!(instance.branches().is_empty());
    }

    #[test]
    fn execution_count_increments_per_node() {
        let mut instance = fresh_instance();
        let first = instance
            .start_node_execution(NodeId::new("n1"), Timestamp::Logical(1))
            .expect("start should succeed");
        instance
            .fail_node_execution(&NodeId::new("n1"), "boom", Timestamp::Logical(2))
            .expect("fail should succeed");
        let second = instance
            .start_node_execution(NodeId::new("n1"), Timestamp::Logical(3))
            .expect("retry start should succeed");
        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }
}
