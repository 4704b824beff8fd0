// cpg-core/src/interfaces/mod.rs
// ============================================================================
// Module: CPG Ports
// Description: Backend-agnostic interfaces for expression/rule/policy
//              evaluation, action dispatch, persistence, and event
//              publication.
// Purpose: Define the contract surfaces the orchestration core consumes
//          without embedding a specific expression engine, decision-table
//          engine, transport, or persistence backend.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! Every port here is a plain, synchronous trait: evaluating a FEEL
//! expression, a decision table, or a policy gate is assumed to be a pure,
//! in-process computation (expression/rule/policy engines are pure ports,
//! injected rather than hard-coded) and dispatching an action is a single
//! blocking call whose *result* may say "this will finish later"
//! (`PENDING`/`WAITING`) rather than the Rust call itself being asynchronous.
//! Implementations must fail closed on missing or invalid data; the core
//! never depends on a specific engine, store, or transport.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::ActionConfig;
use crate::core::ActionType;
use crate::core::CorrelationId;
use crate::core::DecisionTrace;
use crate::core::EdgeId;
use crate::core::EventType;
use crate::core::FeelExpression;
use crate::core::GraphId;
use crate::core::GraphVersion;
use crate::core::HandlerRef;
use crate::core::InstanceId;
use crate::core::NodeId;
use crate::core::PolicyGateId;
use crate::core::PolicyOutcome;
use crate::core::PrincipalId;
use crate::core::ProcessGraph;
use crate::core::ProcessInstance;
use crate::core::RuleId;
use crate::core::TraceId;
use crate::core::TraceType;

// ============================================================================
// SECTION: Expression Evaluator (C3)
// ============================================================================

/// The result of evaluating a single [`FeelExpression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionOutcome {
    /// Whether the evaluator was able to produce a result at all.
    pub success: bool,
    /// The produced value. `Value::Null` both for an expression that
    /// legitimately evaluates to null and for a missing identifier: callers
    /// must not distinguish the two.
    pub result: Value,
    /// Present when `success` is `false`.
    pub error: Option<String>,
}

impl ExpressionOutcome {
    /// Builds a successful outcome.
    #[must_use]
    pub const fn ok(result: Value) -> Self {
        Self {
            success: true,
            result,
            error: None,
        }
    }

    /// Builds a failed outcome.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: Value::Null,
            error: Some(error.into()),
        }
    }

    /// Whether this outcome's result is the boolean `true`, the truth test
    /// used throughout guard/precondition evaluation.
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.success && self.result == Value::Bool(true)
    }
}

/// Evaluates a single [`FeelExpression`] against a flat keyed context.
///
/// Implementations must treat a missing identifier as the null value, never
/// as a failure: a condition that references an unset field should evaluate
/// to `false` (via a null comparison), not abort the whole evaluation.
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluates `expression` against `context`.
    fn evaluate(
        &self,
        expression: &FeelExpression,
        context: &BTreeMap<String, Value>,
    ) -> ExpressionOutcome;
}

// ============================================================================
// SECTION: Rule Evaluator (C3)
// ============================================================================

/// The result of evaluating a referenced decision table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    /// Named outputs produced by the decision table.
    pub outputs: BTreeMap<String, Value>,
    /// Present when the evaluator surfaced a failure; the caller absorbs
    /// this into the owning [`crate::core::NodeEvaluation::blocked_reason`],
    /// never as a hard error.
    pub error: Option<String>,
}

/// Evaluates a referenced decision table (business rule) against a flat
/// keyed context.
pub trait RuleEvaluator: Send + Sync {
    /// Evaluates the decision table named `rule_id`.
    fn evaluate(&self, rule_id: &RuleId, context: &BTreeMap<String, Value>) -> RuleOutcome;
}

// ============================================================================
// SECTION: Policy Evaluator (C3)
// ============================================================================

/// The result of evaluating a referenced policy gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyResult {
    /// The policy outcome.
    pub outcome: PolicyOutcome,
    /// Arbitrary structured detail from the policy evaluator.
    pub details: Option<Value>,
}

impl PolicyResult {
    /// `true` iff `outcome` is `DENIED`, or `REVIEW_REQUIRED` and
    /// `required_outcome` names a different outcome.
    #[must_use]
    pub fn blocks(&self, required_outcome: PolicyOutcome) -> bool {
        match self.outcome {
            PolicyOutcome::Denied => true,
            PolicyOutcome::ReviewRequired => required_outcome != PolicyOutcome::ReviewRequired,
            PolicyOutcome::Allowed | PolicyOutcome::NotApplicable => false,
        }
    }
}

/// Evaluates a referenced policy gate against a flat keyed context.
pub trait PolicyEvaluator: Send + Sync {
    /// Evaluates the policy gate named `policy_gate_id`.
    fn evaluate(
        &self,
        policy_gate_id: &PolicyGateId,
        context: &BTreeMap<String, Value>,
    ) -> PolicyResult;
}

// ============================================================================
// SECTION: Action Handler (C3)
// ============================================================================

/// The input handed to an action handler for one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionContext {
    /// The instance dispatching this action.
    pub instance_id: InstanceId,
    /// The node whose action is being dispatched.
    pub node_id: NodeId,
    /// 1-based attempt count for this node on this instance.
    pub execution_count: u32,
    /// The action's declared configuration.
    pub config: ActionConfig,
    /// A flattened view of the runtime context at dispatch time.
    pub context: BTreeMap<String, Value>,
    /// The authorization principal bound to this cycle.
    pub principal: PrincipalId,
    /// Caller-supplied correlation id, if any.
    pub correlation_id: Option<CorrelationId>,
}

/// The outcome of one action handler invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionResult {
    /// The action finished synchronously.
    Completed {
        /// Result payload.
        output: Option<Value>,
    },
    /// The action was accepted but has not finished (e.g. a human task
    /// awaiting an assignee); a later `NodeCompleted`/`NodeFailed`
    /// orchestration event will resolve it.
    Pending,
    /// The action is in flight asynchronously; same resolution contract as
    /// `Pending`.
    Waiting,
    /// The action failed.
    Failed {
        /// Exception type, matched against `ExceptionRoutes`.
        exception_type: String,
        /// Error detail.
        error: String,
    },
}

/// A handler bound to a node's `(ActionType, HandlerRef)` pair.
pub trait ActionHandler: Send + Sync {
    /// Dispatches the action described by `ctx`.
    fn execute(&self, ctx: &ActionContext) -> ActionResult;

    /// Whether this handler may return `Pending`/`Waiting` instead of
    /// resolving synchronously.
    fn supports_async(&self) -> bool {
        false
    }
}

/// Resolves `(ActionType, HandlerRef)` pairs to concrete handlers.
pub trait ActionHandlerRegistry: Send + Sync {
    /// Looks up the handler bound to `(action_type, handler_ref)`.
    fn resolve(
        &self,
        action_type: ActionType,
        handler_ref: &HandlerRef,
    ) -> Option<Arc<dyn ActionHandler>>;
}

// ============================================================================
// SECTION: Persistence Ports
// ============================================================================

/// Errors raised by any of the three persistence ports.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Backing store reported an I/O failure.
    #[error("repository io error: {0}")]
    Io(String),
    /// Stored data failed to deserialize or violated an invariant.
    #[error("repository data corruption: {0}")]
    Corrupt(String),
    /// An optimistic-concurrency write lost a race.
    #[error("repository revision conflict for {0}")]
    RevisionConflict(String),
}

/// CRUD and lookup for published [`ProcessGraph`] templates, keyed by
/// `(graphId, version)`.
pub trait ProcessGraphRepository: Send + Sync {
    /// Loads a specific graph version.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on a backing-store failure.
    fn load(
        &self,
        graph_id: &GraphId,
        version: GraphVersion,
    ) -> Result<Option<Arc<ProcessGraph>>, RepositoryError>;

    /// Loads the highest published version of `graph_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on a backing-store failure.
    fn load_latest_published(
        &self,
        graph_id: &GraphId,
    ) -> Result<Option<Arc<ProcessGraph>>, RepositoryError>;

    /// Persists a graph version. Graphs are immutable once stored; callers
    /// must publish a new version instead of overwriting one.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on a backing-store failure.
    fn save(&self, graph: Arc<ProcessGraph>) -> Result<(), RepositoryError>;
}

/// CRUD and lookup for [`ProcessInstance`] state.
pub trait ProcessInstanceRepository: Send + Sync {
    /// Loads an instance by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on a backing-store failure.
    fn load(&self, instance_id: &InstanceId) -> Result<Option<ProcessInstance>, RepositoryError>;

    /// Persists an instance snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::RevisionConflict`] if `instance.revision()`
    /// is stale relative to the stored copy, or [`RepositoryError`] on any
    /// other backing-store failure.
    fn save(&self, instance: &ProcessInstance) -> Result<(), RepositoryError>;

    /// Lists every instance id currently `Running` or `Suspended`, for
    /// orchestrator warm-start.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on a backing-store failure.
    fn list_live(&self) -> Result<Vec<InstanceId>, RepositoryError>;
}

/// Read-side (and append) access to the [`DecisionTrace`] log.
pub trait DecisionTraceRepository: Send + Sync {
    /// Appends one trace record.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on a backing-store failure.
    fn append(&self, trace: DecisionTrace) -> Result<(), RepositoryError>;

    /// Finds a trace by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on a backing-store failure.
    fn find_by_id(&self, trace_id: &TraceId) -> Result<Option<DecisionTrace>, RepositoryError>;

    /// Returns every trace for `instance_id`, chronologically.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on a backing-store failure.
    fn find_by_instance_id(
        &self,
        instance_id: &InstanceId,
    ) -> Result<Vec<DecisionTrace>, RepositoryError>;

    /// Returns every trace of a given type, chronologically.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on a backing-store failure.
    fn find_by_type(&self, trace_type: TraceType) -> Result<Vec<DecisionTrace>, RepositoryError>;

    /// Deletes every trace older than `cutoff_unix_millis`, for retention
    /// pruning.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on a backing-store failure.
    fn delete_older_than(&self, cutoff_unix_millis: i64) -> Result<u64, RepositoryError>;
}

// ============================================================================
// SECTION: Event Publisher
// ============================================================================

/// Errors raised when publishing a process event.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The publisher reported a failure.
    #[error("event publish failure: {0}")]
    Failed(String),
}

/// Emits [`crate::core::ProcessEvent`]s out of the core. Implementations may
/// be in-memory, a durable log, or a broker; the core never depends on
/// which.
pub trait EventPublisher: Send + Sync {
    /// Publishes one process event.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when the publisher cannot accept the event.
    fn publish(&self, event: crate::core::ProcessEvent) -> Result<(), PublishError>;
}

/// A source of domain events pushed into the orchestrator from the outside,
/// e.g. a message broker consumer or webhook adapter.
pub trait DomainEventSource: Send + Sync {
    /// Returns the next available domain event, if any, without blocking.
    fn poll(&self) -> Option<(EventType, Value)>;
}

/// The edges a pending/active edge id is expected to resolve against, used
/// by ports that need to validate a reference without importing
/// `ProcessGraph` directly (kept here purely to document the relationship;
/// no port currently requires it beyond `Option<EdgeId>` fields above).
pub type EdgeRef = Option<EdgeId>;
