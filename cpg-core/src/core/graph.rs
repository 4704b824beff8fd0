// cpg-core/src/core/graph.rs
// ============================================================================
// Module: Process Graph Model (C1)
// Description: Immutable ProcessGraph, Node, Edge, and FeelExpression value
//              types, plus structural validation and index-backed queries.
// Purpose: Represent a versioned workflow template and make it cheap to
//          query during evaluation.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

//! ## Overview
//! A `ProcessGraph` is an immutable, versioned template: a directed graph of
//! governed decision points (`Node`) connected by guarded transitions
//! (`Edge`). It is built once by [`ProcessGraph::new`], which validates
//! structural invariants and builds read-only indices over nodes and edges;
//! nothing about a published graph is ever mutated in place. A new version
//! supersedes, it never edits, a prior one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::EdgeId;
use crate::core::identifiers::EventType;
use crate::core::identifiers::ExceptionType;
use crate::core::identifiers::GraphId;
use crate::core::identifiers::GraphVersion;
use crate::core::identifiers::HandlerRef;
use crate::core::identifiers::NodeId;
use crate::core::identifiers::PolicyGateId;
use crate::core::identifiers::RuleId;

// ============================================================================
// SECTION: FEEL Expression
// ============================================================================

/// A single expression evaluated by the host-supplied
/// [`crate::interfaces::ExpressionEvaluator`]. The core treats the source
/// text as opaque; it never parses or interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeelExpression(String);

impl FeelExpression {
    /// Wraps raw expression source text.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    /// Returns the expression source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeelExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Policy Outcome
// ============================================================================

/// Outcome of a policy evaluation, shared by [`crate::interfaces::PolicyResult`]
/// and guard/governance comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyOutcome {
    /// The policy explicitly allows the action.
    Allowed,
    /// The policy explicitly denies the action.
    Denied,
    /// The policy requires manual review before proceeding.
    ReviewRequired,
    /// The policy does not apply to this action.
    NotApplicable,
}

// ============================================================================
// SECTION: Preconditions
// ============================================================================

/// Two ordered lists of expressions gating a node's eligibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Preconditions {
    /// Conditions evaluated against client-supplied context.
    pub client_context: Vec<FeelExpression>,
    /// Conditions evaluated against domain/system context.
    pub domain_context: Vec<FeelExpression>,
}

/// A reference to a policy gate a node must pass, with the outcome required
/// for the gate to be considered satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyGateRef {
    /// Identifies the policy gate to evaluate.
    pub policy_gate_id: PolicyGateId,
    /// The outcome required for this gate to pass.
    pub required_outcome: PolicyOutcome,
}

/// A reference to a business rule (decision table) a node consults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRuleRef {
    /// Identifies the decision table to evaluate.
    pub rule_id: RuleId,
    /// Category label used to group rule outputs in traces.
    pub category: String,
}

// ============================================================================
// SECTION: Action
// ============================================================================

/// The kind of side-effectful work a node dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Invokes an external system.
    SystemInvocation,
    /// Creates a task for a human to complete.
    HumanTask,
    /// Delegates to an AI agent.
    AgentAssisted,
    /// Pure decision/branching action, no external side effect.
    Decision,
    /// Sends a notification.
    Notification,
    /// Waits without performing a side effect.
    Wait,
}

/// Configuration attached to a node's [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ActionConfig {
    /// Whether the handler may return before completing (`PENDING`/`WAITING`).
    #[serde(rename = "async")]
    pub is_async: bool,
    /// Seconds before an in-flight action is treated as `TIMEOUT`/`FAILED`.
    pub timeout_seconds: Option<u64>,
    /// Maximum retry attempts the action itself declares (consulted last by
    /// the Compensation Handler).
    pub retry_count: u32,
    /// Expression resolving the assignee for human tasks.
    pub assignee_expression: Option<FeelExpression>,
    /// Reference to a form definition for human tasks.
    pub form_ref: Option<String>,
}

/// The side-effectful work a node dispatches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// The kind of action.
    pub action_type: ActionType,
    /// Resolves, together with `action_type`, to a concrete handler in the
    /// `ActionHandlerRegistry`.
    pub handler_ref: HandlerRef,
    /// Action configuration.
    pub config: ActionConfig,
}

// ============================================================================
// SECTION: Event Configuration
// ============================================================================

/// When an emission fires relative to node execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionTiming {
    /// Emitted when the node starts executing.
    OnStart,
    /// Emitted when the node completes.
    OnComplete,
}

/// A subscription that makes a node eligible when a matching event occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSubscription {
    /// The domain event type subscribed to.
    pub event_type: EventType,
    /// Optional correlation expression narrowing which occurrences match.
    pub correlation: Option<FeelExpression>,
}

/// A domain event a node emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEmission {
    /// The domain event type emitted.
    pub event_type: EventType,
    /// When the emission fires.
    pub timing: EmissionTiming,
    /// Optional expression producing the emitted payload.
    pub payload: Option<FeelExpression>,
}

/// Event subscriptions and emissions attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EventConfig {
    /// Events that make this node eligible when received.
    pub subscriptions: Vec<EventSubscription>,
    /// Events this node emits.
    pub emissions: Vec<EventEmission>,
}

// ============================================================================
// SECTION: Exception Routes
// ============================================================================

/// The compensation strategy chosen for a failed node execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationStrategy {
    /// Re-attempt the same node.
    Retry,
    /// Undo prior side effects via a compensating action.
    Rollback,
    /// Redirect execution to a different node.
    Alternate,
    /// Route to a human/operational escalation node.
    Escalate,
    /// Mark the node `SKIPPED` and let downstream evaluation proceed.
    Skip,
    /// Fail the owning instance.
    Fail,
}

/// A single exception-matching rule in a node's `ExceptionRoutes`.
///
/// Matching uses wildcard containment: `*`/`ANY` matches any exception type;
/// otherwise a pattern matches if it equals the actual exception type or is
/// contained within it (`actual.contains(pattern)`). This is a documented
/// rule, not a bug; exact-match routes should list the full type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRoute {
    /// The exception-type pattern this route matches.
    pub pattern: ExceptionType,
    /// Strategy chosen when this route matches.
    pub strategy: CompensationStrategy,
    /// Retry ceiling, consulted only when `strategy == Retry`.
    pub max_retries: Option<u32>,
    /// Target node for `Alternate`/`Escalate` strategies.
    pub target_node_id: Option<NodeId>,
}

impl ExceptionRoute {
    /// Returns whether this route matches the given exception type, using
    /// wildcard/substring-containment semantics.
    #[must_use]
    pub fn matches(&self, actual: &ExceptionType) -> bool {
        let pattern = self.pattern.as_str();
        if pattern == "*" || pattern == "ANY" {
            return true;
        }
        actual.as_str().contains(pattern)
    }
}

/// Remediation and escalation routes consulted by the Compensation Handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExceptionRoutes {
    /// Consulted first, in declaration order.
    pub remediation: Vec<ExceptionRoute>,
    /// Consulted after remediation, in declaration order.
    pub escalation: Vec<ExceptionRoute>,
}

// ============================================================================
// SECTION: Node
// ============================================================================

/// A governed decision point in a process graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Identity of the node within its pinned graph version.
    pub id: NodeId,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Node definition version, independent of the owning graph's version.
    pub version: u32,
    /// Eligibility preconditions.
    pub preconditions: Preconditions,
    /// Policy gates evaluated after preconditions.
    pub policy_gates: Vec<PolicyGateRef>,
    /// Business rules evaluated after policy gates.
    pub business_rules: Vec<BusinessRuleRef>,
    /// The side-effectful action this node dispatches.
    pub action: Action,
    /// Event subscriptions and emissions.
    pub event_config: EventConfig,
    /// Failure remediation and escalation routes.
    pub exception_routes: ExceptionRoutes,
}

// ============================================================================
// SECTION: Edge
// ============================================================================

/// A condition gating traversal of an edge on a received event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCondition {
    /// The domain event type checked.
    pub event_type: EventType,
    /// Whether the event must have occurred (`true`) or must not have
    /// occurred (`false`) for this condition to hold.
    pub must_have_occurred: bool,
    /// Optional correlation expression narrowing which occurrences count.
    pub correlation: Option<FeelExpression>,
}

/// The combination of conditions gating traversal of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GuardConditions {
    /// Plain context expressions; all must hold.
    pub context_conditions: Vec<FeelExpression>,
    /// Expected-outcome expressions keyed by the rule they constrain,
    /// evaluated against a context enriched with `ruleOutputs`.
    pub rule_outcome_conditions: BTreeMap<RuleId, FeelExpression>,
    /// Required policy outcomes keyed by the policy gate they constrain.
    pub policy_outcome_conditions: BTreeMap<PolicyGateId, PolicyOutcome>,
    /// Event-presence conditions.
    pub event_conditions: Vec<EventCondition>,
}

/// How an edge's traversal interacts with parallel execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// A normal, single-threaded transition.
    Sequential,
    /// Activates a new parallel branch.
    Parallel,
    /// Represents a compensating transition, exempt from the no-self-loop
    /// structural rule.
    Compensating,
}

/// How a parallel join at the edge's target node is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JoinType {
    /// Every relevant branch must reach `COMPLETED`.
    All,
    /// At least one relevant branch must reach `COMPLETED`.
    Any,
    /// At least `required` branches (or, if unset, the documented majority
    /// `floor(N/2)+1` of the total relevant branches) must reach
    /// `COMPLETED`.
    NOfM {
        /// Explicit threshold; `None` defaults to majority of the relevant
        /// branch count at evaluation time.
        required: Option<u32>,
    },
}

/// Ordering and exclusivity applied during edge selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority {
    /// Primary sort key, descending.
    pub weight: i64,
    /// Secondary sort key, ascending, used to break weight ties.
    pub rank: i64,
    /// When set, this edge wins outright over any other traversable edge
    /// from the same node.
    pub exclusive: bool,
}

/// Events that activate or force reevaluation of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EventTriggers {
    /// Events that make this edge a candidate for traversal.
    pub activating_events: Vec<EventType>,
    /// Events that force reevaluation of this edge even if already
    /// considered.
    pub reevaluation_events: Vec<EventType>,
}

/// Edge-level compensation strategy, distinct from a node's exception
/// routes: consulted after node-level remediation/escalation fail to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeCompensationStrategy {
    /// Re-attempt the source node.
    Retry,
    /// Undo prior side effects.
    Rollback,
    /// Redirect to the alternate path.
    ///
    /// The source corpus has no explicit target for this path; it is
    /// currently mapped to `Skip` by the Compensation Handler (see
    /// DESIGN.md).
    Alternate,
    /// Escalate via the compensating edge's target.
    Escalate,
}

/// Edge-level compensation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationSemantics {
    /// The strategy this edge prescribes on failure.
    pub strategy: EdgeCompensationStrategy,
    /// Retry ceiling, consulted only when `strategy == Retry`.
    pub max_retries: u32,
    /// The edge to traverse for `Rollback`/`Escalate` strategies.
    pub compensating_edge_id: Option<EdgeId>,
    /// Optional guard expression narrowing when this compensation applies.
    pub condition: Option<FeelExpression>,
}

/// Combined execution-semantics configuration for an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSemantics {
    /// Sequential, parallel, or compensating.
    pub kind: EdgeKind,
    /// Join evaluation rule applied at the target node.
    pub join_type: JoinType,
}

/// A guarded transition from one node to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Identity of the edge within its pinned graph version.
    pub id: EdgeId,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Source node id.
    pub source: NodeId,
    /// Target node id.
    pub target: NodeId,
    /// Conditions gating traversal.
    pub guard: GuardConditions,
    /// Parallel/join semantics.
    pub execution: ExecutionSemantics,
    /// Selection ordering and exclusivity.
    pub priority: Priority,
    /// Activation/reevaluation event triggers.
    pub event_triggers: EventTriggers,
    /// Optional edge-level compensation, consulted by the Compensation
    /// Handler after node-level routes fail to match.
    pub compensation: Option<CompensationSemantics>,
}

// ============================================================================
// SECTION: Process Graph
// ============================================================================

/// Lifecycle status of a `ProcessGraph`. Transitions are forward-only along
/// this declared order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphStatus {
    /// Authored but not yet eligible to start instances.
    Draft,
    /// Eligible to start new instances.
    Published,
    /// No longer eligible to start instances; existing instances continue.
    Deprecated,
    /// Retired; existing instances should have completed.
    Archived,
}

impl GraphStatus {
    /// Returns whether `self -> next` is a valid forward transition.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        next >= self
    }
}

/// Structural validation failures for a `ProcessGraph`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Two nodes share the same id.
    #[error("duplicate node id: {0}")]
    DuplicateNodeId(NodeId),
    /// Two edges share the same id.
    #[error("duplicate edge id: {0}")]
    DuplicateEdgeId(EdgeId),
    /// An edge's source or target does not resolve to a node in the graph.
    #[error("edge {edge} references unknown node {node}")]
    DanglingEdge {
        /// The offending edge.
        edge: EdgeId,
        /// The node id that failed to resolve.
        node: NodeId,
    },
    /// An entry node id does not resolve.
    #[error("entry node {0} does not resolve")]
    UnknownEntryNode(NodeId),
    /// A terminal node id does not resolve.
    #[error("terminal node {0} does not resolve")]
    UnknownTerminalNode(NodeId),
    /// The graph declares no entry nodes.
    #[error("graph declares no entry nodes")]
    NoEntryNodes,
    /// A terminal node is not reachable from any entry node.
    #[error("terminal node {0} is not reachable from any entry node")]
    UnreachableTerminal(NodeId),
    /// A self-loop edge lacks `COMPENSATING` semantics.
    #[error("self-loop edge {0} is not marked compensating")]
    InvalidSelfLoop(EdgeId),
    /// An exclusive edge was declared with no weight set.
    #[error("exclusive edge {0} must carry a nonzero weight")]
    ExclusiveEdgeMissingWeight(EdgeId),
}

/// Read-only indices built once at construction, never mutated afterward.
#[derive(Debug, Clone, Default)]
struct GraphIndex {
    node_position: HashMap<NodeId, usize>,
    edge_position: HashMap<EdgeId, usize>,
    outbound: HashMap<NodeId, Vec<usize>>,
    inbound: HashMap<NodeId, Vec<usize>>,
    subscribed: HashMap<EventType, Vec<NodeId>>,
    reevaluated_by: HashMap<EventType, Vec<EdgeId>>,
}

/// An immutable, versioned template of nodes and edges.
///
/// Constructed only via [`ProcessGraph::new`], which validates structural
/// invariants and builds the read-only query indices described in the
/// design notes (node/edge lookup, outbound/inbound adjacency, event
/// subscriptions). A `ProcessGraph` is never mutated after construction; a
/// new version supersedes it entirely.
#[derive(Debug, Clone)]
pub struct ProcessGraph {
    graph_id: GraphId,
    version: GraphVersion,
    name: String,
    description: String,
    status: GraphStatus,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    entry_node_ids: BTreeSet<NodeId>,
    terminal_node_ids: BTreeSet<NodeId>,
    metadata: BTreeMap<String, String>,
    index: GraphIndex,
}

impl ProcessGraph {
    /// Builds and validates a new `ProcessGraph`.
    ///
    /// # Errors
    ///
    /// Returns the full list of structural validation errors; never a
    /// single error and never a panic. An empty vector on the `Err` side
    /// never occurs.
    #[allow(clippy::too_many_arguments, reason = "mirrors the flat graph template shape")]
    pub fn new(
        graph_id: GraphId,
        version: GraphVersion,
        name: impl Into<String>,
        description: impl Into<String>,
        status: GraphStatus,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        entry_node_ids: BTreeSet<NodeId>,
        terminal_node_ids: BTreeSet<NodeId>,
        metadata: BTreeMap<String, String>,
    ) -> Result<Self, Vec<GraphError>> {
        let mut graph = Self {
            graph_id,
            version,
            name: name.into(),
            description: description.into(),
            status,
            nodes,
            edges,
            entry_node_ids,
            terminal_node_ids,
            metadata,
            index: GraphIndex::default(),
        };
        let errors = graph.validate();
        if !errors.is_empty() {
            return Err(errors);
        }
        graph.rebuild_index();
        Ok(graph)
    }

    /// Validates structural invariants, returning every violation found.
    /// Never panics; an empty-but-invalid graph simply yields `NoEntryNodes`
    /// plus whatever else applies.
    fn validate(&self) -> Vec<GraphError> {
        let mut errors = Vec::new();
        let mut seen_nodes = BTreeSet::new();
        for node in &self.nodes {
            if !seen_nodes.insert(node.id.clone()) {
                errors.push(GraphError::DuplicateNodeId(node.id.clone()));
            }
        }
        let mut seen_edges = BTreeSet::new();
        for edge in &self.edges {
            if !seen_edges.insert(edge.id.clone()) {
                errors.push(GraphError::DuplicateEdgeId(edge.id.clone()));
            }
            if !seen_nodes.contains(&edge.source) {
                errors.push(GraphError::DanglingEdge {
                    edge: edge.id.clone(),
                    node: edge.source.clone(),
                });
            }
            if !seen_nodes.contains(&edge.target) {
                errors.push(GraphError::DanglingEdge {
                    edge: edge.id.clone(),
                    node: edge.target.clone(),
                });
            }
            if edge.source == edge.target && edge.execution.kind != EdgeKind::Compensating {
                errors.push(GraphError::InvalidSelfLoop(edge.id.clone()));
            }
            if edge.priority.exclusive && edge.priority.weight == 0 {
                errors.push(GraphError::ExclusiveEdgeMissingWeight(edge.id.clone()));
            }
        }
        if self.entry_node_ids.is_empty() {
            errors.push(GraphError::NoEntryNodes);
        }
        for entry in &self.entry_node_ids {
            if !seen_nodes.contains(entry) {
                errors.push(GraphError::UnknownEntryNode(entry.clone()));
            }
        }
        for terminal in &self.terminal_node_ids {
            if !seen_nodes.contains(terminal) {
                errors.push(GraphError::UnknownTerminalNode(terminal.clone()));
            }
        }
        if errors.is_empty() {
            errors.extend(self.check_terminal_reachability());
        }
        errors
    }

    fn check_terminal_reachability(&self) -> Vec<GraphError> {
        let mut reachable: BTreeSet<NodeId> = BTreeSet::new();
        let mut frontier: Vec<NodeId> = self.entry_node_ids.iter().cloned().collect();
        while let Some(node_id) = frontier.pop() {
            if !reachable.insert(node_id.clone()) {
                continue;
            }
            for edge in self.edges.iter().filter(|edge| edge.source == node_id) {
                if !reachable.contains(&edge.target) {
                    frontier.push(edge.target.clone());
                }
            }
        }
        self.terminal_node_ids
            .iter()
            .filter(|terminal| !reachable.contains(*terminal))
            .cloned()
            .map(GraphError::UnreachableTerminal)
            .collect()
    }

    fn rebuild_index(&mut self) {
        let mut index = GraphIndex::default();
        for (position, node) in self.nodes.iter().enumerate() {
            index.node_position.insert(node.id.clone(), position);
            for subscription in &node.event_config.subscriptions {
                index
                    .subscribed
                    .entry(subscription.event_type.clone())
                    .or_default()
                    .push(node.id.clone());
            }
        }
        for (position, edge) in self.edges.iter().enumerate() {
            index.edge_position.insert(edge.id.clone(), position);
            index
                .outbound
                .entry(edge.source.clone())
                .or_default()
                .push(position);
            index
                .inbound
                .entry(edge.target.clone())
                .or_default()
                .push(position);
            for event_type in &edge.event_triggers.reevaluation_events {
                index
                    .reevaluated_by
                    .entry(event_type.clone())
                    .or_default()
                    .push(edge.id.clone());
            }
        }
        self.index = index;
    }

    /// Graph template identity.
    #[must_use]
    pub const fn graph_id(&self) -> &GraphId {
        &self.graph_id
    }

    /// Graph version.
    #[must_use]
    pub const fn version(&self) -> GraphVersion {
        self.version
    }

    /// Lifecycle status.
    #[must_use]
    pub const fn status(&self) -> GraphStatus {
        self.status
    }

    /// Entry node ids.
    #[must_use]
    pub const fn entry_node_ids(&self) -> &BTreeSet<NodeId> {
        &self.entry_node_ids
    }

    /// Terminal node ids.
    #[must_use]
    pub const fn terminal_node_ids(&self) -> &BTreeSet<NodeId> {
        &self.terminal_node_ids
    }

    /// Returns whether `node_id` is a terminal node of this graph.
    #[must_use]
    pub fn is_terminal(&self, node_id: &NodeId) -> bool {
        self.terminal_node_ids.contains(node_id)
    }

    /// Arbitrary metadata attached at publish time.
    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Looks up a node by id in constant time.
    #[must_use]
    pub fn find_node(&self, id: &NodeId) -> Option<&Node> {
        self.index
            .node_position
            .get(id)
            .and_then(|&position| self.nodes.get(position))
    }

    /// Looks up an edge by id in constant time.
    #[must_use]
    pub fn find_edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.index
            .edge_position
            .get(id)
            .and_then(|&position| self.edges.get(position))
    }

    /// Returns every node, in declaration order (used to break selection
    /// ties by insertion order).
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns every edge, in declaration order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges whose source is `node_id`.
    #[must_use]
    pub fn outbound_edges(&self, node_id: &NodeId) -> Vec<&Edge> {
        self.index
            .outbound
            .get(node_id)
            .into_iter()
            .flatten()
            .filter_map(|&position| self.edges.get(position))
            .collect()
    }

    /// Edges whose target is `node_id`.
    #[must_use]
    pub fn inbound_edges(&self, node_id: &NodeId) -> Vec<&Edge> {
        self.index
            .inbound
            .get(node_id)
            .into_iter()
            .flatten()
            .filter_map(|&position| self.edges.get(position))
            .collect()
    }

    /// Nodes subscribed to `event_type`.
    #[must_use]
    pub fn nodes_subscribed_to(&self, event_type: &EventType) -> &[NodeId] {
        self.index
            .subscribed
            .get(event_type)
            .map_or(&[], Vec::as_slice)
    }

    /// Edges that must be reevaluated when `event_type` occurs.
    #[must_use]
    pub fn edges_reevaluated_by(&self, event_type: &EventType) -> &[EdgeId] {
        self.index
            .reevaluated_by
            .get(event_type)
            .map_or(&[], Vec::as_slice)
    }

    /// Computes a stable content hash of this graph's canonical form, for use
    /// as a pinned-version fingerprint. Indices are excluded: only the
    /// template data participates.
    ///
    /// # Errors
    ///
    /// Returns [`crate::core::hashing::HashError`] if canonicalization fails.
    pub fn canonical_hash(
        &self,
        algorithm: crate::core::hashing::HashAlgorithm,
    ) -> Result<crate::core::hashing::HashDigest, crate::core::hashing::HashError> {
        #[derive(Serialize)]
        struct Canonical<'a> {
            graph_id: &'a GraphId,
            version: GraphVersion,
            name: &'a str,
            nodes: &'a [Node],
            edges: &'a [Edge],
            entry_node_ids: &'a BTreeSet<NodeId>,
            terminal_node_ids: &'a BTreeSet<NodeId>,
        }
        crate::core::hashing::hash_canonical_json(
            algorithm,
            &Canonical {
                graph_id: &self.graph_id,
                version: self.version,
                name: &self.name,
                nodes: &self.nodes,
                edges: &self.edges,
                entry_node_ids: &self.entry_node_ids,
                terminal_node_ids: &self.terminal_node_ids,
            },
        )
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

    fn simple_node(id: &str) -> Node {
        Node {
            id: NodeId::new(id),
            name: id.to_string(),
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

    fn simple_edge(id: &str, source: &str, target: &str) -> Edge {
        Edge {
            id: EdgeId::new(id),
            name: id.to_string(),
            description: String::new(),
            source: NodeId::new(source),
            target: NodeId::new(target),
            guard: GuardConditions::default(),
            execution: ExecutionSemantics {
                kind: EdgeKind::Sequential,
                join_type: JoinType::All,
            },
            priority: Priority {
                weight: 0,
                rank: 0,
                exclusive: false,
            },
            event_triggers: EventTriggers::default(),
            compensation: None,
        }
    }

    #[test]
    fn rejects_dangling_edge() {
        let result = ProcessGraph::new(
            GraphId::new("g"),
            GraphVersion::new(1),
            "g",
            "",
            GraphStatus::Draft,
            vec![simple_node("a")],
            vec![simple_edge("a-b", "a", "b")],
            BTreeSet::from([NodeId::new("a")]),
            BTreeSet::new(),
            BTreeMap::new(),
        );
        assert!(matches!(
            result,
            Err(errors) if errors.iter().any(|e| matches!(e, GraphError::DanglingEdge { .. }))
        ));
    }

    #[test]
    fn rejects_unreachable_terminal() {
        let result = ProcessGraph::new(
            GraphId::new("g"),
            GraphVersion::new(1),
            "g",
            "",
            GraphStatus::Draft,
            vec![simple_node("a"), simple_node("b")],
            vec![],
            BTreeSet::from([NodeId::new("a")]),
            BTreeSet::from([NodeId::new("b")]),
            BTreeMap::new(),
        );
        assert!(matches!(
            result,
            Err(errors) if errors.contains(&GraphError::UnreachableTerminal(NodeId::new("b")))
        ));
    }

    #[test]
    fn builds_indices_on_success() {
        let graph = ProcessGraph::new(
            GraphId::new("g"),
            GraphVersion::new(1),
            "g",
            "",
            GraphStatus::Published,
            vec![simple_node("a"), simple_node("b")],
            vec![simple_edge("a-b", "a", "b")],
            BTreeSet::from([NodeId::new("a")]),
            BTreeSet::from([NodeId::new("b")]),
            BTreeMap::new(),
        )
        .expect("graph should validate");
        assert_eq!(graph.outbound_edges(&NodeId::new("a")).len(), 1);
        assert_eq!(graph.inbound_edges(&NodeId::new("b")).len(), 1);
        assert!(graph.find_node(&NodeId::new("a")).is_some());
    }

    #[test]
    fn exclusive_edge_without_weight_is_rejected() {
        let mut edge = simple_edge("a-b", "a", "b");
        edge.priority.exclusive = true;
        let result = ProcessGraph::new(
            GraphId::new("g"),
            GraphVersion::new(1),
            "g",
            "",
            GraphStatus::Draft,
            vec![simple_node("a"), simple_node("b")],
            vec![edge],
            BTreeSet::from([NodeId::new("a")]),
            BTreeSet::from([NodeId::new("b")]),
            BTreeMap::new(),
        );
        assert!(matches!(
            result,
            Err(errors) if errors.contains(&GraphError::ExclusiveEdgeMissingWeight(EdgeId::new("a-b")))
        ));
    }
}
