// cpg-core/src/core/events.rs
// ============================================================================
// Module: Orchestration Event Data Shapes (C14, C15)
// Description: OrchestrationEvent (queue items), ProcessEvent (emissions),
//              and the domain event catalog entry shape.
// Purpose: Distinguish what arrives at the Process Orchestrator's queue from
//          what the core emits outward through EventPublisher.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

//! ## Overview
//! `OrchestrationEvent` is the tagged union the Process Orchestrator's (C14)
//! bounded queue carries. `ProcessEvent` is what the core publishes outward
//! (through [`crate::interfaces::EventPublisher`]) when a node starts,
//! completes, emits a domain event, or an instance reaches a terminal
//! status. The Event Bridge (C15, `runtime::event_bridge`) translates
//! between the two and serves the domain event catalog.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::EventId;
use crate::core::identifiers::EventType;
use crate::core::identifiers::InstanceId;
use crate::core::identifiers::NodeId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Orchestration Events (Inbound)
// ============================================================================

/// One occurrence enqueued on the Process Orchestrator's event queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrchestrationEvent {
    /// Context data changed externally (e.g. an upstream system pushed an
    /// update).
    DataChange {
        /// Correlates to one or more instances; see C14 correlation rule.
        correlation_id: Option<CorrelationId>,
        /// The changed field path.
        path: String,
        /// The new value.
        value: Value,
    },
    /// A human or system approval decision was recorded.
    Approval {
        /// Correlates to one or more instances.
        correlation_id: Option<CorrelationId>,
        /// The node the approval targets.
        node_id: Option<NodeId>,
        /// Whether the approval was granted.
        approved: bool,
    },
    /// An out-of-band failure was reported for an in-flight action.
    Failure {
        /// Correlates to one or more instances.
        correlation_id: Option<CorrelationId>,
        /// The node that failed.
        node_id: NodeId,
        /// The exception type, matched against `ExceptionRoutes`.
        exception_type: String,
        /// Error detail.
        error: String,
    },
    /// A scheduled SLA/timer fired.
    TimerExpired {
        /// Correlates to one or more instances.
        correlation_id: Option<CorrelationId>,
        /// The node whose timer fired.
        node_id: Option<NodeId>,
    },
    /// A policy definition changed, forcing a re-check.
    PolicyUpdate {
        /// Correlates to one or more instances.
        correlation_id: Option<CorrelationId>,
    },
    /// An async action handler reported completion.
    NodeCompleted {
        /// The instance the node belongs to.
        instance_id: InstanceId,
        /// The node that completed.
        node_id: NodeId,
        /// Result payload.
        output: Option<Value>,
    },
    /// An async action handler reported failure.
    NodeFailed {
        /// The instance the node belongs to.
        instance_id: InstanceId,
        /// The node that failed.
        node_id: NodeId,
        /// Exception type, matched against `ExceptionRoutes`.
        exception_type: String,
        /// Error detail.
        error: String,
    },
    /// A domain event arrived from an external system via the Event Bridge.
    DomainEvent {
        /// Correlates to one or more instances.
        correlation_id: Option<CorrelationId>,
        /// The domain event type.
        event_type: EventType,
        /// Identity of this occurrence.
        event_id: EventId,
        /// Event payload.
        payload: Value,
    },
}

impl OrchestrationEvent {
    /// The correlation id carried by this event, if any.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<&CorrelationId> {
        match self {
            Self::DataChange { correlation_id, .. }
            | Self::Approval { correlation_id, .. }
            | Self::Failure { correlation_id, .. }
            | Self::TimerExpired { correlation_id, .. }
            | Self::PolicyUpdate { correlation_id }
            | Self::DomainEvent { correlation_id, .. } => correlation_id.as_ref(),
            Self::NodeCompleted { .. } | Self::NodeFailed { .. } => None,
        }
    }

    /// The instance id this event targets directly, when it names one
    /// without needing correlation lookup.
    #[must_use]
    pub const fn direct_instance_id(&self) -> Option<&InstanceId> {
        match self {
            Self::NodeCompleted { instance_id, .. } | Self::NodeFailed { instance_id, .. } => {
                Some(instance_id)
            }
            _ => None,
        }
    }

    /// The domain event type this event carries, when it is a
    /// [`Self::DomainEvent`].
    #[must_use]
    pub const fn domain_event_type(&self) -> Option<&EventType> {
        match self {
            Self::DomainEvent { event_type, .. } => Some(event_type),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Process Events (Outbound)
// ============================================================================

/// A low-level process event the core publishes out through
/// [`crate::interfaces::EventPublisher`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessEvent {
    /// A node's action started.
    NodeStarted {
        /// The instance.
        instance_id: InstanceId,
        /// The node.
        node_id: NodeId,
        /// When this happened.
        at: Timestamp,
    },
    /// A node's action completed.
    NodeCompleted {
        /// The instance.
        instance_id: InstanceId,
        /// The node.
        node_id: NodeId,
        /// Result payload.
        output: Option<Value>,
        /// When this happened.
        at: Timestamp,
    },
    /// A node's `EventConfig` emission fired.
    DomainEventEmitted {
        /// The instance.
        instance_id: InstanceId,
        /// The domain event type emitted.
        event_type: EventType,
        /// Emitted payload.
        payload: Option<Value>,
        /// When this happened.
        at: Timestamp,
    },
    /// An instance reached `Completed`.
    InstanceCompleted {
        /// The instance.
        instance_id: InstanceId,
        /// When this happened.
        at: Timestamp,
    },
    /// An instance reached `Failed`.
    InstanceFailed {
        /// The instance.
        instance_id: InstanceId,
        /// Failure reason.
        reason: String,
        /// When this happened.
        at: Timestamp,
    },
}

// ============================================================================
// SECTION: Domain Event Catalog (C15 Data Shape)
// ============================================================================

/// A catalog entry describing one well-known domain event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEventDescriptor {
    /// The event type this entry describes.
    pub event_type: EventType,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema (as a raw `Value`) for the expected payload shape.
    pub payload_schema: Value,
}
