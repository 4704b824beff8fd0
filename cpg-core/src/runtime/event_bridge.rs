// cpg-core/src/runtime/event_bridge.rs
// ============================================================================
// Module: Event Bridge & Domain Event Catalog (C15)
// Description: Translates low-level ProcessEvents into OrchestrationEvents
//              and serves the well-known domain event catalog.
// Purpose: Decouple what the core emits (ProcessEvent, through
//          EventPublisher) from what a downstream system, polled via
//          DomainEventSource, feeds back in as an OrchestrationEvent.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The bridge has two responsibilities: translating a `(EventType, Value)`
//! pair polled from a [`DomainEventSource`] into a
//! [`crate::core::OrchestrationEvent::DomainEvent`] ready for the Process
//! Orchestrator's queue, and serving a registry of
//! [`DomainEventDescriptor`]s so operators can discover what a graph's
//! `EventConfig` subscriptions/emissions actually mean. The catalog is a
//! plain in-memory map populated at construction; it is descriptive only
//! and never gates translation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::CorrelationId;
use crate::core::DomainEventDescriptor;
use crate::core::EventId;
use crate::core::EventType;
use crate::core::OrchestrationEvent;
use crate::interfaces::DomainEventSource;

/// Translates polled domain events into orchestration events and serves the
/// domain event catalog.
pub struct EventBridge {
    source: Arc<dyn DomainEventSource>,
    catalog: BTreeMap<EventType, DomainEventDescriptor>,
    sequence: std::sync::atomic::AtomicU64,
}

impl EventBridge {
    /// Builds a bridge over `source`, seeded with `catalog` entries.
    #[must_use]
    pub fn new(source: Arc<dyn DomainEventSource>, catalog: Vec<DomainEventDescriptor>) -> Self {
        Self {
            source,
            catalog: catalog.into_iter().map(|entry| (entry.event_type.clone(), entry)).collect(),
            sequence: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Polls the underlying source once, returning a translated
    /// [`OrchestrationEvent::DomainEvent`] if one was available.
    /// `correlation_id` is attached as-is; the bridge does not attempt to
    /// derive correlation from payload content.
    pub fn poll(&self, correlation_id: Option<CorrelationId>) -> Option<OrchestrationEvent> {
        let (event_type, payload) = self.source.poll()?;
        let ordinal = self.sequence.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Some(OrchestrationEvent::DomainEvent {
            correlation_id,
            event_type,
            event_id: EventId::new(format!("bridge:{ordinal}")),
            payload,
        })
    }

    /// Looks up the catalog entry for `event_type`, if registered.
    #[must_use]
    pub fn describe(&self, event_type: &EventType) -> Option<&DomainEventDescriptor> {
        self.catalog.get(event_type)
    }

    /// Returns every catalog entry, in event-type order.
    #[must_use]
    pub fn catalog(&self) -> Vec<&DomainEventDescriptor> {
        self.catalog.values().collect()
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
    use serde_json::json;
    use std::sync::Mutex;

    struct QueueSource {
        queue: Mutex<Vec<(EventType, serde_json::Value)>>,
    }

    impl DomainEventSource for QueueSource {
        fn poll(&self) -> Option<(EventType, serde_json::Value)> {
            self.queue.lock().unwrap_or_else(std::sync::PoisonError::into_inner).pop()
        }
    }

    #[test]
    fn translates_polled_event_into_domain_event() {
        let source = Arc::new(QueueSource {
            queue: Mutex::new(vec![(EventType::new("order.approved"), json!({"id": 1}))]),
        });
        let bridge = EventBridge::new(source, Vec::new());
        let event = bridge.poll(Some(CorrelationId::new("corr-1"))).expect("event should be present");
        assert!(matches!(
            &event,
            OrchestrationEvent::DomainEvent { event_type, correlation_id, .. }
                if *event_type == EventType::new("order.approved")
                    && *correlation_id == Some(CorrelationId::new("corr-1"))
        ));
    }

    #[test]
    fn catalog_lookup_returns_registered_descriptor() {
        let source = Arc::new(QueueSource { queue: Mutex::new(Vec::new()) });
        let bridge = EventBridge::new(
            source,
            vec![DomainEventDescriptor {
                event_type: EventType::new("order.approved"),
                description: "an order was approved".to_string(),
                payload_schema: json!({"type": "object"}),
            }],
        );
        assert!(bridge.describe(&EventType::new("order.approved")).is_some());
        assert!(bridge.describe(&EventType::new("unknown")).is_none());
    }
}
