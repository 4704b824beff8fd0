// cpg-testkit/src/domain_source.rs
// ============================================================================
// Module: In-Memory Domain Event Source
// Description: A DomainEventSource backed by an in-process FIFO queue.
// Purpose: Let tests push domain events into the Event Bridge (C15) without
//          a real broker consumer or webhook adapter.
// Dependencies: cpg_core::interfaces, std::sync::Mutex, std::collections::VecDeque
// ============================================================================

//! ## Overview
//! A `DomainEventSource` that hands out whatever events a test pushed onto it,
//! in the order they were pushed, with no real broker or webhook behind it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Mutex;

use cpg_core::EventType;
use cpg_core::interfaces::DomainEventSource;
use serde_json::Value;

/// A [`DomainEventSource`] backed by an in-process FIFO queue a test can
/// push onto directly.
#[derive(Default)]
pub struct InMemoryDomainEventSource {
    queue: Mutex<VecDeque<(EventType, Value)>>,
}

impl InMemoryDomainEventSource {
    /// Builds a source with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues an event to be returned by a future `poll`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned; test-only code, and
    /// poisoning always indicates a broken test.
    #[allow(clippy::unwrap_used, reason = "test-only poisoned-lock is itself a bug")]
    pub fn push(&self, event_type: EventType, payload: Value) {
        self.queue.lock().unwrap().push_back((event_type, payload));
    }
}

impl DomainEventSource for InMemoryDomainEventSource {
    #[allow(clippy::unwrap_used, reason = "test-only poisoned-lock is itself a bug")]
    fn poll(&self) -> Option<(EventType, Value)> {
        self.queue.lock().unwrap().pop_front()
    }
}
