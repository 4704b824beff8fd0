// cpg-testkit/src/publisher.rs
// ============================================================================
// Module: In-Memory Event Publisher
// Description: An EventPublisher that records every published ProcessEvent
//              in arrival order for test assertions.
// Purpose: Let tests assert "what did the orchestrator publish" without a
//          broker.
// Dependencies: cpg_core::interfaces, std::sync::Mutex
// ============================================================================

//! ## Overview
//! An `EventPublisher` that never leaves the process: every published event
//! is appended to an in-memory log a test can inspect afterward.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use cpg_core::ProcessEvent;
use cpg_core::interfaces::EventPublisher;
use cpg_core::interfaces::PublishError;

/// An [`EventPublisher`] that appends every published event to an
/// in-process log, for test assertions.
#[derive(Default)]
pub struct InMemoryEventPublisher {
    events: Mutex<Vec<ProcessEvent>>,
}

impl InMemoryEventPublisher {
    /// Builds a publisher with no events recorded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every event published so far, in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned; test-only code, and
    /// poisoning always indicates a broken test.
    #[allow(clippy::unwrap_used, reason = "test-only poisoned-lock is itself a bug")]
    #[must_use]
    pub fn events(&self) -> Vec<ProcessEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventPublisher for InMemoryEventPublisher {
    #[allow(clippy::unwrap_used, reason = "test-only poisoned-lock is itself a bug")]
    fn publish(&self, event: ProcessEvent) -> Result<(), PublishError> {
        self.events.lock().unwrap().push(event);
        Ok(())
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
    use cpg_core::InstanceId;
    use cpg_core::NodeId;
    use cpg_core::Timestamp;

    #[test]
    fn publish_appends_in_order() {
        let publisher = InMemoryEventPublisher::new();
        publisher
            .publish(ProcessEvent::NodeStarted {
                instance_id: InstanceId::new("inst-1"),
                node_id: NodeId::new("n1"),
                at: Timestamp::Logical(1),
            })
            .expect("publish should succeed");
        publisher
            .publish(ProcessEvent::NodeStarted {
                instance_id: InstanceId::new("inst-1"),
                node_id: NodeId::new("n2"),
                at: Timestamp::Logical(2),
            })
            .expect("publish should succeed");
        assert_eq!(publisher.events().len(), 2);
    }
}
