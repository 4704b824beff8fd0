// cpg-testkit/src/handlers.rs
// ============================================================================
// Module: Builtin Action Handlers
// Description: A fixed set of trivial ActionHandler implementations plus an
//              in-memory registry binding them to (ActionType, HandlerRef).
// Purpose: Let tests dispatch real node actions without wiring a live
//          system-invocation client, human-task queue, or AI agent.
// Dependencies: cpg_core::interfaces, std::sync::Mutex
// ============================================================================

//! ## Overview
//! A short, fixed list of handler refs any test graph can reference by
//! name, plus an `InMemoryActionHandlerRegistry` a test can extend with
//! its own handlers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use cpg_core::ActionType;
use cpg_core::HandlerRef;
use cpg_core::interfaces::ActionContext;
use cpg_core::interfaces::ActionHandler;
use cpg_core::interfaces::ActionHandlerRegistry;
use cpg_core::interfaces::ActionResult;

/// The handler refs this crate ships an implementation for, independent of
/// `ActionType`.
pub const BUILTIN_HANDLER_REFS: [&str; 4] = ["echo", "always-complete", "always-fail", "sleep"];

/// Whether `handler_ref` names one of [`BUILTIN_HANDLER_REFS`].
#[must_use]
pub fn is_builtin_handler_ref(handler_ref: &str) -> bool {
    BUILTIN_HANDLER_REFS.contains(&handler_ref)
}

/// Completes immediately, echoing the dispatch's flattened context back as
/// its output.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoHandler;

impl ActionHandler for EchoHandler {
    fn execute(&self, ctx: &ActionContext) -> ActionResult {
        let output = serde_json::to_value(&ctx.context).ok();
        ActionResult::Completed { output }
    }
}

/// Completes immediately with no output, regardless of input.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysCompleteHandler;

impl ActionHandler for AlwaysCompleteHandler {
    fn execute(&self, _ctx: &ActionContext) -> ActionResult {
        ActionResult::Completed { output: None }
    }
}

/// Fails every dispatch with a fixed exception type, for exercising
/// compensation routes deterministically.
#[derive(Debug, Clone)]
pub struct AlwaysFailHandler {
    exception_type: String,
}

impl AlwaysFailHandler {
    /// Builds a handler that always fails with `exception_type`.
    #[must_use]
    pub fn new(exception_type: impl Into<String>) -> Self {
        Self { exception_type: exception_type.into() }
    }
}

impl Default for AlwaysFailHandler {
    fn default() -> Self {
        Self::new("handler-error")
    }
}

impl ActionHandler for AlwaysFailHandler {
    fn execute(&self, _ctx: &ActionContext) -> ActionResult {
        ActionResult::Failed {
            exception_type: self.exception_type.clone(),
            error: "always-fail handler invoked".to_string(),
        }
    }
}

/// Simulates an asynchronous action: returns `Waiting` on the first
/// dispatch and `Completed` on every subsequent dispatch for the same
/// `(instance_id, node_id)` pair. Stands in for the builtin `sleep`
/// handler ref, since a synchronous handler cannot literally block.
#[derive(Debug, Default)]
pub struct WaitingHandler {
    seen: Mutex<BTreeMap<(String, String), ()>>,
}

impl WaitingHandler {
    /// Builds a handler with no prior dispatches recorded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActionHandler for WaitingHandler {
    #[allow(clippy::unwrap_used, reason = "test-only poisoned-lock is itself a bug")]
    fn execute(&self, ctx: &ActionContext) -> ActionResult {
        let key = (ctx.instance_id.to_string(), ctx.node_id.to_string());
        let mut seen = self.seen.lock().unwrap();
        if seen.insert(key, ()).is_some() {
            ActionResult::Completed { output: None }
        } else {
            ActionResult::Waiting
        }
    }

    fn supports_async(&self) -> bool {
        true
    }
}

/// An in-memory [`ActionHandlerRegistry`] keyed by `(ActionType,
/// HandlerRef)`, preloaded with [`BUILTIN_HANDLER_REFS`] bound under every
/// [`ActionType`] and open to further registrations.
pub struct InMemoryActionHandlerRegistry {
    handlers: Mutex<BTreeMap<(ActionType, HandlerRef), Arc<dyn ActionHandler>>>,
}

impl InMemoryActionHandlerRegistry {
    /// Builds a registry with the builtin handler refs bound under every
    /// [`ActionType`].
    #[must_use]
    pub fn new() -> Self {
        let registry = Self { handlers: Mutex::new(BTreeMap::new()) };
        for action_type in [
            ActionType::SystemInvocation,
            ActionType::HumanTask,
            ActionType::AgentAssisted,
            ActionType::Decision,
            ActionType::Notification,
            ActionType::Wait,
        ] {
            registry.register(action_type, HandlerRef::new("echo"), Arc::new(EchoHandler));
            registry.register(action_type, HandlerRef::new("always-complete"), Arc::new(AlwaysCompleteHandler));
            registry.register(action_type, HandlerRef::new("always-fail"), Arc::new(AlwaysFailHandler::default()));
            registry.register(action_type, HandlerRef::new("sleep"), Arc::new(WaitingHandler::new()));
        }
        registry
    }

    /// Binds (or replaces) the handler for `(action_type, handler_ref)`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned; test-only code, and
    /// poisoning always indicates a broken test.
    #[allow(clippy::unwrap_used, reason = "test-only poisoned-lock is itself a bug")]
    pub fn register(&self, action_type: ActionType, handler_ref: HandlerRef, handler: Arc<dyn ActionHandler>) {
        self.handlers.lock().unwrap().insert((action_type, handler_ref), handler);
    }
}

impl Default for InMemoryActionHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionHandlerRegistry for InMemoryActionHandlerRegistry {
    #[allow(clippy::unwrap_used, reason = "test-only poisoned-lock is itself a bug")]
    fn resolve(&self, action_type: ActionType, handler_ref: &HandlerRef) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.lock().unwrap().get(&(action_type, handler_ref.clone())).cloned()
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

    fn ctx() -> ActionContext {
        ActionContext {
            instance_id: cpg_core::InstanceId::new("inst-1"),
            node_id: cpg_core::NodeId::new("n1"),
            execution_count: 1,
            config: cpg_core::ActionConfig::default(),
            context: BTreeMap::new(),
            principal: cpg_core::PrincipalId::new("p1"),
            correlation_id: None,
        }
    }

    #[test]
    fn registry_resolves_builtin_handlers() {
        let registry = InMemoryActionHandlerRegistry::new();
        let handler = registry.resolve(ActionType::SystemInvocation, &HandlerRef::new("echo"));
        assert!(handler.is_some());
    }

    #[test]
    fn unregistered_handler_ref_resolves_to_none() {
        let registry = InMemoryActionHandlerRegistry::new();
        let handler = registry.resolve(ActionType::SystemInvocation, &HandlerRef::new("not-bound"));
        assert!(handler.is_none());
    }

    #[test]
    fn waiting_handler_completes_on_second_dispatch() {
        let handler = WaitingHandler::new();
        let first = handler.execute(&ctx());
        assert!(matches!(first, ActionResult::Waiting));
        let second = handler.execute(&ctx());
        assert!(matches!(second, ActionResult::Completed { .. }));
    }

    #[test]
    fn always_fail_handler_reports_configured_exception_type() {
        let handler = AlwaysFailHandler::new("quota-exceeded");
        let result = handler.execute(&ctx());
        match result {
            ActionResult::Failed { exception_type, .. } => assert_eq!(exception_type, "quota-exceeded"),
            _ => panic!("expected Failed"),
        }
    }
}
