// cpg-testkit/src/lib.rs
// ============================================================================
// Module: CPG Testkit Library
// Description: Trivial, deterministic, in-process implementations of every
//              port `cpg-core` consumes.
// Purpose: Let tests (and this crate's own docs) exercise the orchestration
//          core end to end without a real FEEL engine, decision-table
//          service, policy service, transport, or database.
// Dependencies: cpg_core
// ============================================================================

//! ## Overview
//! `cpg-core` defines its expression, rule, policy, action-handler,
//! repository, and event-publisher collaborators purely as traits
//! ([`cpg_core::interfaces`]). This crate supplies one small, deterministic
//! implementation of each, so integration tests can build a real
//! [`cpg_core::ProcessOrchestrator`] and drive it through realistic
//! scenarios. None of these types are meant for production use: they hold
//! everything in memory and their expression grammar is intentionally
//! minimal.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod domain_source;
pub mod expression;
pub mod handlers;
pub mod policy;
pub mod publisher;
pub mod rules;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use domain_source::InMemoryDomainEventSource;
pub use expression::TrivialExpressionEvaluator;
pub use handlers::AlwaysCompleteHandler;
pub use handlers::AlwaysFailHandler;
pub use handlers::EchoHandler;
pub use handlers::InMemoryActionHandlerRegistry;
pub use handlers::WaitingHandler;
pub use handlers::BUILTIN_HANDLER_REFS;
pub use handlers::is_builtin_handler_ref;
pub use policy::TablePolicyEvaluator;
pub use publisher::InMemoryEventPublisher;
pub use rules::TableRuleEvaluator;
pub use store::InMemoryDecisionTraceRepository;
pub use store::InMemoryProcessGraphRepository;
pub use store::InMemoryProcessInstanceRepository;
pub use store::SharedDecisionTraceRepository;
pub use store::SharedProcessGraphRepository;
pub use store::SharedProcessInstanceRepository;
