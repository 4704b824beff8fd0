// cpg-core/src/lib.rs
// ============================================================================
// Module: CPG Core Library
// Description: Public API surface for the Contextualized Process Graph
//              orchestration core.
// Purpose: Expose core types, ports, runtime components, and configuration.
// Dependencies: crate::{config, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The CPG core is a policy-enforcing decision engine for declaratively
//! defined business workflows: an immutable, versioned graph of governed
//! decision points (nodes) and guarded transitions (edges), navigated one
//! step per cycle for each running instance. It is backend-agnostic and
//! integrates through explicit ports (expression/rule/policy evaluators,
//! action handlers, persistence, event publication) rather than embedding
//! a specific expression engine, decision-table engine, transport, or
//! storage layer.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::GovernanceConfig;
pub use config::OrchestratorConfig;
pub use config::TracingConfig;

pub use core::*;

pub use interfaces::ActionContext;
pub use interfaces::ActionHandler;
pub use interfaces::ActionHandlerRegistry;
pub use interfaces::ActionResult;
pub use interfaces::DecisionTraceRepository;
pub use interfaces::DomainEventSource;
pub use interfaces::EventPublisher;
pub use interfaces::ExpressionEvaluator;
pub use interfaces::ExpressionOutcome;
pub use interfaces::PolicyEvaluator;
pub use interfaces::PolicyResult;
pub use interfaces::ProcessGraphRepository;
pub use interfaces::ProcessInstanceRepository;
pub use interfaces::PublishError;
pub use interfaces::RepositoryError;
pub use interfaces::RuleEvaluator;
pub use interfaces::RuleOutcome;

pub use runtime::ActionOutcome;
pub use runtime::AllowAllGrants;
pub use runtime::CompensationHandler;
pub use runtime::ContextAssembler;
pub use runtime::CycleReport;
pub use runtime::EdgeEvaluator;
pub use runtime::EligibilityEvaluator;
pub use runtime::EventBridge;
pub use runtime::ExecutionCoordinator;
pub use runtime::ExecutionGovernor;
pub use runtime::GrantProvider;
pub use runtime::InstanceOrchestrator;
pub use runtime::JoinEvaluation;
pub use runtime::NavigationDecider;
pub use runtime::NodeEvaluator;
pub use runtime::OrchestratorError as InstanceOrchestratorError;
pub use runtime::ProcessOrchestrator;
pub use runtime::ProcessOrchestratorError;
pub use runtime::DecisionTracer;
