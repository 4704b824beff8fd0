// cpg-core/src/runtime/mod.rs
// ============================================================================
// Module: CPG Runtime
// Description: The evaluation and orchestration pipeline (C4-C15) built on
//              top of the core data shapes.
// Purpose: Wire node/edge evaluation, eligibility, navigation, governance,
//          compensation, branch coordination, tracing, and the event-driven
//          orchestrator into one runtime.
// Dependencies: crate::{core, interfaces, config}, tokio
// ============================================================================

//! ## Overview
//! Each submodule corresponds to one runtime component of the
//! orchestrator: node/edge evaluation feed the eligibility evaluator, whose
//! output the navigation decider turns into a decision, which the
//! Instance Orchestrator governs, dispatches, and compensates for a single
//! instance. The Process Orchestrator wraps that per-instance cycle with
//! the event queue and per-instance concurrency discipline that make the
//! whole thing a running service.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod compensation;
pub mod context_assembler;
pub mod coordinator;
pub mod edge_evaluator;
pub mod eligibility_evaluator;
pub mod event_bridge;
pub mod governor;
pub mod instance_orchestrator;
pub mod navigation;
pub mod node_evaluator;
pub mod process_orchestrator;
pub mod tracer;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use compensation::CompensationHandler;
pub use context_assembler::ContextAssembler;
pub use coordinator::ExecutionCoordinator;
pub use coordinator::JoinEvaluation;
pub use edge_evaluator::EdgeEvaluator;
pub use eligibility_evaluator::EligibilityEvaluator;
pub use event_bridge::EventBridge;
pub use governor::AllowAllGrants;
pub use governor::ExecutionGovernor;
pub use governor::GrantProvider;
pub use instance_orchestrator::ActionOutcome;
pub use instance_orchestrator::CycleReport;
pub use instance_orchestrator::InstanceOrchestrator;
pub use instance_orchestrator::OrchestratorError;
pub use navigation::NavigationDecider;
pub use node_evaluator::NodeEvaluator;
pub use process_orchestrator::ProcessOrchestrator;
pub use process_orchestrator::ProcessOrchestratorError;
pub use tracer::DecisionTracer;
