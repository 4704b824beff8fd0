// cpg-core/src/core/mod.rs
// ============================================================================
// Module: CPG Core Types
// Description: Canonical ProcessGraph/ProcessInstance schema and the data
//              shapes every component boundary (C1-C15) exchanges.
// Purpose: Provide stable, serializable types for process graphs, running
//          instances, and decision traces.
// Dependencies: serde, serde_json, sha2, serde_jcs, thiserror
// ============================================================================

//! ## Overview
//! CPG core types define the process graph template, running instance
//! state, evaluation/decision data shapes, governance and compensation
//! records, and the decision trace. These types are the canonical source of
//! truth for the runtime logic in `crate::runtime` and for any derived API
//! surface (HTTP, MCP, or SDKs) outside this crate.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod branch;
pub mod compensation;
pub mod context;
pub mod decision;
pub mod eligibility;
pub mod events;
pub mod governance;
pub mod graph;
pub mod hashing;
pub mod identifiers;
pub mod instance;
pub mod summary;
pub mod time;
pub mod trace;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use branch::BranchStatus;
pub use branch::ParallelBranch;
pub use compensation::CompensationAction;
pub use context::RuntimeContext;
pub use decision::DecisionType;
pub use decision::NavigationDecision;
pub use decision::SelectionCriteria;
pub use eligibility::CandidateAction;
pub use eligibility::EdgeEvaluation;
pub use eligibility::EligibleSpace;
pub use eligibility::NodeEvaluation;
pub use eligibility::PolicyCheckResult;
pub use eligibility::RuleCheckResult;
pub use events::DomainEventDescriptor;
pub use events::OrchestrationEvent;
pub use events::ProcessEvent;
pub use governance::AuthorizationOutcome;
pub use governance::GovernanceResult;
pub use governance::IdempotencyOutcome;
pub use governance::PolicyGateOutcome;
pub use graph::Action;
pub use graph::ActionConfig;
pub use graph::ActionType;
pub use graph::BusinessRuleRef;
pub use graph::CompensationSemantics;
pub use graph::CompensationStrategy;
pub use graph::Edge;
pub use graph::EdgeCompensationStrategy;
pub use graph::EdgeKind;
pub use graph::EmissionTiming;
pub use graph::EventCondition;
pub use graph::EventConfig;
pub use graph::EventEmission;
pub use graph::EventSubscription;
pub use graph::EventTriggers;
pub use graph::ExceptionRoute;
pub use graph::ExceptionRoutes;
pub use graph::ExecutionSemantics;
pub use graph::FeelExpression;
pub use graph::GraphError;
pub use graph::GraphStatus;
pub use graph::GuardConditions;
pub use graph::JoinType;
pub use graph::Node;
pub use graph::PolicyGateRef;
pub use graph::PolicyOutcome;
pub use graph::Preconditions;
pub use graph::Priority;
pub use graph::ProcessGraph;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::BranchId;
pub use identifiers::CorrelationId;
pub use identifiers::EdgeId;
pub use identifiers::EventId;
pub use identifiers::EventType;
pub use identifiers::ExceptionType;
pub use identifiers::GraphId;
pub use identifiers::GraphVersion;
pub use identifiers::HandlerRef;
pub use identifiers::InstanceId;
pub use identifiers::NodeId;
pub use identifiers::PolicyGateId;
pub use identifiers::PrincipalId;
pub use identifiers::RuleId;
pub use identifiers::TraceId;
pub use instance::ExecutionContext;
pub use instance::InstanceError;
pub use instance::InstanceStatus;
pub use instance::NodeExecution;
pub use instance::NodeExecutionStatus;
pub use instance::Obligation;
pub use instance::ProcessInstance;
pub use instance::ReceivedEvent;
pub use summary::SafeSummary;
pub use time::Timestamp;
pub use trace::DecisionTrace;
pub use trace::ExecutionOutcome;
pub use trace::TraceType;
