// cpg-core/src/runtime/instance_orchestrator.rs
// ============================================================================
// Module: Instance Orchestrator (C13)
// Description: Runs one evaluate -> decide -> govern -> execute -> trace
//              cycle for a single ProcessInstance.
// Purpose: The single place that wires C6-C12 together for one instance.
// Dependencies: crate::core, crate::interfaces, crate::runtime::*
// ============================================================================

//! ## Overview
//! One call to [`InstanceOrchestrator::run_cycle`] is one orchestration
//! cycle: assemble context (C8), compute the eligible space (C9), decide
//! navigation (C10), and, for every selected candidate action, govern it
//! (C11) and, if approved, dispatch it through the action handler registry,
//! tracking parallel branches (C6) and compensating on failure (C7). Every
//! branch of this pipeline is traced (C12) before returning. The instance
//! is mutated in place; persisting it is the caller's responsibility.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::CandidateAction;
use crate::core::DecisionType;
use crate::core::EligibleSpace;
use crate::core::ExecutionOutcome;
use crate::core::GovernanceResult;
use crate::core::HashAlgorithm;
use crate::core::InstanceError;
use crate::core::NavigationDecision;
use crate::core::NodeExecutionStatus;
use crate::core::NodeId;
use crate::core::PrincipalId;
use crate::core::ProcessGraph;
use crate::core::ProcessInstance;
use crate::core::SafeSummary;
use crate::core::Timestamp;
use crate::core::TraceType;
use crate::interfaces::ActionContext;
use crate::interfaces::ActionHandlerRegistry;
use crate::interfaces::ActionResult;
use crate::interfaces::RepositoryError;
use crate::runtime::compensation::CompensationHandler;
use crate::runtime::context_assembler::ContextAssembler;
use crate::runtime::coordinator::ExecutionCoordinator;
use crate::runtime::eligibility_evaluator::EligibilityEvaluator;
use crate::runtime::governor::ExecutionGovernor;
use crate::runtime::navigation::NavigationDecider;
use crate::runtime::tracer::DecisionTracer;

/// Errors surfaced by one orchestration cycle.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The instance rejected a state transition the cycle attempted.
    #[error("instance state error: {0}")]
    Instance(#[from] InstanceError),
    /// A persistence port failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    /// The navigation decision referenced a node absent from the graph.
    #[error("node {0} not found in graph")]
    UnknownNode(NodeId),
    /// Canonicalizing the runtime context for hashing failed.
    #[error("context hashing failed: {0}")]
    Hash(#[from] crate::core::HashError),
}

/// The result of dispatching one selected candidate action.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// The node the action targeted.
    pub node_id: NodeId,
    /// Governance result for this action.
    pub governance: GovernanceResult,
    /// The execution outcome, present only when governance approved
    /// dispatch.
    pub execution: Option<ExecutionOutcome>,
}

/// Everything produced by one orchestration cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// The navigation decision reached this cycle.
    pub decision: NavigationDecision,
    /// Per-action governance/execution outcomes, empty only for `Wait`.
    pub actions: Vec<ActionOutcome>,
    /// Every trace appended this cycle.
    pub trace_ids: Vec<crate::core::TraceId>,
}

/// Runs one orchestration cycle for a single instance.
pub struct InstanceOrchestrator {
    eligibility: EligibilityEvaluator,
    governor: ExecutionGovernor,
    compensation: CompensationHandler,
    tracer: DecisionTracer,
    handlers: Arc<dyn ActionHandlerRegistry>,
    hash_algorithm: HashAlgorithm,
}

impl InstanceOrchestrator {
    /// Builds an instance orchestrator from its wired dependencies.
    #[must_use]
    pub fn new(
        eligibility: EligibilityEvaluator,
        governor: ExecutionGovernor,
        compensation: CompensationHandler,
        tracer: DecisionTracer,
        handlers: Arc<dyn ActionHandlerRegistry>,
        hash_algorithm: HashAlgorithm,
    ) -> Self {
        Self {
            eligibility,
            governor,
            compensation,
            tracer,
            handlers,
            hash_algorithm,
        }
    }

    /// Runs one cycle against `instance`, mutating it in place.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] if an instance transition or trace
    /// append fails.
    pub fn run_cycle(
        &self,
        graph: &ProcessGraph,
        instance: &mut ProcessInstance,
        principal: PrincipalId,
        now: Timestamp,
    ) -> Result<CycleReport, OrchestratorError> {
        let context = ContextAssembler::assemble(instance, principal.clone(), now);
        let space = self.eligibility.evaluate(graph, instance, &context, now);
        let decision = NavigationDecider::decide(graph, &space, now);

        match decision.decision_type {
            DecisionType::Wait => {
                let trace = self.tracer.record(
                    instance.id().clone(),
                    TraceType::Wait,
                    Self::summarize(&space, "waiting"),
                    Some(space),
                    Some(decision.clone()),
                    Vec::new(),
                    None,
                    now,
                )?;
                Ok(CycleReport { decision, actions: Vec::new(), trace_ids: vec![trace.id] })
            }
            DecisionType::Proceed | DecisionType::Blocked | DecisionType::Complete => {
                let mut actions = Vec::with_capacity(decision.selected_actions.len());
                let mut trace_ids = Vec::with_capacity(decision.selected_actions.len());
                for candidate in decision.selected_actions.clone() {
                    let (outcome, trace_id) =
                        self.dispatch_candidate(graph, instance, &context, &candidate, &principal, &decision, now)?;
                    let node_finishes_instance = matches!(outcome.execution, Some(ExecutionOutcome::Completed { .. }))
                        && graph.is_terminal(&candidate.node_id)
                        && instance.active_node_ids().is_empty();
                    actions.push(outcome);
                    trace_ids.push(trace_id);
                    if node_finishes_instance {
                        instance.complete(now)?;
                    }
                }
                Ok(CycleReport { decision, actions, trace_ids })
            }
        }
    }

    #[allow(clippy::too_many_arguments, reason = "each argument is independently required by the pipeline stage")]
    fn dispatch_candidate(
        &self,
        graph: &ProcessGraph,
        instance: &mut ProcessInstance,
        context: &crate::core::RuntimeContext,
        candidate: &CandidateAction,
        principal: &PrincipalId,
        decision: &NavigationDecision,
        now: Timestamp,
    ) -> Result<(ActionOutcome, crate::core::TraceId), OrchestratorError> {
        let node = graph
            .find_node(&candidate.node_id)
            .ok_or_else(|| OrchestratorError::UnknownNode(candidate.node_id.clone()))?;
        let flattened = context.flattened();
        let context_hash = context.content_hash(self.hash_algorithm)?;

        let execution_count = instance.execution_count(&node.id) + 1;
        let governance = self
            .governor
            .evaluate(instance.id(), node, execution_count, principal, &context_hash, &flattened);

        if !governance.approved() {
            let trace = self.tracer.record(
                instance.id().clone(),
                TraceType::Blocked,
                SafeSummary::new("governance_denied", governance.rejection_reasons()),
                None,
                Some(decision.clone()),
                vec![governance.clone()],
                None,
                now,
            )?;
            return Ok((
                ActionOutcome { node_id: node.id.clone(), governance, execution: None },
                trace.id,
            ));
        }

        self.governor.record_dispatch(&governance.idempotency);

        if let Some(edge_id) = candidate.incoming_edge_id.as_ref() {
            if let Some(edge) = graph.find_edge(edge_id) {
                if edge.execution.kind == crate::core::EdgeKind::Parallel {
                    ExecutionCoordinator::activate_branch(instance, edge.id.clone(), node.id.clone())?;
                }
                instance.consume_pending_edge(edge_id).ok();
            }
        } else {
            instance.consume_pending_node(&node.id).ok();
        }

        instance.start_node_execution(node.id.clone(), now)?;

        let node_id = node.id.clone();
        let action_type = node.action.action_type;
        let handler_ref = node.action.handler_ref.clone();
        let action_config = node.action.config.clone();
        let handler = self.handlers.resolve(action_type, &handler_ref);

        let outcome = self.run_with_compensation(
            graph,
            instance,
            &node_id,
            &action_config,
            flattened,
            principal,
            execution_count,
            handler,
            &handler_ref,
            now,
        )?;

        let trace = self.tracer.record(
            instance.id().clone(),
            TraceType::Execution,
            SafeSummary::new("executed", Vec::new()),
            None,
            Some(decision.clone()),
            vec![governance.clone()],
            Some(outcome.clone()),
            now,
        )?;

        Ok((
            ActionOutcome { node_id: node.id.clone(), governance, execution: Some(outcome) },
            trace.id,
        ))
    }

    /// Dispatches `handler` for `node_id` and, on failure, asks the
    /// Compensation Handler what to do and acts on it: a `RETRY` verdict
    /// re-invokes the handler inline (bounded by the handler's own retry
    /// ceiling, which the Compensation Handler enforces before ever
    /// returning `RETRY` again), `SKIP` marks the execution skipped,
    /// `ROLLBACK`/`ALTERNATE`/`ESCALATE` force their target edge/node onto
    /// next cycle's candidate space, and `FAIL` fails the whole instance.
    #[allow(clippy::too_many_arguments, reason = "each argument is independently required by the retry loop")]
    fn run_with_compensation(
        &self,
        graph: &ProcessGraph,
        instance: &mut ProcessInstance,
        node_id: &NodeId,
        action_config: &crate::core::ActionConfig,
        flattened: std::collections::BTreeMap<String, serde_json::Value>,
        principal: &PrincipalId,
        mut execution_count: u32,
        handler: Option<Arc<dyn crate::interfaces::ActionHandler>>,
        handler_ref: &crate::core::HandlerRef,
        now: Timestamp,
    ) -> Result<ExecutionOutcome, OrchestratorError> {
        let mut result = handler.as_deref().map_or_else(
            || ActionResult::Failed {
                exception_type: "HANDLER_NOT_FOUND".to_string(),
                error: format!("no handler registered for {handler_ref}"),
            },
            |handler| {
                handler.execute(&ActionContext {
                    instance_id: instance.id().clone(),
                    node_id: node_id.clone(),
                    execution_count,
                    config: action_config.clone(),
                    context: flattened.clone(),
                    principal: principal.clone(),
                    correlation_id: instance.correlation_id().cloned(),
                })
            },
        );

        loop {
            match result {
                ActionResult::Completed { output } => {
                    instance.complete_node_execution(node_id, output.clone(), now)?;
                    self.compensation.clear(instance.id(), node_id);
                    let mut execution_context = instance.context().clone();
                    if let Some(value) = output.clone() {
                        execution_context.accumulated_state.insert(node_id.to_string(), value);
                    }
                    instance.update_context(execution_context)?;
                    return Ok(ExecutionOutcome::Completed { node_id: node_id.clone(), output });
                }
                ActionResult::Pending => {
                    instance.mark_node_suspended(node_id, NodeExecutionStatus::Pending)?;
                    return Ok(ExecutionOutcome::Suspended { node_id: node_id.clone() });
                }
                ActionResult::Waiting => {
                    instance.mark_node_suspended(node_id, NodeExecutionStatus::Waiting)?;
                    return Ok(ExecutionOutcome::Suspended { node_id: node_id.clone() });
                }
                ActionResult::Failed { exception_type, error } => {
                    instance.fail_node_execution(node_id, error.clone(), now)?;
                    let node = graph
                        .find_node(node_id)
                        .ok_or_else(|| OrchestratorError::UnknownNode(node_id.clone()))?;
                    let compensation = self.compensation.decide(
                        graph,
                        instance.id(),
                        node,
                        &crate::core::ExceptionType::new(exception_type),
                        &instance.context().accumulated_state.clone(),
                    );

                    match compensation.strategy {
                        crate::core::CompensationStrategy::Retry => {
                            if let Some(handler) = handler.as_deref() {
                                execution_count = instance.start_node_execution(node_id.clone(), now)?;
                                result = handler.execute(&ActionContext {
                                    instance_id: instance.id().clone(),
                                    node_id: node_id.clone(),
                                    execution_count,
                                    config: action_config.clone(),
                                    context: flattened.clone(),
                                    principal: principal.clone(),
                                    correlation_id: instance.correlation_id().cloned(),
                                });
                                continue;
                            }
                            instance.fail(now)?;
                            return Ok(ExecutionOutcome::Failed { node_id: node_id.clone(), error, compensation });
                        }
                        crate::core::CompensationStrategy::Skip => {
                            instance.skip_node_execution(node_id, now)?;
                            return Ok(ExecutionOutcome::Failed { node_id: node_id.clone(), error, compensation });
                        }
                        crate::core::CompensationStrategy::Fail => {
                            instance.fail(now)?;
                            return Ok(ExecutionOutcome::Failed { node_id: node_id.clone(), error, compensation });
                        }
                        crate::core::CompensationStrategy::Rollback
                        | crate::core::CompensationStrategy::Alternate
                        | crate::core::CompensationStrategy::Escalate => {
                            if let Some(edge_id) = compensation.target_edge_id.clone() {
                                instance.activate_pending_edge(edge_id)?;
                            }
                            if let Some(target_node_id) = compensation.target_node_id.clone() {
                                instance.activate_pending_node(target_node_id)?;
                            }
                            return Ok(ExecutionOutcome::Failed { node_id: node_id.clone(), error, compensation });
                        }
                    }
                }
            }
        }
    }

    fn summarize(space: &EligibleSpace, status: &str) -> SafeSummary {
        let unmet: Vec<String> = space
            .eligible_nodes
            .iter()
            .filter_map(|evaluation| evaluation.blocked_reason.clone())
            .collect();
        SafeSummary::new(status, unmet)
    }
}
