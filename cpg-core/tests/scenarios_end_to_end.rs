// cpg-core/tests/scenarios_end_to_end.rs
// ============================================================================
// Module: End-to-End Orchestration Scenarios
// Description: Drives a real `InstanceOrchestrator` built from `cpg-testkit`'s
//              trivial ports over complete graphs, cycle by cycle.
// ============================================================================

//! ## Overview
//! Each test builds a small, real `ProcessGraph` and a real
//! `InstanceOrchestrator` wired over `cpg-testkit`'s in-process ports, then
//! drives it one `run_cycle` at a time exactly as a host would.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "test-only assertions")]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use cpg_core::Action;
use cpg_core::ActionConfig;
use cpg_core::ActionType;
use cpg_core::DecisionType;
use cpg_core::Edge;
use cpg_core::EdgeId;
use cpg_core::EdgeKind;
use cpg_core::EventConfig;
use cpg_core::EventTriggers;
use cpg_core::ExceptionRoutes;
use cpg_core::ExecutionContext;
use cpg_core::ExecutionSemantics;
use cpg_core::FeelExpression;
use cpg_core::GovernanceConfig;
use cpg_core::GraphId;
use cpg_core::GraphStatus;
use cpg_core::GraphVersion;
use cpg_core::GuardConditions;
use cpg_core::HandlerRef;
use cpg_core::HashAlgorithm;
use cpg_core::InstanceId;
use cpg_core::InstanceStatus;
use cpg_core::JoinType;
use cpg_core::Node;
use cpg_core::NodeId;
use cpg_core::Preconditions;
use cpg_core::PrincipalId;
use cpg_core::Priority;
use cpg_core::ProcessGraph;
use cpg_core::ProcessInstance;
use cpg_core::SelectionCriteria;
use cpg_core::Timestamp;
use cpg_core::TracingConfig;
use cpg_core::interfaces::ActionHandlerRegistry;
use cpg_core::interfaces::DecisionTraceRepository;
use cpg_core::interfaces::ExpressionEvaluator;
use cpg_core::interfaces::PolicyEvaluator;
use cpg_core::interfaces::RuleEvaluator;
use cpg_core::runtime::AllowAllGrants;
use cpg_core::runtime::CompensationHandler;
use cpg_core::runtime::EligibilityEvaluator;
use cpg_core::runtime::ExecutionGovernor;
use cpg_core::runtime::GrantProvider;
use cpg_core::runtime::InstanceOrchestrator;
use cpg_core::runtime::NodeEvaluator;
use cpg_core::runtime::tracer::DecisionTracer;
use cpg_testkit::InMemoryActionHandlerRegistry;
use cpg_testkit::InMemoryDecisionTraceRepository;
use cpg_testkit::TablePolicyEvaluator;
use cpg_testkit::TableRuleEvaluator;
use cpg_testkit::TrivialExpressionEvaluator;
use serde_json::json;

fn simple_node(id: &str, handler_ref: &str) -> Node {
    Node {
        id: NodeId::new(id),
        name: id.to_string(),
        description: String::new(),
        version: 1,
        preconditions: Preconditions::default(),
        policy_gates: Vec::new(),
        business_rules: Vec::new(),
        action: Action {
            action_type: ActionType::Decision,
            handler_ref: HandlerRef::new(handler_ref),
            config: ActionConfig::default(),
        },
        event_config: EventConfig::default(),
        exception_routes: ExceptionRoutes::default(),
    }
}

fn sequential_edge(id: &str, source: &str, target: &str, guard: GuardConditions, priority: Priority) -> Edge {
    Edge {
        id: EdgeId::new(id),
        name: id.to_string(),
        description: String::new(),
        source: NodeId::new(source),
        target: NodeId::new(target),
        guard,
        execution: ExecutionSemantics { kind: EdgeKind::Sequential, join_type: JoinType::All },
        priority,
        event_triggers: EventTriggers::default(),
        compensation: None,
    }
}

fn default_priority() -> Priority {
    Priority { weight: 0, rank: 0, exclusive: false }
}

/// Wires a real `InstanceOrchestrator` over `cpg-testkit`'s trivial ports,
/// with idempotency enforced and authorization/policy checks trivially
/// satisfied.
fn build_orchestrator() -> InstanceOrchestrator {
    let expressions: Arc<dyn ExpressionEvaluator> = Arc::new(TrivialExpressionEvaluator::new());
    let policies: Arc<dyn PolicyEvaluator> = Arc::new(TablePolicyEvaluator::new());
    let rules: Arc<dyn RuleEvaluator> = Arc::new(TableRuleEvaluator::new());
    let grants: Arc<dyn GrantProvider> = Arc::new(AllowAllGrants);
    let trace_repository: Arc<dyn DecisionTraceRepository> = Arc::new(InMemoryDecisionTraceRepository::new());
    let handlers: Arc<dyn ActionHandlerRegistry> = Arc::new(InMemoryActionHandlerRegistry::new());

    let node_evaluator = NodeEvaluator::new(expressions.clone(), policies.clone(), rules);
    let eligibility = EligibilityEvaluator::new(node_evaluator);
    let governor = ExecutionGovernor::new(GovernanceConfig::default(), HashAlgorithm::Sha256, grants, policies);
    let compensation = CompensationHandler::new(expressions);
    let tracer = DecisionTracer::new(trace_repository, TracingConfig::default());

    InstanceOrchestrator::new(eligibility, governor, compensation, tracer, handlers, HashAlgorithm::Sha256)
}

/// Happy path: an entry node completes, its outbound edge's guard becomes
/// true from the resulting context, and the terminal node becomes the sole
/// candidate on the next cycle. The terminal node's action is still
/// dispatched (`EXECUTION(done)`, per spec section 8 scenario 1); the
/// instance transitions to `Completed` right after that dispatch because
/// `done` is terminal and no node remains active (see DESIGN.md).
#[test]
fn happy_path_completes_through_a_guarded_edge() {
    let entry = simple_node("start", "always-complete");
    let terminal = simple_node("done", "always-complete");
    let edge = sequential_edge(
        "start-done",
        "start",
        "done",
        GuardConditions {
            context_conditions: vec![FeelExpression::new("offer.signed = true")],
            ..GuardConditions::default()
        },
        default_priority(),
    );

    let graph = ProcessGraph::new(
        GraphId::new("onboarding"),
        GraphVersion::new(1),
        "onboarding",
        "",
        GraphStatus::Published,
        vec![entry, terminal],
        vec![edge],
        BTreeSet::from([NodeId::new("start")]),
        BTreeSet::from([NodeId::new("done")]),
        BTreeMap::new(),
    )
    .expect("graph should validate");

    let mut client_context = BTreeMap::new();
    client_context.insert("offer".to_string(), json!({"signed": true}));
    let context = ExecutionContext { client_context, ..ExecutionContext::default() };

    let mut instance =
        ProcessInstance::start(InstanceId::new("inst-1"), GraphId::new("onboarding"), GraphVersion::new(1), None, Timestamp::Logical(0), context);

    let orchestrator = build_orchestrator();
    let principal = PrincipalId::new("svc-account");

    let first = orchestrator
        .run_cycle(&graph, &mut instance, principal.clone(), Timestamp::Logical(1))
        .expect("first cycle should run");
    assert_eq!(first.decision.decision_type, DecisionType::Proceed);
    assert_eq!(first.actions.len(), 1);
    assert_eq!(first.actions[0].node_id, NodeId::new("start"));
    assert!(first.actions[0].governance.approved());
    assert_eq!(instance.status(), InstanceStatus::Running);
    assert!(instance.has_executed_node(&NodeId::new("start")));

    let second = orchestrator
        .run_cycle(&graph, &mut instance, principal, Timestamp::Logical(2))
        .expect("second cycle should run");
    assert_eq!(second.decision.decision_type, DecisionType::Complete);
    assert_eq!(second.decision.selection_criteria, SelectionCriteria::SingleOption);
    assert_eq!(second.actions.len(), 1);
    assert_eq!(second.actions[0].node_id, NodeId::new("done"));
    assert!(second.actions[0].governance.approved());
    assert!(instance.has_executed_node(&NodeId::new("done")));
    assert_eq!(instance.status(), InstanceStatus::Completed);
    assert_eq!(instance.completed_at(), Some(Timestamp::Logical(2)));
    assert_eq!(first.trace_ids.len() + second.trace_ids.len(), 2, "one execution trace per dispatched node");
}

/// Exclusive routing: two outbound edges from a completed node are both
/// traversable; the exclusive, lower-weight edge wins and the
/// higher-weight edge is recorded as a considered alternative.
#[test]
fn exclusive_edge_preempts_higher_weight_alternative() {
    let n1 = simple_node("n1", "always-complete");
    let n2 = simple_node("n2", "always-complete");
    let n3 = simple_node("n3", "always-complete");

    let to_n2 = sequential_edge("n1-n2", "n1", "n2", GuardConditions::default(), Priority { weight: 100, rank: 0, exclusive: false });
    let mut to_n3 = sequential_edge("n1-n3", "n1", "n3", GuardConditions::default(), Priority { weight: 10, rank: 0, exclusive: true });
    to_n3.priority.exclusive = true;

    let graph = ProcessGraph::new(
        GraphId::new("routing"),
        GraphVersion::new(1),
        "routing",
        "",
        GraphStatus::Published,
        vec![n1, n2, n3],
        vec![to_n2, to_n3],
        BTreeSet::from([NodeId::new("n1")]),
        BTreeSet::from([NodeId::new("n2"), NodeId::new("n3")]),
        BTreeMap::new(),
    )
    .expect("graph should validate");

    let mut instance = ProcessInstance::start(
        InstanceId::new("inst-2"),
        GraphId::new("routing"),
        GraphVersion::new(1),
        None,
        Timestamp::Logical(0),
        ExecutionContext::default(),
    );

    let orchestrator = build_orchestrator();
    let principal = PrincipalId::new("svc-account");

    orchestrator
        .run_cycle(&graph, &mut instance, principal.clone(), Timestamp::Logical(1))
        .expect("n1 should execute");
    assert!(instance.has_executed_node(&NodeId::new("n1")));

    let routed = orchestrator
        .run_cycle(&graph, &mut instance, principal, Timestamp::Logical(2))
        .expect("routing cycle should run");
    // n3 is not the *only* candidate this cycle (n2 is traversable too), so the
    // exclusive edge preempts it rather than the sole-candidate-terminal path;
    // the decision type is Proceed, matching the Exclusive selection criteria.
    assert_eq!(routed.decision.decision_type, DecisionType::Proceed);
    assert_eq!(routed.decision.selection_criteria, SelectionCriteria::Exclusive);
    assert_eq!(routed.decision.selected_actions.len(), 1);
    assert_eq!(routed.decision.selected_actions[0].node_id, NodeId::new("n3"));
    assert!(
        routed
            .decision
            .alternatives_considered
            .iter()
            .any(|candidate| candidate.node_id == NodeId::new("n2")),
        "the higher-weight edge to n2 should be recorded as a considered alternative"
    );
    assert_eq!(routed.actions.len(), 1);
    assert_eq!(routed.actions[0].node_id, NodeId::new("n3"));
    assert!(instance.has_executed_node(&NodeId::new("n3")));
    assert_eq!(
        instance.status(),
        InstanceStatus::Completed,
        "n3 is terminal and no node remains active after it dispatches, so the instance completes"
    );
}
