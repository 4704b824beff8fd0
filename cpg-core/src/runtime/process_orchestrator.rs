// cpg-core/src/runtime/process_orchestrator.rs
// ============================================================================
// Module: Process Orchestrator (C14)
// Description: Owns the bounded event queue and per-instance concurrency
//              discipline, dispatching events to the Instance Orchestrator.
// Purpose: The top-level runtime entry point: start/signal/suspend/resume/
//          cancel/status/step plus a periodic tick for timers.
// Dependencies: crate::core, crate::interfaces, crate::runtime::*, tokio
// ============================================================================

//! ## Overview
//! Every instance is guarded by its own `tokio::sync::Mutex`, created
//! lazily and kept in a registry keyed by `InstanceId`; two cycles for
//! different instances run fully concurrently, while two cycles for the
//! *same* instance serialize. Inbound occurrences arrive as
//! [`crate::core::OrchestrationEvent`]s on a bounded `tokio::sync::mpsc`
//! channel sized by [`crate::config::OrchestratorConfig::event_queue_capacity`];
//! `signal` uses `try_send` and reports [`ProcessOrchestratorError::QueueFull`]
//! rather than blocking the caller, the documented backpressure behavior.
//!
//! Correlation rule: an event naming a `direct_instance_id` (the async
//! resolution events) targets only that instance. An event carrying a
//! `correlation_id` targets every live instance whose own correlation id
//! matches. An event with neither is broadcast to every live instance, the
//! default chosen for environment-wide signals like `POLICY_UPDATE` (see
//! DESIGN.md).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::mpsc;

use crate::config::OrchestratorConfig;
use crate::core::CorrelationId;
use crate::core::EventId;
use crate::core::EventType;
use crate::core::ExecutionContext;
use crate::core::ExecutionOutcome;
use crate::core::GraphId;
use crate::core::InstanceId;
use crate::core::InstanceStatus;
use crate::core::OrchestrationEvent;
use crate::core::PrincipalId;
use crate::core::ProcessInstance;
use crate::core::ReceivedEvent;
use crate::core::Timestamp;
use crate::core::ProcessEvent;
use crate::interfaces::EventPublisher;
use crate::interfaces::ProcessGraphRepository;
use crate::interfaces::ProcessInstanceRepository;
use crate::interfaces::PublishError;
use crate::interfaces::RepositoryError;
use crate::runtime::instance_orchestrator::CycleReport;
use crate::runtime::instance_orchestrator::InstanceOrchestrator;
use crate::runtime::instance_orchestrator::OrchestratorError;

/// Errors surfaced by the process orchestrator's lifecycle operations.
#[derive(Debug, Error)]
pub enum ProcessOrchestratorError {
    /// The event queue was at capacity.
    #[error("event queue is full")]
    QueueFull,
    /// No graph matched the requested `(graphId, version)`.
    #[error("graph {0} not found")]
    GraphNotFound(GraphId),
    /// No instance matched the requested id.
    #[error("instance {0} not found")]
    InstanceNotFound(InstanceId),
    /// One orchestration cycle failed.
    #[error(transparent)]
    Cycle(#[from] OrchestratorError),
    /// A persistence port failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// Publishing an outbound process event failed.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Owns the event queue and per-instance locks; the single runtime entry
/// point for starting, signalling, and stepping instances.
pub struct ProcessOrchestrator {
    graphs: Arc<dyn ProcessGraphRepository>,
    instances: Arc<dyn ProcessInstanceRepository>,
    instance_orchestrator: Arc<InstanceOrchestrator>,
    publisher: Arc<dyn EventPublisher>,
    config: OrchestratorConfig,
    queue_tx: mpsc::Sender<OrchestrationEvent>,
    queue_rx: AsyncMutex<mpsc::Receiver<OrchestrationEvent>>,
    locks: AsyncMutex<BTreeMap<InstanceId, Arc<AsyncMutex<()>>>>,
}

impl ProcessOrchestrator {
    /// Builds a process orchestrator, creating its bounded event queue from
    /// `config.event_queue_capacity`.
    #[must_use]
    pub fn new(
        graphs: Arc<dyn ProcessGraphRepository>,
        instances: Arc<dyn ProcessInstanceRepository>,
        instance_orchestrator: Arc<InstanceOrchestrator>,
        publisher: Arc<dyn EventPublisher>,
        config: OrchestratorConfig,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(config.event_queue_capacity.max(1));
        Self {
            graphs,
            instances,
            instance_orchestrator,
            publisher,
            config,
            queue_tx,
            queue_rx: AsyncMutex::new(queue_rx),
            locks: AsyncMutex::new(BTreeMap::new()),
        }
    }

    /// Starts a new instance of the latest published version of `graph_id`,
    /// running its first cycle before returning.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessOrchestratorError::GraphNotFound`] if no published
    /// version exists, or propagates a cycle/repository failure.
    pub async fn start(
        &self,
        graph_id: &GraphId,
        correlation_id: Option<CorrelationId>,
        context: ExecutionContext,
        principal: PrincipalId,
        now: Timestamp,
    ) -> Result<InstanceId, ProcessOrchestratorError> {
        let graph = self
            .graphs
            .load_latest_published(graph_id)?
            .ok_or_else(|| ProcessOrchestratorError::GraphNotFound(graph_id.clone()))?;

        let instance_id = InstanceId::new(format!("{graph_id}:{now_suffix(now)}"));
        let mut instance = ProcessInstance::start(instance_id.clone(), graph_id.clone(), graph.version(), correlation_id, now, context);

        let lock = self.lock_for(&instance_id).await;
        let _guard = lock.lock().await;
        let report = self.instance_orchestrator.run_cycle(&graph, &mut instance, principal, now)?;
        self.publish_outcomes(&instance, &report, now)?;
        self.instances.save(&instance)?;
        Ok(instance_id)
    }

    /// Runs one cycle for `instance_id` without going through the event
    /// queue, e.g. for an explicit client-driven poll.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessOrchestratorError::InstanceNotFound`] or propagates
    /// a cycle/repository failure.
    pub async fn step(
        &self,
        instance_id: &InstanceId,
        principal: PrincipalId,
        now: Timestamp,
    ) -> Result<CycleReport, ProcessOrchestratorError> {
        let lock = self.lock_for(instance_id).await;
        let _guard = lock.lock().await;
        let mut instance = self
            .instances
            .load(instance_id)?
            .ok_or_else(|| ProcessOrchestratorError::InstanceNotFound(instance_id.clone()))?;
        let graph = self
            .graphs
            .load(&instance.graph_id().clone(), instance.graph_version())?
            .ok_or_else(|| ProcessOrchestratorError::GraphNotFound(instance.graph_id().clone()))?;
        let report = self.instance_orchestrator.run_cycle(&graph, &mut instance, principal, now)?;
        self.publish_outcomes(&instance, &report, now)?;
        self.instances.save(&instance)?;
        Ok(report)
    }

    /// Returns the current snapshot of `instance_id`, if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on a backing-store failure.
    pub fn status(&self, instance_id: &InstanceId) -> Result<Option<ProcessInstance>, ProcessOrchestratorError> {
        Ok(self.instances.load(instance_id)?)
    }

    /// Suspends a running instance.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessOrchestratorError::InstanceNotFound`] or propagates
    /// an instance/repository error.
    pub fn suspend(&self, instance_id: &InstanceId) -> Result<(), ProcessOrchestratorError> {
        let mut instance = self
            .instances
            .load(instance_id)?
            .ok_or_else(|| ProcessOrchestratorError::InstanceNotFound(instance_id.clone()))?;
        instance.suspend().map_err(OrchestratorError::from)?;
        self.instances.save(&instance)?;
        Ok(())
    }

    /// Resumes a suspended instance.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessOrchestratorError::InstanceNotFound`] or propagates
    /// an instance/repository error.
    pub fn resume(&self, instance_id: &InstanceId) -> Result<(), ProcessOrchestratorError> {
        let mut instance = self
            .instances
            .load(instance_id)?
            .ok_or_else(|| ProcessOrchestratorError::InstanceNotFound(instance_id.clone()))?;
        instance.resume().map_err(OrchestratorError::from)?;
        self.instances.save(&instance)?;
        Ok(())
    }

    /// Cancels an instance unconditionally (idempotent).
    ///
    /// # Errors
    ///
    /// Returns [`ProcessOrchestratorError::InstanceNotFound`] or propagates
    /// a repository error.
    pub fn cancel(&self, instance_id: &InstanceId, now: Timestamp) -> Result<(), ProcessOrchestratorError> {
        let mut instance = self
            .instances
            .load(instance_id)?
            .ok_or_else(|| ProcessOrchestratorError::InstanceNotFound(instance_id.clone()))?;
        instance.cancel(now);
        self.instances.save(&instance)?;
        Ok(())
    }

    /// Enqueues `event` onto the bounded event queue without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessOrchestratorError::QueueFull`] if the queue is at
    /// capacity.
    pub fn signal(&self, event: OrchestrationEvent) -> Result<(), ProcessOrchestratorError> {
        self.queue_tx.try_send(event).map_err(|_| ProcessOrchestratorError::QueueFull)
    }

    /// Drains one event off the queue (if any is immediately available) and
    /// applies it to every instance the correlation rule resolves it
    /// against, running one cycle per affected instance.
    ///
    /// # Errors
    ///
    /// Propagates the first cycle/repository failure encountered; later
    /// targets of a broadcast event are still attempted.
    pub async fn drain_one(&self, principal: PrincipalId, now: Timestamp) -> Result<usize, ProcessOrchestratorError> {
        let event = {
            let mut rx = self.queue_rx.lock().await;
            match rx.try_recv() {
                Ok(event) => event,
                Err(_) => return Ok(0),
            }
        };
        let targets = self.resolve_targets(&event)?;
        let mut processed = 0;
        for instance_id in targets {
            self.apply_and_cycle(&instance_id, &event, principal.clone(), now).await?;
            processed += 1;
        }
        Ok(processed)
    }

    /// Delivers a `TIMER_EXPIRED` tick for every live instance, intended to
    /// be called every [`crate::config::OrchestratorConfig::evaluation_interval_ms`].
    ///
    /// # Errors
    ///
    /// Propagates the first cycle/repository failure encountered.
    pub async fn tick(&self, principal: PrincipalId, now: Timestamp) -> Result<usize, ProcessOrchestratorError> {
        let live = self.instances.list_live()?;
        let mut processed = 0;
        let event = OrchestrationEvent::TimerExpired { correlation_id: None, node_id: None };
        for instance_id in live {
            self.apply_and_cycle(&instance_id, &event, principal.clone(), now).await?;
            processed += 1;
        }
        Ok(processed)
    }

    fn resolve_targets(&self, event: &OrchestrationEvent) -> Result<Vec<InstanceId>, ProcessOrchestratorError> {
        if let Some(instance_id) = event.direct_instance_id() {
            return Ok(vec![instance_id.clone()]);
        }
        let live = self.instances.list_live()?;
        let Some(correlation_id) = event.correlation_id() else {
            return Ok(live);
        };
        let mut matched = Vec::new();
        for instance_id in live {
            if let Some(instance) = self.instances.load(&instance_id)? {
                if instance.correlation_id() == Some(correlation_id) {
                    matched.push(instance_id);
                }
            }
        }
        Ok(matched)
    }

    async fn apply_and_cycle(
        &self,
        instance_id: &InstanceId,
        event: &OrchestrationEvent,
        principal: PrincipalId,
        now: Timestamp,
    ) -> Result<(), ProcessOrchestratorError> {
        let lock = self.lock_for(instance_id).await;
        let _guard = lock.lock().await;

        let Some(mut instance) = self.instances.load(instance_id)? else {
            return Ok(());
        };
        if instance.status() != InstanceStatus::Running {
            return Ok(());
        }
        let graph = self
            .graphs
            .load(&instance.graph_id().clone(), instance.graph_version())?
            .ok_or_else(|| ProcessOrchestratorError::GraphNotFound(instance.graph_id().clone()))?;

        apply_event(&mut instance, event, now).map_err(OrchestratorError::from)?;
        if instance.status() == InstanceStatus::Running {
            let report = self.instance_orchestrator.run_cycle(&graph, &mut instance, principal, now)?;
            self.publish_outcomes(&instance, &report, now)?;
        }
        self.instances.save(&instance)?;
        Ok(())
    }

    fn publish_outcomes(&self, instance: &ProcessInstance, report: &CycleReport, now: Timestamp) -> Result<(), PublishError> {
        for action in &report.actions {
            if let Some(ExecutionOutcome::Completed { node_id, output }) = &action.execution {
                self.publisher.publish(ProcessEvent::NodeCompleted {
                    instance_id: instance.id().clone(),
                    node_id: node_id.clone(),
                    output: output.clone(),
                    at: now,
                })?;
            }
        }
        match instance.status() {
            InstanceStatus::Completed => {
                self.publisher.publish(ProcessEvent::InstanceCompleted { instance_id: instance.id().clone(), at: now })?;
            }
            InstanceStatus::Failed => {
                self.publisher.publish(ProcessEvent::InstanceFailed {
                    instance_id: instance.id().clone(),
                    reason: "instance failed".to_string(),
                    at: now,
                })?;
            }
            InstanceStatus::Running | InstanceStatus::Suspended | InstanceStatus::Cancelled => {}
        }
        Ok(())
    }

    async fn lock_for(&self, instance_id: &InstanceId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(instance_id.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }
}

fn apply_event(instance: &mut ProcessInstance, event: &OrchestrationEvent, now: Timestamp) -> Result<(), crate::core::InstanceError> {
    match event {
        OrchestrationEvent::DataChange { path, value, .. } => {
            let mut context = instance.context().clone();
            context.domain_context.insert(path.clone(), value.clone());
            instance.update_context(context)
        }
        OrchestrationEvent::Approval { node_id, approved, .. } => {
            record_received_event(instance, "approval", node_id.clone(), serde_json::json!({ "approved": approved }), now)
        }
        OrchestrationEvent::Failure { node_id, error, .. } => instance.fail_node_execution(node_id, error.clone(), now),
        OrchestrationEvent::TimerExpired { node_id, .. } => {
            record_received_event(instance, "timer_expired", node_id.clone(), serde_json::Value::Null, now)
        }
        OrchestrationEvent::PolicyUpdate { .. } => Ok(()),
        OrchestrationEvent::NodeCompleted { node_id, output, .. } => {
            instance.complete_node_execution(node_id, output.clone(), now)?;
            let mut context = instance.context().clone();
            if let Some(value) = output.clone() {
                context.accumulated_state.insert(node_id.to_string(), value);
            }
            instance.update_context(context)
        }
        OrchestrationEvent::NodeFailed { node_id, error, .. } => instance.fail_node_execution(node_id, error.clone(), now),
        OrchestrationEvent::DomainEvent { event_type, event_id, payload, .. } => {
            let mut context = instance.context().clone();
            context.received_events.push(ReceivedEvent {
                event_type: event_type.clone(),
                event_id: event_id.clone(),
                timestamp: now,
                payload: payload.clone(),
            });
            instance.update_context(context)
        }
    }
}

fn record_received_event(
    instance: &mut ProcessInstance,
    event_type: &str,
    node_id: Option<crate::core::NodeId>,
    payload: serde_json::Value,
    now: Timestamp,
) -> Result<(), crate::core::InstanceError> {
    let mut context = instance.context().clone();
    let marker = node_id.map_or_else(String::new, |node_id| format!(":{node_id}"));
    context.received_events.push(ReceivedEvent {
        event_type: EventType::new(format!("{event_type}{marker}")),
        event_id: EventId::new(format!("{event_type}:{}", instance.revision())),
        timestamp: now,
        payload,
    });
    instance.update_context(context)
}

fn now_suffix(now: Timestamp) -> String {
    match now {
        Timestamp::UnixMillis(millis) => millis.to_string(),
        Timestamp::Logical(tick) => tick.to_string(),
    }
}
