// cpg-testkit/src/store.rs
// ============================================================================
// Module: In-Memory Persistence Ports
// Description: In-memory ProcessGraphRepository, ProcessInstanceRepository,
//              and DecisionTraceRepository implementations, each wrapped in
//              a clonable `Shared...` handle.
// Purpose: Let tests exercise the orchestrator's persistence boundary
//          without a real database.
// Dependencies: cpg_core::interfaces, std::sync::Mutex
// ============================================================================

//! ## Overview
//! Each repository keeps its state behind a `Mutex` guarding a
//! `BTreeMap`, and a thin `Shared...` wrapper makes the store clonable and
//! trait-object-friendly for handing the same backing store to multiple
//! collaborators.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use cpg_core::DecisionTrace;
use cpg_core::GraphId;
use cpg_core::GraphVersion;
use cpg_core::InstanceId;
use cpg_core::ProcessGraph;
use cpg_core::ProcessInstance;
use cpg_core::TraceId;
use cpg_core::interfaces::DecisionTraceRepository;
use cpg_core::interfaces::ProcessGraphRepository;
use cpg_core::interfaces::ProcessInstanceRepository;
use cpg_core::interfaces::RepositoryError;

// ============================================================================
// SECTION: Process Graph Repository
// ============================================================================

/// An in-memory [`ProcessGraphRepository`] keyed by `(GraphId,
/// GraphVersion)`.
#[derive(Default)]
pub struct InMemoryProcessGraphRepository {
    graphs: Mutex<BTreeMap<(GraphId, GraphVersion), Arc<ProcessGraph>>>,
}

impl InMemoryProcessGraphRepository {
    /// Builds an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessGraphRepository for InMemoryProcessGraphRepository {
    fn load(&self, graph_id: &GraphId, version: GraphVersion) -> Result<Option<Arc<ProcessGraph>>, RepositoryError> {
        let graphs = self.graphs.lock().map_err(|_| RepositoryError::Io("lock poisoned".to_string()))?;
        Ok(graphs.get(&(graph_id.clone(), version)).cloned())
    }

    fn load_latest_published(&self, graph_id: &GraphId) -> Result<Option<Arc<ProcessGraph>>, RepositoryError> {
        let graphs = self.graphs.lock().map_err(|_| RepositoryError::Io("lock poisoned".to_string()))?;
        let latest = graphs
            .iter()
            .filter(|((id, _), graph)| id == graph_id && graph.status() == cpg_core::GraphStatus::Published)
            .max_by_key(|((_, version), _)| version.as_u32())
            .map(|(_, graph)| graph.clone());
        Ok(latest)
    }

    fn save(&self, graph: Arc<ProcessGraph>) -> Result<(), RepositoryError> {
        let mut graphs = self.graphs.lock().map_err(|_| RepositoryError::Io("lock poisoned".to_string()))?;
        graphs.insert((graph.graph_id().clone(), graph.version()), graph);
        Ok(())
    }
}

/// A clonable handle to a shared [`ProcessGraphRepository`].
#[derive(Clone)]
pub struct SharedProcessGraphRepository {
    inner: Arc<dyn ProcessGraphRepository>,
}

impl SharedProcessGraphRepository {
    /// Wraps a fresh, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::from_repository(Arc::new(InMemoryProcessGraphRepository::new()))
    }

    /// Wraps an existing repository implementation.
    #[must_use]
    pub fn from_repository(inner: Arc<dyn ProcessGraphRepository>) -> Self {
        Self { inner }
    }
}

impl Default for SharedProcessGraphRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessGraphRepository for SharedProcessGraphRepository {
    fn load(&self, graph_id: &GraphId, version: GraphVersion) -> Result<Option<Arc<ProcessGraph>>, RepositoryError> {
        self.inner.load(graph_id, version)
    }

    fn load_latest_published(&self, graph_id: &GraphId) -> Result<Option<Arc<ProcessGraph>>, RepositoryError> {
        self.inner.load_latest_published(graph_id)
    }

    fn save(&self, graph: Arc<ProcessGraph>) -> Result<(), RepositoryError> {
        self.inner.save(graph)
    }
}

// ============================================================================
// SECTION: Process Instance Repository
// ============================================================================

/// An in-memory [`ProcessInstanceRepository`] with optimistic-concurrency
/// revision checking, keyed by [`InstanceId`].
#[derive(Default)]
pub struct InMemoryProcessInstanceRepository {
    instances: Mutex<BTreeMap<InstanceId, ProcessInstance>>,
}

impl InMemoryProcessInstanceRepository {
    /// Builds an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessInstanceRepository for InMemoryProcessInstanceRepository {
    fn load(&self, instance_id: &InstanceId) -> Result<Option<ProcessInstance>, RepositoryError> {
        let instances = self.instances.lock().map_err(|_| RepositoryError::Io("lock poisoned".to_string()))?;
        Ok(instances.get(instance_id).cloned())
    }

    fn save(&self, instance: &ProcessInstance) -> Result<(), RepositoryError> {
        let mut instances = self.instances.lock().map_err(|_| RepositoryError::Io("lock poisoned".to_string()))?;
        if let Some(existing) = instances.get(instance.id()) {
            if existing.revision() > instance.revision() {
                return Err(RepositoryError::RevisionConflict);
            }
        }
        instances.insert(instance.id().clone(), instance.clone());
        Ok(())
    }

    fn list_live(&self) -> Result<Vec<InstanceId>, RepositoryError> {
        let instances = self.instances.lock().map_err(|_| RepositoryError::Io("lock poisoned".to_string()))?;
        Ok(instances
            .values()
            .filter(|instance| !instance.status().is_terminal())
            .map(|instance| instance.id().clone())
            .collect())
    }
}

/// A clonable handle to a shared [`ProcessInstanceRepository`].
#[derive(Clone)]
pub struct SharedProcessInstanceRepository {
    inner: Arc<dyn ProcessInstanceRepository>,
}

impl SharedProcessInstanceRepository {
    /// Wraps a fresh, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::from_repository(Arc::new(InMemoryProcessInstanceRepository::new()))
    }

    /// Wraps an existing repository implementation.
    #[must_use]
    pub fn from_repository(inner: Arc<dyn ProcessInstanceRepository>) -> Self {
        Self { inner }
    }
}

impl Default for SharedProcessInstanceRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessInstanceRepository for SharedProcessInstanceRepository {
    fn load(&self, instance_id: &InstanceId) -> Result<Option<ProcessInstance>, RepositoryError> {
        self.inner.load(instance_id)
    }

    fn save(&self, instance: &ProcessInstance) -> Result<(), RepositoryError> {
        self.inner.save(instance)
    }

    fn list_live(&self) -> Result<Vec<InstanceId>, RepositoryError> {
        self.inner.list_live()
    }
}

// ============================================================================
// SECTION: Decision Trace Repository
// ============================================================================

/// An in-memory [`DecisionTraceRepository`] that keeps every appended trace
/// in arrival order.
#[derive(Default)]
pub struct InMemoryDecisionTraceRepository {
    traces: Mutex<Vec<DecisionTrace>>,
}

impl InMemoryDecisionTraceRepository {
    /// Builds an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecisionTraceRepository for InMemoryDecisionTraceRepository {
    fn append(&self, trace: DecisionTrace) -> Result<(), RepositoryError> {
        let mut traces = self.traces.lock().map_err(|_| RepositoryError::Io("lock poisoned".to_string()))?;
        traces.push(trace);
        Ok(())
    }

    fn find_by_id(&self, trace_id: &TraceId) -> Result<Option<DecisionTrace>, RepositoryError> {
        let traces = self.traces.lock().map_err(|_| RepositoryError::Io("lock poisoned".to_string()))?;
        Ok(traces.iter().find(|trace| &trace.id == trace_id).cloned())
    }

    fn find_by_instance_id(&self, instance_id: &InstanceId) -> Result<Vec<DecisionTrace>, RepositoryError> {
        let traces = self.traces.lock().map_err(|_| RepositoryError::Io("lock poisoned".to_string()))?;
        Ok(traces.iter().filter(|trace| &trace.instance_id == instance_id).cloned().collect())
    }

    fn find_by_type(&self, trace_type: cpg_core::TraceType) -> Result<Vec<DecisionTrace>, RepositoryError> {
        let traces = self.traces.lock().map_err(|_| RepositoryError::Io("lock poisoned".to_string()))?;
        Ok(traces.iter().filter(|trace| trace.trace_type == trace_type).cloned().collect())
    }

    fn delete_older_than(&self, cutoff_unix_millis: i64) -> Result<u64, RepositoryError> {
        let mut traces = self.traces.lock().map_err(|_| RepositoryError::Io("lock poisoned".to_string()))?;
        let before = traces.len();
        traces.retain(|trace| trace.timestamp.as_unix_millis().is_none_or(|millis| millis >= cutoff_unix_millis));
        Ok(u64::try_from(before - traces.len()).unwrap_or(u64::MAX))
    }
}

/// A clonable handle to a shared [`DecisionTraceRepository`].
#[derive(Clone)]
pub struct SharedDecisionTraceRepository {
    inner: Arc<dyn DecisionTraceRepository>,
}

impl SharedDecisionTraceRepository {
    /// Wraps a fresh, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::from_repository(Arc::new(InMemoryDecisionTraceRepository::new()))
    }

    /// Wraps an existing repository implementation.
    #[must_use]
    pub fn from_repository(inner: Arc<dyn DecisionTraceRepository>) -> Self {
        Self { inner }
    }
}

impl Default for SharedDecisionTraceRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTraceRepository for SharedDecisionTraceRepository {
    fn append(&self, trace: DecisionTrace) -> Result<(), RepositoryError> {
        self.inner.append(trace)
    }

    fn find_by_id(&self, trace_id: &TraceId) -> Result<Option<DecisionTrace>, RepositoryError> {
        self.inner.find_by_id(trace_id)
    }

    fn find_by_instance_id(&self, instance_id: &InstanceId) -> Result<Vec<DecisionTrace>, RepositoryError> {
        self.inner.find_by_instance_id(instance_id)
    }

    fn find_by_type(&self, trace_type: cpg_core::TraceType) -> Result<Vec<DecisionTrace>, RepositoryError> {
        self.inner.find_by_type(trace_type)
    }

    fn delete_older_than(&self, cutoff_unix_millis: i64) -> Result<u64, RepositoryError> {
        self.inner.delete_older_than(cutoff_unix_millis)
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

    fn empty_execution_context() -> cpg_core::ExecutionContext {
        cpg_core::ExecutionContext {
            client_context: BTreeMap::new(),
            domain_context: BTreeMap::new(),
            accumulated_state: BTreeMap::new(),
            operational_signals: BTreeMap::new(),
            received_events: Vec::new(),
            obligations: Vec::new(),
        }
    }

    #[test]
    fn instance_repository_round_trips() {
        let repository = InMemoryProcessInstanceRepository::new();
        let instance = ProcessInstance::start(
            InstanceId::new("inst-1"),
            GraphId::new("graph-1"),
            GraphVersion::new(1),
            None,
            cpg_core::Timestamp::Logical(1),
            empty_execution_context(),
        );
        repository.save(&instance).expect("save should succeed");
        let loaded = repository.load(instance.id()).expect("load should succeed");
        assert_eq!(loaded.map(|i| i.id().clone()), Some(instance.id().clone()));
    }

    #[test]
    fn stale_revision_save_is_rejected() {
        let repository = InMemoryProcessInstanceRepository::new();
        let mut instance = ProcessInstance::start(
            InstanceId::new("inst-1"),
            GraphId::new("graph-1"),
            GraphVersion::new(1),
            None,
            cpg_core::Timestamp::Logical(1),
            empty_execution_context(),
        );
        repository.save(&instance).expect("save should succeed");
        let stale = instance.clone();
        instance.suspend().expect("suspend should succeed");
        repository.save(&instance).expect("save should succeed");
        let result = repository.save(&stale);
        assert!(matches!(result, Err(RepositoryError::RevisionConflict)));
    }
}
