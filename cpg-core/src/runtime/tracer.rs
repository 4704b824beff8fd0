// cpg-core/src/runtime/tracer.rs
// ============================================================================
// Module: Decision Tracer (C12)
// Description: Appends DecisionTrace records and serves the query surface
//              over DecisionTraceRepository.
// Purpose: Provide the append-only system of record the Instance
//          Orchestrator writes to on every cycle.
// Dependencies: crate::core, crate::interfaces, crate::config
// ============================================================================

//! ## Overview
//! The tracer assigns each trace a deterministic id of the form
//! `<instanceId>:<ordinal>` from a per-instance counter (never a random or
//! wall-clock-derived id) and appends through [`DecisionTraceRepository`].
//! When [`crate::config::TracingConfig::enabled`] is `false` the tracer
//! still builds and returns the record (callers such as the Instance
//! Orchestrator may use it in an immediate response) but never writes it;
//! when `enabled` but not `persist`, the same applies, distinguishing
//! "compute traces for this call" from "keep them around".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::config::TracingConfig;
use crate::core::DecisionTrace;
use crate::core::EligibleSpace;
use crate::core::ExecutionOutcome;
use crate::core::GovernanceResult;
use crate::core::InstanceId;
use crate::core::NavigationDecision;
use crate::core::SafeSummary;
use crate::core::Timestamp;
use crate::core::TraceId;
use crate::core::TraceType;
use crate::interfaces::DecisionTraceRepository;
use crate::interfaces::RepositoryError;

/// Appends and queries [`DecisionTrace`] records.
pub struct DecisionTracer {
    repository: Arc<dyn DecisionTraceRepository>,
    config: TracingConfig,
    ordinals: Mutex<BTreeMap<InstanceId, u64>>,
}

impl DecisionTracer {
    /// Builds a tracer over `repository`, governed by `config`.
    #[must_use]
    pub fn new(repository: Arc<dyn DecisionTraceRepository>, config: TracingConfig) -> Self {
        Self {
            repository,
            config,
            ordinals: Mutex::new(BTreeMap::new()),
        }
    }

    /// Records one decision trace. Always returns the constructed record
    /// (for the caller's immediate use); only appends it to the repository
    /// when tracing is enabled and configured to persist.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the repository append fails.
    #[allow(clippy::too_many_arguments, reason = "mirrors DecisionTrace's own field count")]
    pub fn record(
        &self,
        instance_id: InstanceId,
        trace_type: TraceType,
        context_snapshot: SafeSummary,
        evaluation_snapshot: Option<EligibleSpace>,
        decision_snapshot: Option<NavigationDecision>,
        governance_snapshot: Vec<GovernanceResult>,
        outcome_snapshot: Option<ExecutionOutcome>,
        now: Timestamp,
    ) -> Result<DecisionTrace, RepositoryError> {
        let trace = DecisionTrace {
            id: self.next_trace_id(&instance_id),
            timestamp: now,
            instance_id,
            trace_type,
            context_snapshot,
            evaluation_snapshot,
            decision_snapshot,
            governance_snapshot,
            outcome_snapshot,
        };

        if self.config.enabled && self.config.persist {
            self.repository.append(trace.clone())?;
        }

        Ok(trace)
    }

    /// Finds a trace by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on a backing-store failure.
    pub fn find_by_id(&self, trace_id: &TraceId) -> Result<Option<DecisionTrace>, RepositoryError> {
        self.repository.find_by_id(trace_id)
    }

    /// Returns every trace for `instance_id`, chronologically.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on a backing-store failure.
    pub fn find_by_instance_id(&self, instance_id: &InstanceId) -> Result<Vec<DecisionTrace>, RepositoryError> {
        self.repository.find_by_instance_id(instance_id)
    }

    /// Returns every trace of a given type, chronologically.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on a backing-store failure.
    pub fn find_by_type(&self, trace_type: TraceType) -> Result<Vec<DecisionTrace>, RepositoryError> {
        self.repository.find_by_type(trace_type)
    }

    /// Prunes traces older than `cutoff_unix_millis`, honoring
    /// [`TracingConfig::retention_days`] is the caller's responsibility to
    /// compute the cutoff from; this only performs the delete.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on a backing-store failure.
    pub fn delete_older_than(&self, cutoff_unix_millis: i64) -> Result<u64, RepositoryError> {
        self.repository.delete_older_than(cutoff_unix_millis)
    }

    fn next_trace_id(&self, instance_id: &InstanceId) -> TraceId {
        let mut ordinals = self.ordinals.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let ordinal = ordinals.entry(instance_id.clone()).or_insert(0);
        *ordinal += 1;
        TraceId::new(format!("{instance_id}:{ordinal}"))
    }
}
