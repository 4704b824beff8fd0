// cpg-core/src/core/decision.rs
// ============================================================================
// Module: Navigation Decision Data Shapes (C10)
// Description: NavigationDecision, DecisionType, SelectionCriteria.
// Purpose: Carry the Navigation Decider's deterministic choice, with
//          recorded alternatives, for tracing and dispatch.
// Dependencies: serde, crate::core::{eligibility, summary, time}
// ============================================================================

//! ## Overview
//! A [`NavigationDecision`] is the single output of one Navigation Decider
//! (C10) call: what to do, what was selected, what else was considered, and
//! why. It never embeds raw context or evidence values; `WAIT`/`BLOCKED`
//! decisions carry a redacted [`SafeSummary`] instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::eligibility::CandidateAction;
use crate::core::summary::SafeSummary;
use crate::core::time::Timestamp;

/// What kind of decision the Navigation Decider reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    /// One or more actions were selected for execution.
    Proceed,
    /// No eligible actions exist right now; the instance waits for events.
    Wait,
    /// An action was selected but governance rejected it.
    Blocked,
    /// The only candidate is a satisfied terminal node.
    Complete,
}

/// The rule by which the Navigation Decider chose among alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionCriteria {
    /// Exactly one candidate action existed.
    SingleOption,
    /// An exclusive edge preempted all other candidates.
    Exclusive,
    /// No exclusive/parallel candidate applied; the single highest-priority
    /// candidate (by weight desc, rank asc, then declaration order) won.
    HighestPriority,
    /// Multiple candidates with `PARALLEL` incoming edges were selected
    /// together.
    Parallel,
    /// The candidate space was empty.
    NoOptions,
}

/// The Navigation Decider's (C10) output for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationDecision {
    /// What kind of decision this is.
    pub decision_type: DecisionType,
    /// Actions selected for execution, empty for `WAIT`/`BLOCKED`.
    pub selected_actions: Vec<CandidateAction>,
    /// Every candidate considered but not selected.
    pub alternatives_considered: Vec<CandidateAction>,
    /// The rule applied to reach this decision.
    pub selection_criteria: SelectionCriteria,
    /// Human-readable (but redacted) explanation.
    pub selection_reason: String,
    /// When the decision was made.
    pub decided_at: Timestamp,
    /// Redacted summary, present for `WAIT`/`BLOCKED` decisions.
    pub summary: Option<SafeSummary>,
}
