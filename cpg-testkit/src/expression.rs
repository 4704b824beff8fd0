// cpg-testkit/src/expression.rs
// ============================================================================
// Module: Trivial Expression Evaluator
// Description: A deterministic, in-process ExpressionEvaluator for tests.
// Purpose: Exercise preconditions, guard conditions, and rule-outcome
//          conditions without depending on a real FEEL engine.
// Dependencies: cpg_core::interfaces, serde_json
// ============================================================================

//! ## Overview
//! The core treats [`cpg_core::FeelExpression`] source text as opaque; this
//! evaluator gives it one concrete, deterministic grammar so tests can
//! express realistic guard conditions without pulling in a FEEL engine.
//!
//! Grammar, lowest precedence first:
//! - `<clause> || <clause> || ...` (any clause true => true)
//! - `<clause> && <clause> && ...` (all atoms true => true)
//! - an atom is `!<path>`, a bare `<path>` (truthy, must equal JSON `true`),
//!   the literals `true`/`false`, or `<path> <op> <literal>` with
//!   `op` one of `>=`, `<=`, `!=`, `==`, `=`, `>`, `<`.
//!
//! A path is a dotted identifier resolved against the flattened runtime
//! context (`client.foo`, `domain.bar.baz`, ...). If the first segment
//! names a known namespace (`client`, `domain`, `state`, `signal`) the path
//! resolves against that namespace only; otherwise every namespace is tried
//! in that order and the first hit wins. A path that resolves to nothing
//! evaluates to JSON `null`, never a failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use cpg_core::FeelExpression;
use cpg_core::interfaces::ExpressionEvaluator;
use cpg_core::interfaces::ExpressionOutcome;
use serde_json::Value;

/// Namespaces tried, in order, when a path's first segment is not one of
/// them explicitly.
const NAMESPACES: [&str; 4] = ["client", "domain", "state", "signal"];

/// A deterministic, dependency-free [`ExpressionEvaluator`] for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrivialExpressionEvaluator;

impl TrivialExpressionEvaluator {
    /// Builds a new trivial evaluator. Stateless; cheap to construct
    /// per-test.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ExpressionEvaluator for TrivialExpressionEvaluator {
    fn evaluate(&self, expression: &FeelExpression, context: &BTreeMap<String, Value>) -> ExpressionOutcome {
        match eval_expr(expression.source(), context) {
            Some(value) => ExpressionOutcome::ok(value),
            None => ExpressionOutcome::failed(format!("could not parse expression: {}", expression.source())),
        }
    }
}

fn eval_expr(source: &str, context: &BTreeMap<String, Value>) -> Option<Value> {
    let source = source.trim();
    if source.is_empty() {
        return None;
    }
    let mut any = false;
    for clause in split_top_level(source, "||") {
        let mut all = true;
        for atom in split_top_level(&clause, "&&") {
            if !eval_atom(atom.trim(), context)? {
                all = false;
            }
        }
        if all {
            any = true;
        }
    }
    Some(Value::Bool(any))
}

fn split_top_level(source: &str, token: &str) -> Vec<String> {
    source.split(token).map(str::to_string).collect()
}

fn eval_atom(atom: &str, context: &BTreeMap<String, Value>) -> Option<bool> {
    if let Some(rest) = atom.strip_prefix('!') {
        return eval_atom(rest.trim(), context).map(|value| !value);
    }
    if atom == "true" {
        return Some(true);
    }
    if atom == "false" {
        return Some(false);
    }
    if let Some((path, op, literal)) = split_comparison(atom) {
        let left = resolve_path(path.trim(), context);
        let right = parse_literal(literal.trim());
        return Some(compare(&left, op, &right));
    }
    // Bare path: truthy iff it resolves to exactly JSON `true`.
    Some(resolve_path(atom, context) == Value::Bool(true))
}

/// Operators tried longest-first so `!=`/`==`/`>=`/`<=` never get
/// mis-split on their trailing `=`.
const OPERATORS: [&str; 7] = [">=", "<=", "!=", "==", "=", ">", "<"];

fn split_comparison(atom: &str) -> Option<(&str, &str, &str)> {
    for op in OPERATORS {
        if let Some(index) = atom.find(op) {
            let (left, rest) = atom.split_at(index);
            let right = &rest[op.len()..];
            if !left.is_empty() {
                return Some((left, op, right));
            }
        }
    }
    None
}

fn compare(left: &Value, op: &str, right: &Value) -> bool {
    match op {
        "==" | "=" => left == right,
        "!=" => left != right,
        ">" | ">=" | "<" | "<=" => compare_numeric(left, op, right),
        _ => false,
    }
}

fn compare_numeric(left: &Value, op: &str, right: &Value) -> bool {
    let (Some(left), Some(right)) = (left.as_f64(), right.as_f64()) else {
        return false;
    };
    match op {
        ">" => left > right,
        ">=" => left >= right,
        "<" => left < right,
        "<=" => left <= right,
        _ => false,
    }
}

fn parse_literal(literal: &str) -> Value {
    if let Some(stripped) = literal.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        return Value::String(stripped.to_string());
    }
    if let Some(stripped) = literal.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')) {
        return Value::String(stripped.to_string());
    }
    serde_json::from_str(literal).unwrap_or_else(|_| Value::String(literal.to_string()))
}

fn resolve_path(path: &str, context: &BTreeMap<String, Value>) -> Value {
    let mut segments = path.split('.');
    let Some(first) = segments.next() else {
        return Value::Null;
    };
    let Some(second) = segments.next() else {
        return Value::Null;
    };

    let (mut value, remainder) = if NAMESPACES.contains(&first) {
        (context.get(&format!("{first}.{second}")).cloned(), segments.collect::<Vec<_>>())
    } else {
        let mut found = None;
        for namespace in NAMESPACES {
            if let Some(hit) = context.get(&format!("{namespace}.{first}")) {
                found = Some(hit.clone());
                break;
            }
        }
        let mut remainder = vec![second];
        remainder.extend(segments);
        (found, remainder)
    };

    for segment in remainder {
        value = value.and_then(|v| v.get(segment).cloned());
    }
    value.unwrap_or(Value::Null)
}
