// cpg-core/src/core/identifiers.rs
// ============================================================================
// Module: CPG Identifiers
// Description: Newtype identifiers used across the graph, instance, and
//              trace models.
// Purpose: Prevent accidental mixing of unrelated id spaces at compile time.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every identifier in the orchestrator is a distinct newtype over `String`
//! (or, for graph versions, `u32`) so that a `NodeId` can never be passed
//! where an `EdgeId` is expected, even though both are strings on the wire.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: String-Backed Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from anything convertible to a `String`.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifies a `ProcessGraph` template, independent of version.
    GraphId
);
string_id!(
    /// Identifies a `Node` within a pinned graph version.
    NodeId
);
string_id!(
    /// Identifies an `Edge` within a pinned graph version.
    EdgeId
);
string_id!(
    /// Identifies a running `ProcessInstance`.
    InstanceId
);
string_id!(
    /// Caller-supplied correlation identifier, echoed back on matching events.
    CorrelationId
);
string_id!(
    /// Identifies a single `DecisionTrace` record.
    TraceId
);
string_id!(
    /// Identifies a parallel execution branch, conventionally
    /// `<instanceId>:<counter>`.
    BranchId
);
string_id!(
    /// Identifies the authenticated principal bound to a `RuntimeContext`.
    PrincipalId
);
string_id!(
    /// Identifies a business rule / decision table referenced by a node.
    RuleId
);
string_id!(
    /// Identifies a policy gate referenced by a node or edge.
    PolicyGateId
);
string_id!(
    /// Identifies the action handler bound to a node's `(type, handlerRef)`
    /// pair.
    HandlerRef
);
string_id!(
    /// Names a domain event type, used both for subscriptions/emissions and
    /// for the domain event catalog.
    EventType
);
string_id!(
    /// Identifies a single `ReceivedEvent` occurrence.
    EventId
);
string_id!(
    /// Identifies an exception/error kind surfaced by an action handler,
    /// matched against `ExceptionRoutes` with wildcard containment.
    ExceptionType
);

// ============================================================================
// SECTION: Graph Version
// ============================================================================

/// A `ProcessGraph` version number. Versions are never reused; a new version
/// supersedes but never mutates a prior one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphVersion(u32);

impl GraphVersion {
    /// Creates a new graph version number.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw version number.
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for GraphVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for GraphVersion {
    fn from(value: u32) -> Self {
        Self(value)
    }
}
