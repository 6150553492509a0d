//! Shared types, errors, and outcomes for the Relay pipeline.
//!
//! This crate provides the foundational types used across all other Relay crates:
//! - `RelayError`: unified error taxonomy
//! - `Request`: immutable key-value payload handed to every node
//! - `RunOutcome`: terminal outcome of a pipeline run
//! - `NodeKind`: the two capabilities a chain node can have

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Unified error type for all Relay subsystems.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    // === Chain Construction Errors ===
    #[error("Chain member {index} is a '{found}' node, expected a {expected}")]
    TypeMismatch {
        index: usize,
        expected: NodeKind,
        found: String,
    },

    #[error("Unknown node type '{0}'")]
    UnknownNodeType(String),

    #[error("Invalid definition for node '{node}': {message}")]
    InvalidDefinition { node: String, message: String },

    #[error("Pipeline validation failed: {0}")]
    ValidationError(String),

    // === Run Errors ===
    #[error("{kind} '{node}' failed: {message}")]
    NodeFailure {
        kind: NodeKind,
        node: String,
        message: String,
    },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl RelayError {
    /// Returns `true` if the error was raised while building a pipeline, before
    /// any run could start.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RelayError::TypeMismatch { .. }
                | RelayError::UnknownNodeType(_)
                | RelayError::InvalidDefinition { .. }
                | RelayError::ValidationError(_)
        )
    }

    /// Wrap an error raised inside a node callback as a [`RelayError::NodeFailure`].
    ///
    /// Errors that already name their node pass through unchanged.
    pub fn into_node_failure(self, kind: NodeKind, node: &str) -> Self {
        match self {
            err @ RelayError::NodeFailure { .. } => err,
            other => RelayError::NodeFailure {
                kind,
                node: node.to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// A convenience alias for `Result<T, RelayError>`.
pub type Result<T> = std::result::Result<T, RelayError>;

// ---------------------------------------------------------------------------
// NodeKind: the capability a chain node implements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Gate,
    Handler,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Gate => f.write_str("gate"),
            NodeKind::Handler => f.write_str("handler"),
        }
    }
}

// ---------------------------------------------------------------------------
// Request: read-only payload shared by every node of a run
// ---------------------------------------------------------------------------

/// Immutable key-value payload passed unchanged through both chains.
///
/// Cloning a `Request` yields another handle to the **same** values; there is
/// no API that mutates a request after construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Request {
    values: Arc<BTreeMap<String, serde_json::Value>>,
}

impl Request {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a value by key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Read a value as a string slice. Returns `None` when the key is absent or
    /// not a JSON string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    /// Read a value as an integer. Returns `None` when the key is absent or not
    /// an integer that fits in `i64`.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(|v| v.as_i64())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for Request
where
    K: Into<String>,
    V: Into<serde_json::Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let values = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<BTreeMap<_, _>>();
        Self {
            values: Arc::new(values),
        }
    }
}

impl From<BTreeMap<String, serde_json::Value>> for Request {
    fn from(values: BTreeMap<String, serde_json::Value>) -> Self {
        Self {
            values: Arc::new(values),
        }
    }
}

// ---------------------------------------------------------------------------
// RunOutcome: terminal outcome of a pipeline run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// A gate vetoed the request; no handler was consulted.
    Rejected,
    /// At least one handler applied and acted.
    Handled,
    /// The request was admitted but no handler applied.
    Unhandled,
}

impl RunOutcome {
    pub fn is_handled(self) -> bool {
        self == RunOutcome::Handled
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Rejected => f.write_str("rejected"),
            RunOutcome::Handled => f.write_str("handled"),
            RunOutcome::Unhandled => f.write_str("unhandled"),
        }
    }
}
