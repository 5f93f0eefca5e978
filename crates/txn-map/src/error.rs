//! Error types for expression evaluation and row mapping.

use std::fmt;

use thiserror::Error;

/// Where in a file mapping config an expression lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapTarget {
    /// A `precompute` entry, by name.
    Precompute(String),
    /// A `skip_when` guard, by position.
    SkipWhen(usize),
    /// A `mapping` entry, by output column.
    Column(String),
}

impl fmt::Display for MapTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Precompute(name) => write!(f, "precompute:{name}"),
            Self::SkipWhen(index) => write!(f, "skip_when[{index}]"),
            Self::Column(column) => write!(f, "column:{column}"),
        }
    }
}

/// A failed expression, carrying enough context to point at the offending
/// config entry and input row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {row_index}: {message} in {target}: {expression}")]
pub struct MapError {
    /// The expression text that failed.
    pub expression: String,
    /// Which config entry the expression came from.
    pub target: MapTarget,
    /// Zero-based data row index the failure occurred on.
    pub row_index: usize,
    /// What went wrong.
    pub message: String,
}

/// Evaluation-level failure, before it is attached to a config entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct EvalError(pub String);

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
