//! Mapping configuration types.
//!
//! A mapping config drives the generic engine for one source: which rows to
//! skip, what to precompute, and the expression producing each output
//! column. Configs are JSON documents loaded once per run and read-only for
//! the run's duration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Whether the engine is applied row-by-row or the file is handed to a
/// built-in normalizer named by [`FileMappingConfig::normalizer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingMode {
    #[default]
    Row,
    File,
}

/// A named precompute expression. Entries evaluate in declaration order and
/// each result is bound into the environment for later expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecomputeEntry {
    pub name: String,
    pub expr: String,
}

/// Per-source mapping configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMappingConfig {
    #[serde(default)]
    pub mode: MappingMode,
    /// Built-in normalizer name, only meaningful in [`MappingMode::File`].
    #[serde(default)]
    pub normalizer: Option<String>,
    /// Named expressions evaluated before anything else, in order.
    #[serde(default)]
    pub precompute: Vec<PrecomputeEntry>,
    /// Predicates checked in order; any truthy result drops the row.
    #[serde(default)]
    pub skip_when: Vec<String>,
    /// Output column → expression.
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,
    /// Fallback values for columns without a mapping expression.
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
}

impl FileMappingConfig {
    /// True when the config carries row-wise expressions to evaluate.
    pub fn is_row_wise(&self) -> bool {
        self.mode == MappingMode::Row
    }
}
