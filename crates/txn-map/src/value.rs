//! Runtime values produced by mapping expressions.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;

use txn_core::decimal::decimal_to_str;

/// A value flowing through expression evaluation.
///
/// Numbers are exact decimals, never binary floats. Maps and lists exist so
/// helpers like `split_market` can return structured results, but they are
/// intermediate only and cannot be written to an output cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Decimal),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Truthiness for `skip_when` and boolean operators. Empty strings,
    /// empty collections, zero and null are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => !n.is_zero(),
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Map(entries) => !entries.is_empty(),
        }
    }

    /// Short name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Renders the value as an output cell. Null becomes the empty string
    /// and numbers use the canonical decimal form. Structured values have
    /// no cell representation.
    pub fn into_output(self) -> Result<String, String> {
        match self {
            Self::Null => Ok(String::new()),
            Self::Bool(b) => Ok(if b { "true" } else { "false" }.to_string()),
            Self::Number(n) => Ok(decimal_to_str(Some(n))),
            Self::Str(s) => Ok(s),
            Self::List(_) | Self::Map(_) => {
                Err(format!("{} value cannot be written to a cell", self.type_name()))
            }
        }
    }

    /// Coerces to a string the way `str(...)` does.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Self::Number(n) => decimal_to_str(Some(*n)),
            Self::Str(s) => s.clone(),
            Self::List(_) | Self::Map(_) => format!("<{}>", self.type_name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Decimal> for Value {
    fn from(n: Decimal) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}
