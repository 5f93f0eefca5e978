//! Configuration-driven row mapping.
//!
//! The engine is the generic alternative to a hand-written normalizer: a
//! JSON config per source names an expression for each output column, plus
//! precomputed bindings, skip predicates and defaults. Expressions run in a
//! sandboxed evaluator over the row, the file context and a fixed helper
//! library.

pub mod engine;
pub mod env;
pub mod error;
pub mod expr;
pub mod repository;
pub mod value;

pub use engine::{apply_file_mapping, apply_row_mapping};
pub use env::Environment;
pub use error::{EvalError, MapError, MapTarget};
pub use expr::evaluate;
pub use repository::ConfigRepository;
pub use value::Value;
