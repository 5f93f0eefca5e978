//! Exchange-specific normalizers and shared conversion primitives.
//!
//! This crate turns raw exchange export rows into canonical records:
//!
//! - **decimal**: lenient decimal parsing and canonical number formatting
//! - **timestamp**: per-exchange timestamp parsing to UTC RFC 3339
//! - **market**: market symbol composition and splitting
//! - **context**: per-file metadata passed to normalizers
//! - **exchange**: the closed set of supported formats and dispatch
//! - **firi / kraken / nbx / coinbase**: one normalizer per export format

pub mod coinbase;
pub mod context;
pub mod decimal;
pub mod exchange;
pub mod firi;
pub mod kraken;
pub mod market;
pub mod nbx;
pub mod timestamp;

// Re-export the pieces the mapping engine and pipeline lean on.
pub use context::FileContext;
pub use decimal::{abs_decimal_to_str, decimal_to_str, parse_decimal};
pub use exchange::{normalize_file, Exchange, EXCHANGES};
pub use market::{format_market, is_fiat, split_market};
pub use timestamp::{
    parse_coinbase_timestamp, parse_firi_timestamp, parse_iso_timestamp, parse_kraken_timestamp,
};
