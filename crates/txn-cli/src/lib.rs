//! CLI library components for the transaction converter.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod pipeline;
pub mod summary;
