//! CLI argument definitions for the transaction converter.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "txn-convert",
    version,
    about = "Normalize crypto exchange transaction exports",
    long_about = "Convert per-exchange CSV transaction exports into one canonical schema.\n\n\
                  Supports Firi, Kraken, NBX and Coinbase exports out of the box, plus\n\
                  configuration-driven mapping for any other source."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert every CSV export under the input directory.
    Convert(ConvertArgs),

    /// List the supported exchange formats.
    Exchanges,
}

#[derive(Parser)]
pub struct ConvertArgs {
    /// Input root directory containing per-exchange folders with CSV files.
    #[arg(short = 'i', long = "input", value_name = "DIR")]
    pub input: PathBuf,

    /// Output directory for mapped CSV files.
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: PathBuf,

    /// Directory of per-source mapping configs (<source>.json). A config
    /// takes precedence over the source's built-in normalizer.
    #[arg(long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Parse and convert but do not write output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
