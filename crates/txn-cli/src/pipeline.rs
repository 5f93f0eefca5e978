//! File conversion pipeline.
//!
//! Each input file goes through the same stages:
//! 1. **Ingest**: read the CSV (stripping any metadata preamble)
//! 2. **Resolve**: pick a mapping config or a built-in normalizer by source
//! 3. **Normalize**: produce canonical records
//! 4. **Output**: write `<stem>_mapped.csv` (skipped on dry runs)
//!
//! A mapping configuration error aborts the offending file only; the caller
//! keeps processing the remaining files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use txn_core::{Exchange, FileContext, normalize_file};
use txn_ingest::{output_name, read_export, source_name, write_records};
use txn_map::{ConfigRepository, apply_file_mapping};
use txn_model::CanonicalRecord;

/// How one file was converted, for the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertMode {
    /// Built-in normalizer selected by the source directory name.
    Builtin,
    /// Row-wise mapping config.
    Config,
    /// File-mode config naming a built-in normalizer.
    ConfigNormalizer,
}

impl ConvertMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Config => "config",
            Self::ConfigNormalizer => "config+builtin",
        }
    }
}

/// Outcome of converting one input file.
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub source: String,
    pub mode: ConvertMode,
    pub records: usize,
    /// Written output path; `None` on dry runs and empty results.
    pub output: Option<PathBuf>,
}

/// Result of a whole conversion run.
#[derive(Debug)]
pub struct ConvertResult {
    pub output_dir: PathBuf,
    pub files: Vec<FileOutcome>,
    /// Files with no config and no built-in normalizer.
    pub skipped: Vec<PathBuf>,
    /// Per-file failures that did not stop the run.
    pub errors: Vec<String>,
    pub dry_run: bool,
}

impl ConvertResult {
    pub fn total_records(&self) -> usize {
        self.files.iter().map(|f| f.records).sum()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Converts one file, or returns `None` when no converter applies.
pub fn process_file(
    input: &Path,
    output_dir: &Path,
    repository: Option<&ConfigRepository>,
    dry_run: bool,
) -> Result<Option<FileOutcome>> {
    let source = source_name(input);
    let export = read_export(input)?;
    let ctx = FileContext::new(&source).with_account_id(export.account_id);

    let (records, mode) = match resolve_converter(&source, repository)? {
        Some(Converter::Mapping(config)) => {
            debug!(source, "applying mapping config");
            let records = apply_file_mapping(&export.rows, &config, &ctx)
                .with_context(|| format!("mapping config failed for {}", input.display()))?;
            (records, ConvertMode::Config)
        }
        Some(Converter::Normalizer(exchange, mode)) => {
            debug!(source, exchange = exchange.as_str(), "applying normalizer");
            (normalize_file(exchange, &export.rows, &ctx), mode)
        }
        None => {
            warn!(path = %input.display(), source, "no converter for source; skipping");
            return Ok(None);
        }
    };

    let output = write_output(input, output_dir, &records, dry_run)?;
    info!(
        path = %input.display(),
        records = records.len(),
        mode = mode.as_str(),
        "converted"
    );
    Ok(Some(FileOutcome {
        input: input.to_path_buf(),
        source,
        mode,
        records: records.len(),
        output,
    }))
}

enum Converter {
    Mapping(txn_model::FileMappingConfig),
    Normalizer(Exchange, ConvertMode),
}

/// A mapping config for the source wins over its built-in normalizer. A
/// file-mode config must name a known normalizer; anything else is a
/// configuration error, not a silent fallback.
fn resolve_converter(
    source: &str,
    repository: Option<&ConfigRepository>,
) -> Result<Option<Converter>> {
    if let Some(repo) = repository
        && let Some(config) = repo.load(source)?
    {
        if config.is_row_wise() {
            return Ok(Some(Converter::Mapping(config)));
        }
        let Some(name) = config.normalizer.as_deref() else {
            bail!("file-mode config for '{source}' names no normalizer");
        };
        let Some(exchange) = Exchange::from_source(name) else {
            bail!("file-mode config for '{source}' names unknown normalizer '{name}'");
        };
        return Ok(Some(Converter::Normalizer(
            exchange,
            ConvertMode::ConfigNormalizer,
        )));
    }
    Ok(Exchange::from_source(source)
        .map(|exchange| Converter::Normalizer(exchange, ConvertMode::Builtin)))
}

fn write_output(
    input: &Path,
    output_dir: &Path,
    records: &[CanonicalRecord],
    dry_run: bool,
) -> Result<Option<PathBuf>> {
    if dry_run {
        info!(path = %input.display(), records = records.len(), "dry run; not writing");
        return Ok(None);
    }
    let output_path = output_dir.join(output_name(input));
    if write_records(&output_path, records)? {
        Ok(Some(output_path))
    } else {
        Ok(None)
    }
}
