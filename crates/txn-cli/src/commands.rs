//! Command implementations.

use std::fs;

use anyhow::{Context, Result, bail};
use comfy_table::Table;
use tracing::{info, info_span};

use txn_core::exchange::EXCHANGES;
use txn_ingest::find_csv_files;
use txn_map::ConfigRepository;

use crate::cli::ConvertArgs;
use crate::pipeline::{ConvertResult, process_file};
use crate::summary::apply_table_style;

pub fn run_exchanges() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Exchange", "Format"]);
    apply_table_style(&mut table);
    for exchange in EXCHANGES {
        table.add_row(vec![exchange.as_str(), exchange.description()]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_convert(args: &ConvertArgs) -> Result<ConvertResult> {
    let span = info_span!("convert", input = %args.input.display());
    let _guard = span.enter();

    let repository = args.config_dir.as_ref().map(ConfigRepository::new);
    let files = find_csv_files(&args.input)?;
    if files.is_empty() {
        bail!("no CSV files found in {}", args.input.display());
    }
    info!(files = files.len(), "found input files");

    if !args.dry_run {
        fs::create_dir_all(&args.output)
            .with_context(|| format!("create output directory {}", args.output.display()))?;
    }

    let mut result = ConvertResult {
        output_dir: args.output.clone(),
        files: Vec::new(),
        skipped: Vec::new(),
        errors: Vec::new(),
        dry_run: args.dry_run,
    };
    for file in files {
        match process_file(&file, &args.output, repository.as_ref(), args.dry_run) {
            Ok(Some(outcome)) => result.files.push(outcome),
            Ok(None) => result.skipped.push(file),
            Err(error) => result
                .errors
                .push(format!("{}: {error:#}", file.display())),
        }
    }
    Ok(result)
}
