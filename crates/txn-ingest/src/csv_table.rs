//! CSV reading into raw rows.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use tracing::debug;

use txn_model::RawRow;

use crate::preamble;

/// One parsed export: header-keyed rows plus any preamble metadata.
#[derive(Debug, Clone, Default)]
pub struct CsvExport {
    pub rows: Vec<RawRow>,
    pub account_id: Option<String>,
}

fn normalize_cell(raw: &str) -> &str {
    raw.trim().trim_matches('\u{feff}')
}

/// Picks the delimiter by counting candidates in the header line.
/// European exports regularly use semicolons.
fn detect_delimiter(data: &str) -> u8 {
    let header = data.lines().next().unwrap_or_default();
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons > commas { b';' } else { b',' }
}

/// Reads one export file into raw rows.
///
/// The header row keys every following row; short rows are padded with
/// empty cells and fully empty rows are dropped. A metadata preamble, when
/// present, is stripped first.
pub fn read_export(path: &Path) -> Result<CsvExport> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read csv: {}", path.display()))?;
    let scan = preamble::scan(&content);
    if scan.data.trim().is_empty() {
        return Ok(CsvExport {
            rows: Vec::new(),
            account_id: scan.account_id,
        });
    }

    let delimiter = detect_delimiter(scan.data);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(scan.data.as_bytes());

    let mut headers: Vec<String> = Vec::new();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("read record: {}", path.display()))?;
        if headers.is_empty() {
            headers = record
                .iter()
                .map(|cell| normalize_cell(cell).to_string())
                .collect();
            continue;
        }
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row = RawRow::from_pairs(headers.iter().enumerate().map(|(idx, header)| {
            (
                header.as_str(),
                record.get(idx).map(normalize_cell).unwrap_or(""),
            )
        }));
        rows.push(row);
    }

    debug!(
        path = %path.display(),
        rows = rows.len(),
        delimiter = %(delimiter as char),
        "read export"
    );
    Ok(CsvExport {
        rows,
        account_id: scan.account_id,
    })
}
