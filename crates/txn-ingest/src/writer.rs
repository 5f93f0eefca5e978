//! Canonical record serialization.

use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;
use tracing::warn;

use txn_model::{CanonicalRecord, OUTPUT_COLUMNS};

/// Writes records to `path` with the fixed thirteen-column header. A file
/// that produced no records is skipped with a warning rather than leaving
/// an empty shell behind. Returns whether a file was written.
pub fn write_records(path: &Path, records: &[CanonicalRecord]) -> Result<bool> {
    if records.is_empty() {
        warn!(path = %path.display(), "no mapped records; skipping output file");
        return Ok(false);
    }
    let mut writer =
        Writer::from_path(path).with_context(|| format!("create output: {}", path.display()))?;
    writer
        .write_record(OUTPUT_COLUMNS)
        .with_context(|| format!("write header: {}", path.display()))?;
    for record in records {
        writer
            .write_record(record.to_cells())
            .with_context(|| format!("write record: {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush output: {}", path.display()))?;
    Ok(true)
}

/// Output filename convention: `<input stem>_mapped.csv`.
pub fn output_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    format!("{stem}_mapped.csv")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_appends_the_mapped_suffix() {
        assert_eq!(output_name(Path::new("/in/firi/2024.csv")), "2024_mapped.csv");
    }
}
