//! Input discovery: walking the export tree.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Recursively collects `*.csv` files under `root`, sorted by path so runs
/// are deterministic. An empty or missing root is an error; the caller has
/// nothing to do without inputs.
pub fn find_csv_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("input directory does not exist: {}", root.display());
    }
    let mut files = Vec::new();
    collect(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in
        fs::read_dir(dir).with_context(|| format!("read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            collect(&path, files)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            files.push(path);
        }
    }
    Ok(())
}

/// The source name for a file is its parent directory, lowercased. This is
/// what selects a normalizer or mapping config.
pub fn source_name(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_lowercase()
}
