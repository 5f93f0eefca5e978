//! File-system repository for mapping configurations.
//!
//! Configs are JSON files named after the source they apply to:
//! `{source}.json` inside the configured directory. A config for a source
//! takes precedence over that source's built-in normalizer.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use txn_model::FileMappingConfig;

/// Directory-backed store of per-source mapping configs.
#[derive(Debug, Clone)]
pub struct ConfigRepository {
    base_dir: PathBuf,
}

impl ConfigRepository {
    /// Opens a repository rooted at `base_dir`. The directory does not have
    /// to exist; a missing directory simply holds no configs.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn config_path(&self, source: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", source.to_lowercase()))
    }

    /// Loads the config for a source, if one exists. A present but invalid
    /// config is an error, not a silent fallback to the built-in path.
    pub fn load(&self, source: &str) -> Result<Option<FileMappingConfig>> {
        let path = self.config_path(source);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read mapping config {}", path.display()))?;
        let config: FileMappingConfig = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse mapping config {}", path.display()))?;
        debug!(source, path = %path.display(), "loaded mapping config");
        Ok(Some(config))
    }

    /// Lists the sources with a config present, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut sources = Vec::new();
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(sources),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read config directory {}", self.base_dir.display())
                });
            }
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                sources.push(stem.to_lowercase());
            }
        }
        sources.sort();
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("txn-map-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn missing_config_is_none() {
        let repo = ConfigRepository::new(temp_dir("missing"));
        assert!(repo.load("firi").expect("load").is_none());
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let repo = ConfigRepository::new("/nonexistent/mapping-configs");
        assert!(repo.list().expect("list").is_empty());
    }

    #[test]
    fn loads_and_lists_configs() {
        let dir = temp_dir("round");
        fs::write(
            dir.join("nbx.json"),
            r#"{"mapping": {"Exchange": "'NBX'"}}"#,
        )
        .expect("write config");
        let repo = ConfigRepository::new(&dir);

        let config = repo.load("NBX").expect("load").expect("config present");
        assert_eq!(config.mapping.get("Exchange").map(String::as_str), Some("'NBX'"));
        assert_eq!(repo.list().expect("list"), vec!["nbx".to_string()]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn invalid_config_is_an_error() {
        let dir = temp_dir("invalid");
        fs::write(dir.join("firi.json"), "{not json").expect("write config");
        let repo = ConfigRepository::new(&dir);
        assert!(repo.load("firi").is_err());
        fs::remove_dir_all(&dir).ok();
    }
}
