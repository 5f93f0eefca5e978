//! Per-file call context handed to a normalizer.

/// File-level metadata accompanying the raw rows. Owned per call; nothing
/// here outlives one file's normalization.
#[derive(Debug, Clone, Default)]
pub struct FileContext {
    /// Source name, usually the export's parent directory.
    pub source: String,
    /// Account identifier recovered from a file preamble, when present.
    pub account_id: Option<String>,
}

impl FileContext {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            account_id: None,
        }
    }

    pub fn with_account_id(mut self, account_id: Option<String>) -> Self {
        self.account_id = account_id;
        self
    }
}
