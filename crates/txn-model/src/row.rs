//! Raw source rows as read from an export file.

/// One raw row: trimmed header → trimmed value pairs, preserving the source
/// column order. Lookup is by header name; the order only matters for the
/// header-based format dispatch in the normalizers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Builds a row from header/value pairs, trimming both sides. Empty
    /// header names are dropped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut row = Self::new();
        for (header, value) in pairs {
            row.insert(header.as_ref(), value.as_ref());
        }
        row
    }

    /// Inserts or replaces a field. Used by readers and for engine-injected
    /// synthetic fields such as a derived `Id`.
    pub fn insert(&mut self, header: &str, value: &str) {
        let header = header.trim();
        if header.is_empty() {
            return;
        }
        let value = value.trim();
        if let Some(slot) = self.fields.iter_mut().find(|(name, _)| name == header) {
            slot.1 = value.to_string();
        } else {
            self.fields.push((header.to_string(), value.to_string()));
        }
    }

    /// Returns the trimmed value for a header, or `None` when the column is
    /// absent. Rows are narrow; a linear scan is fine.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == header)
            .map(|(_, value)| value.as_str())
    }

    /// Like [`get`](Self::get) but treats an absent column as empty.
    pub fn value(&self, header: &str) -> &str {
        self.get(header).unwrap_or_default()
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn has_header(&self, header: &str) -> bool {
        self.get(header).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.iter().all(|(_, value)| value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_preserves_order() {
        let row = RawRow::from_pairs([(" Action ", " Match "), ("Amount", "0.5"), ("", "x")]);
        assert_eq!(row.get("Action"), Some("Match"));
        assert_eq!(row.value("Amount"), "0.5");
        let headers: Vec<&str> = row.headers().collect();
        assert_eq!(headers, vec!["Action", "Amount"]);
    }

    #[test]
    fn insert_replaces_existing_value() {
        let mut row = RawRow::from_pairs([("Id", "a")]);
        row.insert("Id", "b");
        assert_eq!(row.get("Id"), Some("b"));
        assert_eq!(row.headers().count(), 1);
    }
}
