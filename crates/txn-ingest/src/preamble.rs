//! Account-export preamble handling.
//!
//! Some account exports carry a metadata block before the real CSV header:
//! a `User,<name>,<account id>` line followed, some lines later, by the
//! `ID,...` header. The scan strips that block and recovers the account id
//! so the normalizer can use it as the exchange-side identifier.

/// Result of scanning a file's text for a metadata preamble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreambleScan<'a> {
    /// The CSV portion, starting at the real header line.
    pub data: &'a str,
    /// Account id from a `User,` metadata line, when present.
    pub account_id: Option<String>,
}

/// Scans for a `User,` metadata line ahead of an `ID,` header. Files
/// without the metadata line pass through untouched; a metadata line with
/// no following header yields no data rows at all.
pub fn scan(content: &str) -> PreambleScan<'_> {
    let mut account_id = None;
    let mut saw_user_line = false;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let stripped = line.trim();
        if stripped.starts_with("User,") {
            saw_user_line = true;
            let mut cells = stripped.split(',').map(str::trim);
            account_id = cells.nth(2).filter(|id| !id.is_empty()).map(String::from);
        }
        if saw_user_line && stripped.starts_with("ID,") {
            return PreambleScan {
                data: &content[offset..],
                account_id,
            };
        }
        offset += line.len();
    }

    if saw_user_line {
        // Metadata but no recognizable header; nothing to parse.
        PreambleScan {
            data: "",
            account_id,
        }
    } else {
        PreambleScan {
            data: content,
            account_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_plain_files_through() {
        let content = "Id,Market\n1,BTC-NOK\n";
        let scan = scan(content);
        assert_eq!(scan.data, content);
        assert_eq!(scan.account_id, None);
    }

    #[test]
    fn strips_metadata_and_captures_account_id() {
        let content = "Transactions\nUser,Jane Doe,ACC123\n\nID,Type,Asset\ntx1,Buy,ETH\n";
        let scan = scan(content);
        assert!(scan.data.starts_with("ID,Type,Asset"));
        assert_eq!(scan.account_id.as_deref(), Some("ACC123"));
    }

    #[test]
    fn metadata_without_header_yields_no_data() {
        let content = "User,Jane Doe,ACC123\nsome,other,noise\n";
        let scan = scan(content);
        assert_eq!(scan.data, "");
        assert_eq!(scan.account_id.as_deref(), Some("ACC123"));
    }

    #[test]
    fn empty_account_cell_is_none() {
        let content = "User,Jane Doe,\nID,Type\ntx1,Buy\n";
        let scan = scan(content);
        assert_eq!(scan.account_id, None);
        assert!(scan.data.starts_with("ID,Type"));
    }
}
