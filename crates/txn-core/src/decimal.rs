//! Exact decimal parsing and formatting for exchange amounts.
//!
//! Export files disagree on separators: some use `,` as the decimal point,
//! some as a thousands separator, and amounts may carry currency symbols or
//! stray whitespace. All amount math runs on `rust_decimal::Decimal`;
//! binary floats never touch amounts because exchange quantities must
//! round-trip exactly.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Parses a raw cell into a decimal, returning `None` for empty or
/// unparsable input.
///
/// Everything except digits, `,`, `.`, and `-` is stripped first. A comma is
/// treated as the decimal separator only when no `.` is present; otherwise
/// commas are thousands separators and are removed.
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|ch| ch.is_ascii_digit() || matches!(ch, ',' | '.' | '-'))
        .collect();
    if cleaned.is_empty() || matches!(cleaned.as_str(), "-" | "." | "-.") {
        return None;
    }
    let cleaned = if cleaned.contains(',') && !cleaned.contains('.') {
        cleaned.replace(',', ".")
    } else {
        cleaned.replace(',', "")
    };
    // Decimal::from_str rejects a bare leading dot.
    let cleaned = if let Some(rest) = cleaned.strip_prefix("-.") {
        format!("-0.{rest}")
    } else if let Some(rest) = cleaned.strip_prefix('.') {
        format!("0.{rest}")
    } else {
        cleaned
    };
    Decimal::from_str(&cleaned).ok()
}

/// Fixed-point formatting with trailing fractional zeros (and a trailing
/// decimal point) trimmed. `None` formats as the empty string; exact zero
/// formats as `"0"`.
pub fn decimal_to_str(value: Option<Decimal>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    let text = value.normalize().to_string();
    if text == "-0" { "0".to_string() } else { text }
}

/// Absolute value, then [`decimal_to_str`].
pub fn abs_decimal_to_str(value: Option<Decimal>) -> String {
    decimal_to_str(value.map(|v| v.abs()))
}
