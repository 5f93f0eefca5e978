//! Per-exchange timestamp normalization.
//!
//! Each exchange export carries its own date grammar. Every parser here
//! tries its known format(s) in order, falls back to a generic ISO-8601
//! parse, and finally returns the original string unmodified; a timestamp
//! parse never fails a row. Successful parses are normalized to UTC in
//! RFC 3339 form.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

fn to_iso(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Generic ISO-8601 parse: RFC 3339 with offset or `Z`, naive date-times
/// with `T` or space separators, and bare dates (midnight UTC).
fn try_parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Normalizes an ISO-8601-ish timestamp, returning the input verbatim when
/// it cannot be parsed.
pub fn parse_iso_timestamp(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    match try_parse_iso(raw) {
        Some(parsed) => to_iso(parsed),
        None => raw.to_string(),
    }
}

/// Account-export timestamps: `YYYY-MM-DD HH:MM:SS UTC` (trailing zone
/// abbreviation), with a generic ISO fallback.
pub fn parse_coinbase_timestamp(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    // chrono cannot parse zone abbreviations; split the trailing token off
    // and treat the remainder as UTC wall time.
    if let Some((head, zone)) = raw.rsplit_once(' ')
        && zone.chars().all(|ch| ch.is_ascii_alphabetic())
        && let Ok(parsed) = NaiveDateTime::parse_from_str(head, "%Y-%m-%d %H:%M:%S")
    {
        return to_iso(parsed.and_utc());
    }
    parse_iso_timestamp(raw)
}

/// Verbose weekday/month timestamps:
/// `Mon Jan 02 2023 15:04:05 GMT+0000 (Coordinated Universal Time)`.
pub fn parse_firi_timestamp(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    // Drop the trailing "(Coordinated Universal Time)" style suffix.
    let head = match raw.find(" (") {
        Some(idx) => raw[..idx].trim_end(),
        None => raw,
    };
    if let Ok(parsed) = DateTime::parse_from_str(head, "%a %b %d %Y %H:%M:%S GMT%z") {
        return to_iso(parsed.with_timezone(&Utc));
    }
    if let Some((front, zone)) = head.rsplit_once(' ')
        && zone.chars().all(|ch| ch.is_ascii_alphabetic())
        && let Ok(parsed) = NaiveDateTime::parse_from_str(front, "%a %b %d %Y %H:%M:%S")
    {
        return to_iso(parsed.and_utc());
    }
    parse_iso_timestamp(raw)
}

/// Ledger timestamps with optional fractional seconds:
/// `YYYY-MM-DD HH:MM:SS.ffff`, naive UTC.
pub fn parse_kraken_timestamp(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return to_iso(parsed.and_utc());
    }
    parse_iso_timestamp(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_parse_normalizes_offsets_to_utc() {
        assert_eq!(
            parse_iso_timestamp("2023-05-01T10:00:00+02:00"),
            "2023-05-01T08:00:00+00:00"
        );
        assert_eq!(
            parse_iso_timestamp("2023-05-01T10:00:00Z"),
            "2023-05-01T10:00:00+00:00"
        );
    }

    #[test]
    fn iso_parse_returns_unparsable_input_verbatim() {
        assert_eq!(parse_iso_timestamp("yesterday"), "yesterday");
        assert_eq!(parse_iso_timestamp(""), "");
    }

    #[test]
    fn coinbase_zone_abbreviation() {
        assert_eq!(
            parse_coinbase_timestamp("2024-03-05 14:30:00 UTC"),
            "2024-03-05T14:30:00+00:00"
        );
    }

    #[test]
    fn firi_verbose_grammar() {
        assert_eq!(
            parse_firi_timestamp("Mon Jan 02 2023 15:04:05 GMT+0000 (Coordinated Universal Time)"),
            "2023-01-02T15:04:05+00:00"
        );
        // Non-UTC offsets are converted.
        assert_eq!(
            parse_firi_timestamp("Mon Jan 02 2023 15:04:05 GMT+0100 (Central European Time)"),
            "2023-01-02T14:04:05+00:00"
        );
    }

    #[test]
    fn kraken_fractional_seconds() {
        assert_eq!(
            parse_kraken_timestamp("2021-06-01 09:30:15.5841"),
            "2021-06-01T09:30:15.584100+00:00"
        );
        assert_eq!(
            parse_kraken_timestamp("2021-06-01 09:30:15"),
            "2021-06-01T09:30:15+00:00"
        );
    }
}
