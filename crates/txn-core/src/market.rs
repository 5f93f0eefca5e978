//! Market-symbol formatting and fiat classification.

/// Closed set of government-issued currencies used to disambiguate base vs
/// quote when an export does not say which is which.
pub const FIAT_CURRENCIES: [&str; 7] = ["NOK", "USD", "EUR", "GBP", "SEK", "DKK", "CHF"];

/// Known quote-currency suffixes for concatenated market symbols, longest
/// first so `USDC`/`USDT` win over `USD`.
const QUOTE_SUFFIXES: [&str; 11] = [
    "USDC", "USDT", "NOK", "USD", "EUR", "GBP", "SEK", "DKK", "CHF", "BTC", "ETH",
];

pub fn is_fiat(currency: &str) -> bool {
    let upper = currency.trim().to_uppercase();
    FIAT_CURRENCIES.contains(&upper.as_str())
}

/// Formats a market pair as `BASE-QUOTE`, a bare `BASE` when the quote is
/// empty, or the empty string when both are.
pub fn format_market(base: &str, quote: &str) -> String {
    let base = base.trim().to_uppercase();
    let quote = quote.trim().to_uppercase();
    if base.is_empty() && quote.is_empty() {
        return String::new();
    }
    if quote.is_empty() {
        return base;
    }
    format!("{base}-{quote}")
}

/// Splits a concatenated symbol like `BTCNOK` into base and quote.
///
/// Picks the longest known quote suffix the symbol ends with (and is longer
/// than); otherwise the last three characters are the quote when the symbol
/// is longer than three, else the whole symbol is the base with no quote.
pub fn split_market(symbol: &str) -> (String, Option<String>) {
    let cleaned = symbol.trim().to_uppercase();
    if cleaned.is_empty() {
        return (String::new(), None);
    }
    for quote in QUOTE_SUFFIXES {
        if cleaned.len() > quote.len()
            && let Some(base) = cleaned.strip_suffix(quote)
        {
            return (base.to_string(), Some(quote.to_string()));
        }
    }
    if cleaned.len() > 3 {
        let split = cleaned.len() - 3;
        (cleaned[..split].to_string(), Some(cleaned[split..].to_string()))
    } else {
        (cleaned, None)
    }
}
