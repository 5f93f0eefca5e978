//! NBX export normalization.
//!
//! Each row is one typed transaction with separate in/out amount and
//! currency columns. For trades the fiat classification of the two
//! currencies decides which leg is the base and which prices it: fiat in
//! and crypto out is a SELL, crypto in and fiat out a BUY, and ambiguous
//! pairs default to BUY with the in-leg as base.

use rust_decimal::Decimal;

use txn_model::{CanonicalRecord, RawRow, Side, TransactionType};

use crate::context::FileContext;
use crate::decimal::{abs_decimal_to_str, decimal_to_str, parse_decimal};
use crate::market::{format_market, is_fiat};
use crate::timestamp::parse_iso_timestamp;

const EXCHANGE: &str = "NBX";

/// Breakdown of a trade row into sided legs. Also exposed to the mapping
/// engine as a reusable primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeBreakdown {
    pub side: Side,
    pub base_amount: Decimal,
    pub base_currency: String,
    pub quote_amount: Decimal,
    pub quote_currency: String,
}

/// Classifies a trade row's in/out legs into base and quote.
pub fn trade_breakdown(row: &RawRow) -> TradeBreakdown {
    let amount_in = parse_decimal(row.value("In")).unwrap_or(Decimal::ZERO);
    let currency_in = row.value("In-Currency").to_uppercase();
    let amount_out = parse_decimal(row.value("Out")).unwrap_or(Decimal::ZERO);
    let currency_out = row.value("Out-Currency").to_uppercase();

    if is_fiat(&currency_in) && !is_fiat(&currency_out) {
        TradeBreakdown {
            side: Side::Sell,
            base_amount: amount_out,
            base_currency: currency_out,
            quote_amount: amount_in,
            quote_currency: currency_in,
        }
    } else if !is_fiat(&currency_in) && is_fiat(&currency_out) {
        TradeBreakdown {
            side: Side::Buy,
            base_amount: amount_in,
            base_currency: currency_in,
            quote_amount: amount_out,
            quote_currency: currency_out,
        }
    } else {
        let base_is_in = !amount_in.is_zero();
        TradeBreakdown {
            side: Side::Buy,
            base_amount: if base_is_in { amount_in } else { amount_out },
            base_currency: if currency_in.is_empty() {
                currency_out.clone()
            } else {
                currency_in.clone()
            },
            quote_amount: if base_is_in { amount_out } else { amount_in },
            quote_currency: if currency_out.is_empty() {
                currency_in
            } else {
                currency_out
            },
        }
    }
}

fn map_trade(row: &RawRow) -> CanonicalRecord {
    let tx_id = row.value("ID");
    let breakdown = trade_breakdown(row);
    let fee = parse_decimal(row.value("Fee"));
    let fee_currency = row.value("Fee-Currency").to_uppercase();

    let price = if breakdown.base_amount.is_zero() || breakdown.quote_amount.is_zero() {
        None
    } else {
        breakdown
            .quote_amount
            .abs()
            .checked_div(breakdown.base_amount.abs())
    };

    // A populated Notes column states the market directly, e.g. "BTC/NOK".
    let notes = row.value("Notes");
    let market = if notes.is_empty() {
        format_market(&breakdown.base_currency, &breakdown.quote_currency)
    } else {
        notes.replace('/', "-")
    };

    CanonicalRecord {
        id: format!("nbx-{tx_id}"),
        exchange_id: tx_id.to_string(),
        time_stamp: parse_iso_timestamp(row.value("Timestamp")),
        status: "COMPLETED".to_string(),
        market,
        exchange: EXCHANGE.to_string(),
        side: breakdown.side.as_str().to_string(),
        transaction_type: TransactionType::Trade.as_str().to_string(),
        filled_quantity: abs_decimal_to_str(Some(breakdown.base_amount)),
        filled_quote: abs_decimal_to_str(Some(breakdown.quote_amount)),
        filled_price: decimal_to_str(price),
        fee: abs_decimal_to_str(fee),
        fee_currency,
    }
}

fn map_deposit_withdraw(
    row: &RawRow,
    transaction_type: TransactionType,
    side: Side,
) -> CanonicalRecord {
    let tx_id = row.value("ID");
    let amount = parse_decimal(row.value("In"))
        .or_else(|| parse_decimal(row.value("Out")))
        .unwrap_or(Decimal::ZERO);
    let currency = {
        let currency_in = row.value("In-Currency");
        if currency_in.is_empty() {
            row.value("Out-Currency").to_uppercase()
        } else {
            currency_in.to_uppercase()
        }
    };
    let fee = parse_decimal(row.value("Fee"));
    let fee_currency = row.value("Fee-Currency").to_uppercase();

    CanonicalRecord {
        id: format!("nbx-{tx_id}"),
        exchange_id: tx_id.to_string(),
        time_stamp: parse_iso_timestamp(row.value("Timestamp")),
        status: "COMPLETED".to_string(),
        market: currency,
        exchange: EXCHANGE.to_string(),
        side: side.as_str().to_string(),
        transaction_type: transaction_type.as_str().to_string(),
        filled_quantity: abs_decimal_to_str(Some(amount)),
        fee: abs_decimal_to_str(fee),
        fee_currency,
        ..CanonicalRecord::default()
    }
}

/// Normalizes one NBX export. Rows with an unrecognized `Type` are dropped.
pub fn normalize(rows: &[RawRow], _ctx: &FileContext) -> Vec<CanonicalRecord> {
    let mut mapped = Vec::new();
    for row in rows {
        match row.value("Type").to_lowercase().as_str() {
            "trade" => mapped.push(map_trade(row)),
            "deposit" => {
                mapped.push(map_deposit_withdraw(row, TransactionType::Deposit, Side::Deposit));
            }
            "withdraw" => {
                mapped.push(map_deposit_withdraw(
                    row,
                    TransactionType::Withdrawal,
                    Side::Withdraw,
                ));
            }
            _ => {}
        }
    }
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade_row(amount_in: &str, currency_in: &str, amount_out: &str, currency_out: &str) -> RawRow {
        RawRow::from_pairs([
            ("ID", "n-1"),
            ("Type", "Trade"),
            ("Timestamp", "2023-04-01T12:00:00Z"),
            ("In", amount_in),
            ("In-Currency", currency_in),
            ("Out", amount_out),
            ("Out-Currency", currency_out),
        ])
    }

    #[test]
    fn crypto_in_fiat_out_is_a_buy() {
        let ctx = FileContext::new("nbx");
        let records = normalize(&[trade_row("0.5", "ETH", "-10000", "NOK")], &ctx);
        let record = &records[0];
        assert_eq!(record.side, "BUY");
        assert_eq!(record.market, "ETH-NOK");
        assert_eq!(record.filled_quantity, "0.5");
        assert_eq!(record.filled_quote, "10000");
        assert_eq!(record.filled_price, "20000");
    }

    #[test]
    fn fiat_in_crypto_out_is_a_sell() {
        let ctx = FileContext::new("nbx");
        let records = normalize(&[trade_row("10000", "NOK", "-0.5", "ETH")], &ctx);
        assert_eq!(records[0].side, "SELL");
        assert_eq!(records[0].market, "ETH-NOK");
        assert_eq!(records[0].filled_quantity, "0.5");
    }

    #[test]
    fn notes_override_the_market() {
        let ctx = FileContext::new("nbx");
        let mut row = trade_row("0.5", "ETH", "-10000", "NOK");
        row.insert("Notes", "ETH/EUR");
        let records = normalize(&[row], &ctx);
        assert_eq!(records[0].market, "ETH-EUR");
    }

    #[test]
    fn deposit_and_withdraw_rows() {
        let ctx = FileContext::new("nbx");
        let mut deposit = trade_row("5000", "NOK", "", "");
        deposit.insert("Type", "Deposit");
        let mut withdraw = trade_row("", "", "-0.1", "BTC");
        withdraw.insert("Type", "Withdraw");
        let records = normalize(&[deposit, withdraw], &ctx);
        assert_eq!(records[0].transaction_type, "DEPOSIT");
        assert_eq!(records[0].side, "DEPOSIT");
        assert_eq!(records[0].market, "NOK");
        assert_eq!(records[1].transaction_type, "WITHDRAWAL");
        assert_eq!(records[1].side, "WITHDRAW");
        assert_eq!(records[1].filled_quantity, "0.1");
    }

    #[test]
    fn unknown_types_are_dropped() {
        let ctx = FileContext::new("nbx");
        let mut row = trade_row("1", "BTC", "", "");
        row.insert("Type", "Transfer");
        assert!(normalize(&[row], &ctx).is_empty());
    }
}
