//! Coinbase account-export normalization.
//!
//! Account exports start with a metadata preamble (handled by ingest, which
//! hands the account id over via [`FileContext`]); every remaining row is
//! one transaction. The side comes from a substring match on the label,
//! falling back to the sign of the quantity when the label says neither.

use rust_decimal::Decimal;

use txn_model::{CanonicalRecord, RawRow, Side, TransactionType};

use crate::context::FileContext;
use crate::decimal::{abs_decimal_to_str, decimal_to_str, parse_decimal};
use crate::market::format_market;
use crate::timestamp::parse_coinbase_timestamp;

const EXCHANGE: &str = "COINBASE";

/// Infers the side from an account-export transaction label, falling back
/// to the quantity sign. Also exposed to the mapping engine.
pub fn determine_side(label: &str, quantity: Decimal) -> Side {
    let lower = label.to_lowercase();
    if lower.contains("withdraw") {
        Side::Withdraw
    } else if lower.contains("deposit") {
        Side::Deposit
    } else if lower.contains("sell") || quantity < Decimal::ZERO {
        Side::Sell
    } else {
        Side::Buy
    }
}

/// Normalizes account-export rows. Rows without an `ID` are dropped.
pub fn normalize(rows: &[RawRow], ctx: &FileContext) -> Vec<CanonicalRecord> {
    let mut mapped = Vec::new();
    for row in rows {
        let tx_id = match row.get("ID").filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => continue,
        };
        let label = row.value("Transaction Type");
        let asset = row.value("Asset").to_uppercase();
        let price_currency = row.value("Price Currency").to_uppercase();
        let quantity = parse_decimal(row.value("Quantity Transacted")).unwrap_or(Decimal::ZERO);
        let subtotal = parse_decimal(row.value("Subtotal"));
        let total = parse_decimal(row.value("Total (inclusive of fees and/or spread)"));
        let fee = parse_decimal(row.value("Fees and/or Spread")).filter(|v| !v.is_zero());
        let explicit_price =
            parse_decimal(row.value("Price at Transaction")).filter(|v| !v.is_zero());

        let filled_quantity = quantity.abs();
        let filled_quote = total.or(subtotal).unwrap_or(Decimal::ZERO).abs();

        let price = explicit_price.or_else(|| {
            if filled_quantity.is_zero() || filled_quote.is_zero() {
                None
            } else {
                filled_quote.checked_div(filled_quantity)
            }
        });

        let side = determine_side(label, quantity);
        let fee_currency = if fee.is_some() {
            price_currency.clone()
        } else {
            String::new()
        };

        mapped.push(CanonicalRecord {
            id: format!("coinbase-{tx_id}"),
            exchange_id: ctx
                .account_id
                .clone()
                .unwrap_or_else(|| tx_id.to_string()),
            time_stamp: parse_coinbase_timestamp(row.value("Timestamp")),
            status: "COMPLETED".to_string(),
            market: format_market(&asset, &price_currency),
            exchange: EXCHANGE.to_string(),
            side: side.as_str().to_string(),
            transaction_type: TransactionType::from_label(label).as_str().to_string(),
            filled_quantity: abs_decimal_to_str(Some(filled_quantity)),
            filled_quote: abs_decimal_to_str(Some(filled_quote)),
            filled_price: decimal_to_str(price),
            fee: abs_decimal_to_str(fee),
            fee_currency,
        });
    }
    mapped
}
