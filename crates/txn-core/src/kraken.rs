//! Kraken ledger normalization.
//!
//! Ledger rows carry a typed event tag and a reference id linking the two
//! legs of one logical transaction (spend + receive). Rows are grouped by
//! reference id, the group's event type picks the reconstruction rule, and
//! fees are summed across the whole group.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;

use txn_model::{CanonicalRecord, RawRow, Side, TransactionType};

use crate::context::FileContext;
use crate::decimal::{abs_decimal_to_str, decimal_to_str, parse_decimal};
use crate::market::{format_market, is_fiat};
use crate::timestamp::parse_kraken_timestamp;

const EXCHANGE: &str = "KRAKEN";

/// One ledger row with its fields parsed. Owned transiently; never leaves
/// this module.
#[derive(Debug, Clone)]
struct LedgerEntry {
    txid: String,
    refid: String,
    time: String,
    event_type: String,
    asset: String,
    amount: Decimal,
    fee: Decimal,
}

impl LedgerEntry {
    fn from_row(row: &RawRow) -> Self {
        Self {
            txid: row.value("txid").to_string(),
            refid: row.value("refid").to_string(),
            time: parse_kraken_timestamp(row.value("time")),
            event_type: row.value("type").to_lowercase(),
            asset: row.value("asset").to_uppercase(),
            amount: parse_decimal(row.value("amount")).unwrap_or(Decimal::ZERO),
            fee: parse_decimal(row.value("fee")).unwrap_or(Decimal::ZERO),
        }
    }

    fn identifier(&self) -> &str {
        if self.refid.is_empty() {
            &self.txid
        } else {
            &self.refid
        }
    }
}

/// Normalizes one Kraken ledger export. Rows without a `txid` are dropped
/// before grouping.
pub fn normalize(rows: &[RawRow], _ctx: &FileContext) -> Vec<CanonicalRecord> {
    let entries: Vec<LedgerEntry> = rows
        .iter()
        .filter(|row| !row.value("txid").is_empty())
        .map(LedgerEntry::from_row)
        .collect();

    let mut grouped: BTreeMap<String, Vec<&LedgerEntry>> = BTreeMap::new();
    for entry in &entries {
        grouped
            .entry(entry.identifier().to_string())
            .or_default()
            .push(entry);
    }

    let mut mapped = Vec::new();
    for group in grouped.values() {
        let Some(first) = group.first() else {
            continue;
        };
        let record = match first.event_type.as_str() {
            "reward" => map_reward(group),
            "trade" | "spend" | "receive" => map_trade_group(group),
            other => {
                debug!(event_type = other, "dropping unrecognized kraken event");
                None
            }
        };
        if let Some(record) = record {
            mapped.push(record);
        }
    }

    mapped.sort_by(|a, b| a.time_stamp.cmp(&b.time_stamp));
    mapped
}

/// Reward groups emit one AIRDROP record from the first row; an empty asset
/// drops the group.
fn map_reward(group: &[&LedgerEntry]) -> Option<CanonicalRecord> {
    let reward = group.first()?;
    if reward.asset.is_empty() {
        return None;
    }
    let identifier = reward.identifier().to_string();
    let has_fee = !reward.fee.is_zero();
    Some(CanonicalRecord {
        id: format!("kraken-{identifier}"),
        exchange_id: identifier,
        time_stamp: reward.time.clone(),
        status: "COMPLETED".to_string(),
        market: reward.asset.clone(),
        exchange: EXCHANGE.to_string(),
        side: Side::Buy.as_str().to_string(),
        transaction_type: TransactionType::Airdrop.as_str().to_string(),
        filled_quantity: abs_decimal_to_str(Some(reward.amount)),
        fee: if has_fee {
            abs_decimal_to_str(Some(reward.fee))
        } else {
            String::new()
        },
        fee_currency: if has_fee {
            reward.asset.clone()
        } else {
            String::new()
        },
        ..CanonicalRecord::default()
    })
}

/// Trade/spend/receive groups pair the first positive-amount row (receive
/// leg) with the first negative-amount row (spend leg). When both legs are
/// present the fiat-tagged one prices the other: crypto spent for fiat is a
/// SELL, everything else a BUY.
fn map_trade_group(group: &[&LedgerEntry]) -> Option<CanonicalRecord> {
    let receive = group.iter().find(|entry| entry.amount > Decimal::ZERO);
    let spend = group.iter().find(|entry| entry.amount < Decimal::ZERO);

    let (side, base, quote) = match (receive, spend) {
        (Some(receive), Some(spend)) => {
            if is_fiat(&receive.asset) && !is_fiat(&spend.asset) {
                (Side::Sell, *spend, Some(*receive))
            } else {
                (Side::Buy, *receive, Some(*spend))
            }
        }
        (None, Some(spend)) => (Side::Sell, *spend, None),
        (Some(receive), None) => (Side::Buy, *receive, None),
        (None, None) => return None,
    };

    let identifier = base.identifier().to_string();

    let mut timestamp = base.time.clone();
    if timestamp.is_empty()
        && let Some(receive) = receive
    {
        timestamp = receive.time.clone();
    }
    if timestamp.is_empty()
        && let Some(spend) = spend
    {
        timestamp = spend.time.clone();
    }

    let base_amount = base.amount.abs();
    let quote_amount = quote.map(|entry| entry.amount.abs());
    let quote_currency = quote.map(|entry| entry.asset.clone()).unwrap_or_default();

    let price = match quote_amount {
        Some(quote_amount) if !base_amount.is_zero() && !quote_amount.is_zero() => {
            quote_amount.checked_div(base_amount)
        }
        _ => None,
    };

    let fee_total: Decimal = group.iter().map(|entry| entry.fee).sum();
    let fee_currency = if fee_total.is_zero() {
        String::new()
    } else if quote_currency.is_empty() {
        base.asset.clone()
    } else {
        quote_currency.clone()
    };

    Some(CanonicalRecord {
        id: format!("kraken-{identifier}"),
        exchange_id: identifier,
        time_stamp: timestamp,
        status: "COMPLETED".to_string(),
        market: format_market(&base.asset, &quote_currency),
        exchange: EXCHANGE.to_string(),
        side: side.as_str().to_string(),
        transaction_type: TransactionType::Trade.as_str().to_string(),
        filled_quantity: abs_decimal_to_str(Some(base_amount)),
        filled_quote: quote_amount.map(|v| abs_decimal_to_str(Some(v))).unwrap_or_default(),
        filled_price: decimal_to_str(price),
        fee: if fee_total.is_zero() {
            String::new()
        } else {
            abs_decimal_to_str(Some(fee_total))
        },
        fee_currency,
        ..CanonicalRecord::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_row(
        txid: &str,
        refid: &str,
        event_type: &str,
        asset: &str,
        amount: &str,
        fee: &str,
    ) -> RawRow {
        RawRow::from_pairs([
            ("txid", txid),
            ("refid", refid),
            ("time", "2021-06-01 09:30:15.5841"),
            ("type", event_type),
            ("asset", asset),
            ("amount", amount),
            ("fee", fee),
        ])
    }

    #[test]
    fn reward_rows_become_airdrops() {
        let ctx = FileContext::new("kraken");
        let rows = vec![ledger_row("t1", "r1", "reward", "ETH", "0.02", "0")];
        let records = normalize(&rows, &ctx);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, "kraken-r1");
        assert_eq!(record.transaction_type, "AIRDROP");
        assert_eq!(record.side, "BUY");
        assert_eq!(record.filled_quantity, "0.02");
        assert_eq!(record.market, "ETH");
        assert_eq!(record.fee, "");
    }

    #[test]
    fn reward_fee_passes_through_in_reward_asset() {
        let ctx = FileContext::new("kraken");
        let rows = vec![ledger_row("t1", "r1", "reward", "ETH", "0.02", "0.0001")];
        let records = normalize(&rows, &ctx);
        assert_eq!(records[0].fee, "0.0001");
        assert_eq!(records[0].fee_currency, "ETH");
    }

    #[test]
    fn reward_with_empty_asset_is_dropped() {
        let ctx = FileContext::new("kraken");
        let rows = vec![ledger_row("t1", "r1", "reward", "", "0.02", "0")];
        assert!(normalize(&rows, &ctx).is_empty());
    }

    #[test]
    fn spend_receive_pair_with_fiat_receive_is_a_sell() {
        let ctx = FileContext::new("kraken");
        let rows = vec![
            ledger_row("t1", "r1", "spend", "BTC", "-0.1", "0"),
            ledger_row("t2", "r1", "receive", "EUR", "2500", "1.5"),
        ];
        let records = normalize(&rows, &ctx);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, "kraken-r1");
        assert_eq!(record.exchange_id, "r1");
        assert_eq!(record.side, "SELL");
        assert_eq!(record.market, "BTC-EUR");
        assert_eq!(record.filled_quantity, "0.1");
        assert_eq!(record.filled_quote, "2500");
        assert_eq!(record.filled_price, "25000");
        assert_eq!(record.fee, "1.5");
        assert_eq!(record.fee_currency, "EUR");
    }

    #[test]
    fn fiat_spend_for_crypto_is_a_buy() {
        let ctx = FileContext::new("kraken");
        let rows = vec![
            ledger_row("t1", "r2", "trade", "EUR", "-1000", "0"),
            ledger_row("t2", "r2", "trade", "ETH", "0.5", "0"),
        ];
        let records = normalize(&rows, &ctx);
        assert_eq!(records[0].side, "BUY");
        assert_eq!(records[0].market, "ETH-EUR");
        assert_eq!(records[0].filled_price, "2000");
    }

    #[test]
    fn lone_spend_leg_is_a_sell_without_quote() {
        let ctx = FileContext::new("kraken");
        let rows = vec![ledger_row("t1", "r3", "spend", "BTC", "-0.05", "0")];
        let records = normalize(&rows, &ctx);
        assert_eq!(records[0].side, "SELL");
        assert_eq!(records[0].market, "BTC");
        assert_eq!(records[0].filled_quote, "");
        assert_eq!(records[0].filled_price, "");
    }

    #[test]
    fn rows_without_txid_are_dropped() {
        let ctx = FileContext::new("kraken");
        let rows = vec![ledger_row("", "r1", "trade", "BTC", "-0.1", "0")];
        assert!(normalize(&rows, &ctx).is_empty());
    }

    #[test]
    fn unrecognized_event_tags_emit_nothing() {
        let ctx = FileContext::new("kraken");
        let rows = vec![ledger_row("t1", "r1", "transfer", "BTC", "0.1", "0")];
        assert!(normalize(&rows, &ctx).is_empty());
    }

    #[test]
    fn txid_is_the_grouping_fallback() {
        let ctx = FileContext::new("kraken");
        let rows = vec![
            ledger_row("t1", "", "receive", "ETH", "1", "0"),
            ledger_row("t2", "", "receive", "BTC", "2", "0"),
        ];
        let records = normalize(&rows, &ctx);
        assert_eq!(records.len(), 2);
    }
}
