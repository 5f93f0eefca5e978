//! Firi export normalization.
//!
//! Firi ships three export shapes distinguished only by their headers: a
//! transaction ledger where one trade is split across multiple `Match` legs
//! sharing a `Match ID`, a discrete trade list, and an order list. The
//! ledger shape carries the real reconstruction work: legs are regrouped
//! into atomic trades, base/quote ambiguity is resolved through the fiat
//! set, and the side falls out of the sign of the base leg's net amount.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;

use txn_model::{CanonicalRecord, RawRow, Side, TransactionType};

use crate::context::FileContext;
use crate::decimal::{abs_decimal_to_str, decimal_to_str, parse_decimal};
use crate::market::{format_market, is_fiat, split_market};
use crate::timestamp::parse_firi_timestamp;

const MATCH_ACTION: &str = "Match";
const MATCH_FEE_ACTION: &str = "MatchFee";
const STAKING_REWARD_ACTION: &str = "StakingReward";
const BANK_DEPOSIT_ACTION: &str = "BankDeposit";
const BANK_WITHDRAW_ACTION: &str = "BankWithdrawal";
/// Internal movements that produce no canonical record at all.
const INTERNAL_ACTIONS: [&str; 2] = ["InternalTransfer", "Stake"];

const EXCHANGE: &str = "FIRI";

/// Normalizes one Firi export file, dispatching on which distinguishing
/// header the first row carries. An unrecognized header set yields an empty
/// result, not an error.
pub fn normalize(rows: &[RawRow], _ctx: &FileContext) -> Vec<CanonicalRecord> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    if first.has_header("Action") {
        map_transactions(rows)
    } else if first.has_header("Trade") {
        map_trades(rows)
    } else if first.has_header("Order ID") {
        map_orders(rows)
    } else {
        debug!("unrecognized firi header set; producing no records");
        Vec::new()
    }
}

/// Sums amounts per currency. A `BTreeMap` keeps currency iteration order
/// deterministic regardless of input row order.
fn sum_amounts<'a>(rows: impl Iterator<Item = &'a RawRow>) -> BTreeMap<String, Decimal> {
    let mut totals = BTreeMap::new();
    for row in rows {
        let currency = row.value("Currency").to_uppercase();
        if currency.is_empty() {
            continue;
        }
        let amount = parse_decimal(row.value("Amount")).unwrap_or(Decimal::ZERO);
        *totals.entry(currency).or_insert(Decimal::ZERO) += amount;
    }
    totals
}

/// Picks the currency with the largest absolute summed amount on the wanted
/// side of the fiat split, falling back to the overall largest when no
/// currency matches the filter. Ties go to the lexicographically smallest
/// currency code (the map iterates in code order and only a strictly larger
/// amount replaces the candidate).
fn select_currency(totals: &BTreeMap<String, Decimal>, prefer_fiat: bool) -> (String, Decimal) {
    let mut candidate: Option<(&str, Decimal)> = None;
    for (currency, amount) in totals {
        if is_fiat(currency) != prefer_fiat {
            continue;
        }
        if candidate.is_none_or(|(_, best)| amount.abs() > best.abs()) {
            candidate = Some((currency, *amount));
        }
    }
    if candidate.is_none() {
        for (currency, amount) in totals {
            if candidate.is_none_or(|(_, best)| amount.abs() > best.abs()) {
                candidate = Some((currency, *amount));
            }
        }
    }
    match candidate {
        Some((currency, amount)) => (currency.to_string(), amount),
        None => (String::new(), Decimal::ZERO),
    }
}

fn action(row: &RawRow) -> &str {
    row.value("Action")
}

fn match_id(row: &RawRow) -> &str {
    let id = row.value("Match ID");
    if id.is_empty() { row.value("MatchId") } else { id }
}

/// Groups `Match`/`MatchFee` rows by match id. Membership depends only on
/// the grouping key, so reordering input rows cannot change which record a
/// leg lands in.
fn group_matches(rows: &[RawRow]) -> BTreeMap<String, Vec<&RawRow>> {
    let mut grouped: BTreeMap<String, Vec<&RawRow>> = BTreeMap::new();
    for row in rows {
        if !matches!(action(row), MATCH_ACTION | MATCH_FEE_ACTION) {
            continue;
        }
        let id = match_id(row);
        if id.is_empty() {
            continue;
        }
        grouped.entry(id.to_string()).or_default().push(row);
    }
    grouped
}

fn map_match(id: &str, rows: &[&RawRow]) -> CanonicalRecord {
    let match_rows = rows.iter().copied().filter(|row| action(row) == MATCH_ACTION);
    let fee_rows: Vec<&RawRow> = rows
        .iter()
        .copied()
        .filter(|row| action(row) == MATCH_FEE_ACTION)
        .collect();

    let match_totals = sum_amounts(match_rows);
    let (base_currency, base_amount) = select_currency(&match_totals, false);
    let (quote_currency, quote_amount) = select_currency(&match_totals, true);

    let side = if base_amount >= Decimal::ZERO {
        Side::Buy
    } else {
        Side::Sell
    };
    let filled_quantity = base_amount.abs();
    let filled_quote = quote_amount.abs();

    let price = if !filled_quantity.is_zero() && !filled_quote.is_zero() {
        filled_quote.checked_div(filled_quantity)
    } else {
        None
    };

    let (fee_total, fee_currency) = if fee_rows.is_empty() {
        (Some(Decimal::ZERO), String::new())
    } else {
        let fee_totals = sum_amounts(fee_rows.iter().copied());
        let (currency, total) = select_currency(&fee_totals, true);
        (Some(total.abs()), currency)
    };

    let timestamp = rows
        .iter()
        .map(|row| parse_firi_timestamp(row.value("Created at")))
        .filter(|ts| !ts.is_empty())
        .min()
        .unwrap_or_default();

    let quote_label = if quote_currency.is_empty() {
        "UNKNOWN".to_string()
    } else {
        quote_currency.clone()
    };

    CanonicalRecord {
        id: format!("firi-match-{id}"),
        exchange_id: id.to_string(),
        time_stamp: timestamp,
        status: "COMPLETED".to_string(),
        market: format_market(&base_currency, &quote_label),
        exchange: EXCHANGE.to_string(),
        side: side.as_str().to_string(),
        transaction_type: TransactionType::Trade.as_str().to_string(),
        filled_quantity: abs_decimal_to_str(Some(filled_quantity)),
        filled_quote: abs_decimal_to_str(Some(filled_quote)),
        filled_price: decimal_to_str(price),
        fee: abs_decimal_to_str(fee_total),
        fee_currency,
    }
}

fn map_staking_reward(row: &RawRow) -> CanonicalRecord {
    let currency = row.value("Currency").to_uppercase();
    let amount = parse_decimal(row.value("Amount")).unwrap_or(Decimal::ZERO);
    let tx_id = row.value("Transaction ID");
    CanonicalRecord {
        id: format!("firi-staking-{tx_id}"),
        exchange_id: tx_id.to_string(),
        time_stamp: parse_firi_timestamp(row.value("Created at")),
        status: "COMPLETED".to_string(),
        market: format_market(&currency, "UNKNOWN"),
        exchange: EXCHANGE.to_string(),
        side: Side::Buy.as_str().to_string(),
        transaction_type: TransactionType::StakingReward.as_str().to_string(),
        filled_quantity: abs_decimal_to_str(Some(amount)),
        ..CanonicalRecord::default()
    }
}

fn map_bank_entry(row: &RawRow, transaction_type: TransactionType, side: Side) -> CanonicalRecord {
    let currency = row.value("Currency").to_uppercase();
    let amount = parse_decimal(row.value("Amount")).unwrap_or(Decimal::ZERO);
    let tx_id = row.value("Transaction ID");
    CanonicalRecord {
        id: format!("firi-{}-{tx_id}", side.as_str().to_lowercase()),
        exchange_id: tx_id.to_string(),
        time_stamp: parse_firi_timestamp(row.value("Created at")),
        status: "COMPLETED".to_string(),
        market: currency,
        exchange: EXCHANGE.to_string(),
        side: side.as_str().to_string(),
        transaction_type: transaction_type.as_str().to_string(),
        filled_quantity: abs_decimal_to_str(Some(amount)),
        ..CanonicalRecord::default()
    }
}

fn map_transactions(rows: &[RawRow]) -> Vec<CanonicalRecord> {
    let grouped = group_matches(rows);
    let mut mapped: Vec<CanonicalRecord> = grouped
        .iter()
        .map(|(id, legs)| map_match(id, legs))
        .collect();

    for row in rows {
        let action = action(row);
        if matches!(action, MATCH_ACTION | MATCH_FEE_ACTION) {
            continue;
        }
        if INTERNAL_ACTIONS.contains(&action) {
            continue;
        }
        match action {
            STAKING_REWARD_ACTION => mapped.push(map_staking_reward(row)),
            BANK_DEPOSIT_ACTION => {
                mapped.push(map_bank_entry(row, TransactionType::Deposit, Side::Deposit));
            }
            BANK_WITHDRAW_ACTION => {
                mapped.push(map_bank_entry(
                    row,
                    TransactionType::Withdrawal,
                    Side::Withdraw,
                ));
            }
            other => debug!(action = other, "dropping unrecognized firi action"),
        }
    }

    mapped.sort_by(|a, b| a.time_stamp.cmp(&b.time_stamp));
    mapped
}

fn map_trades(rows: &[RawRow]) -> Vec<CanonicalRecord> {
    let mut mapped = Vec::new();
    for row in rows {
        let trade_id = match row.get("Trade").filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => continue,
        };
        let (base, quote) = split_market(row.value("Market"));
        let price = parse_decimal(row.value("Price"));
        let volume = parse_decimal(row.value("Volume"));
        let cost = parse_decimal(row.value("Cost"));
        let volume_currency = row.value("Volume currency").to_uppercase();

        // Prefer the stated volume when its currency is the base; otherwise
        // derive the base amount as cost/price. Neither path working drops
        // the row.
        let mut base_amount = None;
        if let Some(volume) = volume
            && !volume_currency.is_empty()
            && volume_currency == base
        {
            base_amount = Some(volume);
        }
        if base_amount.is_none()
            && let (Some(cost), Some(price)) = (cost, price)
            && !price.is_zero()
        {
            base_amount = cost.checked_div(price);
        }
        let Some(base_amount) = base_amount else {
            continue;
        };

        let quote_amount = price
            .filter(|price| !price.is_zero() && !base_amount.is_zero())
            .and_then(|price| price.checked_mul(base_amount))
            .or(cost)
            .unwrap_or(Decimal::ZERO);
        let side = if row.value("Order Type").eq_ignore_ascii_case("bid") {
            Side::Buy
        } else {
            Side::Sell
        };
        let quote_label = quote.unwrap_or_else(|| "UNKNOWN".to_string());

        mapped.push(CanonicalRecord {
            id: format!("firi-trade-{trade_id}"),
            exchange_id: trade_id.to_string(),
            time_stamp: parse_firi_timestamp(row.value("Executed")),
            status: "COMPLETED".to_string(),
            market: format_market(&base, &quote_label),
            exchange: EXCHANGE.to_string(),
            side: side.as_str().to_string(),
            transaction_type: TransactionType::Trade.as_str().to_string(),
            filled_quantity: abs_decimal_to_str(Some(base_amount)),
            filled_quote: abs_decimal_to_str(Some(quote_amount)),
            filled_price: decimal_to_str(price),
            ..CanonicalRecord::default()
        });
    }
    mapped.sort_by(|a, b| a.time_stamp.cmp(&b.time_stamp));
    mapped
}

fn map_orders(rows: &[RawRow]) -> Vec<CanonicalRecord> {
    let mut mapped = Vec::new();
    for row in rows {
        let order_id = match row.get("Order ID").filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => continue,
        };
        let (base_market, quote_market) = split_market(row.value("Market"));
        let filled = parse_decimal(row.value("Filled")).unwrap_or(Decimal::ZERO);
        let price = parse_decimal(row.value("Price"));
        let base_currency = {
            let stated = row.value("Filled currency").to_uppercase();
            if stated.is_empty() { base_market } else { stated }
        };
        let filled_quote = price
            .filter(|price| !price.is_zero() && !filled.is_zero())
            .and_then(|price| price.checked_mul(filled));
        let side = if row.value("Order Type").eq_ignore_ascii_case("bid") {
            Side::Buy
        } else {
            Side::Sell
        };
        let quote_label = quote_market.unwrap_or_else(|| "UNKNOWN".to_string());

        mapped.push(CanonicalRecord {
            id: format!("firi-order-{order_id}"),
            exchange_id: order_id.to_string(),
            time_stamp: parse_firi_timestamp(row.value("Created at")),
            status: row.value("Status").to_uppercase(),
            market: format_market(&base_currency, &quote_label),
            exchange: EXCHANGE.to_string(),
            side: side.as_str().to_string(),
            transaction_type: TransactionType::Order.as_str().to_string(),
            filled_quantity: abs_decimal_to_str(Some(filled)),
            filled_quote: abs_decimal_to_str(filled_quote),
            filled_price: decimal_to_str(price),
            ..CanonicalRecord::default()
        });
    }
    mapped.sort_by(|a, b| a.time_stamp.cmp(&b.time_stamp));
    mapped
}
