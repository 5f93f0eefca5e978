//! Evaluation environment: injected bindings plus the helper library.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use txn_core::decimal::{abs_decimal_to_str, decimal_to_str, parse_decimal};
use txn_core::market::{format_market, is_fiat, split_market};
use txn_core::timestamp::{
    parse_coinbase_timestamp, parse_firi_timestamp, parse_iso_timestamp, parse_kraken_timestamp,
};
use txn_core::{coinbase, nbx, FileContext};
use txn_model::{RawRow, TransactionType};

use crate::error::EvalError;
use crate::value::Value;

/// Bindings visible to mapping expressions. Holds the row, the file context
/// and any precomputed names; helper functions live in a fixed library and
/// are dispatched by name, never stored as values.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: BTreeMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the environment the engine hands to every expression: `row`,
    /// `context` and, when processing row by row, the 1-based `row_number`
    /// alongside the 0-based `row_index`.
    pub fn for_row(row: &RawRow, ctx: &FileContext, row_index: Option<usize>) -> Self {
        let mut env = Self::new();

        let mut fields = BTreeMap::new();
        for (header, value) in row.iter() {
            fields.insert(header.to_string(), Value::str(value));
        }
        env.insert("row", Value::Map(fields));

        let mut context = BTreeMap::new();
        context.insert("source".to_string(), Value::str(ctx.source.clone()));
        if let Some(account_id) = &ctx.account_id {
            context.insert("account_id".to_string(), Value::str(account_id.clone()));
        }
        env.insert("context", Value::Map(context));

        if let Some(index) = row_index {
            env.insert("row_index", Value::Number(Decimal::from(index)));
            env.insert("row_number", Value::Number(Decimal::from(index + 1)));
        }
        env
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Dispatches a helper-library call by name.
    pub fn call(&self, function: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        match function {
            "decimal" => {
                let value = one_arg(function, args)?;
                Ok(match value {
                    Value::Number(n) => Value::Number(n),
                    Value::Null => Value::Null,
                    other => parse_decimal(&other.to_display_string())
                        .map_or(Value::Null, Value::Number),
                })
            }
            "decimal_to_str" => Ok(Value::Str(decimal_to_str(optional_decimal(
                function,
                one_arg(function, args)?,
            )?))),
            "abs_decimal_to_str" => Ok(Value::Str(abs_decimal_to_str(optional_decimal(
                function,
                one_arg(function, args)?,
            )?))),
            "format_market" => {
                let [base, quote] = two_args(function, args)?;
                Ok(Value::Str(format_market(
                    &base.to_display_string(),
                    &quote.to_display_string(),
                )))
            }
            "split_market" => {
                let symbol = one_arg(function, args)?;
                let (base, quote) = split_market(&symbol.to_display_string());
                Ok(Value::List(vec![
                    Value::Str(base),
                    quote.map_or(Value::Null, Value::Str),
                ]))
            }
            "is_fiat" => {
                let currency = one_arg(function, args)?;
                Ok(Value::Bool(is_fiat(&currency.to_display_string())))
            }
            "parse_iso_timestamp" => timestamp_helper(function, args, parse_iso_timestamp),
            "parse_coinbase_timestamp" => {
                timestamp_helper(function, args, parse_coinbase_timestamp)
            }
            "parse_firi_timestamp" => timestamp_helper(function, args, parse_firi_timestamp),
            "parse_kraken_timestamp" => timestamp_helper(function, args, parse_kraken_timestamp),
            "transaction_type" => {
                let label = one_arg(function, args)?;
                Ok(Value::Str(
                    TransactionType::from_label(&label.to_display_string())
                        .as_str()
                        .to_string(),
                ))
            }
            "coinbase_side" => {
                let [label, amount] = two_args(function, args)?;
                let amount = optional_decimal(function, amount)?.unwrap_or(Decimal::ZERO);
                Ok(Value::Str(
                    coinbase::determine_side(&label.to_display_string(), amount)
                        .as_str()
                        .to_string(),
                ))
            }
            "nbx_trade_breakdown" => {
                let row = one_arg(function, args)?;
                let Value::Map(fields) = row else {
                    return Err(EvalError::new("nbx_trade_breakdown expects the row"));
                };
                let raw = RawRow::from_pairs(
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), v.to_display_string())),
                );
                let breakdown = nbx::trade_breakdown(&raw);
                let mut map = BTreeMap::new();
                map.insert(
                    "side".to_string(),
                    Value::str(breakdown.side.as_str()),
                );
                map.insert(
                    "base_amount".to_string(),
                    Value::Number(breakdown.base_amount),
                );
                map.insert(
                    "base_currency".to_string(),
                    Value::Str(breakdown.base_currency),
                );
                map.insert(
                    "quote_amount".to_string(),
                    Value::Number(breakdown.quote_amount),
                );
                map.insert(
                    "quote_currency".to_string(),
                    Value::Str(breakdown.quote_currency),
                );
                Ok(Value::Map(map))
            }
            "abs" => {
                let value = decimal_arg(function, one_arg(function, args)?)?;
                Ok(Value::Number(value.abs()))
            }
            "round" => {
                let mut args = args.into_iter();
                let value = decimal_arg(
                    function,
                    args.next()
                        .ok_or_else(|| EvalError::new("round expects a value"))?,
                )?;
                let places = match args.next() {
                    Some(v) => u32::try_from(
                        decimal_arg(function, v)?.trunc().normalize().mantissa(),
                    )
                    .map_err(|_| EvalError::new("round precision out of range"))?,
                    None => 0,
                };
                // round_dp rounds midpoints half to even
                Ok(Value::Number(value.round_dp(places)))
            }
            "min" | "max" => {
                if args.is_empty() {
                    return Err(EvalError::new(format!("{function} expects arguments")));
                }
                let mut best: Option<Decimal> = None;
                for arg in args {
                    let value = decimal_arg(function, arg)?;
                    best = Some(match best {
                        None => value,
                        Some(current) if function == "min" => current.min(value),
                        Some(current) => current.max(value),
                    });
                }
                // best is always set after at least one argument
                best.map(Value::Number)
                    .ok_or_else(|| EvalError::new(format!("{function} expects arguments")))
            }
            "str" => Ok(Value::Str(one_arg(function, args)?.to_display_string())),
            "len" => {
                let value = one_arg(function, args)?;
                let length = match &value {
                    Value::Str(s) => s.chars().count(),
                    Value::List(items) => items.len(),
                    Value::Map(entries) => entries.len(),
                    other => {
                        return Err(EvalError::new(format!(
                            "len does not apply to {} values",
                            other.type_name()
                        )));
                    }
                };
                Ok(Value::Number(Decimal::from(length)))
            }
            "upper" => Ok(Value::Str(
                one_arg(function, args)?.to_display_string().to_uppercase(),
            )),
            "lower" => Ok(Value::Str(
                one_arg(function, args)?.to_display_string().to_lowercase(),
            )),
            "trim" => Ok(Value::Str(
                one_arg(function, args)?.to_display_string().trim().to_string(),
            )),
            "replace" => {
                let mut args = args.into_iter();
                let (text, from, to) = match (args.next(), args.next(), args.next()) {
                    (Some(a), Some(b), Some(c)) => (a, b, c),
                    _ => return Err(EvalError::new("replace expects three arguments")),
                };
                Ok(Value::Str(text.to_display_string().replace(
                    &from.to_display_string(),
                    &to.to_display_string(),
                )))
            }
            "concat" => {
                let mut out = String::new();
                for arg in args {
                    out.push_str(&arg.to_display_string());
                }
                Ok(Value::Str(out))
            }
            "get" => {
                let mut args = args.into_iter();
                let (container, key) = match (args.next(), args.next()) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Err(EvalError::new("get expects a map and a key")),
                };
                let default = args.next().unwrap_or(Value::Null);
                match (container, key) {
                    (Value::Map(entries), Value::Str(key)) => {
                        Ok(entries.get(&key).cloned().unwrap_or(default))
                    }
                    (container, key) => Err(EvalError::new(format!(
                        "get expects a map and a string key, got {} and {}",
                        container.type_name(),
                        key.type_name()
                    ))),
                }
            }
            other => Err(EvalError::new(format!("unknown function '{other}'"))),
        }
    }
}

fn one_arg(function: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(value), None) => Ok(value),
        _ => Err(EvalError::new(format!("{function} expects one argument"))),
    }
}

fn two_args(function: &str, args: Vec<Value>) -> Result<[Value; 2], EvalError> {
    let mut args = args.into_iter();
    match (args.next(), args.next(), args.next()) {
        (Some(a), Some(b), None) => Ok([a, b]),
        _ => Err(EvalError::new(format!("{function} expects two arguments"))),
    }
}

/// Accepts a number, a numeric string or null where a decimal is wanted.
fn optional_decimal(function: &str, value: Value) -> Result<Option<Decimal>, EvalError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(Some(n)),
        Value::Str(s) => Ok(parse_decimal(&s)),
        other => Err(EvalError::new(format!(
            "{function} expects a number, got {}",
            other.type_name()
        ))),
    }
}

fn decimal_arg(function: &str, value: Value) -> Result<Decimal, EvalError> {
    optional_decimal(function, value)?
        .ok_or_else(|| EvalError::new(format!("{function} expects a number")))
}

fn timestamp_helper(
    function: &str,
    args: Vec<Value>,
    parser: fn(&str) -> String,
) -> Result<Value, EvalError> {
    let raw = one_arg(function, args)?;
    Ok(Value::Str(parser(&raw.to_display_string())))
}
