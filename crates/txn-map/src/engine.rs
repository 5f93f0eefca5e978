//! The row mapping engine: configuration-driven normalization.

use tracing::trace;

use txn_core::FileContext;
use txn_model::{CanonicalRecord, FileMappingConfig, RawRow, OUTPUT_COLUMNS};

use crate::env::Environment;
use crate::error::{EvalError, MapError, MapTarget};
use crate::expr::evaluate;

/// Applies a file mapping config to one row.
///
/// Precompute entries bind first, in declared order, and are visible to
/// every later expression. A truthy `skip_when` predicate short-circuits
/// the row to `None` before any column is evaluated. Otherwise every
/// output column gets its mapped expression, its default, or the empty
/// string, normalized to cell form.
pub fn apply_row_mapping(
    row: &RawRow,
    config: &FileMappingConfig,
    ctx: &FileContext,
    row_index: usize,
) -> Result<Option<CanonicalRecord>, MapError> {
    let mut env = Environment::for_row(row, ctx, Some(row_index));

    for entry in &config.precompute {
        let value = evaluate(&entry.expr, &env).map_err(|err| {
            attach(err, &entry.expr, MapTarget::Precompute(entry.name.clone()), row_index)
        })?;
        env.insert(entry.name.clone(), value);
    }

    for (position, predicate) in config.skip_when.iter().enumerate() {
        let value = evaluate(predicate, &env)
            .map_err(|err| attach(err, predicate, MapTarget::SkipWhen(position), row_index))?;
        if value.is_truthy() {
            trace!(row = row_index, predicate, "row skipped");
            return Ok(None);
        }
    }

    let mut record = CanonicalRecord::default();
    for column in OUTPUT_COLUMNS {
        let value = if let Some(expression) = config.mapping.get(column) {
            let value = evaluate(expression, &env).map_err(|err| {
                attach(err, expression, MapTarget::Column(column.to_string()), row_index)
            })?;
            value.into_output().map_err(|message| MapError {
                expression: expression.clone(),
                target: MapTarget::Column(column.to_string()),
                row_index,
                message,
            })?
        } else {
            config.defaults.get(column).cloned().unwrap_or_default()
        };
        record.set(column, value.trim().to_string());
    }
    Ok(Some(record))
}

/// Applies the config row by row, collecting the records that survive the
/// skip predicates. The first configuration error aborts this file.
pub fn apply_file_mapping(
    rows: &[RawRow],
    config: &FileMappingConfig,
    ctx: &FileContext,
) -> Result<Vec<CanonicalRecord>, MapError> {
    let mut records = Vec::new();
    for (row_index, row) in rows.iter().enumerate() {
        if let Some(record) = apply_row_mapping(row, config, ctx, row_index)? {
            records.push(record);
        }
    }
    Ok(records)
}

fn attach(err: EvalError, expression: &str, target: MapTarget, row_index: usize) -> MapError {
    MapError {
        expression: expression.to_string(),
        target,
        row_index,
        message: err.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txn_model::PrecomputeEntry;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        RawRow::from_pairs(pairs.iter().copied())
    }

    fn config(
        precompute: &[(&str, &str)],
        skip_when: &[&str],
        mapping: &[(&str, &str)],
        defaults: &[(&str, &str)],
    ) -> FileMappingConfig {
        FileMappingConfig {
            precompute: precompute
                .iter()
                .map(|(name, expr)| PrecomputeEntry {
                    name: (*name).to_string(),
                    expr: (*expr).to_string(),
                })
                .collect(),
            skip_when: skip_when.iter().map(|s| (*s).to_string()).collect(),
            mapping: mapping
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            defaults: defaults
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            ..FileMappingConfig::default()
        }
    }

    #[test]
    fn maps_columns_with_defaults_for_the_rest() {
        let cfg = config(
            &[],
            &[],
            &[
                ("Id", "concat('NBX-', row_number)"),
                ("FilledQuantity", "abs_decimal_to_str(decimal(row['In']))"),
            ],
            &[("Exchange", "NBX"), ("Status", "COMPLETED")],
        );
        let ctx = FileContext::new("nbx");
        let record = apply_row_mapping(&row(&[("In", "-1.50")]), &cfg, &ctx, 0)
            .unwrap()
            .unwrap();
        assert_eq!(record.id, "NBX-1");
        assert_eq!(record.filled_quantity, "1.5");
        assert_eq!(record.exchange, "NBX");
        assert_eq!(record.status, "COMPLETED");
        assert_eq!(record.market, "");
    }

    #[test]
    fn skip_when_wins_over_invalid_mappings() {
        // The mapping expression would fail, but the skip fires first.
        let cfg = config(
            &[],
            &["row['Status'] == 'Cancelled'"],
            &[("Id", "unknown_function()")],
            &[],
        );
        let ctx = FileContext::new("test");
        let result = apply_row_mapping(&row(&[("Status", "Cancelled")]), &cfg, &ctx, 0).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn precompute_binds_in_declared_order() {
        let cfg = config(
            &[
                ("base_amount", "decimal(row['Amount'])"),
                ("doubled", "base_amount * 2"),
            ],
            &[],
            &[("FilledQuantity", "decimal_to_str(doubled)")],
            &[],
        );
        let ctx = FileContext::new("test");
        let record = apply_row_mapping(&row(&[("Amount", "2.5")]), &cfg, &ctx, 0)
            .unwrap()
            .unwrap();
        assert_eq!(record.filled_quantity, "5");
    }

    #[test]
    fn evaluation_failures_name_the_target_and_row() {
        let cfg = config(&[], &[], &[("Fee", "row['Missing']")], &[]);
        let ctx = FileContext::new("test");
        let err = apply_row_mapping(&row(&[("A", "1")]), &cfg, &ctx, 3).unwrap_err();
        assert_eq!(err.target, MapTarget::Column("Fee".to_string()));
        assert_eq!(err.row_index, 3);
        assert!(err.to_string().contains("row['Missing']"));
    }

    #[test]
    fn composite_results_are_configuration_errors() {
        let cfg = config(&[], &[], &[("Market", "split_market(row['Pair'])")], &[]);
        let ctx = FileContext::new("test");
        let err = apply_row_mapping(&row(&[("Pair", "BTC-NOK")]), &cfg, &ctx, 0).unwrap_err();
        assert!(err.message.contains("cannot be written"));
    }

    #[test]
    fn context_and_row_number_are_visible() {
        let cfg = config(
            &[],
            &[],
            &[
                ("ExchangeId", "get(context, 'account_id', '')"),
                ("Id", "concat(upper(context['source']), '-', row_number)"),
            ],
            &[],
        );
        let ctx = FileContext::new("coinbase").with_account_id(Some("ACC123".to_string()));
        let record = apply_row_mapping(&row(&[("A", "1")]), &cfg, &ctx, 1)
            .unwrap()
            .unwrap();
        assert_eq!(record.exchange_id, "ACC123");
        assert_eq!(record.id, "COINBASE-2");
    }

    #[test]
    fn file_mapping_keeps_only_unskipped_rows() {
        let cfg = config(
            &[],
            &["row['Status'] == 'Cancelled'"],
            &[("Id", "concat('K-', row['Ref'])")],
            &[],
        );
        let ctx = FileContext::new("test");
        let rows = vec![
            row(&[("Ref", "1"), ("Status", "Done")]),
            row(&[("Ref", "2"), ("Status", "Cancelled")]),
            row(&[("Ref", "3"), ("Status", "Done")]),
        ];
        let records = apply_file_mapping(&rows, &cfg, &ctx).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["K-1", "K-3"]);
    }
}
