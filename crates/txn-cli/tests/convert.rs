use std::fs;
use std::path::PathBuf;

use txn_cli::pipeline::{ConvertMode, process_file};
use txn_map::ConfigRepository;

fn temp_dir(label: &str) -> PathBuf {
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("txn_cli_{label}_{stamp}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn read_rows(path: &PathBuf) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).expect("open output");
    reader
        .records()
        .map(|record| {
            record
                .expect("record")
                .iter()
                .map(str::to_string)
                .collect()
        })
        .collect()
}

#[test]
fn converts_a_coinbase_export_end_to_end() {
    let root = temp_dir("coinbase");
    let input_dir = root.join("in/coinbase");
    let output_dir = root.join("out");
    fs::create_dir_all(&input_dir).expect("mkdir");
    fs::create_dir_all(&output_dir).expect("mkdir");
    fs::write(
        input_dir.join("account.csv"),
        "Transactions\n\
         User,Jane Doe,ACC123\n\
         \n\
         ID,Timestamp,Transaction Type,Asset,Quantity Transacted,Price Currency,\
         Price at Transaction,Subtotal,Total (inclusive of fees and/or spread),\
         Fees and/or Spread,Notes\n\
         tx1,2023-05-01 10:00:00 UTC,Buy,ETH,1.5,EUR,,2990,3000,10,\n",
    )
    .expect("write input");

    let outcome = process_file(&input_dir.join("account.csv"), &output_dir, None, false)
        .expect("process")
        .expect("outcome");
    assert_eq!(outcome.mode, ConvertMode::Builtin);
    assert_eq!(outcome.records, 1);
    let written = outcome.output.expect("output written");

    let rows = read_rows(&written);
    assert_eq!(rows.len(), 1);
    let record = &rows[0];
    // Id, ExchangeId, timeStamp, Status, Market, Exchange, Side, TransactionType,
    // FilledQuantity, FilledQuote, FilledPrice, Fee, FeeCurrency
    assert_eq!(record[1], "ACC123");
    assert_eq!(record[4], "ETH-EUR");
    assert_eq!(record[6], "BUY");
    assert_eq!(record[7], "TRADE");
    assert_eq!(record[8], "1.5");
    assert_eq!(record[9], "3000");
    assert_eq!(record[10], "2000");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn mapping_config_takes_precedence_over_the_builtin() {
    let root = temp_dir("config");
    let input_dir = root.join("in/nbx");
    let output_dir = root.join("out");
    let config_dir = root.join("configs");
    fs::create_dir_all(&input_dir).expect("mkdir");
    fs::create_dir_all(&output_dir).expect("mkdir");
    fs::create_dir_all(&config_dir).expect("mkdir");

    fs::write(
        input_dir.join("history.csv"),
        "Reference,Status,Amount\nr1,Done,2.5\nr2,Cancelled,9\n",
    )
    .expect("write input");
    fs::write(
        config_dir.join("nbx.json"),
        r#"{
            "skip_when": ["row['Status'] == 'Cancelled'"],
            "mapping": {
                "Id": "concat('NBX-', row['Reference'])",
                "FilledQuantity": "abs_decimal_to_str(decimal(row['Amount']))"
            },
            "defaults": {"Exchange": "NBX", "TransactionType": "TRADE"}
        }"#,
    )
    .expect("write config");

    let repo = ConfigRepository::new(&config_dir);
    let outcome = process_file(
        &input_dir.join("history.csv"),
        &output_dir,
        Some(&repo),
        false,
    )
    .expect("process")
    .expect("outcome");
    assert_eq!(outcome.mode, ConvertMode::Config);
    assert_eq!(outcome.records, 1);

    let rows = read_rows(&outcome.output.expect("output"));
    assert_eq!(rows[0][0], "NBX-r1");
    assert_eq!(rows[0][5], "NBX");
    assert_eq!(rows[0][8], "2.5");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn broken_config_fails_that_file_with_context() {
    let root = temp_dir("broken");
    let input_dir = root.join("in/kraken");
    let output_dir = root.join("out");
    let config_dir = root.join("configs");
    fs::create_dir_all(&input_dir).expect("mkdir");
    fs::create_dir_all(&config_dir).expect("mkdir");

    fs::write(input_dir.join("ledgers.csv"), "A,B\n1,2\n").expect("write input");
    fs::write(
        config_dir.join("kraken.json"),
        r#"{"mapping": {"Id": "row['Missing']"}}"#,
    )
    .expect("write config");

    let repo = ConfigRepository::new(&config_dir);
    let error = process_file(
        &input_dir.join("ledgers.csv"),
        &output_dir,
        Some(&repo),
        false,
    )
    .expect_err("config error");
    let message = format!("{error:#}");
    assert!(message.contains("row['Missing']"));
    assert!(message.contains("column:Id"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn unknown_source_is_skipped_not_an_error() {
    let root = temp_dir("unknown");
    let input_dir = root.join("in/bitstamp");
    fs::create_dir_all(&input_dir).expect("mkdir");
    fs::write(input_dir.join("trades.csv"), "A,B\n1,2\n").expect("write input");

    let outcome = process_file(&input_dir.join("trades.csv"), &root.join("out"), None, false)
        .expect("process");
    assert!(outcome.is_none());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn dry_run_writes_nothing() {
    let root = temp_dir("dry");
    let input_dir = root.join("in/nbx");
    let output_dir = root.join("out");
    fs::create_dir_all(&input_dir).expect("mkdir");
    fs::write(
        input_dir.join("history.csv"),
        "Id,Type,Created,In,In-Currency,Out,Out-Currency,Notes\n\
         n1,Trade,2023-01-01T00:00:00Z,0.5,BTC,100000,NOK,\n",
    )
    .expect("write input");

    let outcome = process_file(&input_dir.join("history.csv"), &output_dir, None, true)
        .expect("process")
        .expect("outcome");
    assert_eq!(outcome.records, 1);
    assert!(outcome.output.is_none());
    assert!(!output_dir.exists());

    let _ = fs::remove_dir_all(&root);
}
