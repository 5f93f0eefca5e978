use std::fs;
use std::path::PathBuf;

use txn_ingest::{find_csv_files, read_export, source_name, write_records};
use txn_model::{CanonicalRecord, OUTPUT_COLUMNS};

fn temp_dir(label: &str) -> PathBuf {
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("txn_ingest_{label}_{stamp}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn temp_file(label: &str, name: &str, contents: &str) -> PathBuf {
    let dir = temp_dir(label);
    let path = dir.join(name);
    fs::write(&path, contents).expect("write file");
    path
}

#[test]
fn reads_header_keyed_rows_and_pads_short_ones() {
    let path = temp_file("basic", "basic.csv", "A,B,C\n1,x\n2,y,z\n\n");
    let export = read_export(&path).expect("read export");
    assert_eq!(export.account_id, None);
    assert_eq!(export.rows.len(), 2);
    assert_eq!(export.rows[0].value("A"), "1");
    assert_eq!(export.rows[0].value("C"), "");
    assert_eq!(export.rows[1].value("C"), "z");

    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn detects_semicolon_delimited_exports() {
    let path = temp_file("semi", "semi.csv", "Id;Market;Price\n1;BTC-NOK;500000\n");
    let export = read_export(&path).expect("read export");
    assert_eq!(export.rows.len(), 1);
    assert_eq!(export.rows[0].value("Market"), "BTC-NOK");

    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn strips_account_preamble() {
    let contents = "Transactions\nUser,Jane Doe,ACC123\n\nID,Transaction Type,Asset\n\
                    tx1,Buy,ETH\n";
    let path = temp_file("preamble", "account.csv", contents);
    let export = read_export(&path).expect("read export");
    assert_eq!(export.account_id.as_deref(), Some("ACC123"));
    assert_eq!(export.rows.len(), 1);
    assert_eq!(export.rows[0].value("ID"), "tx1");
    assert_eq!(export.rows[0].value("Asset"), "ETH");

    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn strips_a_byte_order_mark_from_the_header() {
    let path = temp_file("bom", "bom.csv", "\u{feff}Id,Market\n1,BTC-NOK\n");
    let export = read_export(&path).expect("read export");
    assert_eq!(export.rows[0].value("Id"), "1");

    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn discovery_walks_nested_directories_sorted() {
    let root = temp_dir("walk");
    fs::create_dir_all(root.join("firi")).expect("mkdir");
    fs::create_dir_all(root.join("kraken")).expect("mkdir");
    fs::write(root.join("firi/b.csv"), "A\n1\n").expect("write");
    fs::write(root.join("firi/a.csv"), "A\n1\n").expect("write");
    fs::write(root.join("kraken/ledger.CSV"), "A\n1\n").expect("write");
    fs::write(root.join("notes.txt"), "ignored").expect("write");

    let files = find_csv_files(&root).expect("find files");
    let names: Vec<String> = files
        .iter()
        .map(|p| {
            format!(
                "{}/{}",
                source_name(p),
                p.file_name().unwrap().to_string_lossy()
            )
        })
        .collect();
    assert_eq!(names, ["firi/a.csv", "firi/b.csv", "kraken/ledger.CSV"]);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn writer_emits_the_fixed_column_order_and_skips_empty() {
    let dir = temp_dir("writer");
    let out = dir.join("out_mapped.csv");

    assert!(!write_records(&out, &[]).expect("write empty"));
    assert!(!out.exists());

    let record = CanonicalRecord {
        id: "FIRI-1".to_string(),
        market: "BTC-NOK".to_string(),
        ..CanonicalRecord::default()
    };
    assert!(write_records(&out, std::slice::from_ref(&record)).expect("write"));

    let written = fs::read_to_string(&out).expect("read back");
    let mut lines = written.lines();
    assert_eq!(lines.next().unwrap(), OUTPUT_COLUMNS.join(","));
    let data = lines.next().unwrap();
    assert!(data.starts_with("FIRI-1,"));
    assert!(data.contains("BTC-NOK"));

    let _ = fs::remove_dir_all(&dir);
}
