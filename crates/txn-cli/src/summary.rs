//! Run summary rendering.

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::pipeline::ConvertResult;

pub fn print_summary(result: &ConvertResult) {
    if result.dry_run {
        println!("Dry run: no files written");
    } else {
        println!("Output: {}", result.output_dir.display());
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("Source"),
        header_cell("Mode"),
        header_cell("Records"),
        header_cell("Output"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);

    for file in &result.files {
        let name = file
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(name).fg(Color::Blue),
            Cell::new(&file.source),
            Cell::new(file.mode.as_str()),
            records_cell(file.records),
            output_cell(file.output.is_some()),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(result.total_records()).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    println!("{table}");

    if !result.skipped.is_empty() {
        println!("Skipped (no converter):");
        for path in &result.skipped {
            println!("- {}", path.display());
        }
    }
    if !result.errors.is_empty() {
        eprintln!("Errors:");
        for error in &result.errors {
            eprintln!("- {error}");
        }
    }
}

fn output_cell(written: bool) -> Cell {
    if written {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        dim_cell("-")
    }
}

fn records_cell(count: usize) -> Cell {
    if count == 0 {
        dim_cell(count)
    } else {
        Cell::new(count)
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}
