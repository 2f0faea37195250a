use colored::Colorize;
use comfy_table::{Cell, Table};

use super::{build_parser, print_json, ParseOpts};
use crate::error::Result;
use crate::fmt::{elapsed, issue};
use crate::importer::{read_payload, validate_payload};
use crate::models::Field;
use crate::parser::ParseResult;
use crate::settings::load_settings;

pub fn run(file: &str, opts: &ParseOpts, json: bool) -> Result<()> {
    let settings = load_settings();
    let parser = build_parser(&settings, opts)?;
    let payload = read_payload(file)?;
    let result = validate_payload(&parser, &payload)?;

    if json {
        print_json(&result)
    } else {
        println!("{}", format_result(&result));
        Ok(())
    }
}

pub fn format_result(result: &ParseResult) -> String {
    let stats = &result.statistics;
    let mut out = format!(
        "Tables found: {}\nRows: {} ({} valid, {} invalid) in {}",
        stats.tables_found,
        result.total_rows,
        result.success_count,
        result.error_count,
        elapsed(stats.processing_time)
    );

    let mut columns = Table::new();
    columns.set_header(vec!["Field", "Column", "Header"]);
    for (field, idx) in &result.column_mapping {
        let header = stats.headers_detected.get(*idx).cloned().unwrap_or_default();
        columns.add_row(vec![Cell::new(field.display_name()), Cell::new(idx + 1), Cell::new(header)]);
    }
    out.push_str(&format!("\nColumn mapping\n{columns}"));

    let unmapped: Vec<&str> = Field::ALL
        .iter()
        .filter(|f| result.mapped_column(**f).is_none())
        .map(|f| f.display_name())
        .collect();
    if !unmapped.is_empty() {
        out.push_str(&format!("\nNot mapped: {}", unmapped.join(", ")));
    }

    if !stats.data_types_detected.is_empty() {
        let mut types = Table::new();
        types.set_header(vec!["Header", "Type", "Min", "Max"]);
        for (header, kind) in &stats.data_types_detected {
            let (min, max) = match stats.value_ranges.get(header) {
                Some(r) => (format!("{:.2}", r.min), format!("{:.2}", r.max)),
                None => (String::new(), String::new()),
            };
            types.add_row(vec![Cell::new(header), Cell::new(kind), Cell::new(min), Cell::new(max)]);
        }
        out.push_str(&format!("\nDetected types\n{types}"));
    }

    for e in &result.errors {
        out.push_str(&format!("\n{} {}", "error".red().bold(), issue(e)));
    }
    for w in &result.warnings {
        out.push_str(&format!("\n{} {}", "warning".yellow(), issue(w)));
    }
    out
}
