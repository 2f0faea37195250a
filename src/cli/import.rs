use colored::Colorize;
use comfy_table::{Cell, Table};

use super::{build_parser, open_store, ParseOpts};
use crate::error::Result;
use crate::fmt::{elapsed, issue, money};
use crate::importer::{import_payload, read_payload, ImportMode, ImportOutcome};
use crate::settings::load_settings;

pub fn run(file: &str, opts: &ParseOpts, batch: bool, force: bool) -> Result<()> {
    let settings = load_settings();
    let parser = build_parser(&settings, opts)?;
    let store = open_store(&settings)?;
    let payload = read_payload(file)?;

    let mode = if batch || settings.batch_import {
        ImportMode::Batch
    } else {
        ImportMode::PerRecord
    };
    let source = if file == "-" { "stdin" } else { file };
    let outcome = import_payload(&store, &parser, &payload, source, mode, force)?;
    println!("{}", format_outcome(&outcome));
    Ok(())
}

pub fn format_outcome(outcome: &ImportOutcome) -> String {
    if outcome.duplicate_payload {
        return "This data has already been imported (duplicate checksum). Use --force to import it again."
            .to_string();
    }

    let mut out = format!(
        "{} rows read, {} parsed, {} imported ({})",
        outcome.total_rows,
        outcome.parsed_rows,
        outcome.imported_rows,
        elapsed(outcome.processing_time)
    );

    if !outcome.imported.is_empty() {
        let total: f64 = outcome.imported.iter().map(|s| s.sale.sale_price).sum();
        let mut table = Table::new();
        table.set_header(vec!["ID", "Date", "Store", "Vendor", "Description", "Sale Price"]);
        for s in &outcome.imported {
            table.add_row(vec![
                Cell::new(s.id),
                Cell::new(&s.sale.date),
                Cell::new(&s.sale.store),
                Cell::new(&s.sale.vendor),
                Cell::new(&s.sale.description),
                Cell::new(money(s.sale.sale_price)),
            ]);
        }
        out.push_str(&format!("\n{table}\nTotal: {}", money(total)));
    }

    if !outcome.parse_errors.is_empty() {
        out.push_str(&format!("\n{}", format!("{} rows skipped:", outcome.failed_rows).red().bold()));
        for e in &outcome.parse_errors {
            out.push_str(&format!("\n  {}", issue(e)));
        }
    }
    if !outcome.warnings.is_empty() {
        out.push_str(&format!("\n{}", format!("{} warnings:", outcome.warnings.len()).yellow()));
        for w in &outcome.warnings {
            out.push_str(&format!("\n  {}", issue(w)));
        }
    }
    if !outcome.import_errors.is_empty() {
        out.push_str(&format!("\n{}", "Not stored:".red().bold()));
        for e in &outcome.import_errors {
            out.push_str(&format!("\n  {e}"));
        }
    }
    out
}
