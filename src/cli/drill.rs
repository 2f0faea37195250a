use comfy_table::{Cell, Table};

use super::{open_store, print_json};
use crate::error::Result;
use crate::fmt::money;
use crate::models::StoredSale;
use crate::settings::load_settings;
use crate::summary::from_store;

pub fn run(year: i32, month: Option<u32>, day: Option<u32>, json: bool) -> Result<()> {
    let store = open_store(&load_settings())?;
    let summarizer = from_store(&store, Some(year))?;
    let records = summarizer.drill_down(year, month, day)?;

    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No sales recorded for {}.", period_label(year, month, day));
    } else {
        println!("{}", format_records(&period_label(year, month, day), &records));
    }
    Ok(())
}

pub fn period_label(year: i32, month: Option<u32>, day: Option<u32>) -> String {
    match (month, day) {
        (Some(m), Some(d)) => format!("{year:04}-{m:02}-{d:02}"),
        (Some(m), None) => format!("{year:04}-{m:02}"),
        (None, Some(d)) => format!("{year:04} (day {d})"),
        (None, None) => format!("{year:04}"),
    }
}

pub fn format_records(title: &str, records: &[&StoredSale]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Store", "Vendor", "Description", "Sale Price", "Commission", "Remaining"]);
    let mut total = 0.0;
    for r in records {
        total += r.sale.sale_price;
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(&r.sale.date),
            Cell::new(&r.sale.store),
            Cell::new(&r.sale.vendor),
            Cell::new(&r.sale.description),
            Cell::new(money(r.sale.sale_price)),
            Cell::new(money(r.sale.commission)),
            Cell::new(money(r.sale.remaining)),
        ]);
    }
    format!("{title}: {} sales, {}\n{table}", records.len(), money(total))
}
