use comfy_table::{Cell, Table};

use super::{open_store, print_json};
use crate::error::Result;
use crate::fmt::money;
use crate::models::PerformanceRow;
use crate::settings::load_settings;
use crate::summary::from_store;

pub fn stores(year: Option<i32>, json: bool) -> Result<()> {
    let store = open_store(&load_settings())?;
    let rows = from_store(&store, year)?.by_store();
    emit("Store Performance", "Vendors", &rows, json)
}

pub fn vendors(year: Option<i32>, json: bool) -> Result<()> {
    let store = open_store(&load_settings())?;
    let rows = from_store(&store, year)?.by_vendor();
    emit("Vendor Performance", "Stores", &rows, json)
}

fn emit(title: &str, counterpart: &str, rows: &[PerformanceRow], json: bool) -> Result<()> {
    if json {
        return print_json(&rows);
    }
    println!("{}", format_rows(title, counterpart, rows));
    Ok(())
}

pub fn format_rows(title: &str, counterpart: &str, rows: &[PerformanceRow]) -> String {
    let mut table = Table::new();
    table.set_header(vec![
        "Name",
        "Items",
        "Sales",
        "Commission",
        "Remaining",
        "Avg Price",
        "First Sale",
        "Last Sale",
        counterpart,
    ]);
    for r in rows {
        table.add_row(vec![
            Cell::new(&r.name),
            Cell::new(r.total_items),
            Cell::new(money(r.total_sales)),
            Cell::new(money(r.total_commission)),
            Cell::new(money(r.total_remaining)),
            Cell::new(money(r.avg_sale_price)),
            Cell::new(&r.first_sale_date),
            Cell::new(&r.last_sale_date),
            Cell::new(r.unique_counterparts),
        ]);
    }
    format!("{title}\n{table}")
}
