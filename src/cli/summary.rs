use comfy_table::{Cell, Table};

use super::{open_store, print_json};
use crate::error::Result;
use crate::fmt::money;
use crate::models::{GroupBy, SummaryNode};
use crate::settings::load_settings;
use crate::summary::from_store;

pub fn yearly(json: bool) -> Result<()> {
    let store = open_store(&load_settings())?;
    let nodes = from_store(&store, None)?.yearly();
    emit("Yearly Summary", "Period", &nodes, json)
}

pub fn monthly(year: Option<i32>, json: bool) -> Result<()> {
    let store = open_store(&load_settings())?;
    let nodes = from_store(&store, year)?.monthly(year);
    emit("Monthly Summary", "Period", &nodes, json)
}

pub fn daily(year: Option<i32>, month: Option<u32>, json: bool) -> Result<()> {
    let store = open_store(&load_settings())?;
    let nodes = from_store(&store, year)?.daily(year, month)?;
    emit("Daily Summary", "Period", &nodes, json)
}

pub fn pivot(year: Option<i32>) -> Result<()> {
    let store = open_store(&load_settings())?;
    print_json(&from_store(&store, year)?.pivot(year))
}

pub fn custom(
    group_by: &str,
    year: Option<i32>,
    store: Option<&str>,
    vendor: Option<&str>,
    json: bool,
) -> Result<()> {
    let group_by: GroupBy = group_by.parse()?;
    let db = open_store(&load_settings())?;
    let nodes = from_store(&db, year)?.custom(group_by, year, store, vendor);
    let (title, key) = match group_by {
        GroupBy::Store => ("Summary by Store", "Store"),
        GroupBy::Vendor => ("Summary by Vendor", "Vendor"),
        GroupBy::Year => ("Summary by Year", "Period"),
        GroupBy::Month => ("Summary by Month", "Period"),
        GroupBy::Day => ("Summary by Day", "Period"),
    };
    emit(title, key, &nodes, json)
}

fn emit(title: &str, key: &str, nodes: &[SummaryNode], json: bool) -> Result<()> {
    if json {
        return print_json(&nodes);
    }
    if nodes.is_empty() {
        println!("No sales recorded for this period.");
    } else {
        println!("{}", format_nodes(title, key, nodes));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pure formatting functions
// ---------------------------------------------------------------------------

pub fn format_nodes(title: &str, key: &str, nodes: &[SummaryNode]) -> String {
    let mut table = Table::new();
    table.set_header(vec![key, "Items", "Sales", "Commission", "Remaining", "Stores", "Vendors"]);
    for n in nodes {
        table.add_row(vec![
            Cell::new(&n.period),
            Cell::new(n.items_sold),
            Cell::new(money(n.total_sales)),
            Cell::new(money(n.total_commission)),
            Cell::new(money(n.total_remaining)),
            Cell::new(n.unique_stores),
            Cell::new(n.unique_vendors),
        ]);
    }
    format!("{title}\n{table}")
}
