use comfy_table::{Cell, Table};

use super::open_store;
use crate::error::Result;
use crate::fmt::money;
use crate::models::{DatabaseStats, ImportRecord};
use crate::settings::{load_settings, settings_file_exists};
use crate::store::{ImportLog, RecordStore};

const RECENT_IMPORTS: usize = 5;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());

    if !settings_file_exists() && !db_path.exists() {
        println!();
        println!("Database not found. Run `salestrack init` to set up.");
        return Ok(());
    }

    let store = open_store(&settings)?;
    println!();
    println!("{}", format_stats(&store.stats()?));

    let imports = store.recent_imports(RECENT_IMPORTS)?;
    if !imports.is_empty() {
        println!();
        println!("{}", format_imports(&imports));
    }
    Ok(())
}

pub fn format_stats(stats: &DatabaseStats) -> String {
    let range = match (&stats.earliest_date, &stats.latest_date) {
        (Some(from), Some(to)) => format!("{from} to {to}"),
        _ => "(none)".to_string(),
    };
    [
        format!("Records:       {}", stats.total_records),
        format!("Date range:    {range}"),
        format!("Total sales:   {}", money(stats.total_sales)),
        format!("Average sale:  {}", money(stats.avg_sale_price)),
        format!("Stores:        {}", stats.unique_stores),
        format!("Vendors:       {}", stats.unique_vendors),
        format!("Last updated:  {}", stats.last_updated.as_deref().unwrap_or("(never)")),
    ]
    .join("\n")
}

pub fn format_imports(imports: &[ImportRecord]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Imported", "Source", "Records", "From", "To"]);
    for i in imports {
        table.add_row(vec![
            Cell::new(&i.imported_at),
            Cell::new(&i.source),
            Cell::new(i.record_count),
            Cell::new(i.date_range_start.as_deref().unwrap_or("")),
            Cell::new(i.date_range_end.as_deref().unwrap_or("")),
        ]);
    }
    format!("Recent imports\n{table}")
}
