use comfy_table::{Cell, Table};

use super::{open_store, print_json, EditFields};
use crate::error::{Result, SalesError};
use crate::fmt::money;
use crate::models::{RecordFilter, RecordPage, SaleUpdate, SortField, SortOrder};
use crate::parser::decode::parse_date;
use crate::settings::load_settings;
use crate::store::RecordStore;

/// Raw `records list` flags before validation.
pub struct ListArgs {
    pub store: Option<String>,
    pub vendor: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort: String,
    pub order: String,
    pub limit: usize,
    pub offset: usize,
}

/// Accept any date the parser accepts and hand the store its ISO form,
/// since stored dates compare as text.
fn iso_bound(flag: &str, raw: Option<String>) -> Result<Option<String>> {
    raw.map(|value| {
        parse_date(&value)
            .ok_or_else(|| SalesError::InvalidFilter(format!("{flag} is not a date: '{value}'")))
    })
    .transpose()
}

impl ListArgs {
    pub fn into_filter(self) -> Result<RecordFilter> {
        let sort_by = SortField::parse(&self.sort)
            .ok_or_else(|| SalesError::InvalidFilter(format!("unknown sort field '{}'", self.sort)))?;
        let sort_order = SortOrder::parse(&self.order)
            .ok_or_else(|| SalesError::InvalidFilter(format!("unknown sort order '{}'", self.order)))?;
        Ok(RecordFilter {
            store: self.store,
            vendor: self.vendor,
            date_from: iso_bound("--from", self.date_from)?,
            date_to: iso_bound("--to", self.date_to)?,
            min_price: self.min_price,
            max_price: self.max_price,
            sort_by,
            sort_order,
            limit: Some(self.limit),
            offset: self.offset,
        })
    }
}

pub fn list(args: ListArgs, json: bool) -> Result<()> {
    let filter = args.into_filter()?;
    let store = open_store(&load_settings())?;
    let page = store.query(&filter)?;
    if json {
        print_json(&page)
    } else {
        println!("{}", format_page(&page, filter.offset));
        Ok(())
    }
}

pub fn show(id: i64, json: bool) -> Result<()> {
    let store = open_store(&load_settings())?;
    let record = store
        .get(id)?
        .ok_or_else(|| SalesError::Other(format!("no record with id {id}")))?;
    if json {
        return print_json(&record);
    }
    let s = &record.sale;
    println!("ID:           {}", record.id);
    println!("Date:         {}", s.date);
    println!("Store:        {}", s.store);
    println!("Vendor:       {}", s.vendor);
    println!("Description:  {}", s.description);
    println!("Sale price:   {}", money(s.sale_price));
    println!("Commission:   {}", money(s.commission));
    println!("Remaining:    {}", money(s.remaining));
    println!("Created:      {}", record.created_at);
    Ok(())
}

pub fn edit(id: i64, fields: EditFields, json: bool) -> Result<()> {
    let update = fields.into_update();
    if update.is_empty() {
        return Err(SalesError::Other("nothing to change; pass at least one field flag".into()));
    }
    let store = open_store(&load_settings())?;
    let record = store
        .update(id, &update)?
        .ok_or_else(|| SalesError::Other(format!("no record with id {id}")))?;
    if json {
        return print_json(&record);
    }
    println!("Updated record {}: {} {} {}", record.id, record.sale.date, record.sale.store, money(record.sale.sale_price));
    Ok(())
}

impl EditFields {
    pub fn into_update(self) -> SaleUpdate {
        SaleUpdate {
            store: self.store,
            vendor: self.vendor,
            date: self.date,
            description: self.description,
            sale_price: self.sale_price,
            commission: self.commission,
            remaining: self.remaining,
        }
    }
}

pub fn delete(id: i64) -> Result<()> {
    let store = open_store(&load_settings())?;
    if store.delete(id)? {
        println!("Deleted record {id}");
        Ok(())
    } else {
        Err(SalesError::Other(format!("no record with id {id}")))
    }
}

pub fn format_page(page: &RecordPage, offset: usize) -> String {
    if page.records.is_empty() {
        return format!("No records (of {} matching).", page.total);
    }
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Store", "Vendor", "Description", "Sale Price"]);
    for r in &page.records {
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(&r.sale.date),
            Cell::new(&r.sale.store),
            Cell::new(&r.sale.vendor),
            Cell::new(&r.sale.description),
            Cell::new(money(r.sale.sale_price)),
        ]);
    }
    format!(
        "{table}\nShowing {}-{} of {}",
        offset + 1,
        offset + page.records.len(),
        page.total
    )
}
