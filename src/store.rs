use std::path::Path;

use rusqlite::types::{ToSql, Value};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::debug;

use crate::db::{get_connection, init_db};
use crate::error::{Result, SalesError};
use crate::models::{DatabaseStats, ImportRecord, RecordFilter, RecordPage, Sale, SaleUpdate, StoredSale};
use crate::parser::decode::parse_date;

/// Persistence for decoded sales.
pub trait RecordStore {
    fn create_one(&self, sale: &Sale) -> Result<StoredSale>;

    /// All-or-nothing: either every sale is stored or none is.
    fn create_batch(&self, sales: &[Sale]) -> Result<Vec<StoredSale>>;

    fn query(&self, filter: &RecordFilter) -> Result<RecordPage>;

    fn get(&self, id: i64) -> Result<Option<StoredSale>>;

    /// Apply the set fields of `update` and bump `updated_at`. `None` when
    /// no record has `id`.
    fn update(&self, id: i64, update: &SaleUpdate) -> Result<Option<StoredSale>>;

    fn delete(&self, id: i64) -> Result<bool>;

    fn stats(&self) -> Result<DatabaseStats>;
}

/// Log of payloads already imported, keyed by checksum.
pub trait ImportLog {
    fn has_checksum(&self, checksum: &str) -> Result<bool>;

    fn record_import(
        &self,
        source: &str,
        record_count: usize,
        date_range: Option<(&str, &str)>,
        checksum: &str,
    ) -> Result<i64>;

    fn recent_imports(&self, limit: usize) -> Result<Vec<ImportRecord>>;
}

pub struct SqliteStore {
    conn: Connection,
}

const RECORD_COLUMNS: &str =
    "id, store, vendor, date, description, sale_price, commission, remaining, created_at, updated_at";

fn stored_sale_from_row(row: &Row<'_>) -> rusqlite::Result<StoredSale> {
    Ok(StoredSale {
        id: row.get(0)?,
        sale: Sale {
            store: row.get(1)?,
            vendor: row.get(2)?,
            date: row.get(3)?,
            description: row.get(4)?,
            sale_price: row.get(5)?,
            commission: row.get(6)?,
            remaining: row.get(7)?,
        },
        created_at: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        updated_at: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
    })
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = get_connection(path)?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    fn insert(&self, sale: &Sale) -> Result<StoredSale> {
        self.conn.execute(
            "INSERT INTO sales_records (store, vendor, date, description, sale_price, commission, remaining) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                sale.store,
                sale.vendor,
                sale.date,
                sale.description,
                sale.sale_price,
                sale.commission,
                sale.remaining,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get(id)?
            .ok_or_else(|| SalesError::Other(format!("record {id} vanished after insert")))
    }
}

fn where_clause(filter: &RecordFilter) -> Result<(String, Vec<Value>)> {
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
        if min > max {
            return Err(SalesError::InvalidFilter(format!(
                "min price {min} is greater than max price {max}"
            )));
        }
    }
    if let (Some(from), Some(to)) = (&filter.date_from, &filter.date_to) {
        if from > to {
            return Err(SalesError::InvalidFilter(format!("date range {from}..{to} is empty")));
        }
    }

    let mut parts: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();
    let mut push = |sql: &str, value: Value| {
        params.push(value);
        parts.push(format!("{sql} ?{}", params.len()));
    };
    if let Some(store) = &filter.store {
        push("store =", Value::Text(store.clone()));
    }
    if let Some(vendor) = &filter.vendor {
        push("vendor =", Value::Text(vendor.clone()));
    }
    if let Some(from) = &filter.date_from {
        push("date >=", Value::Text(from.clone()));
    }
    if let Some(to) = &filter.date_to {
        push("date <=", Value::Text(to.clone()));
    }
    if let Some(min) = filter.min_price {
        push("sale_price >=", Value::Real(min));
    }
    if let Some(max) = filter.max_price {
        push("sale_price <=", Value::Real(max));
    }

    let clause = if parts.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", parts.join(" AND "))
    };
    Ok((clause, params))
}

fn amount(field: &'static str, value: f64) -> Result<Value> {
    if value.is_finite() && value >= 0.0 {
        Ok(Value::Real(value))
    } else {
        Err(SalesError::InvalidValue {
            field,
            value: value.to_string(),
        })
    }
}

fn set_clause(update: &SaleUpdate) -> Result<(Vec<String>, Vec<Value>)> {
    let mut parts: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();
    let mut push = |column: &str, value: Value| {
        params.push(value);
        parts.push(format!("{column} = ?{}", params.len()));
    };
    if let Some(store) = &update.store {
        push("store", Value::Text(store.trim().to_string()));
    }
    if let Some(vendor) = &update.vendor {
        push("vendor", Value::Text(vendor.trim().to_string()));
    }
    if let Some(date) = &update.date {
        let iso = parse_date(date).ok_or_else(|| SalesError::InvalidValue {
            field: "date",
            value: date.clone(),
        })?;
        push("date", Value::Text(iso));
    }
    if let Some(description) = &update.description {
        push("description", Value::Text(description.trim().to_string()));
    }
    if let Some(price) = update.sale_price {
        push("sale_price", amount("sale price", price)?);
    }
    if let Some(commission) = update.commission {
        push("commission", amount("commission", commission)?);
    }
    if let Some(remaining) = update.remaining {
        push("remaining", amount("remaining", remaining)?);
    }
    Ok((parts, params))
}

impl RecordStore for SqliteStore {
    fn create_one(&self, sale: &Sale) -> Result<StoredSale> {
        self.insert(sale)
    }

    fn create_batch(&self, sales: &[Sale]) -> Result<Vec<StoredSale>> {
        let tx = self.conn.unchecked_transaction()?;
        let mut stored = Vec::with_capacity(sales.len());
        for sale in sales {
            stored.push(self.insert(sale)?);
        }
        tx.commit()?;
        debug!(count = stored.len(), "batch stored");
        Ok(stored)
    }

    fn query(&self, filter: &RecordFilter) -> Result<RecordPage> {
        let (clause, mut params) = where_clause(filter)?;

        let total: i64 = {
            let sql = format!("SELECT COUNT(*) FROM sales_records {clause}");
            let refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
            self.conn.query_row(&sql, refs.as_slice(), |r| r.get(0))?
        };

        let order = filter.sort_order.sql();
        let limit = filter.limit.map_or(-1, |l| l as i64);
        params.push(Value::Integer(limit));
        params.push(Value::Integer(filter.offset as i64));
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM sales_records {clause} \
             ORDER BY {} {order}, id {order} \
             LIMIT ?{} OFFSET ?{}",
            filter.sort_by.column(),
            params.len() - 1,
            params.len(),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        let records = stmt
            .query_map(refs.as_slice(), stored_sale_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(RecordPage { records, total })
    }

    fn get(&self, id: i64) -> Result<Option<StoredSale>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM sales_records WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, [id], stored_sale_from_row)
            .optional()?)
    }

    fn update(&self, id: i64, update: &SaleUpdate) -> Result<Option<StoredSale>> {
        let (mut parts, mut params) = set_clause(update)?;
        if parts.is_empty() {
            return self.get(id);
        }
        parts.push("updated_at = datetime('now')".to_string());
        params.push(Value::Integer(id));
        let sql = format!(
            "UPDATE sales_records SET {} WHERE id = ?{}",
            parts.join(", "),
            params.len()
        );
        let refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        let affected = self.conn.execute(&sql, refs.as_slice())?;
        if affected == 0 {
            return Ok(None);
        }
        debug!(id, "record updated");
        self.get(id)
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM sales_records WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    fn stats(&self) -> Result<DatabaseStats> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*), MIN(date), MAX(date), COALESCE(SUM(sale_price), 0.0), \
             COALESCE(AVG(sale_price), 0.0), COUNT(DISTINCT store), COUNT(DISTINCT vendor), \
             MAX(updated_at) FROM sales_records",
            [],
            |r| {
                Ok(DatabaseStats {
                    total_records: r.get(0)?,
                    earliest_date: r.get(1)?,
                    latest_date: r.get(2)?,
                    total_sales: r.get(3)?,
                    avg_sale_price: r.get(4)?,
                    unique_stores: r.get(5)?,
                    unique_vendors: r.get(6)?,
                    last_updated: r.get(7)?,
                })
            },
        )?)
    }
}

impl ImportLog for SqliteStore {
    fn has_checksum(&self, checksum: &str) -> Result<bool> {
        let mut stmt = self.conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1")?;
        Ok(stmt.exists([checksum])?)
    }

    fn record_import(
        &self,
        source: &str,
        record_count: usize,
        date_range: Option<(&str, &str)>,
        checksum: &str,
    ) -> Result<i64> {
        let (start, end) = date_range.unzip();
        self.conn.execute(
            "INSERT INTO imports (source, record_count, date_range_start, date_range_end, checksum) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![source, record_count as i64, start, end, checksum],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn recent_imports(&self, limit: usize) -> Result<Vec<ImportRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source, record_count, date_range_start, date_range_end, checksum, imported_at \
             FROM imports ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit as i64], |r| {
                Ok(ImportRecord {
                    id: r.get(0)?,
                    source: r.get(1)?,
                    record_count: r.get(2)?,
                    date_range_start: r.get(3)?,
                    date_range_end: r.get(4)?,
                    checksum: r.get(5)?,
                    imported_at: r.get::<_, Option<String>>(6)?.unwrap_or_default(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
