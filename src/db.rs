use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sales_records (
    id INTEGER PRIMARY KEY,
    store TEXT NOT NULL,
    vendor TEXT NOT NULL,
    date TEXT NOT NULL,
    description TEXT NOT NULL,
    sale_price REAL NOT NULL CHECK (sale_price >= 0),
    commission REAL NOT NULL DEFAULT 0 CHECK (commission >= 0),
    remaining REAL NOT NULL DEFAULT 0 CHECK (remaining >= 0),
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_sales_records_date ON sales_records(date);
CREATE INDEX IF NOT EXISTS idx_sales_records_store ON sales_records(store);
CREATE INDEX IF NOT EXISTS idx_sales_records_vendor ON sales_records(vendor);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    source TEXT NOT NULL,
    record_count INTEGER NOT NULL DEFAULT 0,
    date_range_start TEXT,
    date_range_end TEXT,
    checksum TEXT NOT NULL,
    imported_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_imports_checksum ON imports(checksum);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
