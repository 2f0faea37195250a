use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::Result;
use crate::models::{ParseIssue, Sale, StoredSale};
use crate::parser::columns::ColumnMapping;
use crate::parser::stats::DataType;
use crate::parser::{ParseResult, TableParser};
use crate::store::{ImportLog, RecordStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn compute_checksum(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Read a payload from a file, or from stdin when `source` is `-`.
pub fn read_payload(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read_to_string(Path::new(source))?)
    }
}

fn date_range(sales: &[StoredSale]) -> Option<(&str, &str)> {
    let dates = sales.iter().map(|s| s.sale.date.as_str());
    let min = dates.clone().min()?;
    let max = dates.max()?;
    Some((min, max))
}

// ---------------------------------------------------------------------------
// import_payload
// ---------------------------------------------------------------------------

/// How decoded records reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// One insert per record; failures are collected and the rest still land.
    #[default]
    PerRecord,
    /// One transaction; any failure stores nothing.
    Batch,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportOutcome {
    pub total_rows: usize,
    pub parsed_rows: usize,
    /// Rows rejected by the parser; a row with several bad fields counts once.
    pub failed_rows: usize,
    pub imported_rows: usize,
    pub parse_errors: Vec<ParseIssue>,
    pub warnings: Vec<ParseIssue>,
    pub import_errors: Vec<String>,
    pub imported: Vec<StoredSale>,
    pub column_mapping: ColumnMapping,
    pub data_types: BTreeMap<String, DataType>,
    pub processing_time: Duration,
    pub duplicate_payload: bool,
}

fn store_records<S: RecordStore + ?Sized>(
    store: &S,
    records: &[Sale],
    mode: ImportMode,
) -> (Vec<StoredSale>, Vec<String>) {
    match mode {
        ImportMode::Batch => match store.create_batch(records) {
            Ok(stored) => (stored, Vec::new()),
            Err(e) => (Vec::new(), vec![format!("batch insert failed: {e}")]),
        },
        ImportMode::PerRecord => {
            let mut stored = Vec::new();
            let mut errors = Vec::new();
            for (idx, record) in records.iter().enumerate() {
                match store.create_one(record) {
                    Ok(s) => stored.push(s),
                    Err(e) => errors.push(format!("record {}: {e}", idx + 1)),
                }
            }
            (stored, errors)
        }
    }
}

/// Parse `payload` and store every decoded record.
///
/// A payload whose checksum is already in the import log is skipped unless
/// `force` is set. Structural parse failures propagate as errors; row-level
/// problems are reported in the outcome. The import is logged only when at
/// least one record was stored.
pub fn import_payload<S>(
    store: &S,
    parser: &TableParser,
    payload: &str,
    source: &str,
    mode: ImportMode,
    force: bool,
) -> Result<ImportOutcome>
where
    S: RecordStore + ImportLog + ?Sized,
{
    let checksum = compute_checksum(payload);
    if !force && store.has_checksum(&checksum)? {
        info!(source, "payload already imported");
        return Ok(ImportOutcome {
            duplicate_payload: true,
            ..Default::default()
        });
    }

    let result = parser.parse(payload)?;
    let (imported, import_errors) = store_records(store, &result.records, mode);
    if !import_errors.is_empty() {
        warn!(failed = import_errors.len(), "records not stored");
    }

    if !imported.is_empty() {
        store.record_import(source, imported.len(), date_range(&imported), &checksum)?;
    }
    info!(source, imported = imported.len(), parsed = result.success_count, "import finished");

    Ok(ImportOutcome {
        total_rows: result.total_rows,
        parsed_rows: result.success_count,
        failed_rows: result.error_count,
        imported_rows: imported.len(),
        parse_errors: result.errors,
        warnings: result.warnings,
        import_errors,
        imported,
        column_mapping: result.column_mapping,
        data_types: result.statistics.data_types_detected,
        processing_time: result.statistics.processing_time,
        duplicate_payload: false,
    })
}

/// Parse without storing anything.
pub fn validate_payload(parser: &TableParser, payload: &str) -> Result<ParseResult> {
    parser.parse(payload)
}
