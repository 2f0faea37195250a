use chrono::{Datelike, NaiveDate, NaiveDateTime};

use super::columns::ColumnMapping;
use crate::models::{Field, ParseIssue, Sale};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S"];

/// Strip currency symbols, thousands separators and spaces, then parse.
/// `(x)` is negative and an empty remainder is zero. `None` means the value
/// is not a number; callers report the original input.
pub fn parse_currency(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | '¥' | ',' | ' '))
        .collect();

    let cleaned = match cleaned.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => format!("-{inner}"),
        None => cleaned,
    };

    if cleaned.is_empty() {
        return Some(0.0);
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Try each known calendar format in order and normalize to `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })?;
    // Four-digit years only; `%Y` alone would take "24" as year 24.
    if !(1000..=9999).contains(&date.year()) {
        return None;
    }
    Some(date.format("%Y-%m-%d").to_string())
}

/// A decoded row: the sale or its errors, plus any warnings either way.
#[derive(Debug)]
pub struct DecodedRow {
    pub sale: Result<Sale, Vec<ParseIssue>>,
    pub warnings: Vec<ParseIssue>,
}

struct RowReader<'a> {
    cells: &'a [String],
    mapping: &'a ColumnMapping,
    row: usize,
    errors: Vec<ParseIssue>,
    warnings: Vec<ParseIssue>,
}

impl<'a> RowReader<'a> {
    // Unmapped fields and cells past the end of a short row read as empty.
    fn cell(&self, field: Field) -> &'a str {
        self.mapping
            .get(&field)
            .and_then(|idx| self.cells.get(*idx))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    fn error(&mut self, field: Field, message: String, value: Option<&str>) {
        self.errors.push(ParseIssue {
            row: self.row,
            field: Some(field),
            message,
            value: value.map(str::to_string),
        });
    }

    fn warn(&mut self, field: Field, message: String, value: &str) {
        self.warnings.push(ParseIssue {
            row: self.row,
            field: Some(field),
            message,
            value: Some(value.to_string()),
        });
    }

    fn required_text(&mut self, field: Field) -> String {
        let value = self.cell(field);
        if value.is_empty() {
            self.error(field, required_message(field), None);
        }
        value.to_string()
    }

    fn date(&mut self) -> String {
        let value = self.cell(Field::Date);
        if value.is_empty() {
            self.error(Field::Date, required_message(Field::Date), None);
            return String::new();
        }
        match parse_date(value) {
            Some(iso) => iso,
            None => {
                self.error(
                    Field::Date,
                    format!("Invalid date format: unable to parse date: {value}"),
                    Some(value),
                );
                String::new()
            }
        }
    }

    fn sale_price(&mut self) -> f64 {
        let value = self.cell(Field::SalePrice);
        if value.is_empty() {
            self.error(Field::SalePrice, required_message(Field::SalePrice), None);
            return 0.0;
        }
        match parse_currency(value) {
            Some(amount) if amount < 0.0 => {
                self.error(
                    Field::SalePrice,
                    "Sale price cannot be negative".to_string(),
                    Some(value),
                );
                0.0
            }
            Some(amount) => amount,
            None => {
                self.error(
                    Field::SalePrice,
                    format!("Invalid sale price format: invalid currency format: {value}"),
                    Some(value),
                );
                0.0
            }
        }
    }

    fn optional_amount(&mut self, field: Field) -> f64 {
        let value = self.cell(field);
        if value.is_empty() {
            return 0.0;
        }
        let label = field.display_name().to_lowercase();
        match parse_currency(value) {
            Some(amount) if amount < 0.0 => {
                self.warn(field, format!("Negative {label}, using 0.00"), value);
                0.0
            }
            Some(amount) => amount,
            None => {
                self.warn(
                    field,
                    format!("Invalid {label} format, using 0.00: invalid currency format: {value}"),
                    value,
                );
                0.0
            }
        }
    }
}

fn required_message(field: Field) -> String {
    let name = match field {
        Field::SalePrice => "Sale price",
        other => other.display_name(),
    };
    format!("{name} field is required but empty")
}

/// Decode one data row. `row` is the 1-based data row number.
pub fn decode_row(cells: &[String], mapping: &ColumnMapping, row: usize) -> DecodedRow {
    let mut reader = RowReader {
        cells,
        mapping,
        row,
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    let store = reader.required_text(Field::Store);
    let vendor = reader.required_text(Field::Vendor);
    let date = reader.date();
    let description = reader.required_text(Field::Description);
    let sale_price = reader.sale_price();
    let commission = reader.optional_amount(Field::Commission);
    let remaining = reader.optional_amount(Field::Remaining);

    let sale = if reader.errors.is_empty() {
        Ok(Sale {
            store,
            vendor,
            date,
            description,
            sale_price,
            commission,
            remaining,
        })
    } else {
        Err(reader.errors)
    };
    DecodedRow {
        sale,
        warnings: reader.warnings,
    }
}
