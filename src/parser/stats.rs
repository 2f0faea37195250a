use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::decode::parse_currency;
use super::markup::Grid;

/// Data rows sampled per column for type detection.
pub const SAMPLE_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Date,
    Currency,
    Number,
    Text,
    Unknown,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Currency => "currency",
            Self::Number => "number",
            Self::Text => "text",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

fn date_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"^\d{4}-\d{1,2}-\d{1,2}",
            r"^\d{1,2}/\d{1,2}/\d{4}",
            r"^\d{1,2}-\d{1,2}-\d{4}",
            r"^[A-Za-z]{3,9}\s+\d{1,2},?\s+\d{4}",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("invalid date pattern"))
        .collect()
    })
}

fn currency_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"^\$\d+\.?\d*", r"^\d+\.\d{2}$", r"^\(\d+\.?\d*\)$"]
            .iter()
            .map(|p| Regex::new(p).expect("invalid currency pattern"))
            .collect()
    })
}

pub fn looks_like_date(value: &str) -> bool {
    date_patterns().iter().any(|re| re.is_match(value))
}

pub fn looks_like_currency(value: &str) -> bool {
    currency_patterns().iter().any(|re| re.is_match(value))
}

fn looks_like_number(value: &str) -> bool {
    value
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .is_some()
}

/// Classify a column sample. A type wins when strictly more than half of
/// the sampled values (blanks included in the denominator) match it, checked
/// in the order date, currency, number. Anything else is text.
pub fn detect_data_type<S: AsRef<str>>(values: &[S]) -> DataType {
    if values.is_empty() {
        return DataType::Unknown;
    }

    let (mut dates, mut currencies, mut numbers) = (0, 0, 0);
    for value in values {
        let value = value.as_ref().trim();
        if value.is_empty() {
            continue;
        }
        if looks_like_date(value) {
            dates += 1;
        }
        if looks_like_currency(value) {
            currencies += 1;
        }
        if looks_like_number(value) {
            numbers += 1;
        }
    }

    let majority = |count: usize| count * 2 > values.len();
    if majority(dates) {
        DataType::Date
    } else if majority(currencies) {
        DataType::Currency
    } else if majority(numbers) {
        DataType::Number
    } else {
        DataType::Text
    }
}

/// Detected type per header. Row 0 of `grid` is the header.
pub fn column_types(grid: &Grid) -> BTreeMap<String, DataType> {
    let Some((headers, rows)) = grid.split_first() else {
        return BTreeMap::new();
    };
    headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let sample: Vec<&str> = rows
                .iter()
                .take(SAMPLE_ROWS)
                .filter_map(|row| row.get(idx).map(String::as_str))
                .collect();
            (header.clone(), detect_data_type(&sample))
        })
        .collect()
}

/// Min/max/count over every data row for columns typed currency or number.
pub fn value_ranges(grid: &Grid, types: &BTreeMap<String, DataType>) -> BTreeMap<String, ValueRange> {
    let Some((headers, rows)) = grid.split_first() else {
        return BTreeMap::new();
    };
    let mut ranges = BTreeMap::new();
    for (idx, header) in headers.iter().enumerate() {
        if !matches!(types.get(header), Some(DataType::Currency | DataType::Number)) {
            continue;
        }
        let values: Vec<f64> = rows
            .iter()
            .filter_map(|row| row.get(idx))
            .filter(|cell| !cell.trim().is_empty())
            .filter_map(|cell| parse_currency(cell))
            .collect();
        if values.is_empty() {
            continue;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        ranges.insert(
            header.clone(),
            ValueRange {
                min,
                max,
                count: values.len(),
            },
        );
    }
    ranges
}
