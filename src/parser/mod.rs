pub mod columns;
pub mod decode;
pub mod markup;
pub mod normalize;
pub mod stats;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, SalesError};
use crate::models::{Field, ParseIssue, Sale};
use columns::{consignable_layout, ColumnMapping, ColumnStrategy};
use stats::{DataType, ValueRange};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseStatistics {
    pub tables_found: usize,
    pub headers_detected: Vec<String>,
    pub data_types_detected: BTreeMap<String, DataType>,
    pub value_ranges: BTreeMap<String, ValueRange>,
    pub processing_time: Duration,
}

/// Outcome of a parse that got past the structural checks.
/// `success_count + error_count == total_rows` and `records.len() == success_count`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseResult {
    pub records: Vec<Sale>,
    pub total_rows: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<ParseIssue>,
    pub warnings: Vec<ParseIssue>,
    pub column_mapping: ColumnMapping,
    pub statistics: ParseStatistics,
}

/// Turns pasted table data into sales records.
///
/// The column strategy is fixed at construction; a parser holds no other
/// state, so one instance can serve any number of parses.
#[derive(Debug, Clone, Default)]
pub struct TableParser {
    strategy: ColumnStrategy,
}

impl TableParser {
    /// Header matching, non-strict.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map columns by position using field keys such as `"sale_price"`.
    pub fn with_positional<S: AsRef<str>>(fields: &[S]) -> Result<Self> {
        Ok(Self {
            strategy: ColumnStrategy::positional_from_keys(fields)?,
        })
    }

    /// Positional layout of a Consignable sales export.
    pub fn consignable() -> Self {
        Self {
            strategy: ColumnStrategy::Positional(consignable_layout()),
        }
    }

    /// Require every field to match a header. No effect on positional parsers.
    pub fn strict(mut self, strict: bool) -> Self {
        if let ColumnStrategy::HeaderMatch { strict: s } = &mut self.strategy {
            *s = strict;
        }
        self
    }

    pub fn strategy(&self) -> &ColumnStrategy {
        &self.strategy
    }

    pub fn parse(&self, raw: &str) -> Result<ParseResult> {
        let started = Instant::now();

        let normalized = normalize::normalize(raw, self.strategy.synthetic_header())?;
        let (grid, tables_found) = markup::read_grid(&normalized)?;
        debug!(tables_found, rows = grid.len(), "located table");

        let (headers, rows) = grid.split_first().ok_or(SalesError::NoDataRows)?;
        let column_mapping = self.strategy.resolve(headers)?;
        debug!(?column_mapping, "resolved columns");

        let mut result = ParseResult {
            total_rows: rows.len(),
            column_mapping,
            ..Default::default()
        };

        for (idx, cells) in rows.iter().enumerate() {
            let decoded = decode::decode_row(cells, &result.column_mapping, idx + 1);
            match decoded.sale {
                Ok(sale) => {
                    result.records.push(sale);
                    result.success_count += 1;
                }
                Err(errors) => {
                    result.errors.extend(errors);
                    result.error_count += 1;
                }
            }
            result.warnings.extend(decoded.warnings);
        }

        if result.error_count > 0 || !result.warnings.is_empty() {
            warn!(
                failed_rows = result.error_count,
                warnings = result.warnings.len(),
                "rows with issues"
            );
        }

        let data_types = stats::column_types(&grid);
        result.statistics = ParseStatistics {
            tables_found,
            headers_detected: headers.clone(),
            value_ranges: stats::value_ranges(&grid, &data_types),
            data_types_detected: data_types,
            processing_time: started.elapsed(),
        };
        Ok(result)
    }
}

impl ParseResult {
    pub fn mapped_column(&self, field: Field) -> Option<usize> {
        self.column_mapping.get(&field).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_TABLE: &str = r#"
        <table>
            <tr>
                <th>Store</th><th>Vendor</th><th>Date</th><th>Description</th>
                <th>Sale Price</th><th>Commission</th><th>Remaining</th>
            </tr>
            <tr>
                <td>Downtown Store</td><td>Electronics Plus</td><td>2024-01-15</td>
                <td>Samsung TV</td><td>$899.99</td><td>$89.99</td><td>$810.00</td>
            </tr>
            <tr>
                <td>Mall Location</td><td>Home & Garden</td><td>01/16/2024</td>
                <td>Patio Set</td><td>1299.00</td><td>129.90</td><td>1169.10</td>
            </tr>
        </table>
    "#;

    const HEADERLESS_ROWS: &str = r#"
        <tr>
            <td>Downtown Store</td><td>Electronics Plus</td><td>2024-01-15</td>
            <td>Samsung TV</td><td>$899.99</td><td>$89.99</td><td>$810.00</td>
        </tr>
        <tr>
            <td>Mall Location</td><td>Home & Garden</td><td>01/16/2024</td>
            <td>Patio Set</td><td>1299.00</td><td>129.90</td><td>1169.10</td>
        </tr>
    "#;

    fn assert_counts_consistent(result: &ParseResult) {
        assert_eq!(result.success_count + result.error_count, result.total_rows);
        assert_eq!(result.records.len(), result.success_count);
        for record in &result.records {
            assert_eq!(record.date.len(), 10);
            assert!(chrono::NaiveDate::parse_from_str(&record.date, "%Y-%m-%d").is_ok());
        }
    }

    #[test]
    fn test_basic_table() {
        let result = TableParser::new().parse(BASIC_TABLE).unwrap();
        assert_counts_consistent(&result);
        assert_eq!(result.total_rows, 2);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.error_count, 0);

        let first = &result.records[0];
        assert_eq!(first.store, "Downtown Store");
        assert_eq!(first.sale_price, 899.99);
        assert_eq!(first.commission, 89.99);
        assert_eq!(first.remaining, 810.0);
        assert_eq!(first.date, "2024-01-15");
        assert_eq!(result.records[1].vendor, "Home & Garden");
        assert_eq!(result.records[1].date, "2024-01-16");

        assert_eq!(result.statistics.tables_found, 1);
        assert_eq!(result.statistics.headers_detected.len(), 7);
        assert_eq!(result.statistics.data_types_detected["Date"], DataType::Date);
        assert_eq!(result.statistics.data_types_detected["Store"], DataType::Text);
        assert_eq!(result.mapped_column(Field::Remaining), Some(6));
    }

    #[test]
    fn test_various_column_names() {
        let html = r#"
            <table>
                <tr><th>Shop Name</th><th>Supplier</th><th>Sale Date</th><th>Product</th>
                    <th>Amount</th><th>Fee</th><th>Balance</th></tr>
                <tr><td>Test Store</td><td>Test Vendor</td><td>2024-02-01</td><td>Test Product</td>
                    <td>$100.00</td><td>$10.00</td><td>$90.00</td></tr>
            </table>
        "#;
        let result = TableParser::new().parse(html).unwrap();
        assert_eq!(result.success_count, 1);
        let record = &result.records[0];
        assert_eq!(record.store, "Test Store");
        assert_eq!(record.sale_price, 100.0);
        assert_eq!(record.commission, 10.0);
        assert_eq!(record.remaining, 90.0);
    }

    #[test]
    fn test_tab_delimited() {
        let data = "Store\tVendor\tDate\tDescription\tSale Price\n\
                    Test Store\tTest Vendor\t2024-01-15\tTest Item\t$50.00\n\
                    Other Store\tOther Vendor\tJan 16, 2024\tOther Item\t75";
        let result = TableParser::new().parse(data).unwrap();
        assert_counts_consistent(&result);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.records[1].date, "2024-01-16");
        assert_eq!(result.records[1].sale_price, 75.0);
    }

    #[test]
    fn test_pipe_delimited_markdown() {
        let data = "| Store | Vendor | Date | Description | Price |\n\
                    |---|---|---|---|---|\n\
                    | A | B | 2024-03-01 | Chair | $40 |";
        let result = TableParser::new().parse(data).unwrap();
        assert_eq!(result.total_rows, 1);
        assert_eq!(result.records[0].sale_price, 40.0);
    }

    #[test]
    fn test_row_errors_do_not_abort_batch() {
        let html = r#"
            <table>
                <tr><th>Store</th><th>Vendor</th><th>Date</th><th>Description</th><th>Sale Price</th></tr>
                <tr><td></td><td>Vendor</td><td>invalid-date</td><td>Item</td><td>not-a-price</td></tr>
                <tr><td>Valid Store</td><td>Vendor</td><td>2024-01-15</td><td>Item</td><td>$10.00</td></tr>
            </table>
        "#;
        let result = TableParser::new().parse(html).unwrap();
        assert_counts_consistent(&result);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.success_count, 1);
        assert_eq!(result.errors.len(), 3);
        assert_eq!(result.records[0].store, "Valid Store");
        assert!(result.errors.iter().all(|e| e.row == 1));
    }

    #[test]
    fn test_missing_required_columns_is_structural() {
        let html = "<table><tr><th>Store</th><th>Date</th></tr>\
                    <tr><td>Test Store</td><td>2024-01-15</td></tr></table>";
        let err = TableParser::new().parse(html).unwrap_err();
        assert!(err.to_string().contains("missing required columns"));
    }

    #[test]
    fn test_no_tables() {
        let err = TableParser::new().parse("<div>This is not a table</div>").unwrap_err();
        assert!(err.to_string().contains("no tables found"));
        assert!(matches!(TableParser::new().parse("  ").unwrap_err(), SalesError::NoTables));
    }

    #[test]
    fn test_empty_table_has_no_data_rows() {
        let err = TableParser::new().parse("<table></table>").unwrap_err();
        assert!(matches!(err, SalesError::NoDataRows));
    }

    #[test]
    fn test_header_only_table() {
        let html = "<table><tr><th>Store</th><th>Vendor</th><th>Date</th><th>Item</th><th>Price</th></tr></table>";
        let result = TableParser::new().parse(html).unwrap();
        assert_eq!(result.total_rows, 0);
        assert!(result.records.is_empty());
    }

    #[test]
    fn test_multiple_tables_picks_larger() {
        let html = r#"
            <table><tr><th>Nav</th></tr></table>
            <table>
                <tr><th>Store</th><th>Vendor</th><th>Date</th><th>Description</th><th>Sale Price</th></tr>
                <tr><td>A</td><td>V1</td><td>2024-01-15</td><td>Item 1</td><td>10</td></tr>
                <tr><td>B</td><td>V2</td><td>2024-01-16</td><td>Item 2</td><td>20</td></tr>
            </table>
        "#;
        let result = TableParser::new().parse(html).unwrap();
        assert_eq!(result.statistics.tables_found, 2);
        assert_eq!(result.success_count, 2);
    }

    #[test]
    fn test_headerless_rows_with_consignable_layout() {
        let result = TableParser::consignable().parse(HEADERLESS_ROWS).unwrap();
        assert_counts_consistent(&result);
        assert_eq!(result.total_rows, 2);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.records[0].sale_price, 899.99);
        assert_eq!(
            result.statistics.headers_detected,
            vec!["Store", "Vendor", "Date", "Description", "Sale Price", "Commission", "Remaining"]
        );
    }

    #[test]
    fn test_headerless_rows_inside_tbody() {
        let html = format!("<tbody>{HEADERLESS_ROWS}</tbody>");
        let result = TableParser::consignable().parse(&html).unwrap();
        assert_eq!(result.success_count, 2);
    }

    #[test]
    fn test_headerless_rows_without_positional_mapping_fail() {
        let err = TableParser::new().parse(HEADERLESS_ROWS).unwrap_err();
        assert!(err.to_string().contains("missing required columns"));
    }

    #[test]
    fn test_custom_positional_order() {
        let parser =
            TableParser::with_positional(&["vendor", "store", "description", "date", "sale_price"]).unwrap();
        let rows = "<tr><td>Acme</td><td>Main St</td><td>Lamp</td><td>3/5/2024</td><td>$25.00</td></tr>";
        let result = parser.parse(rows).unwrap();
        let record = &result.records[0];
        assert_eq!(record.vendor, "Acme");
        assert_eq!(record.store, "Main St");
        assert_eq!(record.date, "2024-03-05");
    }

    #[test]
    fn test_short_bare_row_under_consignable_layout() {
        let rows = "<tr><td>Store A</td><td>Vendor 1</td><td>2024-01-15</td></tr>";
        let result = TableParser::consignable().parse(rows).unwrap();
        assert_eq!(result.total_rows, 1);
        assert_eq!(result.error_count, 1);
        let fields: Vec<_> = result.errors.iter().filter_map(|e| e.field).collect();
        assert_eq!(fields, vec![Field::Description, Field::SalePrice]);
        assert!(result.errors.iter().all(|e| e.message.contains("required but empty")));
    }

    #[test]
    fn test_positional_table_too_narrow_is_structural() {
        let html = "<table><tr><th>A</th><th>B</th><th>C</th></tr>\
                    <tr><td>1</td><td>2</td><td>3</td></tr></table>";
        let err = TableParser::consignable().parse(html).unwrap_err();
        assert!(err.to_string().contains("insufficient columns"));
        assert!(err.is_structural());
    }

    #[test]
    fn test_unknown_positional_field() {
        assert!(matches!(
            TableParser::with_positional(&["store", "price_ish"]),
            Err(SalesError::UnknownField(f)) if f == "price_ish"
        ));
    }

    #[test]
    fn test_strict_mode() {
        let html = "<table><tr><th>Store</th><th>Vendor</th><th>Date</th><th>Description</th><th>Sale Price</th></tr>\
                    <tr><td>A</td><td>B</td><td>2024-01-01</td><td>C</td><td>1</td></tr></table>";
        assert!(TableParser::new().parse(html).is_ok());
        let err = TableParser::new().strict(true).parse(html).unwrap_err();
        assert!(matches!(err, SalesError::UnmatchedColumn { .. }));
        // Strictness only concerns header matching.
        assert_eq!(TableParser::consignable().strict(true).strategy(), TableParser::consignable().strategy());
    }

    #[test]
    fn test_real_world_consignable_export() {
        let html = r#"
            <tr class="odd"><td>Vintage Corner</td><td>Retro Finds LLC</td><td>03/15/2024</td>
                <td>Mid-century lamp</td><td>$1,299.99</td><td>$389.99</td><td>$910.00</td></tr>
            <tr class="even"><td>Vintage Corner</td><td>Oak &amp; Iron</td><td>Mar 16, 2024</td>
                <td>Side table</td><td>$450.00</td><td>$135.00</td><td>$315.00</td></tr>
            <tr class="odd"><td>Uptown Antiques</td><td>Retro Finds LLC</td><td>2024-03-17</td>
                <td>Armoire</td><td>$2,450.00</td><td>$735.00</td><td>$1,715.00</td></tr>
        "#;
        let result = TableParser::consignable().parse(html).unwrap();
        assert_eq!(result.error_count, 0, "{:?}", result.errors);
        let dates: Vec<_> = result.records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-15", "2024-03-16", "2024-03-17"]);
        assert_eq!(result.records[0].sale_price, 1299.99);
        assert_eq!(result.records[1].vendor, "Oak & Iron");
        assert_eq!(result.records[2].sale_price, 2450.0);
        assert_eq!(result.statistics.value_ranges["Sale Price"].max, 2450.0);
    }

    #[test]
    fn test_processing_time_is_recorded() {
        let result = TableParser::new().parse(BASIC_TABLE).unwrap();
        assert!(result.statistics.processing_time > Duration::ZERO);
    }
}
