use serde::{Deserialize, Serialize};

use crate::error::SalesError;

/// Semantic fields a sales table can carry, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Store,
    Vendor,
    Date,
    Description,
    SalePrice,
    Commission,
    Remaining,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Store,
        Field::Vendor,
        Field::Date,
        Field::Description,
        Field::SalePrice,
        Field::Commission,
        Field::Remaining,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Vendor => "vendor",
            Self::Date => "date",
            Self::Description => "description",
            Self::SalePrice => "sale_price",
            Self::Commission => "commission",
            Self::Remaining => "remaining",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Store => "Store",
            Self::Vendor => "Vendor",
            Self::Date => "Date",
            Self::Description => "Description",
            Self::SalePrice => "Sale Price",
            Self::Commission => "Commission",
            Self::Remaining => "Remaining",
        }
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, Self::Commission | Self::Remaining)
    }

    /// Accepts the snake_case key or the display name, case-insensitively.
    pub fn from_key(raw: &str) -> Option<Field> {
        let wanted = raw.trim().to_lowercase().replace(' ', "_");
        Field::ALL.into_iter().find(|f| f.key() == wanted)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// One decoded sales row. Dates are always ISO `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub store: String,
    pub vendor: String,
    pub date: String,
    pub description: String,
    pub sale_price: f64,
    pub commission: f64,
    pub remaining: f64,
}

impl AsRef<Sale> for Sale {
    fn as_ref(&self) -> &Sale {
        self
    }
}

/// A sale as persisted by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSale {
    pub id: i64,
    #[serde(flatten)]
    pub sale: Sale,
    pub created_at: String,
    pub updated_at: String,
}

impl AsRef<Sale> for StoredSale {
    fn as_ref(&self) -> &Sale {
        &self.sale
    }
}

/// A row-level error or warning. `row` is 1-based and does not count the header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseIssue {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<Field>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Rollup for one period ("2024", "2024-03" or "2024-03-15").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryNode {
    pub period: String,
    pub items_sold: u64,
    pub total_sales: f64,
    pub total_commission: f64,
    pub total_remaining: f64,
    pub unique_stores: usize,
    pub unique_vendors: usize,
}

/// Per-store or per-vendor analytics. `unique_counterparts` counts vendors
/// for a store row and stores for a vendor row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRow {
    pub name: String,
    pub total_items: u64,
    pub total_sales: f64,
    pub total_commission: f64,
    pub total_remaining: f64,
    pub avg_sale_price: f64,
    pub first_sale_date: String,
    pub last_sale_date: String,
    pub unique_counterparts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Date,
    Store,
    Vendor,
    SalePrice,
    CreatedAt,
    Id,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Store => "store",
            Self::Vendor => "vendor",
            Self::SalePrice => "sale_price",
            Self::CreatedAt => "created_at",
            Self::Id => "id",
        }
    }

    pub fn parse(raw: &str) -> Option<SortField> {
        match raw.trim().to_lowercase().as_str() {
            "date" => Some(Self::Date),
            "store" => Some(Self::Store),
            "vendor" => Some(Self::Vendor),
            "sale_price" | "price" => Some(Self::SalePrice),
            "created_at" => Some(Self::CreatedAt),
            "id" => Some(Self::Id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    pub fn parse(raw: &str) -> Option<SortOrder> {
        match raw.trim().to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Partial edit of a stored sale; `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SaleUpdate {
    pub store: Option<String>,
    pub vendor: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub sale_price: Option<f64>,
    pub commission: Option<f64>,
    pub remaining: Option<f64>,
}

impl SaleUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Grouping key for a custom summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Year,
    Month,
    Day,
    Store,
    Vendor,
}

impl std::str::FromStr for GroupBy {
    type Err = SalesError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "year" => Ok(Self::Year),
            "month" => Ok(Self::Month),
            "day" => Ok(Self::Day),
            "store" => Ok(Self::Store),
            "vendor" => Ok(Self::Vendor),
            _ => Err(SalesError::InvalidGroupBy(raw.to_string())),
        }
    }
}

/// Query filter for the record store. `limit: None` returns every match.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub store: Option<String>,
    pub vendor: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub limit: Option<usize>,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordPage {
    pub records: Vec<StoredSale>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub total_records: i64,
    pub earliest_date: Option<String>,
    pub latest_date: Option<String>,
    pub total_sales: f64,
    pub avg_sale_price: f64,
    pub unique_stores: i64,
    pub unique_vendors: i64,
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRecord {
    pub id: i64,
    pub source: String,
    pub record_count: i64,
    pub date_range_start: Option<String>,
    pub date_range_end: Option<String>,
    pub checksum: String,
    pub imported_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_from_key_accepts_display_names() {
        assert_eq!(Field::from_key("sale_price"), Some(Field::SalePrice));
        assert_eq!(Field::from_key("Sale Price"), Some(Field::SalePrice));
        assert_eq!(Field::from_key(" STORE "), Some(Field::Store));
        assert_eq!(Field::from_key("price"), None);
    }

    #[test]
    fn test_group_by_parse() {
        assert_eq!("Month".parse::<GroupBy>().unwrap(), GroupBy::Month);
        assert_eq!(" vendor ".parse::<GroupBy>().unwrap(), GroupBy::Vendor);
        assert!(matches!("week".parse::<GroupBy>(), Err(SalesError::InvalidGroupBy(w)) if w == "week"));
    }

    #[test]
    fn test_sale_update_is_empty() {
        assert!(SaleUpdate::default().is_empty());
        let update = SaleUpdate {
            vendor: Some("Acme".into()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_required_fields() {
        let required: Vec<_> = Field::ALL.iter().filter(|f| f.is_required()).collect();
        assert_eq!(required.len(), 5);
        assert!(!Field::Commission.is_required());
        assert!(!Field::Remaining.is_required());
    }

    #[test]
    fn test_stored_sale_serializes_flat() {
        let stored = StoredSale {
            id: 7,
            sale: Sale {
                store: "Downtown".into(),
                vendor: "Acme".into(),
                date: "2024-01-15".into(),
                description: "Lamp".into(),
                sale_price: 10.0,
                commission: 1.0,
                remaining: 9.0,
            },
            created_at: "2024-01-15 10:00:00".into(),
            updated_at: "2024-01-15 10:00:00".into(),
        };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["store"], "Downtown");
        assert_eq!(json["sale_price"], 10.0);
    }
}
