use std::collections::BTreeMap;

use crate::error::{Result, SalesError};
use crate::models::Field;

/// Semantic field -> zero-based physical column.
pub type ColumnMapping = BTreeMap<Field, usize>;

/// Accepted header spellings per field, highest priority first.
pub const HEADER_ALIASES: &[(Field, &[&str])] = &[
    (
        Field::Store,
        &["store", "shop", "location", "outlet", "branch", "store name", "shop name"],
    ),
    (
        Field::Vendor,
        &["vendor", "supplier", "brand", "manufacturer", "company", "vendor name", "supplier name"],
    ),
    (
        Field::Date,
        &["date", "sale date", "transaction date", "order date", "purchase date", "sold date"],
    ),
    (
        Field::Description,
        &[
            "description",
            "item",
            "product",
            "item description",
            "product description",
            "details",
            "name",
            "product name",
        ],
    ),
    (
        Field::SalePrice,
        &["sale price", "price", "amount", "total", "sale amount", "selling price", "cost", "value"],
    ),
    (
        Field::Commission,
        &[
            "commission",
            "fee",
            "commission amount",
            "commission fee",
            "comm",
            "commission %",
            "commission rate",
        ],
    ),
    (
        Field::Remaining,
        &[
            "remaining",
            "balance",
            "remaining balance",
            "outstanding",
            "due",
            "remaining amount",
            "balance due",
        ],
    ),
];

pub fn aliases(field: Field) -> &'static [&'static str] {
    HEADER_ALIASES
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, a)| *a)
        .unwrap_or(&[])
}

/// The Consignable export layout: every field, in declaration order.
pub fn consignable_layout() -> Vec<Field> {
    Field::ALL.to_vec()
}

/// How a header row turns into a `ColumnMapping`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnStrategy {
    /// Match header text against `HEADER_ALIASES`. In strict mode every
    /// field, optional ones included, must match some header.
    HeaderMatch { strict: bool },
    /// Fixed field order; header text is ignored.
    Positional(Vec<Field>),
}

impl Default for ColumnStrategy {
    fn default() -> Self {
        Self::HeaderMatch { strict: false }
    }
}

impl ColumnStrategy {
    pub fn positional_from_keys<S: AsRef<str>>(keys: &[S]) -> Result<Self> {
        let fields = keys
            .iter()
            .map(|k| {
                Field::from_key(k.as_ref())
                    .ok_or_else(|| SalesError::UnknownField(k.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::Positional(fields))
    }

    /// Header cells to synthesize when bare rows are wrapped into a table.
    pub fn synthetic_header(&self) -> Option<&[Field]> {
        match self {
            Self::Positional(fields) if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }

    pub fn resolve(&self, headers: &[String]) -> Result<ColumnMapping> {
        match self {
            Self::HeaderMatch { strict } => {
                let mapping = match_headers(headers, *strict)?;
                require_fields(&mapping, "header-based mapping", headers)?;
                Ok(mapping)
            }
            Self::Positional(fields) => {
                if headers.len() < fields.len() {
                    return Err(SalesError::InsufficientColumns {
                        expected: fields.len(),
                        found: headers.len(),
                    });
                }
                let mut mapping = ColumnMapping::new();
                for (idx, field) in fields.iter().enumerate() {
                    mapping.entry(*field).or_insert(idx);
                }
                require_fields(&mapping, "positional mapping", headers)?;
                Ok(mapping)
            }
        }
    }
}

fn match_headers(headers: &[String], strict: bool) -> Result<ColumnMapping> {
    let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let mut claimed = vec![false; normalized.len()];
    let mut mapping = ColumnMapping::new();

    for field in Field::ALL {
        let hit = aliases(field).iter().find_map(|alias| {
            normalized.iter().enumerate().position(|(idx, header)| {
                !claimed[idx]
                    && !header.is_empty()
                    && (header.contains(alias) || alias.contains(header.as_str()))
            })
        });
        match hit {
            Some(idx) => {
                claimed[idx] = true;
                mapping.insert(field, idx);
            }
            None if strict => {
                return Err(SalesError::UnmatchedColumn {
                    field: field.key().to_string(),
                    headers: headers.to_vec(),
                });
            }
            None => {}
        }
    }
    Ok(mapping)
}

fn require_fields(mapping: &ColumnMapping, context: &'static str, headers: &[String]) -> Result<()> {
    let missing: Vec<String> = Field::ALL
        .iter()
        .filter(|f| f.is_required() && !mapping.contains_key(f))
        .map(|f| f.key().to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SalesError::MissingColumns {
            context,
            missing,
            available: headers.to_vec(),
        })
    }
}
