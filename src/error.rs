use thiserror::Error;

#[derive(Error, Debug)]
pub enum SalesError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no tables found in the provided data")]
    NoTables,

    #[error("no data rows found in table")]
    NoDataRows,

    #[error("{context} missing required columns: {}. Available headers: {}", .missing.join(", "), .available.join(", "))]
    MissingColumns {
        context: &'static str,
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("insufficient columns: positional mapping expects {expected} columns, but only {found} found")]
    InsufficientColumns { expected: usize, found: usize },

    #[error("required column '{field}' not found in headers: {}", .headers.join(", "))]
    UnmatchedColumn { field: String, headers: Vec<String> },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid {param}: {value}")]
    InvalidPeriod { param: &'static str, value: String },

    #[error("Invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Invalid group-by '{0}': expected year, month, day, store or vendor")]
    InvalidGroupBy(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

impl SalesError {
    /// Whether the error aborted a parse before any row was decoded.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::NoTables
                | Self::NoDataRows
                | Self::MissingColumns { .. }
                | Self::InsufficientColumns { .. }
                | Self::UnmatchedColumn { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SalesError>;
