pub mod drill;
pub mod import;
pub mod init;
pub mod performance;
pub mod records;
pub mod status;
pub mod summary;
pub mod validate;

use clap::{Args, Parser, Subcommand};

use crate::error::Result;
use crate::parser::TableParser;
use crate::settings::Settings;
use crate::store::SqliteStore;

/// Open the record store under the configured data directory, creating it on first use.
pub(crate) fn open_store(settings: &Settings) -> Result<SqliteStore> {
    std::fs::create_dir_all(&settings.data_dir)?;
    SqliteStore::open(&settings.db_path())
}

/// Parser from saved settings, with command-line overrides on top.
pub(crate) fn build_parser(settings: &Settings, opts: &ParseOpts) -> Result<TableParser> {
    let parser = if opts.consignable {
        TableParser::consignable()
    } else if let Some(columns) = &opts.columns {
        let keys: Vec<&str> = columns.split(',').map(str::trim).filter(|k| !k.is_empty()).collect();
        TableParser::with_positional(keys.as_slice())?
    } else {
        settings.parser()?
    };
    Ok(parser.strict(opts.strict || settings.strict_mode))
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Parser)]
#[command(name = "salestrack", about = "Import pasted sales tables and roll them up by year, month and day.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Column mapping flags shared by `import` and `validate`.
#[derive(Args, Debug, Default, Clone)]
pub struct ParseOpts {
    /// Headerless rows in the consignable layout (store, vendor, date, description, price, commission, remaining)
    #[arg(long, conflicts_with = "columns")]
    pub consignable: bool,
    /// Comma-separated field keys mapping columns by position, e.g. store,vendor,date,description,sale_price
    #[arg(long)]
    pub columns: Option<String>,
    /// Fail when a header cannot be matched instead of falling back
    #[arg(long)]
    pub strict: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for salestrack data (default: ~/Documents/salestrack)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Parse a pasted table (HTML, tab or pipe delimited) and store its sales.
    Import {
        /// File to import, or - for stdin
        file: String,
        #[command(flatten)]
        opts: ParseOpts,
        /// Store everything in one transaction; any failure stores nothing
        #[arg(long)]
        batch: bool,
        /// Import even if this exact payload was imported before
        #[arg(long)]
        force: bool,
    },
    /// Parse a table and report what would be imported, without storing anything.
    Validate {
        /// File to validate, or - for stdin
        file: String,
        #[command(flatten)]
        opts: ParseOpts,
        /// Print the full parse result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Roll sales up by period.
    Summary {
        #[command(subcommand)]
        command: SummaryCommands,
    },
    /// List the individual sales behind a year, month or day.
    Drill {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        day: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Browse stored sales records.
    Records {
        #[command(subcommand)]
        command: RecordsCommands,
    },
    /// Per-store or per-vendor performance.
    Performance {
        #[command(subcommand)]
        command: PerformanceCommands,
    },
    /// Show database statistics and recent imports.
    Status,
}

#[derive(Subcommand)]
pub enum SummaryCommands {
    /// One row per year.
    Yearly {
        #[arg(long)]
        json: bool,
    },
    /// One row per month.
    Monthly {
        /// Only months of this year
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        json: bool,
    },
    /// One row per day.
    Daily {
        #[arg(long)]
        year: Option<i32>,
        /// Month number (1-12)
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Yearly, monthly and daily rollups together (JSON).
    Pivot {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Rollup grouped by year, month, day, store or vendor.
    Custom {
        #[arg(long = "group-by", default_value = "month")]
        group_by: String,
        #[arg(long)]
        year: Option<i32>,
        /// Only sales at this store
        #[arg(long)]
        store: Option<String>,
        /// Only sales from this vendor
        #[arg(long)]
        vendor: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum RecordsCommands {
    /// List records matching the given filters.
    List {
        #[arg(long)]
        store: Option<String>,
        #[arg(long)]
        vendor: Option<String>,
        /// Earliest date, inclusive (any accepted date format)
        #[arg(long = "from")]
        date_from: Option<String>,
        /// Latest date, inclusive
        #[arg(long = "to")]
        date_to: Option<String>,
        #[arg(long = "min-price")]
        min_price: Option<f64>,
        #[arg(long = "max-price")]
        max_price: Option<f64>,
        /// date, store, vendor, sale_price, created_at or id
        #[arg(long, default_value = "date")]
        sort: String,
        /// asc or desc
        #[arg(long, default_value = "desc")]
        order: String,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        json: bool,
    },
    /// Show one record.
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Change fields of one record; fields left out keep their value.
    Edit {
        id: i64,
        #[command(flatten)]
        fields: EditFields,
        #[arg(long)]
        json: bool,
    },
    /// Delete one record.
    Delete { id: i64 },
}

#[derive(Args, Debug, Default, Clone)]
pub struct EditFields {
    #[arg(long)]
    pub store: Option<String>,
    #[arg(long)]
    pub vendor: Option<String>,
    /// Any accepted date format; stored as YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long = "sale-price")]
    pub sale_price: Option<f64>,
    #[arg(long)]
    pub commission: Option<f64>,
    #[arg(long)]
    pub remaining: Option<f64>,
}

#[derive(Subcommand)]
pub enum PerformanceCommands {
    /// Totals per store, highest sales first.
    Stores {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        json: bool,
    },
    /// Totals per vendor, highest sales first.
    Vendors {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        json: bool,
    },
}
