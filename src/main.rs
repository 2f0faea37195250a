mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod parser;
mod settings;
mod store;
mod summary;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands, PerformanceCommands, RecordsCommands, SummaryCommands};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("SALESTRACK_LOG")
                .unwrap_or_else(|_| format!("{}=warn", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        None | Some(Commands::Status) => cli::status::run(),
        Some(Commands::Init { data_dir }) => cli::init::run(data_dir),
        Some(Commands::Import {
            file,
            opts,
            batch,
            force,
        }) => cli::import::run(&file, &opts, batch, force),
        Some(Commands::Validate { file, opts, json }) => cli::validate::run(&file, &opts, json),
        Some(Commands::Summary { command }) => match command {
            SummaryCommands::Yearly { json } => cli::summary::yearly(json),
            SummaryCommands::Monthly { year, json } => cli::summary::monthly(year, json),
            SummaryCommands::Daily { year, month, json } => cli::summary::daily(year, month, json),
            SummaryCommands::Pivot { year } => cli::summary::pivot(year),
            SummaryCommands::Custom {
                group_by,
                year,
                store,
                vendor,
                json,
            } => cli::summary::custom(&group_by, year, store.as_deref(), vendor.as_deref(), json),
        },
        Some(Commands::Drill {
            year,
            month,
            day,
            json,
        }) => cli::drill::run(year, month, day, json),
        Some(Commands::Records { command }) => match command {
            RecordsCommands::List {
                store,
                vendor,
                date_from,
                date_to,
                min_price,
                max_price,
                sort,
                order,
                limit,
                offset,
                json,
            } => cli::records::list(
                cli::records::ListArgs {
                    store,
                    vendor,
                    date_from,
                    date_to,
                    min_price,
                    max_price,
                    sort,
                    order,
                    limit,
                    offset,
                },
                json,
            ),
            RecordsCommands::Show { id, json } => cli::records::show(id, json),
            RecordsCommands::Edit { id, fields, json } => cli::records::edit(id, fields, json),
            RecordsCommands::Delete { id } => cli::records::delete(id),
        },
        Some(Commands::Performance { command }) => match command {
            PerformanceCommands::Stores { year, json } => cli::performance::stores(year, json),
            PerformanceCommands::Vendors { year, json } => cli::performance::vendors(year, json),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        if e.is_structural() {
            eprintln!("Run `salestrack validate <file>` to inspect how the table was read.");
        }
        std::process::exit(1);
    }
}
