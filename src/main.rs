use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use payverify::application::engine::PaymentEngine;
use payverify::application::stats::StatsPeriod;
use payverify::config::Config;
use payverify::domain::ports::{AttemptStoreBox, OrderStoreBox};
use payverify::infrastructure::in_memory::{InMemoryAttemptStore, InMemoryOrderStore};
#[cfg(feature = "storage-rocksdb")]
use payverify::infrastructure::rocksdb::RocksDBStore;
use payverify::interfaces::csv::command_reader::CommandReader;
use payverify::interfaces::csv::report_writer::ReportWriter;
use std::fs::File;
use std::io;
use std::path::PathBuf;

#[derive(Clone, Copy, ValueEnum)]
enum Report {
    Attempts,
    Orders,
    Stats,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// TOML configuration file (optional).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Which report to print once all commands ran.
    #[arg(long, value_enum, default_value = "attempts")]
    report: Report,

    /// Period for the stats report: all, today, 7d or 30d.
    #[arg(long, default_value = "all")]
    period: String,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(cli: &Cli) -> Result<(AttemptStoreBox, OrderStoreBox)> {
    if let Some(db_path) = &cli.db_path {
        // Use persistent storage (RocksDB)
        let store = RocksDBStore::open(db_path).into_diagnostic()?;
        return Ok((Box::new(store.clone()), Box::new(store)));
    }
    Ok(in_memory_stores())
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(cli: &Cli) -> Result<(AttemptStoreBox, OrderStoreBox)> {
    if cli.db_path.is_some() {
        miette::bail!("--db-path requires a build with the storage-rocksdb feature");
    }
    Ok(in_memory_stores())
}

fn in_memory_stores() -> (AttemptStoreBox, OrderStoreBox) {
    (
        Box::new(InMemoryAttemptStore::new()),
        Box::new(InMemoryOrderStore::new()),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path).into_diagnostic()?,
        None => Config::default(),
    };
    let period: StatsPeriod = cli.period.parse().into_diagnostic()?;

    let (attempts, orders) = open_stores(&cli)?;
    let engine = PaymentEngine::new(attempts, orders, &config).into_diagnostic()?;

    // Run commands
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for (line, command) in reader.commands().enumerate() {
        match command {
            Ok(command) => {
                if let Err(e) = command.execute(&engine).await {
                    eprintln!("Error executing command {}: {}", line + 1, e);
                }
            }
            Err(e) => {
                eprintln!("Error reading command {}: {}", line + 1, e);
            }
        }
    }

    // Output the requested report
    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    match cli.report {
        Report::Attempts => {
            let attempts = engine.attempts().await.into_diagnostic()?;
            writer.write_attempts(&attempts).into_diagnostic()?;
        }
        Report::Orders => {
            let orders = engine.orders().await.into_diagnostic()?;
            writer
                .write_orders(&orders, engine.registry())
                .into_diagnostic()?;
        }
        Report::Stats => {
            let stats = engine.get_stats(period).await.into_diagnostic()?;
            writer.write_stats(&stats).into_diagnostic()?;
        }
    }

    Ok(())
}
