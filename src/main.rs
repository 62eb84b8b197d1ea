use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payflow::config::FlowConfig;
use payflow::domain::ports::{SnapshotStoreBox, SnapshotStoreFactory};
use payflow::infrastructure::in_memory::InMemorySnapshotStore;
use payflow::interfaces::csv::outcome_writer::OutcomeWriter;
use payflow::interfaces::csv::script_reader::ScriptReader;
use payflow::interfaces::replay::ScenarioReplay;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario script CSV file (`op, kind, value` rows)
    script: PathBuf,

    /// JSON configuration file (optional). Defaults apply to missing fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent snapshot database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Where the caller expects to be returned when the transaction ends
    #[arg(long)]
    return_target: Option<String>,

    /// Log queue and channel plumbing
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = Arc::new(FlowConfig::load(cli.config.as_deref()).into_diagnostic()?);
    let stores = snapshot_stores(cli.db_path)?;
    let mut replay = ScenarioReplay::new(config, stores, cli.return_target);

    // Replay the scenario
    let file = File::open(&cli.script).into_diagnostic()?;
    let reader = ScriptReader::new(file);
    for step_result in reader.steps() {
        match step_result {
            Ok(step) => {
                if let Err(e) = replay.apply(step).await {
                    warn!(error = %e, "Error applying step");
                }
            }
            Err(e) => {
                warn!(error = %e, "Error reading step");
            }
        }
    }

    // Output where the transaction ended up
    let report = replay.finish();
    let stdout = io::stdout();
    let mut writer = OutcomeWriter::new(stdout.lock());
    writer.write_report(&report).into_diagnostic()?;

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn snapshot_stores(db_path: Option<PathBuf>) -> Result<SnapshotStoreFactory> {
    use payflow::infrastructure::rocksdb::RocksDbSnapshotStore;

    match db_path {
        Some(path) => {
            let store = RocksDbSnapshotStore::open(path).into_diagnostic()?;
            Ok(Box::new(move || Box::new(store.clone()) as SnapshotStoreBox))
        }
        None => Ok(in_memory_stores()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn snapshot_stores(db_path: Option<PathBuf>) -> Result<SnapshotStoreFactory> {
    if db_path.is_some() {
        warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_stores())
}

fn in_memory_stores() -> SnapshotStoreFactory {
    let store = InMemorySnapshotStore::new();
    Box::new(move || Box::new(store.clone()) as SnapshotStoreBox)
}
