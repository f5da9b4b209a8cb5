pub mod baseline;
pub mod cache;
pub mod catalog;
pub mod db;
pub mod engine;
pub mod ingest;
pub mod models;
pub mod oracle;
pub mod parsing;
pub mod reconstruct;
pub mod sampling;
pub mod settings;
pub mod utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use db::Database;
use engine::ReconstructionEngine;
use ingest::Ingestor;
use sampling::{FileSampleSource, SampleSource, SamplingController};
use settings::{EngineSettings, SettingsStore};

/// Command-line arguments for tradetrace
#[derive(Parser, Debug)]
#[command(name = "tradetrace")]
#[command(about = "Reconstructs marketplace trades from OCR'd activity logs")]
#[command(version)]
pub struct Cli {
    /// SQLite trade store
    #[arg(long, default_value = "tradetrace.sqlite3", env = "TRADETRACE_DB")]
    pub db: PathBuf,

    /// Engine settings (JSON); written out with defaults when missing
    #[arg(long, default_value = "settings.json", env = "TRADETRACE_SETTINGS")]
    pub settings: PathBuf,

    /// File the OCR stage writes samples to (plain text or JSON)
    #[arg(long, env = "TRADETRACE_INPUT")]
    pub input: PathBuf,

    /// Ingest the current sample once, print the report and exit
    #[arg(long)]
    pub once: bool,
}

/// Open the store and build an ingestor with persisted state loaded.
pub async fn open_ingestor(db_path: PathBuf, settings: &EngineSettings) -> Result<Ingestor> {
    let database = Database::new(db_path).context("failed to open trade store")?;
    let engine = ReconstructionEngine::from_settings(settings)?;
    Ingestor::load(engine, database, settings.occurrence_retention_days)
        .await
        .context("failed to load persisted process state")
}

async fn run_cli(cli: Cli) -> Result<()> {
    let settings = SettingsStore::new(cli.settings.clone())?.get();
    let mut ingestor = open_ingestor(cli.db.clone(), &settings).await?;
    let mut source = FileSampleSource::new(cli.input.clone(), settings.sampling.default_tab);

    if cli.once {
        let Some(sample) = source.capture()? else {
            log::warn!("no sample at {}", cli.input.display());
            return Ok(());
        };
        let report = ingestor.ingest(sample).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut controller = SamplingController::new();
    controller.start_sampling(Box::new(source), ingestor, &settings.sampling)?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    log::info!("Shutdown requested");

    controller.stop_sampling().await?;
    Ok(())
}

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    log::info!("tradetrace starting up...");

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
        .and_then(|runtime| runtime.block_on(run_cli(cli)));

    if let Err(err) = result {
        log::error!("tradetrace failed: {err:?}");
        std::process::exit(1);
    }
}
