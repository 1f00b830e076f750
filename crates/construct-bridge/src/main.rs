use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use construct_bridge::{Args, BridgeConfig, build_service, serve, spawn_sweeper};
use construct_kv::InMemoryKvStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries replies, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = BridgeConfig::resolve(&args)?;

    let kv_config = config.kv_config()?;
    let store = Arc::new(match &config.data_file {
        Some(path) => InMemoryKvStore::load(path, kv_config)
            .with_context(|| format!("cannot load key-value snapshot {}", path.display()))?,
        None => InMemoryKvStore::with_config(kv_config),
    });
    let service = Arc::new(build_service(&config, Arc::clone(&store))?);

    if args.describe {
        println!("{}", serde_json::to_string_pretty(&service.describe())?);
        return Ok(());
    }

    info!(
        "Starting {} bridge with {} methods",
        service.name(),
        service.registry().public_names().len()
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = spawn_sweeper(
        Arc::clone(&store),
        config.sweep_interval(),
        config.data_file.clone(),
        shutdown_rx,
    );

    let served = serve(
        service,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;

    // Stop the sweeper and persist the store whether or not serving failed
    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        warn!("Sweeper task failed: {}", e);
    }
    if let Some(path) = &config.data_file {
        store
            .save(path)
            .with_context(|| format!("cannot save key-value snapshot {}", path.display()))?;
    }

    let stats = served?;
    info!("Bridge stopped after {} requests", stats.requests);
    Ok(())
}
