// SPDX-License-Identifier: PMPL-1.0-or-later
//! Tarifa engine binary
//!
//! Assembles the storage layer and exports the administrative service.
//! Usage: `tarifa-api [config.yaml]`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tarifa_api::{ApierV1, EngineConfig, StorageLayer};
use tarifa_dispatch::ServiceRouter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = EngineConfig::load(config_path.as_deref())?;

    let storage = StorageLayer::assemble(&config).context("Failed to assemble storage layer")?;

    let mut router = ServiceRouter::new();
    router.mount(Arc::new(ApierV1::new(storage.data_db.clone())).dispatcher()?)?;
    tracing::info!(services = ?router.services(), "Tarifa engine ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");

    storage.close().await?;
    Ok(())
}
