//! `siren-api` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP
//! server. The document backend is the explicitly constructed client every
//! component receives; its lifecycle is owned here, not by any ambient
//! singleton.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use anyhow::Result;

use siren_api::config::Config;
use siren_api::server::Server;
use siren_core::observability::{init_logging, LogFormat};
use siren_core::storage::{DocumentBackend, MemoryBackend};

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_logging(choose_log_format(&config));

    // A hosted realtime backend would be wired in here; the in-process
    // backend keeps single-node deployments and local development simple.
    tracing::info!("using in-memory document backend");
    let backend: Arc<dyn DocumentBackend> = Arc::new(MemoryBackend::new());

    let server = Server::new(config, backend)?;
    server.serve().await?;
    Ok(())
}
