//! SmogLens: live camera view under an AQI-driven smog haze
//!
//! Main entry point. Initializes the global allocator, sets up logging,
//! loads the configuration and runs the window or headless mode.

mod config;
mod export;
mod feed;
mod headless;
mod shell;

use anyhow::Result;
use config::{AppConfig, RunMode};
use tracing::info;
use tracing_subscriber::EnvFilter;

// Use mimalloc as the global allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    info!("SmogLens {} starting...", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    match config.mode {
        RunMode::Window => shell::run(config)?,
        RunMode::Headless => {
            let path = headless::run(&config)?;
            info!("Snapshot written to {}", path.display());
        }
    }

    info!("SmogLens shutting down");
    Ok(())
}
