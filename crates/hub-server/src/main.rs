//! # Royale Hub
//!
//! Live event hub for a chat-driven battle royale stream. Receives chat,
//! gift and command events from the livestream connector and streams the
//! resulting notifications to browser overlays.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! royale-hub
//!
//! # Run with environment variables
//! HUB_PORT=8080 HUB_HOST=0.0.0.0 royale-hub
//! ```
//!
//! A `royale-hub.toml` in the working directory, `/etc/royale-hub/` or
//! `~/.config/royale-hub/` is picked up when present.

mod config;
mod handlers;
mod metrics;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "royale_hub=debug,royale_hub_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    tracing::info!("Starting Royale hub on {}:{}", config.host, config.port);

    // Initialize metrics
    metrics::init_metrics();

    // Start the server
    handlers::run_server(config).await?;

    Ok(())
}
