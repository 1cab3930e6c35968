mod cache;
mod routes;
mod state;

use anyhow::{Context, Result};
use gamefy_core::GamefyConfig;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = GamefyConfig::load()?;
    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.listen))?;

    let state = AppState::new(&config)?;
    if config.feed_url().is_none() {
        info!("No feed_url configured; serving stored events only");
    }

    let app = routes::app(state);

    info!("gamefy-server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize logging; `RUST_LOG` overrides the default level.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
