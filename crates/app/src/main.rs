//! LedgerBridge - Blinksale and FreshBooks connection check
//!
//! Main entry point: loads configuration, connects the configured services
//! and prints what they hold.

use anyhow::Context;
use ledgerbridge_infra::config;
use ledgerbridge_lib::{summarize, AppContext};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging FIRST so we can see .env loading
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match dotenvy::dotenv() {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(e) => debug!(error = %e, "no .env file loaded"),
    }

    let config = config::load().context("failed to load configuration")?;
    let ctx = AppContext::new(config).await.context("failed to connect services")?;

    info!("LedgerBridge starting...");
    let summary = summarize(&ctx).await.context("failed to summarize services")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(token) = ctx.freshbooks.as_ref().and_then(|freshbooks| freshbooks.token()) {
        info!(expires_at = %token.expires_at(), "FreshBooks token current");
    }
    Ok(())
}
