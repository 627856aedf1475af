//! Application context - service clients sharing one transport

use std::sync::Arc;

use ledgerbridge_core::Transport;
use ledgerbridge_domain::{Config, Result};
use ledgerbridge_infra::{Blinksale, FreshBooks, HttpTransport};
use tracing::info;

/// Connected services for one run
pub struct AppContext {
    pub config: Config,
    pub transport: Arc<dyn Transport>,
    pub blinksale: Option<Blinksale>,
    pub freshbooks: Option<FreshBooks>,
}

impl AppContext {
    /// Connect every configured service over the reqwest transport.
    pub async fn new(config: Config) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(&config.transport));
        Self::with_transport(config, transport).await
    }

    pub async fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let blinksale = config
            .blinksale
            .as_ref()
            .map(|blinksale| Blinksale::new(blinksale, Arc::clone(&transport)))
            .transpose()?;

        let freshbooks = match &config.freshbooks {
            Some(freshbooks) => Some(FreshBooks::connect(freshbooks, Arc::clone(&transport)).await?),
            None => None,
        };

        info!(
            blinksale = blinksale.is_some(),
            freshbooks = freshbooks.is_some(),
            "application context ready"
        );
        Ok(Self { config, transport, blinksale, freshbooks })
    }
}
