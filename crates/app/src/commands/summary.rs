//! Connection summary: what each configured service holds

use ledgerbridge_core::{Filter, TokenState};
use ledgerbridge_domain::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::context::AppContext;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blinksale: Option<BlinksaleSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freshbooks: Option<FreshBooksSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlinksaleSummary {
    pub clients: usize,
    pub invoices: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreshBooksSummary {
    /// Token state wire name: `absent`, `valid` or `expired`
    pub token: String,
    pub businesses: usize,
    /// Where to obtain an authorization code when no token is held
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
}

/// Count clients and invoices in Blinksale and the businesses reachable in
/// FreshBooks.
pub async fn summarize(ctx: &AppContext) -> Result<Summary> {
    let mut summary = Summary::default();

    if let Some(blinksale) = &ctx.blinksale {
        let clients = blinksale.clients(Filter::new())?.count().await?;
        let invoices = blinksale.invoices(Filter::new())?.count().await?;
        info!(clients, invoices, "Blinksale");
        summary.blinksale = Some(BlinksaleSummary { clients, invoices });
    }

    if let Some(freshbooks) = &ctx.freshbooks {
        let state = freshbooks.session().state();
        let token = state.to_string();
        summary.freshbooks = Some(match state {
            TokenState::Absent => {
                let url = freshbooks.authorization_url();
                warn!(%url, "FreshBooks needs an authorization code");
                FreshBooksSummary { token, businesses: 0, authorization_url: Some(url) }
            }
            _ => {
                let businesses = freshbooks.businesses().await?.len();
                info!(businesses, "FreshBooks");
                FreshBooksSummary { token, businesses, authorization_url: None }
            }
        });
    }

    Ok(summary)
}
