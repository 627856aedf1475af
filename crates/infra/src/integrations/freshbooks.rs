//! FreshBooks client
//!
//! FreshBooks speaks JSON at `https://api.freshbooks.com` with OAuth2 bearer
//! tokens and an `Api-Version: alpha` header. Accounting collections live
//! under the selected business's account, so `clients` and `invoices` are
//! only declared once [`FreshBooks::use_business`] has picked one.

use std::sync::Arc;

use ledgerbridge_core::{
    Client, Collection, CollectionOptions, Filter, FilterStyle, OAuth2Session, Resource, TokenState,
    Transport,
};
use ledgerbridge_domain::constants::{
    FRESHBOOKS_API_VERSION, FRESHBOOKS_AUTHORIZE_URL, FRESHBOOKS_HOST, FRESHBOOKS_IDENTITY_PATH,
    FRESHBOOKS_TOKEN_PATH,
};
use ledgerbridge_domain::{
    FreshBooksConfig, MediaType, OAuth2Credentials, OAuth2Token, RestError, Result,
};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::ServiceEndpoint;
use crate::auth::OAuth2TokenEndpoint;

/// Business and account the accounting collections are scoped to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessSelection {
    pub business_id: u64,
    pub account_id: String,
}

/// Connected FreshBooks user
///
/// Like the client it wraps, the collections and resources it returns stay
/// usable only while this value is alive.
pub struct FreshBooks {
    client: Client,
    session: Arc<OAuth2Session>,
    credentials: OAuth2Credentials,
    selection: RwLock<Option<BusinessSelection>>,
}

impl FreshBooks {
    /// Build the client and bring its token up to date: exchange the
    /// configured authorization code when there is no stored token, or
    /// refresh a stored token that has expired.
    pub async fn connect(config: &FreshBooksConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::connect_to(config, &ServiceEndpoint::https(FRESHBOOKS_HOST), transport).await
    }

    pub async fn connect_to(
        config: &FreshBooksConfig,
        endpoint: &ServiceEndpoint,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let freshbooks = Self::with_endpoint(config, endpoint, transport)?;
        match (freshbooks.session.state(), config.auth_code.as_deref()) {
            (TokenState::Absent, Some(code)) => {
                freshbooks.session.authenticate(code).await?;
            }
            (TokenState::Expired, _) => {
                freshbooks.session.refresh().await?;
            }
            (TokenState::Absent, None) => {
                warn!("no FreshBooks token or authorization code configured");
            }
            (TokenState::Valid, _) => {}
        }
        Ok(freshbooks)
    }

    /// Build the client without touching the token endpoint.
    pub fn with_endpoint(
        config: &FreshBooksConfig,
        endpoint: &ServiceEndpoint,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let token_endpoint = OAuth2TokenEndpoint::new(
            format!("{}{FRESHBOOKS_TOKEN_PATH}", endpoint.url()),
            config.credentials.clone(),
            Arc::clone(&transport),
        )
        .with_header("Api-Version", FRESHBOOKS_API_VERSION);

        let exchange = Arc::new(token_endpoint);
        let session = Arc::new(match &config.token {
            Some(token) => OAuth2Session::with_token(exchange, token.clone()),
            None => OAuth2Session::new(exchange),
        });

        let client = endpoint
            .configure(Client::builder(endpoint.host.clone()))
            .media_type(MediaType::json())
            .header("Api-Version", FRESHBOOKS_API_VERSION)
            .filter_style(FilterStyle::Search)
            .authorization(session.clone())
            .transport(transport)
            .build()?;

        Ok(Self { client, session, credentials: config.credentials.clone(), selection: RwLock::new(None) })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn session(&self) -> &Arc<OAuth2Session> {
        &self.session
    }

    /// Current token, for persisting between runs.
    pub fn token(&self) -> Option<OAuth2Token> {
        self.session.token()
    }

    /// Page the user visits to grant access and obtain an authorization code.
    pub fn authorization_url(&self) -> String {
        format!(
            "{FRESHBOOKS_AUTHORIZE_URL}?client_id={}&response_type=code&redirect_uri={}",
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(&self.credentials.redirect_uri),
        )
    }

    /// Exchange an authorization code for a token.
    pub async fn authenticate(&self, code: &str) -> Result<OAuth2Token> {
        self.session.authenticate(code).await
    }

    /// The signed-in user's identity document.
    pub fn identity(&self) -> Arc<Resource> {
        self.client.resource(FRESHBOOKS_IDENTITY_PATH, Filter::new())
    }

    /// Businesses the user is a member of.
    pub async fn businesses(&self) -> Result<Vec<Value>> {
        let memberships = match self.identity().get("business_memberships").await {
            Ok(Value::Array(memberships)) => memberships,
            Ok(_) | Err(RestError::UnknownAttribute(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        Ok(memberships
            .into_iter()
            .filter_map(|mut membership| membership.get_mut("business").map(Value::take))
            .collect())
    }

    pub fn selection(&self) -> Option<BusinessSelection> {
        self.selection.read().clone()
    }

    /// The selected business, if one has been chosen and is still listed.
    pub async fn using_business(&self) -> Result<Option<Value>> {
        let Some(selection) = self.selection() else {
            return Ok(None);
        };
        Ok(self
            .businesses()
            .await?
            .into_iter()
            .find(|business| matches_business(business, selection.business_id, &selection.account_id)))
    }

    /// Scope the accounting collections to `business_id` / `account_id`.
    ///
    /// Fails with `Precondition`, leaving the current selection and cache
    /// untouched, when the business is not one of [`FreshBooks::businesses`].
    #[instrument(skip(self))]
    pub async fn use_business(&self, business_id: u64, account_id: &str) -> Result<()> {
        let businesses = self.businesses().await?;
        if !businesses.iter().any(|business| matches_business(business, business_id, account_id)) {
            return Err(RestError::Precondition(format!(
                "business {business_id} (account {account_id}) is not available to this user"
            )));
        }

        *self.selection.write() =
            Some(BusinessSelection { business_id, account_id: account_id.to_string() });
        self.client.clear_cache();

        self.client.declare_collection(
            "clients",
            CollectionOptions::new()
                .path(format!("/accounting/account/{account_id}/users/clients"))
                .element_key("client"),
            |_| {},
        );
        self.client.declare_collection(
            "invoices",
            CollectionOptions::new()
                .path(format!("/accounting/account/{account_id}/invoices/invoices"))
                .element_key("invoice"),
            |_| {},
        );

        info!(business_id, account_id, "using FreshBooks business");
        Ok(())
    }

    pub fn clients(&self, filter: Filter) -> Result<Arc<Collection>> {
        self.client.collection("clients", filter)
    }

    pub fn invoices(&self, filter: Filter) -> Result<Arc<Collection>> {
        self.client.collection("invoices", filter)
    }
}

fn matches_business(business: &Value, business_id: u64, account_id: &str) -> bool {
    let id_matches = match business.get("id") {
        Some(Value::Number(id)) => id.as_u64() == Some(business_id),
        Some(Value::String(id)) => id.parse::<u64>().ok() == Some(business_id),
        _ => false,
    };
    id_matches && business.get("account_id").and_then(Value::as_str) == Some(account_id)
}
