//! OAuth2 token endpoint client
//!
//! Exchanges authorization codes and refresh tokens for bearer tokens. The
//! endpoint takes a JSON body:
//!
//! ```json
//! {"client_id": "...", "client_secret": "...", "redirect_uri": "...",
//!  "grant_type": "authorization_code", "code": "..."}
//! ```
//!
//! and answers with `access_token`, `refresh_token`, `token_type`,
//! `created_at` and `expires_in`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ledgerbridge_core::auth::{TokenExchange, TokenGrant};
use ledgerbridge_core::transport::{check_status, HeaderSet, HttpRequest, Transport, Verb};
use ledgerbridge_domain::constants::{DEFAULT_USER_AGENT, MEDIA_TYPE_JSON};
use ledgerbridge_domain::{OAuth2Credentials, OAuth2Token, RestError, Result, TokenResponse};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::errors::InfraError;

/// [`TokenExchange`] against a JSON OAuth2 token endpoint
pub struct OAuth2TokenEndpoint {
    url: String,
    credentials: OAuth2Credentials,
    headers: HeaderSet,
    transport: Arc<dyn Transport>,
}

impl OAuth2TokenEndpoint {
    /// `url` is the absolute URL of the token endpoint.
    pub fn new(url: impl Into<String>, credentials: OAuth2Credentials, transport: Arc<dyn Transport>) -> Self {
        let mut headers = HeaderSet::new();
        headers.insert("Accept", MEDIA_TYPE_JSON);
        headers.insert("Content-Type", MEDIA_TYPE_JSON);
        headers.insert("User-Agent", DEFAULT_USER_AGENT);
        Self { url: url.into(), credentials, headers, transport }
    }

    /// Extra header sent with every token request.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request_body(&self, grant: &TokenGrant) -> Value {
        let mut body = json!({
            "client_id": self.credentials.client_id,
            "client_secret": self.credentials.client_secret,
            "redirect_uri": self.credentials.redirect_uri,
            "grant_type": grant.grant_type().to_string(),
        });
        match grant {
            TokenGrant::AuthorizationCode(code) => body["code"] = json!(code),
            TokenGrant::RefreshToken(token) => body["refresh_token"] = json!(token),
        }
        body
    }
}

#[async_trait]
impl TokenExchange for OAuth2TokenEndpoint {
    #[instrument(skip(self, grant), fields(url = %self.url, grant_type = %grant.grant_type()))]
    async fn exchange(&self, grant: &TokenGrant) -> Result<OAuth2Token> {
        let body = serde_json::to_string(&self.request_body(grant))
            .map_err(|e| RestError::from(InfraError::from(e)))?;
        let request =
            HttpRequest { verb: Verb::Post, url: self.url.clone(), headers: self.headers.clone(), body: Some(body) };

        let response = self.transport.execute(request).await?;
        debug!(status = response.status, "token endpoint responded");
        check_status(&response, None).map_err(|err| RestError::Token(err.to_string()))?;

        let token: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| RestError::Token(format!("malformed token response: {e}")))?;
        Ok(token.into_token(Utc::now()))
    }
}
