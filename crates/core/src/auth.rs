//! Request authorization
//!
//! A client may carry an [`AuthorizationProvider`] that yields the
//! `Authorization` header for each request. [`OAuth2Session`] is the
//! bearer-token provider: it tracks the token lifecycle and refreshes an
//! expired token through a [`TokenExchange`] before the request is sent.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ledgerbridge_domain::{impl_wire_name_conversions, GrantType, OAuth2Token, RestError, Result};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Supplies the `Authorization` header value for outgoing requests
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    /// Header value, or `None` to send the request unauthenticated.
    async fn authorization(&self) -> Result<Option<String>>;
}

/// Grant presented to a token endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenGrant {
    AuthorizationCode(String),
    RefreshToken(String),
}

impl TokenGrant {
    pub fn grant_type(&self) -> GrantType {
        match self {
            Self::AuthorizationCode(_) => GrantType::AuthorizationCode,
            Self::RefreshToken(_) => GrantType::RefreshToken,
        }
    }
}

/// Exchanges a grant for a token at an OAuth2 token endpoint
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self, grant: &TokenGrant) -> Result<OAuth2Token>;
}

/// Lifecycle of the session's token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Absent,
    Valid,
    Expired,
}

impl_wire_name_conversions!(TokenState {
    Absent => "absent",
    Valid => "valid",
    Expired => "expired",
});

/// OAuth2 bearer-token session
pub struct OAuth2Session {
    exchange: Arc<dyn TokenExchange>,
    token: Mutex<Option<OAuth2Token>>,
}

impl OAuth2Session {
    pub fn new(exchange: Arc<dyn TokenExchange>) -> Self {
        Self { exchange, token: Mutex::new(None) }
    }

    /// Resume a session from a previously issued token.
    pub fn with_token(exchange: Arc<dyn TokenExchange>, token: OAuth2Token) -> Self {
        Self { exchange, token: Mutex::new(Some(token)) }
    }

    pub fn state(&self) -> TokenState {
        match self.token.lock().as_ref() {
            None => TokenState::Absent,
            Some(token) if token.is_expired_at(Utc::now()) => TokenState::Expired,
            Some(_) => TokenState::Valid,
        }
    }

    pub fn token(&self) -> Option<OAuth2Token> {
        self.token.lock().clone()
    }

    /// Exchange an authorization code for a token (absent → valid).
    pub async fn authenticate(&self, code: &str) -> Result<OAuth2Token> {
        let token = self.exchange.exchange(&TokenGrant::AuthorizationCode(code.to_string())).await?;
        info!(token_type = %token.token_type, ttl = token.ttl, "OAuth2 token issued");
        *self.token.lock() = Some(token.clone());
        Ok(token)
    }

    /// Exchange the refresh token for a new token (expired → valid).
    ///
    /// On failure the stored token is left untouched.
    pub async fn refresh(&self) -> Result<OAuth2Token> {
        let refresh_token = self
            .token
            .lock()
            .as_ref()
            .map(|token| token.refresh_token.clone())
            .ok_or_else(|| RestError::Token("no token to refresh".into()))?;

        let token = self
            .exchange
            .exchange(&TokenGrant::RefreshToken(refresh_token))
            .await
            .map_err(|err| {
                warn!(error = %err, "OAuth2 token refresh failed");
                match err {
                    RestError::Token(message) => RestError::Token(message),
                    other => RestError::Token(format!("refresh failed: {other}")),
                }
            })?;

        info!(ttl = token.ttl, "OAuth2 token refreshed");
        *self.token.lock() = Some(token.clone());
        Ok(token)
    }
}

#[async_trait]
impl AuthorizationProvider for OAuth2Session {
    async fn authorization(&self) -> Result<Option<String>> {
        match self.state() {
            TokenState::Absent => Err(RestError::Token("not authenticated".into())),
            TokenState::Expired => {
                debug!("OAuth2 token expired, refreshing before request");
                let token = self.refresh().await?;
                Ok(Some(token.authorization_header()))
            }
            TokenState::Valid => {
                Ok(self.token.lock().as_ref().map(OAuth2Token::authorization_header))
            }
        }
    }
}
