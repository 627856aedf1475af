//! Value types shared by the core and the service clients

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{MEDIA_TYPE_JSON, MEDIA_TYPE_XML};
use crate::impl_wire_name_conversions;

/// Numeric identifier of a remote entity inside its collection
pub type ResourceId = u64;

/// Media type used for `Accept`/`Content-Type` and codec selection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaType(String);

impl MediaType {
    pub fn new(media_type: impl Into<String>) -> Self {
        Self(media_type.into())
    }

    pub fn xml() -> Self {
        Self::new(MEDIA_TYPE_XML)
    }

    pub fn json() -> Self {
        Self::new(MEDIA_TYPE_JSON)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `application/json`, `application/vnd.foo+json`, ...
    pub fn is_json(&self) -> bool {
        self.subtype().contains("json")
    }

    /// `application/xml`, `text/xml`, `application/vnd.blinksale+xml`, ...
    pub fn is_xml(&self) -> bool {
        self.subtype().contains("xml")
    }

    fn subtype(&self) -> String {
        let essence = self.0.split(';').next().unwrap_or_default();
        essence.rsplit('/').next().unwrap_or_default().trim().to_ascii_lowercase()
    }
}

impl Default for MediaType {
    fn default() -> Self {
        Self::xml()
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Static credentials attached to every request of a client
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credentials {
    #[default]
    None,
    Basic {
        userid: String,
        password: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { userid, .. } => {
                f.debug_struct("Basic").field("userid", userid).field("password", &"***").finish()
            }
        }
    }
}

/// OAuth2 grant types understood by the token endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    AuthorizationCode,
    RefreshToken,
}

impl_wire_name_conversions!(GrantType {
    AuthorizationCode => "authorization_code",
    RefreshToken => "refresh_token",
});

/// Application credentials registered with an OAuth2 provider
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl fmt::Debug for OAuth2Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Bearer token issued by an OAuth2 token endpoint
///
/// A token is expired strictly after `issued_at + ttl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Token {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub issued_at: DateTime<Utc>,
    /// Lifetime in seconds
    pub ttl: i64,
}

impl OAuth2Token {
    /// Instant after which the token is expired
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(self.ttl)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Value of the `Authorization` header, e.g. `Bearer abc123`
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Token endpoint response body
///
/// `created_at` is a Unix timestamp; when the provider omits it the token is
/// considered issued at the moment the response was received.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    pub fn into_token(self, received_at: DateTime<Utc>) -> OAuth2Token {
        let issued_at = self
            .created_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or(received_at);

        OAuth2Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            issued_at,
            ttl: self.expires_in.unwrap_or_default(),
        }
    }
}
