//! Configuration structures
//!
//! Loaded by `ledgerbridge-infra::config` from the environment or a config
//! file and handed explicitly to the entry point.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TIMEOUT_SECS;
use crate::types::{OAuth2Credentials, OAuth2Token};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub blinksale: Option<BlinksaleConfig>,
    #[serde(default)]
    pub freshbooks: Option<FreshBooksConfig>,
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Blinksale account access (HTTP basic auth)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlinksaleConfig {
    /// Account subdomain, e.g. `acme` for `acme.blinksale.com`
    pub id: String,
    pub userid: String,
    pub password: String,
}

/// FreshBooks application registration and authorization state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshBooksConfig {
    #[serde(flatten)]
    pub credentials: OAuth2Credentials,
    /// Authorization code obtained out of band
    #[serde(default)]
    pub auth_code: Option<String>,
    /// Previously issued token, reused until it expires
    #[serde(default)]
    pub token: Option<OAuth2Token>,
}

/// HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { timeout_seconds: DEFAULT_TIMEOUT_SECS, accept_invalid_certs: false }
    }
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
