//! # LedgerBridge Infrastructure
//!
//! Infrastructure implementations of core ports and the service clients.
//!
//! This crate contains:
//! - The reqwest-backed HTTP transport
//! - The OAuth2 token endpoint adapter
//! - Configuration loading (environment, TOML, JSON)
//! - Blinksale and FreshBooks clients
//!
//! ## Architecture
//! - Implements traits defined in `ledgerbridge-core`
//! - Contains all "impure" code (network and file I/O)

pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod integrations;

// Re-export commonly used items
pub use auth::OAuth2TokenEndpoint;
pub use errors::InfraError;
pub use http::{HttpTransport, HttpTransportBuilder};
pub use integrations::{Blinksale, BusinessSelection, FreshBooks, InvoiceLine, ServiceEndpoint};
