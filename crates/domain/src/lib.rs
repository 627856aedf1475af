//! # LedgerBridge Domain
//!
//! Domain types shared by every LedgerBridge crate.
//!
//! This crate contains:
//! - The error taxonomy and `Result` alias
//! - Configuration structures
//! - Value types (media types, credentials, OAuth2 tokens)
//! - Protocol constants
//!
//! ## Architecture
//! - No dependencies on other LedgerBridge crates
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
