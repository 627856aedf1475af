//! # LedgerBridge App
//!
//! Application layer for the `ledgerbridge` binary.
//!
//! This crate contains:
//! - Application context (service clients wired to one transport)
//! - Commands run by the entry point
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Configuration is loaded by the entry point and passed in explicitly

pub mod commands;
pub mod context;

// Re-export for convenience
pub use commands::*;
pub use context::*;
