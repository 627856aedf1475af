//! Commands run by the `ledgerbridge` binary

pub mod summary;

pub use summary::{summarize, BlinksaleSummary, FreshBooksSummary, Summary};
