//! # LedgerBridge Core
//!
//! Lazy, cache-aware access to REST resources.
//!
//! This crate contains:
//! - The document codec (XML element trees, JSON with envelope unwrapping)
//! - The transport port and the request pipeline (headers, auth, status)
//! - `Client`, `Collection` and `Resource` handles
//! - Collection declarations and extension hooks
//! - The OAuth2 session state machine
//! - The attribute migration engine
//!
//! ## Architecture Principles
//! - Only depends on `ledgerbridge-domain`
//! - No sockets: all I/O goes through the `Transport` trait
//! - Handles are memoized by their client and hold a weak reference to it

pub mod auth;
pub mod client;
pub mod collection;
pub mod declaration;
pub mod document;
pub mod extension;
pub mod filter;
pub mod migration;
pub mod resource;
pub mod transport;

mod representation;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export specific items to avoid ambiguity
pub use auth::{AuthorizationProvider, OAuth2Session, TokenExchange, TokenGrant, TokenState};
pub use client::{Client, ClientBuilder, ClientSettings};
pub use collection::Collection;
pub use declaration::{CollectionDecl, CollectionOptions};
pub use document::{AttributeValue, Document, ParsedDocument, XmlNode};
pub use extension::{CollectionExtension, Extension, ResourceExtension};
pub use filter::{Filter, FilterStyle};
pub use migration::{AttrAssociation, Migration};
pub use resource::Resource;
pub use transport::{HeaderSet, HttpRequest, HttpResponse, RequestOptions, Transport, Verb};
