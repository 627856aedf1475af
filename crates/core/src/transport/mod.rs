//! Transport port and request primitives
//!
//! The core builds fully-formed [`HttpRequest`]s (URL, merged headers, body)
//! and validates responses; a [`Transport`] only moves bytes. Production code
//! uses the reqwest-backed transport from `ledgerbridge-infra`.

mod headers;

use async_trait::async_trait;
use ledgerbridge_domain::{RestError, Result};

pub use self::headers::HeaderSet;

/// HTTP verbs used by the resource layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outgoing request with absolute URL and final headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub verb: Verb,
    pub url: String,
    pub headers: HeaderSet,
    pub body: Option<String>,
}

/// Completed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderSet,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, headers: HeaderSet::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }
}

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Headers that override every default and client-level header
    pub headers: HeaderSet,
    /// Exact status the operation requires
    pub expected_status: Option<u16>,
}

impl RequestOptions {
    pub fn expect(status: u16) -> Self {
        Self { headers: HeaderSet::new(), expected_status: Some(status) }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Moves a request over the wire
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute the request and return the response regardless of its status.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Drop any persistent connection so the next call opens a fresh one.
    fn reset(&self) {}
}

/// Accept 2xx/3xx, and when `expected` is given require that exact status.
pub fn check_status(response: &HttpResponse, expected: Option<u16>) -> Result<()> {
    if !(200..400).contains(&response.status) {
        return Err(RestError::Http { status: response.status, body: response.body.clone() });
    }
    match expected {
        Some(expected) if expected != response.status => {
            Err(RestError::UnexpectedStatus { expected, actual: response.status })
        }
        _ => Ok(()),
    }
}
