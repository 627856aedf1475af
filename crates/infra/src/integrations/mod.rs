//! Service clients built on the core resource layer

pub mod blinksale;
pub mod freshbooks;

use ledgerbridge_core::ClientBuilder;
use ledgerbridge_domain::{RestError, Result};
use url::Url;

pub use blinksale::{Blinksale, InvoiceLine};
pub use freshbooks::{BusinessSelection, FreshBooks};

/// Where a service client connects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub host: String,
    /// Explicit port; the scheme's default when `None`
    pub port: Option<u16>,
    pub use_tls: bool,
}

impl ServiceEndpoint {
    pub fn https(host: impl Into<String>) -> Self {
        Self { host: host.into(), port: None, use_tls: true }
    }

    /// Endpoint from a base URL such as `http://127.0.0.1:8080`.
    pub fn parse(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url)
            .map_err(|e| RestError::Config(format!("Invalid service URL '{base_url}': {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| RestError::Config(format!("Service URL '{base_url}' has no host")))?;
        let use_tls = match url.scheme() {
            "https" => true,
            "http" => false,
            other => return Err(RestError::Config(format!("Unsupported URL scheme: {other}"))),
        };
        Ok(Self { host: host.to_string(), port: url.port(), use_tls })
    }

    /// `scheme://host[:port]`
    pub fn url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        match self.port {
            Some(port) => format!("{scheme}://{}:{port}", self.host),
            None => format!("{scheme}://{}", self.host),
        }
    }

    pub(crate) fn configure(&self, builder: ClientBuilder) -> ClientBuilder {
        let builder = builder.use_tls(self.use_tls);
        match self.port {
            Some(port) => builder.port(port),
            None => builder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base_urls() {
        let endpoint = ServiceEndpoint::parse("http://127.0.0.1:8080").unwrap();
        assert_eq!(endpoint, ServiceEndpoint { host: "127.0.0.1".into(), port: Some(8080), use_tls: false });
        assert_eq!(endpoint.url(), "http://127.0.0.1:8080");

        let endpoint = ServiceEndpoint::parse("https://api.freshbooks.com/").unwrap();
        assert_eq!(endpoint, ServiceEndpoint::https("api.freshbooks.com"));
    }

    #[test]
    fn rejects_unusable_urls() {
        assert!(matches!(ServiceEndpoint::parse("ftp://host"), Err(RestError::Config(_))));
        assert!(matches!(ServiceEndpoint::parse("not a url"), Err(RestError::Config(_))));
    }
}
