use std::time::Duration;

use async_trait::async_trait;
use ledgerbridge_core::transport::{HeaderSet, HttpRequest, HttpResponse, Transport, Verb};
use ledgerbridge_domain::constants::DEFAULT_TIMEOUT_SECS;
use ledgerbridge_domain::{RestError, Result, TransportConfig};
use parking_lot::Mutex;
use reqwest::{Client as ReqwestClient, Method};
use tracing::debug;

use crate::errors::InfraError;

/// reqwest-backed [`Transport`].
///
/// The pooled reqwest client is created on first use and kept until
/// [`Transport::reset`] drops it. Requests are never retried.
pub struct HttpTransport {
    client: Mutex<Option<ReqwestClient>>,
    timeout: Duration,
    accept_invalid_certs: bool,
    no_proxy: bool,
}

impl HttpTransport {
    /// Start building a new HTTP transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        Self::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .accept_invalid_certs(config.accept_invalid_certs)
            .build()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether requests skip the system proxy settings.
    pub fn bypasses_proxy(&self) -> bool {
        self.no_proxy
    }

    /// Whether a pooled client is currently open.
    pub fn is_connected(&self) -> bool {
        self.client.lock().is_some()
    }

    fn client(&self) -> Result<ReqwestClient> {
        let mut slot = self.client.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let mut builder = ReqwestClient::builder().timeout(self.timeout);
        if self.no_proxy {
            builder = builder.no_proxy();
        }
        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build().map_err(|err| RestError::from(InfraError::from(err)))?;

        debug!(timeout = ?self.timeout, "opened HTTP connection pool");
        *slot = Some(client.clone());
        Ok(client)
    }

    fn map_error(&self, err: reqwest::Error) -> RestError {
        if err.is_timeout() {
            RestError::Timeout(self.timeout)
        } else {
            InfraError::from(err).into()
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let client = self.client()?;
        let method = match request.verb {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Delete => Method::DELETE,
        };

        let mut builder = client.request(method.clone(), &request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        debug!(%method, url = %request.url, "sending HTTP request");
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                debug!(%method, url = %request.url, error = %err, "HTTP request failed");
                return Err(self.map_error(err));
            }
        };

        let status = response.status();
        debug!(%method, url = %request.url, %status, "received HTTP response");

        let mut headers = HeaderSet::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str(), value);
            }
        }
        let body = response.text().await.map_err(|err| self.map_error(err))?;

        Ok(HttpResponse { status: status.as_u16(), headers, body })
    }

    fn reset(&self) {
        if self.client.lock().take().is_some() {
            debug!("closed HTTP connection pool");
        }
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    timeout: Duration,
    accept_invalid_certs: bool,
    no_proxy: bool,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            accept_invalid_certs: false,
            no_proxy: false,
        }
    }
}

impl HttpTransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Allow self-signed or otherwise invalid TLS certificates.
    pub fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }

    /// Ignore `HTTP_PROXY`/`HTTPS_PROXY` and connect directly, e.g. to a
    /// local mock server.
    pub fn no_proxy(mut self, enabled: bool) -> Self {
        self.no_proxy = enabled;
        self
    }

    pub fn build(self) -> HttpTransport {
        HttpTransport {
            client: Mutex::new(None),
            timeout: self.timeout,
            accept_invalid_certs: self.accept_invalid_certs,
            no_proxy: self.no_proxy,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn request(verb: Verb, url: String, body: Option<&str>) -> HttpRequest {
        let headers: HeaderSet = [("Accept", "application/xml"), ("X-Test", "1")].into_iter().collect();
        HttpRequest { verb, url, headers, body: body.map(str::to_string) }
    }

    fn local_transport() -> HttpTransport {
        HttpTransport::builder().no_proxy(true).build()
    }

    #[tokio::test]
    async fn returns_status_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/clients"))
            .and(header("X-Test", "1"))
            .and(body_string("<client/>"))
            .respond_with(
                ResponseTemplate::new(201).insert_header("Location", "/clients/99").set_body_string("created"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = local_transport();
        let response = transport
            .execute(request(Verb::Post, format!("{}/clients", server.uri()), Some("<client/>")))
            .await
            .unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.header("location"), Some("/clients/99"));
        assert_eq!(response.body, "created");
    }

    #[tokio::test]
    async fn error_statuses_are_returned_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = local_transport();
        let response =
            transport.execute(request(Verb::Delete, format!("{}/x", server.uri()), None)).await.unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.body, "missing");
    }

    #[tokio::test]
    async fn slow_responses_time_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let transport =
            HttpTransport::builder().timeout(Duration::from_millis(50)).no_proxy(true).build();
        let err = transport.execute(request(Verb::Get, server.uri(), None)).await.unwrap_err();

        assert_eq!(err, RestError::Timeout(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn connection_refused_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED

        let transport = local_transport();
        let err = transport.execute(request(Verb::Get, format!("http://{addr}"), None)).await.unwrap_err();

        assert!(matches!(err, RestError::Network(_)), "expected network error, got {err:?}");
    }

    #[tokio::test]
    async fn reset_drops_the_pool_and_the_next_request_reopens_it() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let transport = local_transport();
        assert!(!transport.is_connected());

        transport.execute(request(Verb::Get, server.uri(), None)).await.unwrap();
        assert!(transport.is_connected());

        transport.reset();
        assert!(!transport.is_connected());

        transport.execute(request(Verb::Get, server.uri(), None)).await.unwrap();
        assert!(transport.is_connected());
    }

    #[test]
    fn from_config_applies_the_timeout() {
        let config = TransportConfig { timeout_seconds: 5, accept_invalid_certs: true };
        assert_eq!(HttpTransport::from_config(&config).timeout(), Duration::from_secs(5));
    }

    #[test]
    fn proxies_are_honored_unless_disabled() {
        assert!(!HttpTransport::new().bypasses_proxy());
        assert!(!HttpTransport::from_config(&TransportConfig::default()).bypasses_proxy());
        assert!(local_transport().bypasses_proxy());
    }
}
