//! Client: connection settings, request pipeline and handle cache
//!
//! A [`Client`] owns every [`Resource`] and [`Collection`] it hands out.
//! Handles are memoized per `(path, filter)` and keep only a weak reference
//! back to the client, so dropping the client invalidates them.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ledgerbridge_domain::constants::{DEFAULT_USER_AGENT, HTTPS_PORT, HTTP_PORT};
use ledgerbridge_domain::{Credentials, MediaType, RestError, Result};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use crate::auth::AuthorizationProvider;
use crate::collection::Collection;
use crate::declaration::{CollectionDecl, CollectionOptions};
use crate::filter::{Filter, FilterStyle};
use crate::representation::Representation;
use crate::resource::{Resource, Scope};
use crate::transport::{check_status, HeaderSet, HttpRequest, HttpResponse, RequestOptions, Transport, Verb};

/// Connection settings of a client
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    pub credentials: Credentials,
    pub media_type: MediaType,
    pub user_agent: String,
    /// Extra headers sent with every request
    pub headers: HeaderSet,
    pub filter_style: FilterStyle,
}

impl ClientSettings {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: HTTPS_PORT,
            use_tls: true,
            credentials: Credentials::None,
            media_type: MediaType::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: HeaderSet::new(),
            filter_style: FilterStyle::Plain,
        }
    }

    /// `scheme://host[:port]`, omitting the standard ports.
    pub fn url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        if self.port == HTTP_PORT || self.port == HTTPS_PORT {
            format!("{scheme}://{}", self.host)
        } else {
            format!("{scheme}://{}:{}", self.host, self.port)
        }
    }
}

/// Builder for [`Client`]
pub struct ClientBuilder {
    settings: ClientSettings,
    port: Option<u16>,
    transport: Option<Arc<dyn Transport>>,
    authorization: Option<Arc<dyn AuthorizationProvider>>,
}

impl ClientBuilder {
    fn new(host: impl Into<String>) -> Self {
        Self { settings: ClientSettings::new(host), port: None, transport: None, authorization: None }
    }

    /// Port to connect to; defaults to 443 with TLS and 80 without.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn use_tls(mut self, use_tls: bool) -> Self {
        self.settings.use_tls = use_tls;
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.settings.credentials = credentials;
        self
    }

    pub fn media_type(mut self, media_type: impl Into<MediaType>) -> Self {
        self.settings.media_type = media_type.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.settings.user_agent = user_agent.into();
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.settings.headers.insert(name, value);
        self
    }

    pub fn filter_style(mut self, style: FilterStyle) -> Self {
        self.settings.filter_style = style;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Provider for the `Authorization` header; takes precedence over
    /// static credentials.
    pub fn authorization(mut self, provider: Arc<dyn AuthorizationProvider>) -> Self {
        self.authorization = Some(provider);
        self
    }

    pub fn build(self) -> Result<Client> {
        let mut settings = self.settings;
        if settings.host.trim().is_empty() {
            return Err(RestError::Config("Client host not set".to_string()));
        }
        let transport =
            self.transport.ok_or_else(|| RestError::Config("Transport not set".to_string()))?;
        settings.port =
            self.port.unwrap_or(if settings.use_tls { HTTPS_PORT } else { HTTP_PORT });

        Ok(Client {
            inner: Arc::new(ClientInner {
                settings,
                transport,
                authorization: self.authorization,
                cache: Mutex::new(HandleCache::default()),
                registry: RwLock::new(BTreeMap::new()),
            }),
        })
    }
}

/// Root of the resource graph for one service
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    pub fn builder(host: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(host)
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.inner.settings
    }

    pub fn url(&self) -> String {
        self.inner.settings.url()
    }

    /// Resource at the service root; root-level collections hang off it.
    pub fn root(&self) -> Arc<Resource> {
        self.inner.cached_resource(String::new(), || {
            Resource::new(
                Arc::downgrade(&self.inner),
                Some(String::new()),
                Filter::new(),
                None,
                Scope::Root,
                None,
                Representation::default(),
            )
        })
    }

    /// Memoized handle for the resource at `path`.
    pub fn resource(&self, path: &str, filter: Filter) -> Arc<Resource> {
        let key = self.inner.cache_key(path, &filter);
        self.inner.cached_resource(key, || {
            Resource::new(
                Arc::downgrade(&self.inner),
                Some(path.to_string()),
                filter,
                None,
                Scope::Detached,
                None,
                Representation::default(),
            )
        })
    }

    /// Root-level declared collection `name`.
    pub fn collection(&self, name: &str, filter: Filter) -> Result<Arc<Collection>> {
        self.root().collection(name, filter)
    }

    /// Register (or replace) a root-level collection. `configure` receives
    /// the declaration to add nested collections.
    pub fn declare_collection<F>(&self, name: &str, options: CollectionOptions, configure: F)
    where
        F: FnOnce(&mut CollectionDecl),
    {
        let mut decl = CollectionDecl::new(name, options);
        configure(&mut decl);
        debug!(collection = name, path = decl.segment(), "declared collection");
        self.inner.registry.write().insert(name.to_string(), Arc::new(decl));
    }

    pub fn declared_collections(&self) -> Vec<String> {
        self.inner.registry.read().keys().cloned().collect()
    }

    /// Forget every memoized handle.
    pub fn clear_cache(&self) {
        let mut cache = self.inner.cache.lock();
        info!(
            resources = cache.resources.len(),
            collections = cache.collections.len(),
            "clearing handle cache"
        );
        cache.clear();
    }

    /// Drop the transport's connection; the next request opens a new one.
    pub fn reconnect(&self) {
        debug!(host = %self.inner.settings.host, "resetting transport connection");
        self.inner.transport.reset();
    }

    /// Issue a request at `path` through the full header/auth/status pipeline.
    pub async fn request(
        &self,
        verb: Verb,
        path: &str,
        body: Option<String>,
        options: RequestOptions,
    ) -> Result<HttpResponse> {
        self.inner.request(verb, path, body, options).await
    }

    #[cfg(test)]
    pub(crate) fn cached_keys(&self) -> Vec<String> {
        let cache = self.inner.cache.lock();
        let mut keys: Vec<String> =
            cache.resources.keys().chain(cache.collections.keys()).cloned().collect();
        keys.sort();
        keys
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("url", &self.url()).finish_non_exhaustive()
    }
}

#[derive(Default)]
struct HandleCache {
    resources: HashMap<String, Arc<Resource>>,
    collections: HashMap<String, Arc<Collection>>,
}

impl HandleCache {
    fn clear(&mut self) {
        self.resources.clear();
        self.collections.clear();
    }
}

pub(crate) struct ClientInner {
    settings: ClientSettings,
    transport: Arc<dyn Transport>,
    authorization: Option<Arc<dyn AuthorizationProvider>>,
    cache: Mutex<HandleCache>,
    registry: RwLock<BTreeMap<String, Arc<CollectionDecl>>>,
}

impl ClientInner {
    pub(crate) fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub(crate) fn media_type(&self) -> &MediaType {
        &self.settings.media_type
    }

    pub(crate) fn cache_key(&self, path: &str, filter: &Filter) -> String {
        format!("{path}{}", filter.query_string(self.settings.filter_style))
    }

    pub(crate) fn declaration(&self, name: &str) -> Option<Arc<CollectionDecl>> {
        self.registry.read().get(name).cloned()
    }

    pub(crate) fn cached_resource<F>(&self, key: String, make: F) -> Arc<Resource>
    where
        F: FnOnce() -> Resource,
    {
        self.cache.lock().resources.entry(key).or_insert_with(|| Arc::new(make())).clone()
    }

    pub(crate) fn lookup_resource(&self, key: &str) -> Option<Arc<Resource>> {
        self.cache.lock().resources.get(key).cloned()
    }

    pub(crate) fn register_resource(&self, key: String, resource: Arc<Resource>) {
        self.cache.lock().resources.insert(key, resource);
    }

    pub(crate) fn cached_collection<F>(&self, key: String, make: F) -> Arc<Collection>
    where
        F: FnOnce() -> Collection,
    {
        self.cache.lock().collections.entry(key).or_insert_with(|| Arc::new(make())).clone()
    }

    /// Drop every handle at `path`, under any filter, and below it.
    pub(crate) fn evict(&self, path: &str) {
        let query_prefix = format!("{path}?");
        let child_prefix = format!("{path}/");
        let covered = |key: &String| {
            key == path || key.starts_with(&query_prefix) || key.starts_with(&child_prefix)
        };

        let mut cache = self.cache.lock();
        cache.resources.retain(|key, _| !covered(key));
        cache.collections.retain(|key, _| !covered(key));
        debug!(path, "evicted cached handles");
    }

    async fn authorization_header(&self) -> Result<Option<String>> {
        if let Some(provider) = &self.authorization {
            return provider.authorization().await;
        }
        Ok(match &self.settings.credentials {
            Credentials::Basic { userid, password } => {
                Some(format!("Basic {}", STANDARD.encode(format!("{userid}:{password}"))))
            }
            Credentials::None => None,
        })
    }

    #[instrument(skip(self, body, options), fields(host = %self.settings.host))]
    pub(crate) async fn request(
        &self,
        verb: Verb,
        path: &str,
        body: Option<String>,
        options: RequestOptions,
    ) -> Result<HttpResponse> {
        let media_type = self.settings.media_type.as_str();
        let mut headers = HeaderSet::new();
        headers.insert("Accept", media_type);
        headers.insert("Content-Type", media_type);
        headers.insert("User-Agent", self.settings.user_agent.clone());
        headers.merge(&self.settings.headers);
        if let Some(authorization) = self.authorization_header().await? {
            headers.insert("Authorization", authorization);
        }
        headers.merge(&options.headers);

        let request = HttpRequest { verb, url: format!("{}{path}", self.settings.url()), headers, body };
        debug!(verb = %request.verb, url = %request.url, "sending request");

        let response = self.transport.execute(request).await?;
        debug!(status = response.status, bytes = response.body.len(), "received response");

        check_status(&response, options.expected_status)?;
        Ok(response)
    }
}

/// Resolve a handle's weak client reference.
pub(crate) fn upgrade(client: &Weak<ClientInner>) -> Result<Arc<ClientInner>> {
    client.upgrade().ok_or_else(|| RestError::Precondition("client has been dropped".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;

    fn client(transport: Arc<ScriptedTransport>) -> Client {
        Client::builder("acme.example.com")
            .credentials(Credentials::Basic { userid: "user".into(), password: "secret".into() })
            .header("X-Trace", "client")
            .transport(transport)
            .build()
            .unwrap()
    }

    #[test]
    fn url_omits_standard_ports() {
        let transport = ScriptedTransport::new();
        let tls = Client::builder("h").transport(transport.clone()).build().unwrap();
        assert_eq!(tls.url(), "https://h");

        let plain = Client::builder("h").use_tls(false).transport(transport.clone()).build().unwrap();
        assert_eq!(plain.url(), "http://h");

        let custom = Client::builder("h").use_tls(false).port(8080).transport(transport).build().unwrap();
        assert_eq!(custom.url(), "http://h:8080");
    }

    #[test]
    fn build_requires_a_transport() {
        let result = Client::builder("h").build();
        assert!(matches!(result, Err(RestError::Config(_))));
    }

    #[tokio::test]
    async fn headers_merge_with_later_layers_winning() {
        let transport = ScriptedTransport::new();
        transport.push(HttpResponse::new(200, "<ok/>"));
        let client = client(transport.clone());

        let options = RequestOptions::expect(200).header("accept", "text/html").header("x-trace", "call");
        client.request(Verb::Get, "/clients", None, options).await.unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(request.url, "https://acme.example.com/clients");
        assert_eq!(request.headers.get("Accept"), Some("text/html"));
        assert_eq!(request.headers.get("Content-Type"), Some("application/xml"));
        assert_eq!(request.headers.get("X-Trace"), Some("call"));
        assert_eq!(request.headers.get("Authorization"), Some("Basic dXNlcjpzZWNyZXQ="));
        assert_eq!(request.headers.get("User-Agent"), Some(DEFAULT_USER_AGENT));
    }

    #[tokio::test]
    async fn error_statuses_fail_the_request() {
        let transport = ScriptedTransport::new();
        transport.push(HttpResponse::new(404, "missing"));
        let client = client(transport);

        let err = client.request(Verb::Get, "/x", None, RequestOptions::default()).await.unwrap_err();
        assert_eq!(err, RestError::Http { status: 404, body: "missing".into() });
    }

    #[test]
    fn resources_are_memoized_per_path_and_filter() {
        let client = client(ScriptedTransport::new());

        let a = client.resource("/clients/1", Filter::new());
        let b = client.resource("/clients/1", Filter::new());
        let c = client.resource("/clients/1", Filter::from([("page", 2)]));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));

        client.clear_cache();
        let d = client.resource("/clients/1", Filter::new());
        assert!(!Arc::ptr_eq(&a, &d));
    }

    #[test]
    fn reconnect_resets_the_transport() {
        let transport = ScriptedTransport::new();
        let client = client(transport.clone());
        client.reconnect();
        assert_eq!(transport.resets(), 1);
    }

    #[test]
    fn undeclared_collections_are_rejected() {
        let client = client(ScriptedTransport::new());
        client.declare_collection("clients", CollectionOptions::new(), |_| {});

        assert_eq!(client.declared_collections(), vec!["clients".to_string()]);
        assert!(client.collection("clients", Filter::new()).is_ok());
        assert!(matches!(
            client.collection("vendors", Filter::new()),
            Err(RestError::UnknownCollection(name)) if name == "vendors"
        ));
    }
}
