//! Collection: lazily-loaded handle to a listing of entities
//!
//! The listing is fetched once and cached until the collection is
//! refreshed. Element handles are memoized by the client and seeded with
//! their entry from the listing, so enumerating a collection does not fetch
//! every element.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use futures::stream::{self, Stream, TryStreamExt};
use ledgerbridge_domain::{MediaType, ResourceId, RestError, Result};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::client::{upgrade, ClientInner};
use crate::declaration::CollectionDecl;
use crate::document::Document;
use crate::filter::Filter;
use crate::representation::Representation;
use crate::resource::{Resource, Scope};
use crate::transport::{RequestOptions, Verb};

pub struct Collection {
    client: Weak<ClientInner>,
    path: String,
    filter: Filter,
    parent: Option<Arc<Resource>>,
    decl: Option<Arc<CollectionDecl>>,
    state: Mutex<Representation>,
}

impl Collection {
    pub(crate) fn new(
        client: Weak<ClientInner>,
        path: String,
        filter: Filter,
        parent: Option<Arc<Resource>>,
        decl: Option<Arc<CollectionDecl>>,
    ) -> Self {
        Self { client, path, filter, parent, decl, state: Mutex::new(Representation::default()) }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn parent(&self) -> Option<&Arc<Resource>> {
        self.parent.as_ref()
    }

    pub fn declaration(&self) -> Option<&Arc<CollectionDecl>> {
        self.decl.as_ref()
    }

    pub fn url(&self) -> Result<String> {
        let client = upgrade(&self.client)?;
        Ok(format!("{}{}", client.settings().url(), client.cache_key(&self.path, &self.filter)))
    }

    /// Raw listing body, fetched when not cached or when `force_refresh`.
    pub async fn data(&self, force_refresh: bool) -> Result<String> {
        let cached = if force_refresh { None } else { self.state.lock().data.clone() };
        if let Some(body) = cached {
            return Ok(body);
        }

        let client = upgrade(&self.client)?;
        let path = client.cache_key(&self.path, &self.filter);
        let response = client.request(Verb::Get, &path, None, RequestOptions::expect(200)).await?;
        self.state.lock().store(response.body.clone());
        Ok(response.body)
    }

    /// Parsed listing document.
    pub async fn document(&self) -> Result<Document> {
        if let Some(document) = self.cached_document()? {
            return Ok(document);
        }
        self.data(false).await?;
        self.cached_document()?.ok_or_else(|| RestError::Decode("listing body is empty".into()))
    }

    /// Identifiers of the listed entities, in listing order.
    pub async fn keys(&self) -> Result<Vec<ResourceId>> {
        self.document().await?.element_ids()
    }

    pub async fn size(&self) -> Result<usize> {
        Ok(self.keys().await?.len())
    }

    pub async fn count(&self) -> Result<usize> {
        self.size().await
    }

    /// Handle for element `id`. Seeds the element's listing entry when the
    /// listing is already cached; never fetches.
    pub fn at(self: &Arc<Self>, id: ResourceId) -> Result<Arc<Resource>> {
        let client = upgrade(&self.client)?;
        let path = format!("{}/{id}", self.path);
        let key = client.cache_key(&path, &Filter::new());
        let partial = self.listing_entry(id)?;

        if let Some(resource) = client.lookup_resource(&key) {
            resource.seed_partial(partial);
            return Ok(resource);
        }

        let resource = client.cached_resource(key, || {
            Resource::new(
                Arc::downgrade(&client),
                Some(path),
                Filter::new(),
                Some(Arc::clone(self)),
                self.element_scope(),
                self.element_key(),
                Representation::with_partial(partial.clone()),
            )
        });
        resource.seed_partial(partial);
        Ok(resource)
    }

    /// Every element in listing order. The stream fetches the listing on
    /// first poll and can be restarted by calling `enumerate` again.
    pub fn enumerate(self: &Arc<Self>) -> impl Stream<Item = Result<Arc<Resource>>> + Send + 'static {
        let seed: (Arc<Collection>, Option<VecDeque<ResourceId>>) = (Arc::clone(self), None);
        stream::try_unfold(seed, |(collection, pending)| async move {
            let mut pending: VecDeque<ResourceId> = match pending {
                Some(pending) => pending,
                None => collection.keys().await?.into_iter().collect(),
            };
            let next = match pending.pop_front() {
                Some(id) => {
                    let resource = collection.at(id)?;
                    Some((resource, (collection, Some(pending))))
                }
                None => None,
            };
            Ok::<_, RestError>(next)
        })
    }

    pub async fn resources(self: &Arc<Self>) -> Result<Vec<Arc<Resource>>> {
        self.enumerate().try_collect().await
    }

    pub async fn first(self: &Arc<Self>) -> Result<Option<Arc<Resource>>> {
        match self.keys().await?.first() {
            Some(id) => self.at(*id).map(Some),
            None => Ok(None),
        }
    }

    /// Unsaved element holding `body`; `save` creates it here.
    pub fn build(self: &Arc<Self>, body: impl Into<String>) -> Result<Arc<Resource>> {
        let client = upgrade(&self.client)?;
        Ok(Arc::new(Resource::new(
            Arc::downgrade(&client),
            None,
            Filter::new(),
            Some(Arc::clone(self)),
            self.element_scope(),
            self.element_key(),
            Representation::with_data(Some(body.into())),
        )))
    }

    /// Build and save a new element.
    pub async fn create(self: &Arc<Self>, body: impl Into<String>) -> Result<Arc<Resource>> {
        let resource = self.build(body)?;
        resource.save().await?;
        Ok(resource)
    }

    /// Forget the cached listing. Idempotent.
    pub fn refresh(&self) {
        debug!(path = %self.path, "invalidating collection listing");
        self.state.lock().clear();
    }

    /// Listing in another media type (Atom, RSS, ...).
    pub async fn get_representation(&self, media_type: &MediaType) -> Result<String> {
        let client = upgrade(&self.client)?;
        let path = client.cache_key(&self.path, &self.filter);
        let options = RequestOptions::expect(200).header("Accept", media_type.as_str());
        Ok(client.request(Verb::Get, &path, None, options).await?.body)
    }

    /// Run a named operation of the declaration's collection extension.
    pub async fn call(self: &Arc<Self>, operation: &str) -> Result<Value> {
        let extension = self.decl.as_ref().and_then(|decl| decl.extension().collection.clone());
        match extension {
            Some(extension) if extension.operations().contains(&operation) => {
                extension.invoke(operation, self).await
            }
            _ => Err(RestError::UnknownOperation(operation.to_string())),
        }
    }

    fn element_scope(&self) -> Scope {
        match &self.decl {
            Some(decl) => Scope::Element(Arc::clone(decl)),
            None => Scope::Detached,
        }
    }

    fn element_key(&self) -> Option<String> {
        self.decl.as_ref().and_then(|decl| decl.element_key().map(str::to_string))
    }

    fn cached_document(&self) -> Result<Option<Document>> {
        let client = upgrade(&self.client)?;
        let mut state = self.state.lock();
        Ok(state.document(client.media_type(), None)?.map(|parsed| parsed.document.clone()))
    }

    fn listing_entry(&self, id: ResourceId) -> Result<Option<String>> {
        let client = upgrade(&self.client)?;
        let mut state = self.state.lock();
        Ok(state.document(client.media_type(), None)?.and_then(|parsed| parsed.document.element_body(id)))
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("path", &self.path)
            .field("filter", &self.filter)
            .field("declaration", &self.decl.as_ref().map(|decl| decl.name()))
            .finish_non_exhaustive()
    }
}
