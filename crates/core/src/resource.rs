//! Resource: lazily-loaded handle to one remote entity
//!
//! A resource fetches its body on first access, answers attribute reads from
//! the parsed document and writes edits back with `save`. Resources created
//! from a collection listing start with the listing's copy of the element
//! (partial data) and only fetch the full body when an attribute is missing.

use std::sync::{Arc, Weak};

use ledgerbridge_domain::{MediaType, ResourceId, RestError, Result};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::client::{upgrade, ClientInner};
use crate::collection::Collection;
use crate::declaration::CollectionDecl;
use crate::document::{self, AttributeValue, Document};
use crate::filter::Filter;
use crate::representation::Representation;
use crate::transport::{RequestOptions, Verb};

/// Where a resource looks up its nested collections and extension
#[derive(Debug, Clone)]
pub(crate) enum Scope {
    /// Service root: collections come from the client's registry
    Root,
    /// Element of a declared collection
    Element(Arc<CollectionDecl>),
    /// Addressed directly by path
    Detached,
}

pub struct Resource {
    client: Weak<ClientInner>,
    path: RwLock<Option<String>>,
    filter: Filter,
    parent: Option<Arc<Collection>>,
    scope: Scope,
    root_key_hint: Option<String>,
    state: Mutex<Representation>,
}

impl Resource {
    pub(crate) fn new(
        client: Weak<ClientInner>,
        path: Option<String>,
        filter: Filter,
        parent: Option<Arc<Collection>>,
        scope: Scope,
        root_key_hint: Option<String>,
        state: Representation,
    ) -> Self {
        Self { client, path: RwLock::new(path), filter, parent, scope, root_key_hint, state: Mutex::new(state) }
    }

    /// Path of the entity; `None` until an unsaved resource is created.
    pub fn path(&self) -> Option<String> {
        self.path.read().clone()
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn parent(&self) -> Option<&Arc<Collection>> {
        self.parent.as_ref()
    }

    pub fn is_new(&self) -> bool {
        self.path.read().is_none()
    }

    /// Identifier from the final path segment, or from the document when
    /// the path does not end in one.
    pub fn identifier(&self) -> Option<ResourceId> {
        if let Some(id) = self
            .path
            .read()
            .as_deref()
            .and_then(|path| path.rsplit('/').next())
            .and_then(|segment| segment.parse().ok())
        {
            return Some(id);
        }
        let client = self.client.upgrade()?;
        let mut state = self.state.lock();
        let parsed = state.document(client.media_type(), self.root_key_hint.as_deref()).ok()??;
        parsed.document.identifier()
    }

    pub fn url(&self) -> Result<String> {
        let client = upgrade(&self.client)?;
        Ok(format!("{}{}", client.settings().url(), self.request_path()?))
    }

    /// Raw body. Fetches when nothing is cached or when `force_refresh` is
    /// set; partial data from a listing is returned without a round trip.
    pub async fn data(&self, force_refresh: bool) -> Result<String> {
        if !force_refresh {
            let client = upgrade(&self.client)?;
            let mut state = self.state.lock();
            if state.dirty {
                if let Some(body) = state.body(client.media_type(), self.root_key_hint.as_deref())? {
                    return Ok(body);
                }
            }
            if let Some(body) = state.data.clone().or_else(|| state.partial.clone()) {
                return Ok(body);
            }
        }
        self.fetch().await
    }

    /// Replace the cached body.
    pub fn set_data(&self, body: impl Into<String>) {
        self.state.lock().store(body.into());
    }

    /// Parsed document, fetching the body first if needed.
    pub async fn document(&self) -> Result<Document> {
        if let Some(document) = self.cached_document()? {
            return Ok(document);
        }
        self.fetch().await?;
        self.cached_document()?
            .ok_or_else(|| RestError::Decode("resource body is empty".into()))
    }

    /// Value of attribute `name`. A name missing from partial data triggers
    /// one full fetch before failing with `UnknownAttribute`.
    pub async fn get(&self, name: &str) -> Result<AttributeValue> {
        if let Some(value) = self.lookup(name)? {
            return Ok(value);
        }
        if self.needs_full_fetch()? {
            self.fetch().await?;
            if let Some(value) = self.lookup(name)? {
                return Ok(value);
            }
        }
        Err(RestError::UnknownAttribute(name.to_string()))
    }

    pub async fn attribute_exists(&self, name: &str) -> Result<bool> {
        match self.get(name).await {
            Ok(_) => Ok(true),
            Err(RestError::UnknownAttribute(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Overwrite attribute `name` in the cached document. The change is sent
    /// on the next `save`.
    pub async fn set(&self, name: &str, value: impl Into<AttributeValue>) -> Result<()> {
        let value = value.into();
        if self.assign(name, &value)? {
            return Ok(());
        }
        if self.needs_full_fetch()? {
            self.fetch().await?;
            if self.assign(name, &value)? {
                return Ok(());
            }
        }
        Err(RestError::UnknownAttribute(name.to_string()))
    }

    /// Forget the cached body, partial data and document. Idempotent.
    pub fn refresh(&self) {
        self.state.lock().clear();
    }

    /// Create the entity if it has never been saved, else update it.
    pub async fn save(self: &Arc<Self>) -> Result<()> {
        if self.is_new() {
            self.create().await
        } else {
            self.update().await
        }
    }

    /// POST the document to the parent collection.
    ///
    /// XML services answer 201 with a `Location` header; JSON services answer
    /// 200 with the new entity's `id` in the response body.
    #[instrument(skip(self))]
    pub async fn create(self: &Arc<Self>) -> Result<()> {
        let client = upgrade(&self.client)?;
        let parent = self
            .parent
            .clone()
            .ok_or_else(|| RestError::Precondition("unsaved resource has no parent collection".into()))?;
        if !self.is_new() {
            return Err(RestError::Precondition("resource has already been created".into()));
        }

        let media_type = client.media_type().clone();
        let body = self.outgoing_body(&media_type)?;
        let expected = if media_type.is_json() { 200 } else { 201 };
        let response =
            client.request(Verb::Post, parent.path(), Some(body), RequestOptions::expect(expected)).await?;

        let path = if media_type.is_json() {
            let created = document::parse(&response.body, &media_type)?;
            let id = created.document.identifier().ok_or_else(|| {
                RestError::Decode("create response carries no resource id".into())
            })?;
            format!("{}/{id}", parent.path())
        } else {
            response
                .header("Location")
                .and_then(document::locator_path)
                .ok_or_else(|| RestError::Decode("create response has no Location header".into()))?
        };

        {
            let mut state = self.state.lock();
            if response.body.trim().is_empty() {
                state.clear();
            } else {
                state.store(response.body.clone());
            }
        }
        *self.path.write() = Some(path.clone());

        parent.refresh();
        client.register_resource(client.cache_key(&path, &self.filter), Arc::clone(self));
        info!(path = %path, "created resource");
        Ok(())
    }

    /// PUT the document back to the resource's own path.
    #[instrument(skip(self))]
    pub async fn update(&self) -> Result<()> {
        let client = upgrade(&self.client)?;
        let path = self
            .path()
            .ok_or_else(|| RestError::Precondition("cannot update a resource with no path".into()))?;

        let body = self.outgoing_body(client.media_type())?;
        let response = client.request(Verb::Put, &path, Some(body), RequestOptions::expect(200)).await?;

        // An empty reply leaves nothing authoritative; the next read fetches.
        let mut state = self.state.lock();
        if response.body.trim().is_empty() {
            state.clear();
        } else {
            state.store(response.body);
        }
        drop(state);
        debug!(path = %path, "updated resource");
        Ok(())
    }

    /// DELETE the entity, invalidate the parent listing and evict the path
    /// from the client cache.
    #[instrument(skip(self))]
    pub async fn delete(&self) -> Result<()> {
        let client = upgrade(&self.client)?;
        let path = self
            .path()
            .ok_or_else(|| RestError::Precondition("cannot delete a resource with no path".into()))?;

        client.request(Verb::Delete, &path, None, RequestOptions::expect(200)).await?;

        if let Some(parent) = &self.parent {
            parent.refresh();
        }
        client.evict(&path);
        self.refresh();
        info!(path = %path, "deleted resource");
        Ok(())
    }

    /// Body in another media type. The cached document is left untouched.
    pub async fn get_representation(&self, media_type: &MediaType) -> Result<String> {
        let client = upgrade(&self.client)?;
        let path = self.request_path()?;
        let options = RequestOptions::expect(200).header("Accept", media_type.as_str());
        Ok(client.request(Verb::Get, &path, None, options).await?.body)
    }

    /// Nested collection `name` declared for this resource.
    pub fn collection(self: &Arc<Self>, name: &str, filter: Filter) -> Result<Arc<Collection>> {
        let client = upgrade(&self.client)?;
        let decl = match &self.scope {
            Scope::Root => client.declaration(name),
            Scope::Element(decl) => decl.child(name).cloned(),
            Scope::Detached => None,
        }
        .ok_or_else(|| RestError::UnknownCollection(name.to_string()))?;

        let parent_path = self.path().ok_or_else(|| {
            RestError::Precondition("an unsaved resource has no nested collections".into())
        })?;
        let path = decl.resolve_path(&parent_path);
        let filter = decl.filter_defaults().merged(&filter);
        let key = client.cache_key(&path, &filter);

        Ok(client.cached_collection(key, || {
            Collection::new(Arc::downgrade(&client), path, filter, Some(Arc::clone(self)), Some(decl))
        }))
    }

    /// Run a named operation of the declaring collection's extension.
    pub async fn call(self: &Arc<Self>, operation: &str) -> Result<Value> {
        let extension = match &self.scope {
            Scope::Element(decl) => decl.extension().resource.clone(),
            _ => None,
        };
        match extension {
            Some(extension) if extension.operations().contains(&operation) => {
                extension.invoke(operation, self).await
            }
            _ => Err(RestError::UnknownOperation(operation.to_string())),
        }
    }

    /// Seed listing data into a handle that holds nothing yet.
    pub(crate) fn seed_partial(&self, body: Option<String>) {
        let mut state = self.state.lock();
        if state.is_empty() {
            state.partial = body;
        }
    }

    fn request_path(&self) -> Result<String> {
        let path = self
            .path()
            .ok_or_else(|| RestError::Precondition("resource has not been created yet".into()))?;
        let client = upgrade(&self.client)?;
        Ok(client.cache_key(&path, &self.filter))
    }

    async fn fetch(&self) -> Result<String> {
        let client = upgrade(&self.client)?;
        let path = self.request_path()?;
        let response = client.request(Verb::Get, &path, None, RequestOptions::expect(200)).await?;
        self.state.lock().store(response.body.clone());
        Ok(response.body)
    }

    fn cached_document(&self) -> Result<Option<Document>> {
        let client = upgrade(&self.client)?;
        let mut state = self.state.lock();
        let parsed = state.document(client.media_type(), self.root_key_hint.as_deref())?;
        Ok(parsed.map(|parsed| parsed.document.clone()))
    }

    fn lookup(&self, name: &str) -> Result<Option<AttributeValue>> {
        let client = upgrade(&self.client)?;
        let mut state = self.state.lock();
        let parsed = state.document(client.media_type(), self.root_key_hint.as_deref())?;
        Ok(parsed.and_then(|parsed| parsed.document.get(name)))
    }

    fn assign(&self, name: &str, value: &AttributeValue) -> Result<bool> {
        let client = upgrade(&self.client)?;
        let mut state = self.state.lock();
        let assigned = match state.document(client.media_type(), self.root_key_hint.as_deref())? {
            Some(parsed) => parsed.document.set(name, value.clone()),
            None => false,
        };
        if assigned {
            state.dirty = true;
        }
        Ok(assigned)
    }

    /// Full data was never fetched and the entity exists remotely.
    fn needs_full_fetch(&self) -> Result<bool> {
        let state = self.state.lock();
        Ok(!state.is_complete() && !state.dirty && !self.is_new())
    }

    fn outgoing_body(&self, media_type: &MediaType) -> Result<String> {
        self.state
            .lock()
            .body(media_type, self.root_key_hint.as_deref())?
            .ok_or_else(|| RestError::Precondition("resource has no data to send".into()))
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("path", &self.path())
            .field("filter", &self.filter)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
