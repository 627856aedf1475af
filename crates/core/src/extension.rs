//! Named operations attached to resources and collections
//!
//! A declaration may carry an [`Extension`] bundle. Handles created under that
//! declaration expose the bundle's operations through `call(operation)`
//! instead of growing new methods.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use ledgerbridge_domain::Result;
use serde_json::Value;

use crate::collection::Collection;
use crate::resource::Resource;

/// Extra operations available on every element of a collection
#[async_trait]
pub trait ResourceExtension: Send + Sync {
    /// Names accepted by [`ResourceExtension::invoke`]
    fn operations(&self) -> &'static [&'static str];

    /// Run `operation` against `resource`. Unknown names return
    /// `RestError::UnknownOperation`.
    async fn invoke(&self, operation: &str, resource: &Arc<Resource>) -> Result<Value>;
}

/// Extra operations available on a collection
#[async_trait]
pub trait CollectionExtension: Send + Sync {
    fn operations(&self) -> &'static [&'static str];

    async fn invoke(&self, operation: &str, collection: &Arc<Collection>) -> Result<Value>;
}

/// Optional resource and collection hooks supplied at declaration time
#[derive(Clone, Default)]
pub struct Extension {
    pub resource: Option<Arc<dyn ResourceExtension>>,
    pub collection: Option<Arc<dyn CollectionExtension>>,
}

impl Extension {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, extension: Arc<dyn ResourceExtension>) -> Self {
        self.resource = Some(extension);
        self
    }

    pub fn with_collection(mut self, extension: Arc<dyn CollectionExtension>) -> Self {
        self.collection = Some(extension);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.resource.is_none() && self.collection.is_none()
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("resource", &self.resource.as_ref().map(|ext| ext.operations()))
            .field("collection", &self.collection.as_ref().map(|ext| ext.operations()))
            .finish()
    }
}
