//! Collection declarations
//!
//! A [`CollectionDecl`] names a collection, the path segment it lives at, the
//! filter it applies by default, the key its elements are wrapped under and
//! the extension its handles carry. Declarations nest: an element of a
//! declared collection resolves child collections through
//! [`CollectionDecl::has_many`] entries.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::extension::Extension;
use crate::filter::Filter;

/// Options for declaring a collection
#[derive(Debug, Clone, Default)]
pub struct CollectionOptions {
    /// Path segment relative to the parent; defaults to the collection name.
    /// A value starting with `/` is used as an absolute path.
    pub path: Option<String>,
    /// Filter merged under any caller-supplied filter
    pub filter_defaults: Filter,
    /// Key JSON elements are wrapped under when written (`client`)
    pub element_key: Option<String>,
    pub extension: Extension,
}

impl CollectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn filter_defaults(mut self, filter: Filter) -> Self {
        self.filter_defaults = filter;
        self
    }

    pub fn element_key(mut self, key: impl Into<String>) -> Self {
        self.element_key = Some(key.into());
        self
    }

    pub fn extension(mut self, extension: Extension) -> Self {
        self.extension = extension;
        self
    }
}

/// A declared collection and its nested declarations
#[derive(Debug, Clone)]
pub struct CollectionDecl {
    name: String,
    segment: String,
    filter_defaults: Filter,
    element_key: Option<String>,
    extension: Extension,
    children: BTreeMap<String, Arc<CollectionDecl>>,
}

impl CollectionDecl {
    pub fn new(name: impl Into<String>, options: CollectionOptions) -> Self {
        let name = name.into();
        let segment = options.path.unwrap_or_else(|| name.clone());
        Self {
            name,
            segment,
            filter_defaults: options.filter_defaults,
            element_key: options.element_key,
            extension: options.extension,
            children: BTreeMap::new(),
        }
    }

    /// Declare a nested collection available on every element of this one.
    pub fn has_many<F>(&mut self, name: &str, options: CollectionOptions, configure: F) -> &mut Self
    where
        F: FnOnce(&mut CollectionDecl),
    {
        let mut child = CollectionDecl::new(name, options);
        configure(&mut child);
        self.children.insert(name.to_string(), Arc::new(child));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn filter_defaults(&self) -> &Filter {
        &self.filter_defaults
    }

    pub fn element_key(&self) -> Option<&str> {
        self.element_key.as_deref()
    }

    pub fn extension(&self) -> &Extension {
        &self.extension
    }

    pub fn child(&self, name: &str) -> Option<&Arc<CollectionDecl>> {
        self.children.get(name)
    }

    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Path of this collection below `parent_path`.
    pub fn resolve_path(&self, parent_path: &str) -> String {
        if self.segment.starts_with('/') {
            self.segment.clone()
        } else {
            format!("{}/{}", parent_path.trim_end_matches('/'), self.segment)
        }
    }
}
