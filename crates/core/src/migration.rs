//! Attribute migration between two resources
//!
//! A [`Migration`] pairs a source resource with an optional destination and
//! a list of attribute associations. It reports which associations differ
//! and copies source values over the differing destination attributes.

use std::sync::Arc;

use ledgerbridge_domain::{RestError, Result};
use serde_json::{Map, Value};
use tracing::info;

use crate::document::{render_scalar, AttributeValue};
use crate::resource::Resource;

/// One source attribute mapped onto one destination attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrAssociation {
    pub description: String,
    pub src: String,
    pub dst: String,
}

pub struct Migration {
    src: Arc<Resource>,
    dst: Option<Arc<Resource>>,
    associations: Vec<AttrAssociation>,
}

impl Migration {
    pub fn new(src: Arc<Resource>, dst: Option<Arc<Resource>>) -> Self {
        Self { src, dst, associations: Vec::new() }
    }

    pub fn src(&self) -> &Arc<Resource> {
        &self.src
    }

    pub fn dst(&self) -> Option<&Arc<Resource>> {
        self.dst.as_ref()
    }

    pub fn associations(&self) -> &[AttrAssociation] {
        &self.associations
    }

    /// Map `src_attr` onto `dst_attr` (or onto the same name when `None`
    /// or blank).
    pub fn add_attr_association(
        &mut self,
        description: &str,
        src_attr: &str,
        dst_attr: Option<&str>,
    ) -> Result<&mut Self> {
        if src_attr.trim().is_empty() {
            return Err(RestError::Precondition(format!("{description}: source attribute is blank")));
        }
        let dst = match dst_attr {
            Some(dst) if !dst.trim().is_empty() => dst,
            _ => src_attr,
        };
        self.associations.push(AttrAssociation {
            description: description.to_string(),
            src: src_attr.to_string(),
            dst: dst.to_string(),
        });
        Ok(self)
    }

    /// Destination attribute name → source value, for every association.
    pub async fn migration_hash(&self) -> Result<Map<String, Value>> {
        let mut hash = Map::new();
        for association in &self.associations {
            hash.insert(association.dst.clone(), self.src.get(&association.src).await?);
        }
        Ok(hash)
    }

    /// Associations whose source and destination values do not match.
    /// Without a destination every association with a non-blank source
    /// value differs.
    pub async fn differing(&self) -> Result<Vec<AttrAssociation>> {
        let mut differing = Vec::new();
        for association in &self.associations {
            let src_value = self.src.get(&association.src).await?;
            let dst_value = match &self.dst {
                Some(dst) => dst.get(&association.dst).await?,
                None => Value::Null,
            };
            if !values_match(&src_value, &dst_value) {
                info!(
                    description = %association.description,
                    src_attr = %association.src,
                    dst_attr = %association.dst,
                    src_value = %render_scalar(&src_value),
                    dst_value = %render_scalar(&dst_value),
                    "attributes don't match"
                );
                differing.push(association.clone());
            }
        }
        Ok(differing)
    }

    pub async fn same(&self) -> Result<bool> {
        Ok(self.differing().await?.is_empty())
    }

    /// Copy every differing source value onto the destination. The
    /// destination is edited in place; saving it is up to the caller.
    /// Returns the associations that were migrated.
    pub async fn update(&self) -> Result<Vec<AttrAssociation>> {
        let dst = self
            .dst
            .as_ref()
            .ok_or_else(|| RestError::Precondition("migration has no destination".into()))?;

        let differing = self.differing().await?;
        for association in &differing {
            let value = self.src.get(&association.src).await?;
            dst.set(&association.dst, value.clone()).await?;
            info!(
                description = %association.description,
                src_attr = %association.src,
                dst_attr = %association.dst,
                value = %render_scalar(&value),
                "attribute migrated"
            );
        }
        Ok(differing)
    }
}

/// Null, empty or whitespace-only strings, empty containers and `false`.
pub fn is_blank(value: &AttributeValue) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Number(_) => false,
    }
}

/// Two values match when both are blank or they are deeply equal. XML
/// attributes are always strings, so scalars also match on their text form.
pub fn values_match(src: &AttributeValue, dst: &AttributeValue) -> bool {
    if is_blank(src) && is_blank(dst) {
        return true;
    }
    if src == dst {
        return true;
    }
    let scalar = |value: &Value| !value.is_array() && !value.is_object();
    scalar(src) && scalar(dst) && render_scalar(src) == render_scalar(dst)
}
