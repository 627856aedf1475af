//! Document codec
//!
//! Converts raw bodies to an attribute-addressable [`Document`] and back.
//! XML media types parse into an element tree; JSON media types parse into a
//! `serde_json::Value` with the response envelope stripped.

pub mod json;
pub mod xml;

use std::collections::BTreeSet;

use ledgerbridge_domain::{MediaType, ResourceId, RestError, Result};
use serde_json::Value;
use url::Url;

pub use self::xml::XmlNode;

/// Attribute values are exposed as JSON values; XML attributes are strings.
pub type AttributeValue = Value;

/// Parsed body of a resource or listing
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Xml(XmlNode),
    Json(Value),
}

/// A document together with the envelope key it was found under
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub root_key: Option<String>,
    pub document: Document,
}

/// Parse `body` according to `media_type`.
pub fn parse(body: &str, media_type: &MediaType) -> Result<ParsedDocument> {
    if media_type.is_json() {
        let (root_key, value) = json::unwrap(body)?;
        Ok(ParsedDocument { root_key, document: Document::Json(value) })
    } else if media_type.is_xml() {
        Ok(ParsedDocument { root_key: None, document: Document::Xml(XmlNode::parse(body)?) })
    } else {
        Err(RestError::Decode(format!("no codec for content type {media_type}")))
    }
}

/// Serialize `document`; JSON documents are wrapped under `root_key`.
pub fn serialize(document: &Document, root_key: Option<&str>) -> Result<String> {
    match document {
        Document::Xml(node) => node.to_xml_string(),
        Document::Json(value) => json::wrap(value, root_key),
    }
}

impl ParsedDocument {
    pub fn serialize(&self) -> Result<String> {
        serialize(&self.document, self.root_key.as_deref())
    }
}

impl Document {
    /// Value of attribute `name`, if present.
    ///
    /// XML: a child element (its text) wins over an XML attribute of the same
    /// name. Underscored names also match dashed element names.
    pub fn get(&self, name: &str) -> Option<AttributeValue> {
        match self {
            Document::Xml(node) => {
                if let Some(child) = xml_child(node, name) {
                    if child.attribute("nil") == Some("true") {
                        return Some(Value::Null);
                    }
                    return Some(Value::String(child.text.clone()));
                }
                node.attribute(name).map(|value| Value::String(value.to_string()))
            }
            Document::Json(value) => value.as_object().and_then(|object| object.get(name)).cloned(),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        match self {
            Document::Xml(node) => xml_child(node, name).is_some() || node.attribute(name).is_some(),
            Document::Json(value) => {
                value.as_object().is_some_and(|object| object.contains_key(name))
            }
        }
    }

    /// Overwrite an existing attribute. Returns `false` when the document has
    /// no attribute called `name`.
    pub fn set(&mut self, name: &str, value: AttributeValue) -> bool {
        match self {
            Document::Xml(node) => {
                let text = render_scalar(&value);
                if let Some(child) = xml_child_mut(node, name) {
                    child.text = text;
                    child.attributes.retain(|(key, _)| key != "nil");
                    return true;
                }
                node.set_attribute(name, text)
            }
            Document::Json(document) => match document.as_object_mut() {
                Some(object) if object.contains_key(name) => {
                    object.insert(name.to_string(), value);
                    true
                }
                _ => false,
            },
        }
    }

    /// Names of every addressable attribute
    pub fn attribute_names(&self) -> BTreeSet<String> {
        match self {
            Document::Xml(node) => node
                .children
                .iter()
                .map(|child| child.name.clone())
                .chain(node.attributes.iter().map(|(key, _)| key.clone()))
                .collect(),
            Document::Json(value) => value
                .as_object()
                .map(|object| object.keys().cloned().collect())
                .unwrap_or_default(),
        }
    }

    /// Identifier of the entity this document describes.
    ///
    /// XML: final path segment of the `uri` locator. JSON: the `id` field.
    pub fn identifier(&self) -> Option<ResourceId> {
        match self {
            Document::Xml(node) => node.attribute("uri").and_then(id_from_locator),
            Document::Json(value) => value.get("id").and_then(id_from_value),
        }
    }

    /// Identifiers of the entries of a listing document, in document order.
    pub fn element_ids(&self) -> Result<Vec<ResourceId>> {
        self.elements()?
            .iter()
            .map(|element| {
                element.identifier().ok_or_else(|| {
                    RestError::Decode("listing entry has no resource locator".into())
                })
            })
            .collect()
    }

    /// Raw body of the listing entry with identifier `id`.
    pub fn element_body(&self, id: ResourceId) -> Option<String> {
        let element = self.elements().ok()?.into_iter().find(|e| e.identifier() == Some(id))?;
        match element {
            Document::Xml(node) => node.to_xml_string().ok(),
            Document::Json(value) => serde_json::to_string(&value).ok(),
        }
    }

    /// Nested entries `<container><item/>...</container>` (XML) or the array
    /// under `container` (JSON), as standalone documents.
    pub fn section(&self, container: &str, item: &str) -> Vec<Document> {
        match self {
            Document::Xml(node) => xml_child(node, container)
                .map(|section| {
                    section.children_named(item).cloned().map(Document::Xml).collect()
                })
                .unwrap_or_default(),
            Document::Json(value) => {
                let section = value.get(container);
                let entries = match section {
                    Some(Value::Array(entries)) => Some(entries),
                    Some(Value::Object(object)) => object.get(item).and_then(Value::as_array),
                    _ => None,
                };
                entries
                    .map(|entries| entries.iter().cloned().map(Document::Json).collect())
                    .unwrap_or_default()
            }
        }
    }

    fn elements(&self) -> Result<Vec<Document>> {
        match self {
            Document::Xml(node) => Ok(node.children.iter().cloned().map(Document::Xml).collect()),
            Document::Json(Value::Array(entries)) => {
                Ok(entries.iter().cloned().map(Document::Json).collect())
            }
            Document::Json(_) => Err(RestError::Decode("listing document is not a list".into())),
        }
    }
}

/// Path component of a resource locator (absolute URL or absolute path).
pub fn locator_path(locator: &str) -> Option<String> {
    if locator.starts_with('/') {
        let path = locator.split(['?', '#']).next().unwrap_or(locator);
        return Some(path.to_string());
    }
    Url::parse(locator).ok().map(|url| url.path().to_string())
}

/// Render a scalar the way it appears in text-based formats.
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn id_from_locator(locator: &str) -> Option<ResourceId> {
    let path = locator_path(locator)?;
    path.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

fn id_from_value(value: &Value) -> Option<ResourceId> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

fn xml_child<'a>(node: &'a XmlNode, name: &str) -> Option<&'a XmlNode> {
    node.child(name).or_else(|| node.child(&name.replace('_', "-")))
}

fn xml_child_mut<'a>(node: &'a mut XmlNode, name: &str) -> Option<&'a mut XmlNode> {
    let dashed = name.replace('_', "-");
    let index = node
        .children
        .iter()
        .position(|child| child.name == name)
        .or_else(|| node.children.iter().position(|child| child.name == dashed))?;
    node.children.get_mut(index)
}
