//! Blinksale client
//!
//! Blinksale speaks XML (`application/vnd.blinksale+xml`) with HTTP basic
//! auth at `https://{account}.blinksale.com`. Clients have people; invoices
//! have deliveries and payments, and carry extra operations:
//!
//! - invoice: `html` (rendered invoice), `lines` (invoice line items)
//! - invoice collection: `total`, `max_number`, `atom`, `rss`

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use ledgerbridge_core::{
    Client, Collection, CollectionExtension, CollectionOptions, Document, Extension, Filter,
    Resource, ResourceExtension, Transport,
};
use ledgerbridge_domain::constants::{
    BLINKSALE_HOST_SUFFIX, MEDIA_TYPE_ATOM, MEDIA_TYPE_BLINKSALE, MEDIA_TYPE_HTML, MEDIA_TYPE_RSS,
};
use ledgerbridge_domain::{BlinksaleConfig, Credentials, MediaType, RestError, Result};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use super::ServiceEndpoint;

/// Connected Blinksale account
///
/// Collections and resources handed out here only hold a weak reference to
/// the underlying client. Keep the `Blinksale` value alive while using them;
/// once it is dropped every handle fails with `RestError::Precondition`.
pub struct Blinksale {
    client: Client,
}

impl Blinksale {
    /// Client for `https://{config.id}.blinksale.com`.
    pub fn new(config: &BlinksaleConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let endpoint = ServiceEndpoint::https(format!("{}{BLINKSALE_HOST_SUFFIX}", config.id));
        Self::with_endpoint(config, &endpoint, transport)
    }

    pub fn with_endpoint(
        config: &BlinksaleConfig,
        endpoint: &ServiceEndpoint,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let client = endpoint
            .configure(Client::builder(endpoint.host.clone()))
            .credentials(Credentials::Basic {
                userid: config.userid.clone(),
                password: config.password.clone(),
            })
            .media_type(MEDIA_TYPE_BLINKSALE)
            .transport(transport)
            .build()?;

        client.declare_collection("clients", CollectionOptions::new(), |clients| {
            clients.has_many("people", CollectionOptions::new(), |_| {});
        });

        let invoice = Extension::new()
            .with_resource(Arc::new(InvoiceOperations))
            .with_collection(Arc::new(InvoiceListOperations));
        client.declare_collection("invoices", CollectionOptions::new().extension(invoice), |invoices| {
            invoices
                .has_many("deliveries", CollectionOptions::new(), |_| {})
                .has_many("payments", CollectionOptions::new(), |_| {});
        });

        info!(account = %config.id, url = %client.url(), "Blinksale client ready");
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn clients(&self, filter: Filter) -> Result<Arc<Collection>> {
        self.client.collection("clients", filter)
    }

    /// Invoices, e.g. `invoices(Filter::from([("status", "closed")]))`.
    pub fn invoices(&self, filter: Filter) -> Result<Arc<Collection>> {
        self.client.collection("invoices", filter)
    }
}

/// One `<line>` of an invoice
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct InvoiceLine {
    attributes: BTreeMap<String, Value>,
}

impl InvoiceLine {
    fn from_document(document: &Document) -> Self {
        let attributes = document
            .attribute_names()
            .into_iter()
            .filter_map(|name| document.get(&name).map(|value| (name, value)))
            .collect();
        Self { attributes }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes
            .get(name)
            .or_else(|| self.attributes.get(&name.replace('_', "-")))
    }

    pub fn attribute_exists(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }
}

/// Line items of an invoice, from `<lines><line>...</line></lines>`.
pub async fn invoice_lines(invoice: &Resource) -> Result<Vec<InvoiceLine>> {
    let document = invoice.document().await?;
    Ok(document.section("lines", "line").iter().map(InvoiceLine::from_document).collect())
}

struct InvoiceOperations;

#[async_trait]
impl ResourceExtension for InvoiceOperations {
    fn operations(&self) -> &'static [&'static str] {
        &["html", "lines"]
    }

    async fn invoke(&self, operation: &str, invoice: &Arc<Resource>) -> Result<Value> {
        match operation {
            "html" => Ok(Value::String(invoice.get_representation(&MediaType::new(MEDIA_TYPE_HTML)).await?)),
            "lines" => serde_json::to_value(invoice_lines(invoice).await?)
                .map_err(|e| RestError::Decode(format!("invoice lines: {e}"))),
            other => Err(RestError::UnknownOperation(other.to_string())),
        }
    }
}

struct InvoiceListOperations;

#[async_trait]
impl CollectionExtension for InvoiceListOperations {
    fn operations(&self) -> &'static [&'static str] {
        &["total", "max_number", "atom", "rss"]
    }

    async fn invoke(&self, operation: &str, invoices: &Arc<Collection>) -> Result<Value> {
        match operation {
            "total" => {
                let totals = numeric_attribute(invoices, "total").await?;
                Ok(json!(totals.iter().sum::<f64>()))
            }
            "max_number" => {
                let numbers = numeric_attribute(invoices, "number").await?;
                Ok(numbers.into_iter().reduce(f64::max).map_or(Value::Null, |max| json!(max)))
            }
            "atom" => Ok(Value::String(invoices.get_representation(&MediaType::new(MEDIA_TYPE_ATOM)).await?)),
            "rss" => Ok(Value::String(invoices.get_representation(&MediaType::new(MEDIA_TYPE_RSS)).await?)),
            other => Err(RestError::UnknownOperation(other.to_string())),
        }
    }
}

/// `name` of every element parsed as a number; blank or non-numeric values
/// count as zero.
async fn numeric_attribute(collection: &Arc<Collection>, name: &str) -> Result<Vec<f64>> {
    let resources: Vec<Arc<Resource>> = collection.enumerate().try_collect().await?;
    let mut values = Vec::with_capacity(resources.len());
    for resource in resources {
        let value = resource.get(name).await?;
        values.push(as_number(&value));
    }
    Ok(values)
}

fn as_number(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or_default(),
        Value::String(text) => text.trim().parse().unwrap_or_default(),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_parse_from_text_and_json() {
        assert_eq!(as_number(&json!("250.50")), 250.5);
        assert_eq!(as_number(&json!(12)), 12.0);
        assert_eq!(as_number(&json!("n/a")), 0.0);
        assert_eq!(as_number(&Value::Null), 0.0);
    }

    #[test]
    fn invoice_lines_expose_dashed_names() {
        let document = Document::Xml(
            ledgerbridge_core::XmlNode::parse("<line><name>Design</name><unit-price>40.00</unit-price></line>")
                .unwrap(),
        );
        let line = InvoiceLine::from_document(&document);

        assert_eq!(line.get("name"), Some(&json!("Design")));
        assert_eq!(line.get("unit_price"), Some(&json!("40.00")));
        assert!(!line.attribute_exists("quantity"));
        assert_eq!(line.attribute_names().collect::<Vec<_>>(), vec!["name", "unit-price"]);
    }
}
