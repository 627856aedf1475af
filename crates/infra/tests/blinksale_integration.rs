//! Blinksale client against a mock HTTP server

mod support;

use ledgerbridge_core::Filter;
use ledgerbridge_domain::{BlinksaleConfig, RestError};
use ledgerbridge_infra::Blinksale;
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{endpoint, init_tracing, transport};

const VND: &str = "application/vnd.blinksale+xml";

fn config() -> BlinksaleConfig {
    BlinksaleConfig { id: "acme".into(), userid: "bob".into(), password: "secret".into() }
}

fn blinksale(server: &MockServer) -> Blinksale {
    Blinksale::with_endpoint(&config(), &endpoint(server), transport()).unwrap()
}

fn xml(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).insert_header("Content-Type", VND).set_body_string(body)
}

#[tokio::test]
async fn lists_clients_with_basic_auth_and_vendor_media_type() {
    init_tracing();
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/clients"))
        .and(header("Authorization", "Basic Ym9iOnNlY3JldA=="))
        .and(header("Accept", VND))
        .respond_with(xml(format!(
            r#"<clients>
                 <client uri="{base}/clients/7"><name>Acme</name></client>
                 <client uri="{base}/clients/9"><name>Globex</name></client>
               </clients>"#
        )))
        .expect(1)
        .mount(&server)
        .await;

    let blinksale = blinksale(&server);
    let clients = blinksale.clients(Filter::new()).unwrap();

    assert_eq!(clients.keys().await.unwrap(), vec![7, 9]);
    assert_eq!(clients.size().await.unwrap(), 2);
    // Served from the listing entry, no element fetch.
    assert_eq!(clients.at(9).unwrap().get("name").await.unwrap(), json!("Globex"));
}

#[tokio::test]
async fn client_people_nest_under_the_client_path() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/clients/7/people"))
        .respond_with(xml(format!(
            r#"<people>
                 <person uri="{base}/clients/7/people/3"><first-name>Ann</first-name></person>
               </people>"#
        )))
        .expect(1)
        .mount(&server)
        .await;

    let blinksale = blinksale(&server);
    let client = blinksale.clients(Filter::new()).unwrap().at(7).unwrap();
    let people = client.collection("people", Filter::new()).unwrap();

    assert_eq!(people.path(), "/clients/7/people");
    let person = people.first().await.unwrap().unwrap();
    assert_eq!(person.path().as_deref(), Some("/clients/7/people/3"));
    assert_eq!(person.get("first_name").await.unwrap(), json!("Ann"));
}

#[tokio::test]
async fn closed_invoice_totals_and_highest_number() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/invoices"))
        .and(query_param("status", "closed"))
        .respond_with(xml(format!(
            r#"<invoices>
                 <invoice uri="{base}/invoices/1"><number>1001</number><total>120.50</total></invoice>
                 <invoice uri="{base}/invoices/2"><number>1002</number><total>180.00</total></invoice>
               </invoices>"#
        )))
        .expect(1)
        .mount(&server)
        .await;

    let blinksale = blinksale(&server);
    let closed = blinksale.invoices(Filter::from([("status", "closed")])).unwrap();

    assert_eq!(closed.call("total").await.unwrap(), json!(300.5));
    assert_eq!(closed.call("max_number").await.unwrap(), json!(1002.0));
    assert!(matches!(closed.call("archive").await, Err(RestError::UnknownOperation(_))));
}

#[tokio::test]
async fn invoice_renders_html_and_exposes_lines() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/invoices/3"))
        .and(header("Accept", "text/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Invoice 1003</html>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/invoices/3"))
        .and(header("Accept", VND))
        .respond_with(xml(format!(
            r#"<invoice uri="{base}/invoices/3">
                 <number>1003</number>
                 <lines>
                   <line><name>Design</name><quantity>2</quantity><unit-price>40.00</unit-price></line>
                   <line><name>Hosting</name><quantity>1</quantity><unit-price>15.00</unit-price></line>
                 </lines>
               </invoice>"#
        )))
        .expect(1)
        .mount(&server)
        .await;

    let blinksale = blinksale(&server);
    let invoice = blinksale.invoices(Filter::new()).unwrap().at(3).unwrap();

    assert_eq!(invoice.call("html").await.unwrap(), json!("<html>Invoice 1003</html>"));
    assert_eq!(
        invoice.call("lines").await.unwrap(),
        json!([
            {"name": "Design", "quantity": "2", "unit-price": "40.00"},
            {"name": "Hosting", "quantity": "1", "unit-price": "15.00"}
        ])
    );
    // The HTML fetch did not replace the cached XML document.
    assert_eq!(invoice.get("number").await.unwrap(), json!("1003"));
}

#[tokio::test]
async fn invoice_listing_feeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/invoices"))
        .and(header("Accept", "application/atom+xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<feed/>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/invoices"))
        .and(header("Accept", "application/rss+xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<rss/>"))
        .mount(&server)
        .await;

    let blinksale = blinksale(&server);
    let invoices = blinksale.invoices(Filter::new()).unwrap();

    assert_eq!(invoices.call("atom").await.unwrap(), json!("<feed/>"));
    assert_eq!(invoices.call("rss").await.unwrap(), json!("<rss/>"));
}

#[tokio::test]
async fn creates_client_from_location_header() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("POST"))
        .and(path("/clients"))
        .and(header("Content-Type", VND))
        .and(body_string("<client><name>Initech</name></client>"))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Location", format!("{base}/clients/99").as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clients/99"))
        .respond_with(xml(format!(
            r#"<client uri="{base}/clients/99"><name>Initech</name><email>info@initech.test</email></client>"#
        )))
        .expect(1)
        .mount(&server)
        .await;

    let blinksale = blinksale(&server);
    let clients = blinksale.clients(Filter::new()).unwrap();
    let client = clients.create("<client><name>Initech</name></client>").await.unwrap();

    assert_eq!(client.path().as_deref(), Some("/clients/99"));
    assert_eq!(client.identifier(), Some(99));
    assert_eq!(client.get("email").await.unwrap(), json!("info@initech.test"));
}

#[tokio::test]
async fn rejected_create_surfaces_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/clients"))
        .respond_with(ResponseTemplate::new(422).set_body_string("<errors><error>Name is required</error></errors>"))
        .mount(&server)
        .await;

    let blinksale = blinksale(&server);
    let clients = blinksale.clients(Filter::new()).unwrap();
    let err = clients.create("<client/>").await.unwrap_err();

    assert!(matches!(err, RestError::Http { status: 422, .. }), "got {err:?}");
}

#[tokio::test]
async fn deleting_invoice_refreshes_listing() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/invoices"))
        .respond_with(xml(format!(
            r#"<invoices><invoice uri="{base}/invoices/3"><number>1003</number></invoice></invoices>"#
        )))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/invoices/3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let blinksale = blinksale(&server);
    let invoices = blinksale.invoices(Filter::new()).unwrap();
    assert_eq!(invoices.keys().await.unwrap(), vec![3]);

    invoices.at(3).unwrap().delete().await.unwrap();

    // Listing was dropped by the delete and is fetched again.
    assert_eq!(invoices.keys().await.unwrap(), vec![3]);
}

#[tokio::test]
async fn collections_outlive_their_service_only_as_dead_handles() {
    let server = MockServer::start().await;

    let clients = blinksale(&server).clients(Filter::new()).unwrap();
    let err = clients.keys().await.unwrap_err();

    assert!(matches!(err, RestError::Precondition(_)), "got {err:?}");
    assert!(server.received_requests().await.unwrap().is_empty());
}
