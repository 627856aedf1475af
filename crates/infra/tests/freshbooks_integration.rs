//! FreshBooks client against a mock HTTP server

mod support;

use std::sync::Arc;

use chrono::{Duration, Utc};
use ledgerbridge_core::{Filter, TokenState};
use ledgerbridge_domain::{FreshBooksConfig, OAuth2Credentials, OAuth2Token, RestError};
use ledgerbridge_infra::{BusinessSelection, FreshBooks};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{endpoint, init_tracing, transport};

fn config(token: Option<OAuth2Token>, auth_code: Option<&str>) -> FreshBooksConfig {
    FreshBooksConfig {
        credentials: OAuth2Credentials {
            client_id: "cid".into(),
            client_secret: "csecret".into(),
            redirect_uri: "https://localhost/callback".into(),
        },
        auth_code: auth_code.map(str::to_string),
        token,
    }
}

fn token(access: &str, issued_ago: Duration) -> OAuth2Token {
    OAuth2Token {
        access_token: access.into(),
        refresh_token: format!("{access}-refresh"),
        token_type: "Bearer".into(),
        issued_at: Utc::now() - issued_ago,
        ttl: 3600,
    }
}

fn token_response(access: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": access,
        "refresh_token": format!("{access}-refresh"),
        "token_type": "Bearer",
        "expires_in": 43200
    }))
}

async fn mount_identity(server: &MockServer, bearer: &str) {
    Mock::given(method("GET"))
        .and(path("/auth/api/v1/users/me"))
        .and(header("Authorization", format!("Bearer {bearer}").as_str()))
        .and(header("Api-Version", "alpha"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {
                "id": 4,
                "first_name": "Bob",
                "business_memberships": [
                    {"role": "owner", "business": {"id": 77, "account_id": "AbC12", "name": "Acme"}}
                ]
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn connect_exchanges_the_authorization_code() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/oauth/token"))
        .and(header("Api-Version", "alpha"))
        .and(body_partial_json(json!({
            "grant_type": "authorization_code",
            "code": "code-1",
            "client_id": "cid",
            "redirect_uri": "https://localhost/callback"
        })))
        .respond_with(token_response("a1"))
        .expect(1)
        .mount(&server)
        .await;

    let freshbooks =
        FreshBooks::connect_to(&config(None, Some("code-1")), &endpoint(&server), transport()).await.unwrap();

    assert_eq!(freshbooks.session().state(), TokenState::Valid);
    assert_eq!(freshbooks.token().unwrap().access_token, "a1");
}

#[tokio::test]
async fn connect_without_token_or_code_stays_unauthenticated() {
    let server = MockServer::start().await;

    let freshbooks = FreshBooks::connect_to(&config(None, None), &endpoint(&server), transport()).await.unwrap();

    assert_eq!(freshbooks.session().state(), TokenState::Absent);
    let err = freshbooks.identity().get("id").await.unwrap_err();
    assert!(matches!(err, RestError::Token(_)), "got {err:?}");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn authorization_url_carries_client_and_redirect() {
    let server = MockServer::start().await;
    let freshbooks = FreshBooks::with_endpoint(&config(None, None), &endpoint(&server), transport()).unwrap();

    assert_eq!(
        freshbooks.authorization_url(),
        "https://my.freshbooks.com/service/auth/oauth/authorize?client_id=cid&response_type=code\
         &redirect_uri=https%3A%2F%2Flocalhost%2Fcallback"
    );
}

#[tokio::test]
async fn expired_token_is_refreshed_once_before_the_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/oauth/token"))
        .and(body_partial_json(json!({
            "grant_type": "refresh_token",
            "refresh_token": "a1-refresh"
        })))
        .respond_with(token_response("a2"))
        .expect(1)
        .mount(&server)
        .await;
    mount_identity(&server, "a2").await;

    let stale = token("a1", Duration::hours(2));
    let freshbooks = FreshBooks::with_endpoint(&config(Some(stale), None), &endpoint(&server), transport()).unwrap();
    assert_eq!(freshbooks.session().state(), TokenState::Expired);

    assert_eq!(freshbooks.identity().get("first_name").await.unwrap(), json!("Bob"));
    assert_eq!(freshbooks.token().unwrap().access_token, "a2");

    // The refreshed token is reused.
    assert_eq!(freshbooks.businesses().await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_refresh_keeps_the_stale_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_grant"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/api/v1/users/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let stale = token("a1", Duration::hours(2));
    let freshbooks =
        FreshBooks::with_endpoint(&config(Some(stale.clone()), None), &endpoint(&server), transport()).unwrap();

    let err = freshbooks.identity().get("id").await.unwrap_err();
    assert!(matches!(err, RestError::Token(_)), "got {err:?}");
    assert_eq!(freshbooks.token(), Some(stale));
}

#[tokio::test]
async fn use_business_scopes_accounting_collections() {
    let server = MockServer::start().await;
    mount_identity(&server, "a1").await;

    Mock::given(method("GET"))
        .and(path("/accounting/account/AbC12/users/clients"))
        .and(query_param("search[email]", "bob@acme.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"result": {
                "clients": [{"id": 1, "fname": "Bob", "email": "bob@acme.test"}],
                "page": 1,
                "pages": 1
            }}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fresh = token("a1", Duration::zero());
    let freshbooks = FreshBooks::with_endpoint(&config(Some(fresh), None), &endpoint(&server), transport()).unwrap();

    assert!(matches!(freshbooks.clients(Filter::new()), Err(RestError::UnknownCollection(_))));

    let businesses = freshbooks.businesses().await.unwrap();
    assert_eq!(businesses, vec![json!({"id": 77, "account_id": "AbC12", "name": "Acme"})]);

    freshbooks.use_business(77, "AbC12").await.unwrap();
    assert_eq!(
        freshbooks.selection(),
        Some(BusinessSelection { business_id: 77, account_id: "AbC12".into() })
    );
    assert_eq!(freshbooks.using_business().await.unwrap().unwrap()["name"], json!("Acme"));

    let clients = freshbooks.clients(Filter::from([("email", "bob@acme.test")])).unwrap();
    assert_eq!(clients.keys().await.unwrap(), vec![1]);
    assert_eq!(clients.at(1).unwrap().get("fname").await.unwrap(), json!("Bob"));

    let invoices = freshbooks.invoices(Filter::new()).unwrap();
    assert_eq!(invoices.path(), "/accounting/account/AbC12/invoices/invoices");
}

#[tokio::test]
async fn unknown_business_leaves_selection_and_cache_alone() {
    let server = MockServer::start().await;
    mount_identity(&server, "a1").await;

    let fresh = token("a1", Duration::zero());
    let freshbooks = FreshBooks::with_endpoint(&config(Some(fresh), None), &endpoint(&server), transport()).unwrap();

    freshbooks.use_business(77, "AbC12").await.unwrap();
    let clients = freshbooks.clients(Filter::new()).unwrap();

    let err = freshbooks.use_business(99, "zzz").await.unwrap_err();
    assert!(matches!(err, RestError::Precondition(_)), "got {err:?}");

    assert_eq!(
        freshbooks.selection(),
        Some(BusinessSelection { business_id: 77, account_id: "AbC12".into() })
    );
    assert!(Arc::ptr_eq(&clients, &freshbooks.clients(Filter::new()).unwrap()));
}

#[tokio::test]
async fn created_client_is_wrapped_and_addressed_by_id() {
    let server = MockServer::start().await;
    mount_identity(&server, "a1").await;

    Mock::given(method("POST"))
        .and(path("/accounting/account/AbC12/users/clients"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"client": {"fname": "Beta"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"result": {"client": {"id": 55, "fname": "Beta"}}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fresh = token("a1", Duration::zero());
    let freshbooks = FreshBooks::with_endpoint(&config(Some(fresh), None), &endpoint(&server), transport()).unwrap();
    freshbooks.use_business(77, "AbC12").await.unwrap();

    let clients = freshbooks.clients(Filter::new()).unwrap();
    let client = clients.create(r#"{"fname":"Beta"}"#).await.unwrap();

    assert_eq!(client.path().as_deref(), Some("/accounting/account/AbC12/users/clients/55"));
    assert_eq!(client.get("fname").await.unwrap(), json!("Beta"));
}
