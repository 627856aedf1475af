//! Shared helpers for the service integration tests

use std::sync::Arc;

use ledgerbridge_infra::{HttpTransport, ServiceEndpoint};
use tracing_subscriber::EnvFilter;
use wiremock::MockServer;

/// Route test logs through the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn endpoint(server: &MockServer) -> ServiceEndpoint {
    ServiceEndpoint::parse(&server.uri()).expect("mock server URI should parse")
}

pub fn transport() -> Arc<HttpTransport> {
    Arc::new(HttpTransport::builder().no_proxy(true).build())
}
