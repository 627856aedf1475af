//! HTTP transport implementation

pub mod transport;

pub use transport::{HttpTransport, HttpTransportBuilder};
