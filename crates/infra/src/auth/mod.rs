//! OAuth2 token endpoint adapter

pub mod token_endpoint;

pub use token_endpoint::OAuth2TokenEndpoint;
