//! Conversions from external infrastructure errors into domain errors.

use ledgerbridge_domain::RestError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub RestError);

impl From<InfraError> for RestError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<RestError> for InfraError {
    fn from(value: RestError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoRestError {
    fn into_rest(self) -> RestError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → RestError */
/* -------------------------------------------------------------------------- */

impl IntoRestError for HttpError {
    fn into_rest(self) -> RestError {
        if self.is_builder() {
            return RestError::Config(format!("invalid HTTP request: {self}"));
        }
        if self.is_decode() || self.is_body() {
            return RestError::Decode(format!("failed to read HTTP body: {self}"));
        }
        if let Some(status) = self.status() {
            return RestError::Http { status: status.as_u16(), body: self.to_string() };
        }
        if self.is_timeout() {
            return RestError::Network(format!("http request timed out: {self}"));
        }
        RestError::Network(format!("http request failed: {self}"))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_rest())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → RestError */
/* -------------------------------------------------------------------------- */

impl IntoRestError for serde_json::Error {
    fn into_rest(self) -> RestError {
        RestError::Decode(format!("invalid JSON: {self}"))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(value.into_rest())
    }
}

/* -------------------------------------------------------------------------- */
/* toml::de::Error → RestError */
/* -------------------------------------------------------------------------- */

impl IntoRestError for toml::de::Error {
    fn into_rest(self) -> RestError {
        RestError::Config(format!("Invalid TOML format: {self}"))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(value.into_rest())
    }
}
