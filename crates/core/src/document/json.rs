//! JSON envelope handling
//!
//! Services wrap payloads as `{"response": {"result": {"client": {...}}}}`.
//! Unwrapping keeps the key of the substantive payload (`client`) so that a
//! write can re-wrap the document the way the service expects it.

use ledgerbridge_domain::constants::{ENVELOPE_RESPONSE_KEY, ENVELOPE_RESULT_KEY};
use ledgerbridge_domain::{RestError, Result};
use serde_json::{Map, Value};

/// Parse `body` and strip the response envelope.
///
/// Returns the root key (when the payload was found under a `result` entry)
/// and the payload itself.
pub fn unwrap(body: &str) -> Result<(Option<String>, Value)> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| RestError::Decode(format!("json parse: {e}")))?;

    let value = match value {
        Value::Object(mut object) if object.contains_key(ENVELOPE_RESPONSE_KEY) => {
            object.remove(ENVELOPE_RESPONSE_KEY).unwrap_or(Value::Null)
        }
        other => other,
    };

    match value {
        Value::Object(mut object) if object.contains_key(ENVELOPE_RESULT_KEY) => {
            match object.remove(ENVELOPE_RESULT_KEY) {
                Some(Value::Object(result)) => Ok(unwrap_result(result)),
                Some(other) => Ok((None, other)),
                None => Ok((None, Value::Object(object))),
            }
        }
        other => Ok((None, other)),
    }
}

fn unwrap_result(result: Map<String, Value>) -> (Option<String>, Value) {
    let payload_key = result
        .iter()
        .find(|(_, value)| value.is_array() || value.is_object())
        .map(|(key, _)| key.clone());

    match payload_key {
        Some(key) => {
            let mut result = result;
            let payload = result.remove(&key).unwrap_or(Value::Null);
            (Some(key), payload)
        }
        None => (None, Value::Object(result)),
    }
}

/// Serialize `document`, wrapping it under `root_key` when one is given.
pub fn wrap(document: &Value, root_key: Option<&str>) -> Result<String> {
    let rendered = match root_key {
        Some(key) => {
            let mut wrapper = Map::new();
            wrapper.insert(key.to_string(), document.clone());
            serde_json::to_string(&Value::Object(wrapper))
        }
        None => serde_json::to_string(document),
    };
    rendered.map_err(|e| RestError::Decode(format!("json write: {e}")))
}
