//! Wire types for the composite insert and query endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of one composite insert call. `all_or_none` stays false: partial
/// success is the loader's expected steady state.
#[derive(Debug, Serialize)]
pub struct CompositeInsertRequest {
    #[serde(rename = "allOrNone")]
    pub all_or_none: bool,
    pub records: Vec<Value>,
}

/// One page of a SOQL query response.
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    pub done: bool,
    #[serde(rename = "nextRecordsUrl")]
    pub next_records_url: Option<String>,
    #[serde(default)]
    pub records: Vec<Value>,
}

/// Wrap a record payload in the attributes envelope the composite endpoint
/// expects: `{"attributes": {"type": <object>}, ...fields}`.
pub fn with_attributes(object: &str, payload: Value) -> Value {
    let mut map = match payload {
        Value::Object(map) => map,
        other => {
            // Non-object payloads cannot occur from the loader core; keep
            // the envelope total anyway.
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    map.insert(
        "attributes".to_string(),
        serde_json::json!({ "type": object }),
    );
    Value::Object(map)
}
