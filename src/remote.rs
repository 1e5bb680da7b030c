//! Remote platform seam
//!
//! The loader core talks to the platform only through `RemoteApi`. The
//! production implementation is the REST client in [`crate::rest`]; tests
//! substitute in-memory implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;

/// Per-record error entry as reported by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveError {
    #[serde(rename = "statusCode")]
    pub status_code: String,
    pub message: String,
}

/// One entry of the positional response array for a submitted batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResult {
    pub success: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub errors: Vec<SaveError>,
}

impl SaveResult {
    pub fn inserted(id: &str) -> Self {
        Self {
            success: true,
            id: Some(id.to_string()),
            errors: Vec::new(),
        }
    }

    pub fn rejected(status_code: &str, message: &str) -> Self {
        Self {
            success: false,
            id: None,
            errors: vec![SaveError {
                status_code: status_code.to_string(),
                message: message.to_string(),
            }],
        }
    }
}

/// Record-oriented platform operations the loader depends on.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Insert up to one platform batch of records for `object`. The returned
    /// vector is positionally aligned with `payloads`; per-record rejection
    /// is reported inside the entries, not as an `Err`.
    async fn insert(
        &self,
        object: &str,
        payloads: Vec<Value>,
    ) -> Result<Vec<SaveResult>, TransportError>;

    /// Run a SOQL query, following pagination to completion.
    async fn query(&self, soql: &str) -> Result<Vec<Value>, TransportError>;
}

/// Escape a string for inclusion in a single-quoted SOQL literal.
pub fn escape_soql_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
