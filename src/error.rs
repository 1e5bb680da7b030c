//! Error handling for the seed loader
//!
//! Per-record rejections are expected, frequent outcomes and are modeled as
//! data (`RejectionKind` on ledger entries), never as errors. The error types
//! here cover the conditions that abort a batch or a run: transport failures,
//! unusable configuration, and unreadable source datasets.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the loader.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("transport failure while loading {object}: {source}")]
    Transport {
        object: String,
        #[source]
        source: TransportError,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The batch call itself did not complete. Distinct from per-record
/// rejection: no partial outcome exists and nothing is merged.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("platform returned {received} results for {submitted} submitted records")]
    ResultCountMismatch { submitted: usize, received: usize },

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Other(String),
}

/// Errors reading or parsing a source dataset file.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} row {row}, column {column}: {message}")]
    BadValue {
        path: PathBuf,
        row: usize,
        column: String,
        message: String,
    },
}

/// Classification of a per-record rejection, local or remote-reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// Field missing from the live schema or not visible (`INVALID_FIELD`).
    /// Permanent for the run; never retried.
    Schema,
    /// Platform invariant violation (`STANDARD_PRICE_NOT_DEFINED`). Should
    /// be pre-empted by the precedence guard; occurrence is a defect signal.
    Constraint,
    /// Platform duplicate detection fired. The state the insert would have
    /// created already exists, so this is informational, not a run failure.
    Duplicate,
    /// A referenced local external key has no directory entry. Detected
    /// before submission; the record is never sent.
    UnresolvedReference,
    /// Any other remote-reported rejection.
    Other,
}

impl RejectionKind {
    /// Map a platform status code onto the rejection taxonomy.
    pub fn from_status_code(code: &str) -> Self {
        match code {
            "INVALID_FIELD" | "INVALID_FIELD_FOR_INSERT_UPDATE" | "INVALID_TYPE_ON_FIELD_IN_RECORD" => {
                RejectionKind::Schema
            }
            "STANDARD_PRICE_NOT_DEFINED" | "FIELD_INTEGRITY_EXCEPTION" => RejectionKind::Constraint,
            "DUPLICATES_DETECTED" | "DUPLICATE_VALUE" | "DUPLICATE_EXTERNAL_ID" => {
                RejectionKind::Duplicate
            }
            _ => RejectionKind::Other,
        }
    }

    /// True for rejections that count against the run (duplicates do not:
    /// the invariant they protect already holds).
    pub fn is_run_failure(&self) -> bool {
        !matches!(self, RejectionKind::Duplicate)
    }
}
