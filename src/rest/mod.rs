//! REST transport for the record-insertion platform
//!
//! Production implementation of [`crate::remote::RemoteApi`] speaking the
//! composite sObject collections endpoint for inserts and the paginated
//! SOQL endpoint for queries, authenticated with an injected bearer token.

pub mod client;
pub mod types;

pub use client::{RestClient, Session};

/// Platform REST API version used for all calls.
pub const DEFAULT_API_VERSION: &str = "65.0";
