//! HTTP client for the record-insertion platform.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use super::types::{with_attributes, CompositeInsertRequest, QueryResponse};
use super::DEFAULT_API_VERSION;
use crate::error::TransportError;
use crate::remote::{RemoteApi, SaveResult};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const ERROR_BODY_SAMPLE: usize = 500;

/// Opaque authenticated session: a bearer token and the tenant base URL.
/// How the token is obtained is the auth provider's concern, not the
/// loader's.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub instance_url: String,
    pub api_version: String,
}

impl Session {
    pub fn new(access_token: &str, instance_url: &str) -> Self {
        Self {
            access_token: access_token.to_string(),
            instance_url: instance_url.trim_end_matches('/').to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn with_api_version(mut self, version: &str) -> Self {
        self.api_version = version.to_string();
        self
    }

    /// Build from environment: `SEED_ACCESS_TOKEN`, `SEED_INSTANCE_URL`, and
    /// optionally `SEED_API_VERSION`.
    pub fn from_env() -> Result<Self> {
        let access_token = std::env::var("SEED_ACCESS_TOKEN")
            .map_err(|_| anyhow!("SEED_ACCESS_TOKEN environment variable not set"))?;
        let instance_url = std::env::var("SEED_INSTANCE_URL")
            .map_err(|_| anyhow!("SEED_INSTANCE_URL environment variable not set"))?;
        let mut session = Self::new(&access_token, &instance_url);
        if let Ok(version) = std::env::var("SEED_API_VERSION") {
            session.api_version = version;
        }
        Ok(session)
    }
}

pub struct RestClient {
    http: reqwest::Client,
    session: Session,
}

impl RestClient {
    pub fn new(session: Session) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http, session })
    }

    fn endpoint(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else if path.starts_with('/') {
            // Pagination URLs come back as full service paths.
            format!("{}{}", self.session.instance_url, path)
        } else {
            format!(
                "{}/services/data/v{}/{}",
                self.session.instance_url, self.session.api_version, path
            )
        }
    }

    async fn fetch_query_page(&self, url: &str) -> Result<QueryResponse, TransportError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.session.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(response.json().await?)
    }
}

async fn status_error(response: reqwest::Response) -> TransportError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let body = body.chars().take(ERROR_BODY_SAMPLE).collect();
    TransportError::Status { status, body }
}

#[async_trait]
impl RemoteApi for RestClient {
    async fn insert(
        &self,
        object: &str,
        payloads: Vec<Value>,
    ) -> Result<Vec<SaveResult>, TransportError> {
        if payloads.is_empty() {
            return Ok(Vec::new());
        }
        let body = CompositeInsertRequest {
            all_or_none: false,
            records: payloads
                .into_iter()
                .map(|payload| with_attributes(object, payload))
                .collect(),
        };
        let response = self
            .http
            .post(self.endpoint("composite/sobjects"))
            .bearer_auth(&self.session.access_token)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn query(&self, soql: &str) -> Result<Vec<Value>, TransportError> {
        let mut url = Url::parse(&self.endpoint("query"))
            .map_err(|e| TransportError::Other(format!("invalid query URL: {e}")))?;
        url.query_pairs_mut().append_pair("q", soql);

        let mut page = self.fetch_query_page(url.as_str()).await?;
        let mut records = std::mem::take(&mut page.records);
        while !page.done {
            let next = page.next_records_url.ok_or_else(|| {
                TransportError::Other("query page not done but no next URL".to_string())
            })?;
            page = self.fetch_query_page(&self.endpoint(&next)).await?;
            records.append(&mut page.records);
        }
        Ok(records)
    }
}
