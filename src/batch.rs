//! Bounded batch submission
//!
//! Partitions resolved records into platform-sized batches, interprets the
//! positional result array, and folds outcomes into the directory and
//! ledger. Partial rejection is the expected steady state; only a failed
//! batch call escalates as an error.

use std::time::Duration;

use serde_json::Value;

use crate::directory::ExternalKeyDirectory;
use crate::error::{LoaderError, RejectionKind, TransportError};
use crate::ledger::{ErrorLedger, ObjectCounts};
use crate::object::ObjectSpec;
use crate::remote::{RemoteApi, SaveResult};

/// Platform maximum for one insertion call.
pub const MAX_BATCH_SIZE: usize = 200;

/// Transport-level retry policy. Per-record rejections are never retried:
/// the known rejection reasons are not transient, so a blind retry fails
/// identically. Transport retries are only safe when the platform's own
/// duplicate protection makes a replayed batch harmless.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per batch, including the first.
    pub max_attempts: u32,
    /// Initial backoff, doubled after each failed attempt.
    pub backoff: Duration,
    /// Whether the platform deduplicates replays. When false, the first
    /// transport failure is fatal for the batch regardless of attempts.
    pub platform_duplicate_safe: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_secs(2),
            platform_duplicate_safe: false,
        }
    }
}

/// Per-record batch outcome, positionally aligned with the submitted records.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Inserted {
        remote_id: String,
    },
    Rejected {
        kind: RejectionKind,
        status_code: String,
        message: String,
    },
}

/// A record ready for the wire: its local key and its outgoing payload.
pub type SubmittableRecord = (String, Value);

pub struct BatchInserter<'a> {
    remote: &'a dyn RemoteApi,
    retry: RetryPolicy,
    batch_size: usize,
}

impl<'a> BatchInserter<'a> {
    pub fn new(remote: &'a dyn RemoteApi) -> Self {
        Self {
            remote,
            retry: RetryPolicy::default(),
            batch_size: MAX_BATCH_SIZE,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// Submit all records for one object type. Inserted outcomes are merged
    /// into the directory (when the object carries an external-key field)
    /// and rejections into the ledger and counts, batch by batch, so a
    /// transport failure on batch N+1 never unwinds batch N's merges.
    pub async fn submit(
        &self,
        spec: &ObjectSpec,
        records: &[SubmittableRecord],
        directory: &mut ExternalKeyDirectory,
        ledger: &mut ErrorLedger,
        counts: &mut ObjectCounts,
    ) -> Result<Vec<InsertOutcome>, LoaderError> {
        let mut outcomes = Vec::with_capacity(records.len());
        if records.is_empty() {
            return Ok(outcomes);
        }

        for chunk in records.chunks(self.batch_size) {
            let payloads: Vec<Value> = chunk.iter().map(|(_, payload)| payload.clone()).collect();
            let results = self
                .call_with_retry(&spec.api_name, payloads)
                .await
                .map_err(|source| LoaderError::Transport {
                    object: spec.api_name.clone(),
                    source,
                })?;

            // Positional correspondence is the whole contract; a length
            // mismatch means the response cannot be attributed to records.
            if results.len() != chunk.len() {
                return Err(LoaderError::Transport {
                    object: spec.api_name.clone(),
                    source: TransportError::ResultCountMismatch {
                        submitted: chunk.len(),
                        received: results.len(),
                    },
                });
            }

            for ((local_key, _), result) in chunk.iter().zip(results) {
                outcomes.push(self.fold_outcome(spec, local_key, result, directory, ledger, counts));
            }
        }

        tracing::info!(
            object = %spec.api_name,
            attempted = records.len(),
            inserted = counts.inserted,
            rejected = counts.rejected_total(),
            "batch submission complete"
        );
        Ok(outcomes)
    }

    fn fold_outcome(
        &self,
        spec: &ObjectSpec,
        local_key: &str,
        result: SaveResult,
        directory: &mut ExternalKeyDirectory,
        ledger: &mut ErrorLedger,
        counts: &mut ObjectCounts,
    ) -> InsertOutcome {
        match (result.success, result.id) {
            (true, Some(remote_id)) => {
                if spec.external_key_field.is_some() {
                    directory.record(&spec.api_name, local_key, &remote_id);
                }
                counts.inserted += 1;
                InsertOutcome::Inserted { remote_id }
            }
            (true, None) => {
                // Claimed success without an identifier is unusable: nothing
                // downstream could reference the record.
                let kind = RejectionKind::Other;
                counts.record_rejection(kind);
                ledger.push(
                    &spec.api_name,
                    local_key,
                    kind,
                    "MISSING_ID",
                    "platform reported success without an id",
                );
                InsertOutcome::Rejected {
                    kind,
                    status_code: "MISSING_ID".to_string(),
                    message: "platform reported success without an id".to_string(),
                }
            }
            (false, _) => {
                let (status_code, message) = result
                    .errors
                    .first()
                    .map(|e| (e.status_code.clone(), e.message.clone()))
                    .unwrap_or_else(|| ("UNKNOWN".to_string(), "no error detail".to_string()));
                let kind = RejectionKind::from_status_code(&status_code);
                counts.record_rejection(kind);
                ledger.push(&spec.api_name, local_key, kind, &status_code, &message);
                InsertOutcome::Rejected {
                    kind,
                    status_code,
                    message,
                }
            }
        }
    }

    async fn call_with_retry(
        &self,
        object: &str,
        payloads: Vec<Value>,
    ) -> Result<Vec<SaveResult>, TransportError> {
        let mut attempt = 1u32;
        let mut delay = self.retry.backoff;
        loop {
            match self.remote.insert(object, payloads.clone()).await {
                Ok(results) => return Ok(results),
                Err(err) => {
                    // Replaying a batch whose fate is unknown duplicates data
                    // unless the platform itself deduplicates.
                    if !self.retry.platform_duplicate_safe || attempt >= self.retry.max_attempts {
                        return Err(err);
                    }
                    tracing::warn!(
                        object,
                        attempt,
                        error = %err,
                        "transport failure, retrying batch"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
            }
        }
    }
}
