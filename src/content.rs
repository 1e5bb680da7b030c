//! Content note loading
//!
//! The platform has no direct note insert: a note is authored as a
//! ContentVersion (base64 body, `.snote` path), the platform derives a
//! ContentDocument from it, and a ContentDocumentLink ties that document to
//! the parent record. This loader drives the three steps per note and folds
//! every outcome into the run's ledger and counts under one object label.

use std::collections::HashSet;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;

use crate::batch::{BatchInserter, InsertOutcome, SubmittableRecord};
use crate::directory::ExternalKeyDirectory;
use crate::error::{LoaderError, RejectionKind};
use crate::ledger::{ErrorLedger, ObjectCounts};
use crate::object::ObjectSpec;
use crate::record::{CandidateRecord, FieldValue, RecordSet};
use crate::remote::{escape_soql_literal, RemoteApi};

const OBJECT: &str = "ContentNote";
const PARENT_OBJECTS: [&str; 3] = ["Account", "Opportunity", "Case"];

/// What the loader did, for the run log.
#[derive(Debug, Clone, Default)]
pub struct ContentNoteSummary {
    /// Notes created and linked to their parent.
    pub linked: usize,
    /// Notes skipped because the parent already carries linked content.
    pub skipped_existing: usize,
}

pub struct ContentNoteLoader {
    /// Probe ContentDocumentLink for parents that already have content and
    /// skip their notes instead of re-inserting.
    probe_existing_links: bool,
}

impl ContentNoteLoader {
    pub fn new(probe_existing_links: bool) -> Self {
        Self {
            probe_existing_links,
        }
    }

    /// Load every authored note: resolve its parent across the seeded parent
    /// types, insert the content version, query the derived document id, and
    /// link it. A note counts as inserted only once its link exists.
    pub async fn load(
        &self,
        remote: &dyn RemoteApi,
        inserter: &BatchInserter<'_>,
        notes: &RecordSet,
        directory: &ExternalKeyDirectory,
        ledger: &mut ErrorLedger,
        counts: &mut ObjectCounts,
    ) -> Result<ContentNoteSummary, LoaderError> {
        let mut summary = ContentNoteSummary::default();
        if notes.is_empty() {
            return Ok(summary);
        }

        // Resolve parents first; a note with no linkable parent is an
        // unresolved reference, never sent.
        let mut resolved: Vec<(String, String, Value)> = Vec::with_capacity(notes.len());
        for record in notes.iter() {
            counts.attempted += 1;
            match resolve_parent(record, directory) {
                Some(parent_id) => {
                    resolved.push((
                        record.local_key.clone(),
                        parent_id,
                        version_payload(record),
                    ));
                }
                None => {
                    counts.record_rejection(RejectionKind::UnresolvedReference);
                    ledger.push(
                        OBJECT,
                        &record.local_key,
                        RejectionKind::UnresolvedReference,
                        "UNRESOLVED_REFERENCE",
                        "no seeded parent for the note's related record key",
                    );
                }
            }
        }

        if self.probe_existing_links {
            let linked_parents = self.existing_linked_parents(remote, &resolved).await;
            resolved.retain(|(local_key, parent_id, _)| {
                if linked_parents.contains(parent_id.as_str()) {
                    summary.skipped_existing += 1;
                    counts.record_rejection(RejectionKind::Duplicate);
                    ledger.push(
                        OBJECT,
                        local_key,
                        RejectionKind::Duplicate,
                        "ALREADY_EXISTS",
                        "parent record already has linked content",
                    );
                    false
                } else {
                    true
                }
            });
        }

        if resolved.is_empty() {
            return Ok(summary);
        }

        // Step one: the content versions.
        let versions: Vec<SubmittableRecord> = resolved
            .iter()
            .map(|(local_key, _, payload)| (local_key.clone(), payload.clone()))
            .collect();
        let outcomes = self
            .submit_scratch(inserter, "ContentVersion", &versions)
            .await?;

        // Step two: one link per created version, via the derived document.
        let mut links: Vec<SubmittableRecord> = Vec::new();
        for ((local_key, parent_id, _), outcome) in resolved.iter().zip(&outcomes) {
            match outcome {
                InsertOutcome::Inserted { remote_id } => {
                    match self.document_id_for(remote, remote_id).await? {
                        Some(document_id) => {
                            links.push((
                                local_key.clone(),
                                serde_json::json!({
                                    "ContentDocumentId": document_id,
                                    "LinkedEntityId": parent_id,
                                    "ShareType": "V",
                                    "Visibility": "AllUsers",
                                }),
                            ));
                        }
                        None => {
                            counts.record_rejection(RejectionKind::Other);
                            ledger.push(
                                OBJECT,
                                local_key,
                                RejectionKind::Other,
                                "MISSING_CONTENT_DOCUMENT",
                                "content version created but no document derived",
                            );
                        }
                    }
                }
                InsertOutcome::Rejected {
                    kind,
                    status_code,
                    message,
                } => {
                    counts.record_rejection(*kind);
                    ledger.push(OBJECT, local_key, *kind, status_code, message);
                }
            }
        }

        if !links.is_empty() {
            let outcomes = self
                .submit_scratch(inserter, "ContentDocumentLink", &links)
                .await?;
            for ((local_key, _), outcome) in links.iter().zip(&outcomes) {
                match outcome {
                    InsertOutcome::Inserted { .. } => {
                        summary.linked += 1;
                        counts.inserted += 1;
                    }
                    InsertOutcome::Rejected {
                        kind,
                        status_code,
                        message,
                    } => {
                        counts.record_rejection(*kind);
                        ledger.push(OBJECT, local_key, *kind, status_code, message);
                    }
                }
            }
        }

        tracing::info!(
            linked = summary.linked,
            skipped = summary.skipped_existing,
            "content notes loaded"
        );
        Ok(summary)
    }

    /// Submit through scratch sinks; outcomes are re-reported by the caller
    /// under the note's own object label.
    async fn submit_scratch(
        &self,
        inserter: &BatchInserter<'_>,
        object: &str,
        records: &[SubmittableRecord],
    ) -> Result<Vec<InsertOutcome>, LoaderError> {
        let spec = ObjectSpec::new(object);
        let mut directory = ExternalKeyDirectory::new();
        let mut ledger = ErrorLedger::default();
        let mut counts = ObjectCounts::default();
        inserter
            .submit(&spec, records, &mut directory, &mut ledger, &mut counts)
            .await
    }

    async fn document_id_for(
        &self,
        remote: &dyn RemoteApi,
        version_id: &str,
    ) -> Result<Option<String>, LoaderError> {
        let soql = format!(
            "SELECT ContentDocumentId FROM ContentVersion WHERE Id = '{}'",
            escape_soql_literal(version_id)
        );
        let rows = remote
            .query(&soql)
            .await
            .map_err(|source| LoaderError::Transport {
                object: OBJECT.to_string(),
                source,
            })?;
        Ok(rows
            .first()
            .and_then(|row| row.get("ContentDocumentId"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Parents that already carry linked content. A failed probe degrades to
    /// seeding everything; the platform then reports any overlap.
    async fn existing_linked_parents(
        &self,
        remote: &dyn RemoteApi,
        resolved: &[(String, String, Value)],
    ) -> HashSet<String> {
        let parent_ids: HashSet<&str> = resolved.iter().map(|(_, id, _)| id.as_str()).collect();
        if parent_ids.is_empty() {
            return HashSet::new();
        }
        let in_list: Vec<String> = parent_ids
            .iter()
            .map(|id| format!("'{}'", escape_soql_literal(id)))
            .collect();
        let soql = format!(
            "SELECT LinkedEntityId FROM ContentDocumentLink WHERE LinkedEntityId IN ({})",
            in_list.join(",")
        );
        match remote.query(&soql).await {
            Ok(rows) => rows
                .iter()
                .filter_map(|row| row.get("LinkedEntityId").and_then(Value::as_str))
                .map(str::to_string)
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, "cannot probe existing content links, loading all notes");
                HashSet::new()
            }
        }
    }
}

fn resolve_parent(record: &CandidateRecord, directory: &ExternalKeyDirectory) -> Option<String> {
    let key = record
        .field("RelatedRecordExtId__c")
        .and_then(FieldValue::as_text)?;
    PARENT_OBJECTS
        .iter()
        .find_map(|object| directory.lookup(object, key))
        .map(str::to_string)
}

/// The ContentVersion payload that materializes one note.
fn version_payload(record: &CandidateRecord) -> Value {
    let title = record
        .field("Title")
        .and_then(FieldValue::as_text)
        .unwrap_or(&record.local_key);
    let body = record
        .field("Content")
        .and_then(FieldValue::as_text)
        .unwrap_or_default();
    serde_json::json!({
        "Title": title,
        "PathOnClient": "note.snote",
        "VersionData": BASE64.encode(body.as_bytes()),
        "ContentLocation": "S",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_payload_encodes_the_note_body() {
        let record = CandidateRecord::new("N-1")
            .with_text("Title", "Kickoff notes")
            .with_text("Content", "Discussed rollout plan");
        let payload = version_payload(&record);
        assert_eq!(payload["Title"], "Kickoff notes");
        assert_eq!(payload["PathOnClient"], "note.snote");
        assert_eq!(payload["VersionData"], "RGlzY3Vzc2VkIHJvbGxvdXQgcGxhbg==");
        assert_eq!(payload["ContentLocation"], "S");
    }

    #[test]
    fn parent_resolution_spans_the_seeded_parent_types() {
        let mut directory = ExternalKeyDirectory::new();
        directory.record("Opportunity", "RC-OPP-001", "006AAA");

        let on_opp = CandidateRecord::new("N-1").with_text("RelatedRecordExtId__c", "RC-OPP-001");
        assert_eq!(resolve_parent(&on_opp, &directory), Some("006AAA".to_string()));

        let orphan = CandidateRecord::new("N-2").with_text("RelatedRecordExtId__c", "RC-ACCT-404");
        assert_eq!(resolve_parent(&orphan, &directory), None);
    }
}
