//! Load orchestration
//!
//! Drives the pipeline across object types in their declared dependency
//! order. Object types later in the order resolve against a directory that
//! only holds keys of completed types, so the strict sequence is what makes
//! foreign key resolution sound. A single object type's partial failure
//! never halts the run; only its own transport failure leaves it incomplete,
//! and dependents then degrade record-by-record to unresolved references.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::batch::{BatchInserter, SubmittableRecord};
use crate::config::SeederConfig;
use crate::content::ContentNoteLoader;
use crate::directory::ExternalKeyDirectory;
use crate::error::{RejectionKind, TransportError};
use crate::filter::filter_outgoing;
use crate::ledger::{ErrorLedger, LoadReport, ObjectCounts};
use crate::object::{DedupeSpec, ObjectSpec};
use crate::pricebook::PricebookPrecedenceGuard;
use crate::record::{to_payload, RecordSet};
use crate::remote::{escape_soql_literal, RemoteApi};
use crate::resolve::resolve_relations;

/// Per-object pipeline phase within a run. No object type re-enters
/// `Pending` once it has left it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Pending,
    Filtering,
    Resolving,
    Submitted,
    Completed,
}

/// Source datasets keyed by object API name.
pub type Datasets = HashMap<String, RecordSet>;

pub struct LoadOrchestrator<'a> {
    remote: &'a dyn RemoteApi,
    config: SeederConfig,
}

impl<'a> LoadOrchestrator<'a> {
    pub fn new(remote: &'a dyn RemoteApi, config: SeederConfig) -> Self {
        Self { remote, config }
    }

    /// Run the full pipeline over `specs` in order. Always returns a report;
    /// a non-empty ledger is a normal operating mode, not a failure.
    pub async fn run(&self, specs: &[ObjectSpec], datasets: &Datasets) -> LoadReport {
        let mut report = LoadReport::new();
        let mut directory = ExternalKeyDirectory::new();
        let inserter = BatchInserter::new(self.remote)
            .with_retry(self.config.retry.clone())
            .with_batch_size(self.config.batch_size);
        let guard = PricebookPrecedenceGuard::new(self.config.default_unit_price);

        tracing::info!(run_id = %report.run_id, objects = specs.len(), "seed run starting");

        for spec in specs {
            // The platform requires standard prices before any custom
            // price-list entry, so the guard runs right before that load.
            if spec.api_name == "PricebookEntry" {
                let products = directory.entries_for("Product2");
                let custom = datasets.get(&spec.api_name).cloned().unwrap_or_default();
                let mut ledger = std::mem::take(&mut report.ledger);
                let mut counts = ObjectCounts::default();
                match guard
                    .ensure_baseline(
                        self.remote,
                        &inserter,
                        &products,
                        &custom,
                        &mut ledger,
                        &mut counts,
                    )
                    .await
                {
                    Ok(summary) => {
                        tracing::info!(
                            seeded = summary.seeded,
                            skipped = summary.duplicate_skips + summary.already_present,
                            "precedence guard finished"
                        );
                    }
                    Err(err) => {
                        // Custom entries will surface the violation as
                        // constraint rejections; keep going.
                        tracing::error!(error = %err, "precedence guard failed");
                    }
                }
                report.ledger = ledger;
                report.object_mut(&spec.api_name).counts = counts;
            }

            if spec.api_name == "ContentNote" {
                self.load_content_notes(spec, datasets, &inserter, &directory, &mut report)
                    .await;
                continue;
            }

            self.load_object(spec, datasets, &inserter, &mut directory, &mut report)
                .await;
        }

        report.finish();
        tracing::info!(
            run_id = %report.run_id,
            inserted = report.total_inserted(),
            failures = report.total_run_failures(),
            "seed run finished"
        );
        report
    }

    async fn load_object(
        &self,
        spec: &ObjectSpec,
        datasets: &Datasets,
        inserter: &BatchInserter<'_>,
        directory: &mut ExternalKeyDirectory,
        report: &mut LoadReport,
    ) {
        let object = spec.api_name.as_str();
        report.object_mut(object);

        if self.config.probe_existing && spec.external_key_field.is_some() {
            match self.probe_existing(spec, directory).await {
                Ok(found) if found > 0 => {
                    tracing::info!(object, found, "already seeded, directory loaded from platform");
                    let entry = report.object_mut(object);
                    entry.skipped_existing = true;
                    entry.completed = true;
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(object, error = %err, "presence probe failed, loading anyway");
                }
            }
        }

        let Some(dataset) = datasets.get(object) else {
            tracing::debug!(object, "no dataset, nothing to load");
            report.object_mut(object).completed = true;
            return;
        };

        let mut phase = LoadPhase::Filtering;
        tracing::debug!(object, records = dataset.len(), ?phase, "load starting");

        // Resolution failures are partitioned out here: recorded in the
        // ledger, excluded from the batch, never silently dropped.
        phase = LoadPhase::Resolving;
        tracing::debug!(object, ?phase, "resolving references");
        let mut counts = report.counts(object).copied().unwrap_or_default();
        let mut ledger = std::mem::take(&mut report.ledger);
        let mut submittable: Vec<SubmittableRecord> = Vec::with_capacity(dataset.len());
        for record in dataset.iter() {
            counts.attempted += 1;
            match resolve_relations(spec, record, directory) {
                Ok(resolved) => {
                    let outgoing = filter_outgoing(spec, &resolved);
                    submittable.push((record.local_key.clone(), to_payload(&outgoing)));
                }
                Err(unresolved) => {
                    counts.record_rejection(RejectionKind::UnresolvedReference);
                    ledger.push(
                        object,
                        &record.local_key,
                        RejectionKind::UnresolvedReference,
                        "UNRESOLVED_REFERENCE",
                        &unresolved.to_string(),
                    );
                }
            }
        }

        // Non-keyed objects dedupe per record: the presence probe cannot see
        // them, so an alternate-key query decides which records to skip.
        if self.config.probe_existing {
            if let Some(dedupe) = &spec.dedupe {
                submittable = self
                    .dedupe_submittable(spec, dedupe, submittable, &mut ledger, &mut counts)
                    .await;
            }
        }

        phase = LoadPhase::Submitted;
        tracing::debug!(object, submitting = submittable.len(), ?phase, "resolution done");
        let completed = match inserter
            .submit(spec, &submittable, directory, &mut ledger, &mut counts)
            .await
        {
            Ok(_) => true,
            Err(err) => {
                // Outcomes merged before the failing batch stay merged; the
                // un-returned batch contributes nothing. Dependents fail
                // per-record as unresolved references, which is the accepted
                // degraded outcome. Records with no returned outcome do not
                // count as attempted, keeping the count identity intact.
                counts.attempted = counts.inserted + counts.rejected_total();
                tracing::error!(object, error = %err, "object type left incomplete");
                false
            }
        };

        let entry = report.object_mut(object);
        entry.counts = counts;
        entry.completed = completed;
        report.ledger = ledger;
        if completed {
            phase = LoadPhase::Completed;
            tracing::debug!(object, ?phase, "load finished");
        }
    }

    async fn load_content_notes(
        &self,
        spec: &ObjectSpec,
        datasets: &Datasets,
        inserter: &BatchInserter<'_>,
        directory: &ExternalKeyDirectory,
        report: &mut LoadReport,
    ) {
        let object = spec.api_name.as_str();
        report.object_mut(object);

        let Some(dataset) = datasets.get(object) else {
            tracing::debug!(object, "no dataset, nothing to load");
            report.object_mut(object).completed = true;
            return;
        };

        let loader = ContentNoteLoader::new(self.config.probe_existing);
        let mut counts = report.counts(object).copied().unwrap_or_default();
        let mut ledger = std::mem::take(&mut report.ledger);
        let completed = match loader
            .load(self.remote, inserter, dataset, directory, &mut ledger, &mut counts)
            .await
        {
            Ok(_) => true,
            Err(err) => {
                counts.attempted = counts.inserted + counts.rejected_total();
                tracing::error!(object, error = %err, "object type left incomplete");
                false
            }
        };

        let entry = report.object_mut(object);
        entry.counts = counts;
        entry.completed = completed;
        report.ledger = ledger;
    }

    /// Drop records whose alternate key already exists on the platform.
    /// A failed probe degrades to loading everything.
    async fn dedupe_submittable(
        &self,
        spec: &ObjectSpec,
        dedupe: &DedupeSpec,
        submittable: Vec<SubmittableRecord>,
        ledger: &mut ErrorLedger,
        counts: &mut ObjectCounts,
    ) -> Vec<SubmittableRecord> {
        if submittable.is_empty() {
            return submittable;
        }
        let existing = match self.query_existing(spec, dedupe, &submittable).await {
            Ok(existing) => existing,
            Err(err) => {
                tracing::warn!(
                    object = %spec.api_name,
                    error = %err,
                    "dedupe probe failed, loading without rerun protection"
                );
                return submittable;
            }
        };
        if existing.is_empty() {
            return submittable;
        }

        let mut kept = Vec::with_capacity(submittable.len());
        for (local_key, payload) in submittable {
            let already_present = dedupe_key(&payload, dedupe)
                .map_or(false, |key| existing.contains(&key));
            if already_present {
                counts.record_rejection(RejectionKind::Duplicate);
                ledger.push(
                    &spec.api_name,
                    &local_key,
                    RejectionKind::Duplicate,
                    "ALREADY_EXISTS",
                    "record already present on the platform",
                );
            } else {
                kept.push((local_key, payload));
            }
        }
        kept
    }

    async fn query_existing(
        &self,
        spec: &ObjectSpec,
        dedupe: &DedupeSpec,
        submittable: &[SubmittableRecord],
    ) -> Result<HashSet<Vec<String>>, TransportError> {
        let soql = match dedupe {
            DedupeSpec::ByField { field } => {
                let values = distinct_values(submittable, field);
                if values.is_empty() {
                    return Ok(HashSet::new());
                }
                format!(
                    "SELECT {field} FROM {} WHERE {field} IN ({})",
                    spec.api_name,
                    in_list(&values)
                )
            }
            DedupeSpec::ByFieldPair { first, second } => {
                let firsts = distinct_values(submittable, first);
                let seconds = distinct_values(submittable, second);
                if firsts.is_empty() || seconds.is_empty() {
                    return Ok(HashSet::new());
                }
                format!(
                    "SELECT {first}, {second} FROM {} WHERE {first} IN ({}) AND {second} IN ({})",
                    spec.api_name,
                    in_list(&firsts),
                    in_list(&seconds)
                )
            }
        };

        let rows = self.remote.query(&soql).await?;
        let mut existing = HashSet::new();
        for row in &rows {
            if let Some(key) = dedupe_key(row, dedupe) {
                existing.insert(key);
            }
        }
        Ok(existing)
    }

    /// Query the platform for keys already carrying this run's prefix and
    /// seed the directory from the survivors of a prior run.
    async fn probe_existing(
        &self,
        spec: &ObjectSpec,
        directory: &mut ExternalKeyDirectory,
    ) -> Result<usize, TransportError> {
        let ext = spec
            .external_key_field
            .as_deref()
            .expect("probe requires an external-key field");
        let soql = format!(
            "SELECT Id, {ext} FROM {} WHERE {ext} LIKE '{}%'",
            spec.api_name,
            escape_soql_literal(&self.config.key_prefix)
        );
        let rows = self.remote.query(&soql).await?;
        for row in &rows {
            let id = row.get("Id").and_then(serde_json::Value::as_str);
            let key = row.get(ext).and_then(serde_json::Value::as_str);
            if let (Some(id), Some(key)) = (id, key) {
                directory.record(&spec.api_name, key, id);
            }
        }
        Ok(rows.len())
    }
}

/// The outgoing alternate-key value(s) of one payload; `None` when a key
/// field is absent (such records are never treated as already present).
fn dedupe_key(payload: &Value, dedupe: &DedupeSpec) -> Option<Vec<String>> {
    let text = |field: &str| {
        payload
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    match dedupe {
        DedupeSpec::ByField { field } => Some(vec![text(field)?]),
        DedupeSpec::ByFieldPair { first, second } => Some(vec![text(first)?, text(second)?]),
    }
}

fn distinct_values(submittable: &[SubmittableRecord], field: &str) -> Vec<String> {
    let mut values: Vec<String> = submittable
        .iter()
        .filter_map(|(_, payload)| payload.get(field).and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    values.sort();
    values.dedup();
    values
}

fn in_list(values: &[String]) -> String {
    values
        .iter()
        .map(|value| format!("'{}'", escape_soql_literal(value)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Convenience wrapper: run the standard object set against `datasets`.
pub async fn run_full_load(
    remote: &dyn RemoteApi,
    config: SeederConfig,
    datasets: &Datasets,
) -> LoadReport {
    let specs = crate::object::standard_objects();
    let orchestrator = LoadOrchestrator::new(remote, config);
    orchestrator.run(&specs, datasets).await
}
