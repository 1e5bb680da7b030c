//! Error ledger and load report
//!
//! The ledger is the run's audit trail: one append-only entry per rejected
//! record, in submission order, never truncated mid-run. The report is the
//! externally consumed artifact: per-object counts plus the full ledger.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::RejectionKind;

/// One rejected record: which object, which local key, and why.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub object: String,
    pub local_key: String,
    pub kind: RejectionKind,
    pub status_code: String,
    pub message: String,
}

/// Append-only, ordered sequence of rejections for the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorLedger {
    entries: Vec<LedgerEntry>,
}

impl ErrorLedger {
    pub fn push(
        &mut self,
        object: &str,
        local_key: &str,
        kind: RejectionKind,
        status_code: &str,
        message: &str,
    ) {
        tracing::info!(object, local_key, code = status_code, message, "record rejected");
        self.entries.push(LedgerEntry {
            object: object.to_string(),
            local_key: local_key.to_string(),
            kind,
            status_code: status_code.to_string(),
            message: message.to_string(),
        });
    }

    pub fn append(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries_for<'a>(&'a self, object: &'a str) -> impl Iterator<Item = &'a LedgerEntry> + 'a {
        self.entries.iter().filter(move |e| e.object == object)
    }
}

/// Per-object outcome counts. The identity
/// `attempted == inserted + every rejection bucket` holds at all times.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ObjectCounts {
    pub attempted: usize,
    pub inserted: usize,
    pub rejected_by_schema: usize,
    pub rejected_by_constraint: usize,
    pub rejected_by_duplicate: usize,
    pub rejected_by_unresolved_reference: usize,
    pub rejected_other: usize,
}

impl ObjectCounts {
    pub fn record_rejection(&mut self, kind: RejectionKind) {
        match kind {
            RejectionKind::Schema => self.rejected_by_schema += 1,
            RejectionKind::Constraint => self.rejected_by_constraint += 1,
            RejectionKind::Duplicate => self.rejected_by_duplicate += 1,
            RejectionKind::UnresolvedReference => self.rejected_by_unresolved_reference += 1,
            RejectionKind::Other => self.rejected_other += 1,
        }
    }

    pub fn rejected_total(&self) -> usize {
        self.rejected_by_schema
            + self.rejected_by_constraint
            + self.rejected_by_duplicate
            + self.rejected_by_unresolved_reference
            + self.rejected_other
    }

    pub fn is_balanced(&self) -> bool {
        self.attempted == self.inserted + self.rejected_total()
    }

    /// Rejections that count against the run; duplicates are excluded
    /// because the state they protect already exists.
    pub fn run_failures(&self) -> usize {
        self.rejected_total() - self.rejected_by_duplicate
    }
}

/// Outcome summary for one object type in a run.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectReport {
    pub object: String,
    pub counts: ObjectCounts,
    /// False when a transport failure left the object type incomplete;
    /// dependents then degrade to unresolved references.
    pub completed: bool,
    /// True when the presence probe found the object already seeded and the
    /// directory was loaded from the platform instead.
    pub skipped_existing: bool,
}

impl ObjectReport {
    fn new(object: &str) -> Self {
        Self {
            object: object.to_string(),
            counts: ObjectCounts::default(),
            completed: false,
            skipped_existing: false,
        }
    }
}

/// The run's primary output artifact.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub objects: Vec<ObjectReport>,
    pub ledger: ErrorLedger,
}

impl LoadReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            objects: Vec::new(),
            ledger: ErrorLedger::default(),
        }
    }

    /// Report slot for an object type, created in run order on first access.
    pub fn object_mut(&mut self, object: &str) -> &mut ObjectReport {
        if let Some(idx) = self.objects.iter().position(|o| o.object == object) {
            &mut self.objects[idx]
        } else {
            self.objects.push(ObjectReport::new(object));
            self.objects.last_mut().expect("just pushed")
        }
    }

    pub fn counts(&self, object: &str) -> Option<&ObjectCounts> {
        self.objects
            .iter()
            .find(|o| o.object == object)
            .map(|o| &o.counts)
    }

    pub fn total_inserted(&self) -> usize {
        self.objects.iter().map(|o| o.counts.inserted).sum()
    }

    pub fn total_run_failures(&self) -> usize {
        self.objects.iter().map(|o| o.counts.run_failures()).sum()
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

impl Default for LoadReport {
    fn default() -> Self {
        Self::new()
    }
}
