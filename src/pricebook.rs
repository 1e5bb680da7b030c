//! Standard-price precedence guard
//!
//! The platform refuses a custom price-list entry for a product until the
//! standard price book holds an entry for it (`STANDARD_PRICE_NOT_DEFINED`).
//! The guard seeds the missing standard entries proactively, drawing each
//! price from the authored custom entry for that product when present.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde_json::Value;

use crate::batch::{BatchInserter, InsertOutcome, SubmittableRecord};
use crate::directory::ExternalKeyDirectory;
use crate::error::{LoaderError, RejectionKind};
use crate::ledger::{ErrorLedger, ObjectCounts};
use crate::object::ObjectSpec;
use crate::record::{FieldValue, RecordSet};
use crate::remote::{escape_soql_literal, RemoteApi};

/// What the guard did, for the run log and report.
#[derive(Debug, Clone, Default)]
pub struct GuardSummary {
    pub standard_pricebook_id: Option<String>,
    /// Standard entries inserted by the guard.
    pub seeded: usize,
    /// Products that already had a standard entry on the platform.
    pub already_present: usize,
    /// Seed inserts the platform rejected as duplicates; the invariant
    /// already holds for these, so they are informational skips.
    pub duplicate_skips: usize,
    /// Seed inserts that failed for any other reason.
    pub failures: usize,
}

pub struct PricebookPrecedenceGuard {
    /// Policy default when no authored custom entry names a price.
    pub default_unit_price: Decimal,
}

impl PricebookPrecedenceGuard {
    pub fn new(default_unit_price: Decimal) -> Self {
        Self { default_unit_price }
    }

    /// Ensure every product in `products` has a standard price-book entry.
    /// `products` is (local external key, remote id) per inserted product;
    /// `custom_entries` is the authored custom price-list dataset, used only
    /// as the fallback price source. Non-duplicate seed outcomes are folded
    /// into `counts` so the report and the ledger agree; duplicate skips
    /// stay informational and touch neither.
    pub async fn ensure_baseline(
        &self,
        remote: &dyn RemoteApi,
        inserter: &BatchInserter<'_>,
        products: &[(String, String)],
        custom_entries: &RecordSet,
        ledger: &mut ErrorLedger,
        counts: &mut ObjectCounts,
    ) -> Result<GuardSummary, LoaderError> {
        let mut summary = GuardSummary::default();
        if products.is_empty() {
            tracing::info!("no products loaded, standard price seeding skipped");
            return Ok(summary);
        }

        let std_rows = remote
            .query("SELECT Id FROM Pricebook2 WHERE IsStandard = true")
            .await
            .map_err(|source| LoaderError::Transport {
                object: "Pricebook2".to_string(),
                source,
            })?;
        let Some(std_id) = std_rows
            .first()
            .and_then(|row| row.get("Id"))
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            tracing::warn!("no standard price book found, standard price seeding skipped");
            return Ok(summary);
        };
        summary.standard_pricebook_id = Some(std_id.clone());

        // Products that already hold a standard entry must not be re-seeded.
        // If the probe fails we fall back to seeding everything and let the
        // platform's duplicate rejection sort it out.
        let existing = self.existing_standard_products(remote, &std_id).await;
        let prices = authored_prices(custom_entries);

        let mut seeds: Vec<SubmittableRecord> = Vec::new();
        for (ext_key, product_id) in products {
            if existing.contains(product_id.as_str()) {
                summary.already_present += 1;
                continue;
            }
            let unit_price = prices
                .get(ext_key.as_str())
                .copied()
                .unwrap_or(self.default_unit_price);
            seeds.push((
                ext_key.clone(),
                serde_json::json!({
                    "Product2Id": product_id,
                    "Pricebook2Id": std_id,
                    "UnitPrice": FieldValue::Number(unit_price).to_json(),
                    "IsActive": true,
                    "UseStandardPrice": false,
                }),
            ));
        }

        if seeds.is_empty() {
            tracing::info!(
                already_present = summary.already_present,
                "all products already have standard prices"
            );
            return Ok(summary);
        }

        // Seed through a scratch ledger: duplicate rejections are
        // success-equivalent here and must not surface as run failures.
        let seed_spec = ObjectSpec::new("PricebookEntry");
        let mut scratch_directory = ExternalKeyDirectory::new();
        let mut scratch_ledger = ErrorLedger::default();
        let mut scratch_counts = ObjectCounts::default();
        let outcomes = inserter
            .submit(
                &seed_spec,
                &seeds,
                &mut scratch_directory,
                &mut scratch_ledger,
                &mut scratch_counts,
            )
            .await?;

        for ((ext_key, _), outcome) in seeds.iter().zip(&outcomes) {
            match outcome {
                InsertOutcome::Inserted { .. } => {
                    summary.seeded += 1;
                    counts.attempted += 1;
                    counts.inserted += 1;
                }
                InsertOutcome::Rejected {
                    kind: RejectionKind::Duplicate,
                    ..
                } => {
                    tracing::info!(product = %ext_key, "standard price already defined, skipping");
                    summary.duplicate_skips += 1;
                }
                InsertOutcome::Rejected { kind, .. } => {
                    summary.failures += 1;
                    counts.attempted += 1;
                    counts.record_rejection(*kind);
                }
            }
        }
        for entry in scratch_ledger.entries() {
            if entry.kind != RejectionKind::Duplicate {
                ledger.append(entry.clone());
            }
        }

        tracing::info!(
            seeded = summary.seeded,
            already_present = summary.already_present,
            duplicate_skips = summary.duplicate_skips,
            failures = summary.failures,
            "standard price seeding complete"
        );
        Ok(summary)
    }

    async fn existing_standard_products(
        &self,
        remote: &dyn RemoteApi,
        std_pricebook_id: &str,
    ) -> HashSet<String> {
        let soql = format!(
            "SELECT Product2Id FROM PricebookEntry WHERE Pricebook2Id = '{}'",
            escape_soql_literal(std_pricebook_id)
        );
        match remote.query(&soql).await {
            Ok(rows) => rows
                .iter()
                .filter_map(|row| row.get("Product2Id").and_then(Value::as_str))
                .map(str::to_string)
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, "cannot probe existing standard prices, seeding all");
                HashSet::new()
            }
        }
    }
}

/// First authored unit price per product external key.
fn authored_prices(custom_entries: &RecordSet) -> HashMap<&str, Decimal> {
    let mut prices = HashMap::new();
    for record in custom_entries.iter() {
        let Some(ext_key) = record.field("ProductExtId__c").and_then(FieldValue::as_text) else {
            continue;
        };
        let Some(price) = record.field("UnitPrice").and_then(FieldValue::as_number) else {
            continue;
        };
        prices.entry(ext_key).or_insert(price);
    }
    prices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CandidateRecord;

    #[test]
    fn first_authored_price_wins_per_product() {
        let entries: RecordSet = vec![
            CandidateRecord::new("PBE-1")
                .with_text("ProductExtId__c", "RC-PROD-001")
                .with_field("UnitPrice", FieldValue::Number(Decimal::from(100))),
            CandidateRecord::new("PBE-2")
                .with_text("ProductExtId__c", "RC-PROD-001")
                .with_field("UnitPrice", FieldValue::Number(Decimal::from(250))),
        ]
        .into_iter()
        .collect();

        let prices = authored_prices(&entries);
        assert_eq!(prices.get("RC-PROD-001"), Some(&Decimal::from(100)));
    }

    #[test]
    fn records_without_price_are_ignored() {
        let entries: RecordSet = vec![CandidateRecord::new("PBE-1")
            .with_text("ProductExtId__c", "RC-PROD-002")]
        .into_iter()
        .collect();
        assert!(authored_prices(&entries).is_empty());
    }
}
