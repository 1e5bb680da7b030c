//! Standard-price precedence behavior across a full price-catalog load: the
//! guard must seed missing standard entries before any custom price-list
//! entry reaches the platform.

mod common;

use common::MockRemote;
use rust_decimal::Decimal;
use serde_json::json;

use crm_seeder::{
    CandidateRecord, Datasets, FieldValue, LoadOrchestrator, ObjectSpec, SeederConfig,
};

fn catalog_specs() -> Vec<ObjectSpec> {
    crm_seeder::standard_objects()
        .into_iter()
        .filter(|spec| {
            matches!(
                spec.api_name.as_str(),
                "Product2" | "Pricebook2" | "PricebookEntry"
            )
        })
        .collect()
}

fn catalog_datasets() -> Datasets {
    let mut datasets = Datasets::new();
    datasets.insert(
        "Product2".to_string(),
        vec![
            CandidateRecord::new("RC-PROD-001").with_text("Name", "Widget"),
            CandidateRecord::new("RC-PROD-002").with_text("Name", "Sprocket"),
        ]
        .into_iter()
        .collect(),
    );
    datasets.insert(
        "Pricebook2".to_string(),
        vec![CandidateRecord::new("RC-PB-001").with_text("Name", "Enterprise")]
            .into_iter()
            .collect(),
    );
    datasets.insert(
        "PricebookEntry".to_string(),
        vec![
            CandidateRecord::new("RC-PBE-001")
                .with_text("ProductExtId__c", "RC-PROD-001")
                .with_text("Pricebook2ExtId__c", "RC-PB-001")
                .with_field("UnitPrice", FieldValue::Number(Decimal::from(100))),
            CandidateRecord::new("RC-PBE-002")
                .with_text("ProductExtId__c", "RC-PROD-002")
                .with_text("Pricebook2ExtId__c", "RC-PB-001")
                .with_field("UnitPrice", FieldValue::Number(Decimal::from(250))),
        ]
        .into_iter()
        .collect(),
    );
    datasets
}

// Products insert first (ids ID00001, ID00002), then the custom price book
// (ID00003). The platform already holds a standard entry for the first
// product, so only the second needs seeding.
#[tokio::test]
async fn guard_seeds_only_missing_products_before_custom_entries() {
    let remote = MockRemote::new()
        .with_query("IsStandard = true", vec![json!({ "Id": "01sSTD" })])
        .with_query(
            "Product2Id FROM PricebookEntry",
            vec![json!({ "Product2Id": "ID00001" })],
        );

    let orchestrator = LoadOrchestrator::new(&remote, SeederConfig::default());
    let report = orchestrator.run(&catalog_specs(), &catalog_datasets()).await;

    let calls = remote.calls_for("PricebookEntry");
    assert_eq!(calls.len(), 2, "one seed batch, then the custom entries");

    // Seed batch: only the product with no standard entry, priced from its
    // authored custom entry, into the standard price book.
    assert_eq!(calls[0].payloads.len(), 1);
    let seed = &calls[0].payloads[0];
    assert_eq!(seed["Product2Id"], json!("ID00002"));
    assert_eq!(seed["Pricebook2Id"], json!("01sSTD"));
    assert_eq!(seed["UnitPrice"], json!(250.0));
    assert_eq!(seed["UseStandardPrice"], json!(false));

    // Custom entries follow, resolved into the custom price book.
    assert_eq!(calls[1].payloads.len(), 2);
    for payload in &calls[1].payloads {
        assert_eq!(payload["Pricebook2Id"], json!("ID00003"));
    }

    // The seed counts alongside the two custom entries, so the report's
    // identity covers everything the guard put on the wire.
    let entries = report.counts("PricebookEntry").unwrap();
    assert_eq!(entries.attempted, 3);
    assert_eq!(entries.inserted, 3);
    assert!(entries.is_balanced());
    assert!(report.ledger.is_empty());
}

#[tokio::test]
async fn duplicate_seed_rejections_are_informational() {
    // No existing-entries probe data, so the guard seeds both products; the
    // platform answers that the standard prices are already defined.
    let remote = MockRemote::new()
        .with_query("IsStandard = true", vec![json!({ "Id": "01sSTD" })])
        .push_rejection(
            "PricebookEntry",
            "DUPLICATES_DETECTED",
            "standard price already defined",
        );

    let orchestrator = LoadOrchestrator::new(&remote, SeederConfig::default());
    let report = orchestrator.run(&catalog_specs(), &catalog_datasets()).await;

    let calls = remote.calls_for("PricebookEntry");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].payloads.len(), 2, "both products seeded");

    // The duplicate rejections never surface: not in the ledger, not in the
    // run-failure total, and the custom entries load normally.
    assert_eq!(report.ledger.entries_for("PricebookEntry").count(), 0);
    assert_eq!(report.total_run_failures(), 0);
    assert_eq!(report.counts("PricebookEntry").unwrap().inserted, 2);
}

#[tokio::test]
async fn failed_seeds_surface_in_both_counts_and_ledger() {
    // Both seeds go out (no existing-entries data) and the platform rejects
    // them for a reason other than duplication.
    let remote = MockRemote::new()
        .with_query("IsStandard = true", vec![json!({ "Id": "01sSTD" })])
        .push_rejection(
            "PricebookEntry",
            "FIELD_INTEGRITY_EXCEPTION",
            "product is not active",
        );

    let orchestrator = LoadOrchestrator::new(&remote, SeederConfig::default());
    let report = orchestrator.run(&catalog_specs(), &catalog_datasets()).await;

    let entries = report.counts("PricebookEntry").unwrap();
    assert_eq!(entries.attempted, 4, "two failed seeds plus two custom entries");
    assert_eq!(entries.inserted, 2);
    assert_eq!(entries.rejected_by_constraint, 2);
    assert!(entries.is_balanced());
    assert_eq!(report.ledger.entries_for("PricebookEntry").count(), 2);
    assert_eq!(report.total_run_failures(), 2);
}

#[tokio::test]
async fn rerun_skips_entries_whose_combination_already_exists() {
    // Second run: products and the custom price book are recovered from the
    // platform, every standard price exists, and one of the two custom
    // combinations is already present.
    let remote = MockRemote::new()
        .with_query(
            "FROM Product2 WHERE ProductExtId__c LIKE 'RC-%'",
            vec![
                json!({ "Id": "01tAAA", "ProductExtId__c": "RC-PROD-001" }),
                json!({ "Id": "01tBBB", "ProductExtId__c": "RC-PROD-002" }),
            ],
        )
        .with_query(
            "FROM Pricebook2 WHERE Pricebook2ExtId__c LIKE 'RC-%'",
            vec![json!({ "Id": "01sCUST", "Pricebook2ExtId__c": "RC-PB-001" })],
        )
        .with_query("IsStandard = true", vec![json!({ "Id": "01sSTD" })])
        .with_query(
            "WHERE Pricebook2Id = '01sSTD'",
            vec![
                json!({ "Product2Id": "01tAAA" }),
                json!({ "Product2Id": "01tBBB" }),
            ],
        )
        .with_query(
            "FROM PricebookEntry WHERE Product2Id IN",
            vec![json!({ "Product2Id": "01tAAA", "Pricebook2Id": "01sCUST" })],
        );
    let config = SeederConfig {
        probe_existing: true,
        ..SeederConfig::default()
    };

    let orchestrator = LoadOrchestrator::new(&remote, config);
    let report = orchestrator.run(&catalog_specs(), &catalog_datasets()).await;

    // Only the combination the platform does not know yet goes out.
    let calls = remote.calls_for("PricebookEntry");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].payloads.len(), 1);
    assert_eq!(calls[0].payloads[0]["Product2Id"], json!("01tBBB"));

    let entries = report.counts("PricebookEntry").unwrap();
    assert_eq!(entries.attempted, 2);
    assert_eq!(entries.inserted, 1);
    assert_eq!(entries.rejected_by_duplicate, 1);
    assert_eq!(entries.run_failures(), 0);
    let skipped = report
        .ledger
        .entries_for("PricebookEntry")
        .next()
        .expect("skip recorded");
    assert_eq!(skipped.status_code, "ALREADY_EXISTS");
}

#[tokio::test]
async fn missing_standard_pricebook_skips_seeding_but_not_the_load() {
    // The standard price-book query answers nothing, so there is nowhere to
    // seed; custom entries still go out as authored.
    let remote = MockRemote::new();

    let orchestrator = LoadOrchestrator::new(&remote, SeederConfig::default());
    let report = orchestrator.run(&catalog_specs(), &catalog_datasets()).await;

    let calls = remote.calls_for("PricebookEntry");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].payloads.len(), 2);
    assert_eq!(report.counts("PricebookEntry").unwrap().inserted, 2);
}
