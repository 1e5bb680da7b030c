//! Activity record loading: feed items and email messages attach to one
//! undiscriminated parent column, and content notes ride the two-step
//! version-then-link flow.

mod common;

use common::MockRemote;
use serde_json::json;

use crm_seeder::{CandidateRecord, Datasets, LoadOrchestrator, ObjectSpec, SeederConfig};

fn subset(names: &[&str]) -> Vec<ObjectSpec> {
    crm_seeder::standard_objects()
        .into_iter()
        .filter(|spec| names.contains(&spec.api_name.as_str()))
        .collect()
}

#[tokio::test]
async fn activity_parents_resolve_across_parent_types() {
    let remote = MockRemote::new();
    let mut datasets = Datasets::new();
    datasets.insert(
        "Account".to_string(),
        vec![CandidateRecord::new("RC-ACCT-001").with_text("Name", "Globex")]
            .into_iter()
            .collect(),
    );
    datasets.insert(
        "Opportunity".to_string(),
        vec![CandidateRecord::new("RC-OPP-001")
            .with_text("Name", "Globex Renewal")
            .with_text("StageName", "Negotiation")
            .with_text("AccountExtId__c", "RC-ACCT-001")]
        .into_iter()
        .collect(),
    );
    datasets.insert(
        "FeedItem".to_string(),
        vec![
            CandidateRecord::new("Account update")
                .with_text("Title", "Account update")
                .with_text("Body", "Globex went live")
                .with_text("ParentExtId__c", "RC-ACCT-001"),
            CandidateRecord::new("Renewal risk")
                .with_text("Title", "Renewal risk")
                .with_text("Body", "Champion left")
                .with_text("ParentExtId__c", "RC-OPP-001"),
            CandidateRecord::new("Orphan post")
                .with_text("Title", "Orphan post")
                .with_text("ParentExtId__c", "RC-CASE-404"),
        ]
        .into_iter()
        .collect(),
    );
    datasets.insert(
        "EmailMessage".to_string(),
        vec![CandidateRecord::new("Renewal terms")
            .with_text("Subject", "Renewal terms")
            .with_text("TextBody", "Attached are the renewal terms.")
            .with_text("ParentExtId__c", "RC-OPP-001")]
        .into_iter()
        .collect(),
    );

    let orchestrator = LoadOrchestrator::new(&remote, SeederConfig::default());
    let report = orchestrator
        .run(
            &subset(&["Account", "Opportunity", "FeedItem", "EmailMessage"]),
            &datasets,
        )
        .await;

    // Account -> ID00001, Opportunity -> ID00002; each activity payload
    // carries the resolved parent id, never the authored key column.
    let feed_calls = remote.calls_for("FeedItem");
    assert_eq!(feed_calls.len(), 1);
    assert_eq!(feed_calls[0].payloads.len(), 2);
    assert_eq!(feed_calls[0].payloads[0]["ParentId"], json!("ID00001"));
    assert_eq!(feed_calls[0].payloads[1]["ParentId"], json!("ID00002"));
    assert_eq!(feed_calls[0].payloads[0].get("ParentExtId__c"), None);

    let email_calls = remote.calls_for("EmailMessage");
    assert_eq!(email_calls.len(), 1);
    assert_eq!(email_calls[0].payloads[0]["ParentId"], json!("ID00002"));

    let feed = report.counts("FeedItem").unwrap();
    assert_eq!(feed.attempted, 3);
    assert_eq!(feed.inserted, 2);
    assert_eq!(feed.rejected_by_unresolved_reference, 1);
    assert!(feed.is_balanced());

    let orphan = report
        .ledger
        .entries_for("FeedItem")
        .next()
        .expect("orphan recorded");
    assert_eq!(orphan.local_key, "Orphan post");
}

#[tokio::test]
async fn content_notes_insert_a_version_then_link_the_document() {
    let remote = MockRemote::new().with_query(
        "ContentDocumentId FROM ContentVersion",
        vec![json!({ "ContentDocumentId": "069DOC" })],
    );
    let mut datasets = Datasets::new();
    datasets.insert(
        "Account".to_string(),
        vec![CandidateRecord::new("RC-ACCT-001").with_text("Name", "Globex")]
            .into_iter()
            .collect(),
    );
    datasets.insert(
        "ContentNote".to_string(),
        vec![
            CandidateRecord::new("Kickoff")
                .with_text("Title", "Kickoff")
                .with_text("Content", "Notes body")
                .with_text("RelatedRecordExtId__c", "RC-ACCT-001"),
            CandidateRecord::new("Unattached")
                .with_text("Title", "Unattached")
                .with_text("Content", "No parent survived")
                .with_text("RelatedRecordExtId__c", "RC-OPP-404"),
        ]
        .into_iter()
        .collect(),
    );

    let orchestrator = LoadOrchestrator::new(&remote, SeederConfig::default());
    let report = orchestrator
        .run(&subset(&["Account", "ContentNote"]), &datasets)
        .await;

    // One version for the resolvable note, base64 body and note path set.
    let version_calls = remote.calls_for("ContentVersion");
    assert_eq!(version_calls.len(), 1);
    assert_eq!(version_calls[0].payloads.len(), 1);
    let version = &version_calls[0].payloads[0];
    assert_eq!(version["Title"], json!("Kickoff"));
    assert_eq!(version["PathOnClient"], json!("note.snote"));
    assert_eq!(version["VersionData"], json!("Tm90ZXMgYm9keQ=="));

    // The derived document is linked to the account's remote id.
    let link_calls = remote.calls_for("ContentDocumentLink");
    assert_eq!(link_calls.len(), 1);
    let link = &link_calls[0].payloads[0];
    assert_eq!(link["ContentDocumentId"], json!("069DOC"));
    assert_eq!(link["LinkedEntityId"], json!("ID00001"));
    assert_eq!(link["ShareType"], json!("V"));

    let notes = report.counts("ContentNote").unwrap();
    assert_eq!(notes.attempted, 2);
    assert_eq!(notes.inserted, 1);
    assert_eq!(notes.rejected_by_unresolved_reference, 1);
    assert!(notes.is_balanced());
    assert_eq!(
        report
            .ledger
            .entries_for("ContentNote")
            .next()
            .unwrap()
            .local_key,
        "Unattached"
    );
}

#[tokio::test]
async fn notes_skip_parents_that_already_carry_content() {
    let remote = MockRemote::new()
        .with_query(
            "FROM Account WHERE AccountExtId__c LIKE 'RC-%'",
            vec![json!({ "Id": "001EXIST", "AccountExtId__c": "RC-ACCT-001" })],
        )
        .with_query(
            "FROM ContentDocumentLink WHERE LinkedEntityId IN",
            vec![json!({ "LinkedEntityId": "001EXIST" })],
        );
    let mut datasets = Datasets::new();
    datasets.insert(
        "Account".to_string(),
        vec![CandidateRecord::new("RC-ACCT-001").with_text("Name", "Globex")]
            .into_iter()
            .collect(),
    );
    datasets.insert(
        "ContentNote".to_string(),
        vec![CandidateRecord::new("Kickoff")
            .with_text("Title", "Kickoff")
            .with_text("Content", "Notes body")
            .with_text("RelatedRecordExtId__c", "RC-ACCT-001")]
        .into_iter()
        .collect(),
    );
    let config = SeederConfig {
        probe_existing: true,
        ..SeederConfig::default()
    };

    let orchestrator = LoadOrchestrator::new(&remote, config);
    let report = orchestrator
        .run(&subset(&["Account", "ContentNote"]), &datasets)
        .await;

    assert!(remote.calls_for("ContentVersion").is_empty());
    assert!(remote.calls_for("ContentDocumentLink").is_empty());

    let notes = report.counts("ContentNote").unwrap();
    assert_eq!(notes.attempted, 1);
    assert_eq!(notes.rejected_by_duplicate, 1);
    assert_eq!(notes.inserted, 0);
    assert_eq!(notes.run_failures(), 0);
}
