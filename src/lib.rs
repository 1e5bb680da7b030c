//! crm-seeder - relationally consistent CRM seed loading
//!
//! Loads a synthetic CRM dataset (accounts, contacts, opportunities, cases,
//! tasks, products, price books, feed items, notes, emails) into a
//! record-oriented REST platform with
//! strict per-object schema and referential constraints. The core is a
//! dependency-ordered, partially-failing insertion pipeline: foreign keys
//! are authored as local external keys and resolved against the remote
//! identifiers of already-loaded parents, drifted fields are filtered
//! client-side, and every exclusion lands in an auditable ledger.
//!
//! ## Pipeline
//! RecordSet -> resolve references -> whitelist fields -> batch insert
//! -> directory update -> next object type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crm_seeder::{run_full_load, RestClient, SeederConfig, Session};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let client = RestClient::new(Session::from_env()?)?;
//! let config = SeederConfig::default();
//! let specs = crm_seeder::standard_objects();
//! let datasets = crm_seeder::dataset::load_datasets(&config.data_dir, &specs)?;
//! let report = run_full_load(&client, config, &datasets).await;
//! println!("inserted {} records", report.total_inserted());
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Records and per-object configuration
pub mod object;
pub mod record;

// Loader core
pub mod batch;
pub mod content;
pub mod directory;
pub mod filter;
pub mod ledger;
pub mod orchestrator;
pub mod pricebook;
pub mod resolve;

// Remote platform seam and its REST implementation
pub mod remote;
pub mod rest;

// Run configuration and source datasets
pub mod config;
pub mod dataset;

// Public re-exports for the pipeline surface
pub use batch::{BatchInserter, InsertOutcome, RetryPolicy, MAX_BATCH_SIZE};
pub use config::SeederConfig;
pub use content::{ContentNoteLoader, ContentNoteSummary};
pub use directory::ExternalKeyDirectory;
pub use error::{DatasetError, LoaderError, RejectionKind, TransportError};
pub use ledger::{ErrorLedger, LedgerEntry, LoadReport, ObjectCounts, ObjectReport};
pub use object::{standard_objects, DedupeSpec, FieldKind, ObjectSpec, RelationSpec};
pub use orchestrator::{run_full_load, Datasets, LoadOrchestrator, LoadPhase};
pub use pricebook::{GuardSummary, PricebookPrecedenceGuard};
pub use record::{CandidateRecord, FieldMap, FieldValue, RecordSet};
pub use remote::{RemoteApi, SaveError, SaveResult};
pub use resolve::UnresolvedReference;
pub use rest::{RestClient, Session};
