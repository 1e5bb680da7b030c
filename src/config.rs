//! Runtime configuration for a seeding run.

use std::path::PathBuf;

use rust_decimal::Decimal;

use crate::batch::{RetryPolicy, MAX_BATCH_SIZE};

/// Knobs for one seeding run. Built by the CLI from arguments and
/// environment; defaults match the canonical single-org seed.
#[derive(Debug, Clone)]
pub struct SeederConfig {
    /// Directory holding the per-object CSV datasets.
    pub data_dir: PathBuf,
    /// Records per insertion call, capped at the platform maximum.
    pub batch_size: usize,
    /// Transport-level retry policy.
    pub retry: RetryPolicy,
    /// Query for already-seeded external keys before loading each object
    /// type, and skip the load (seeding the directory from the platform)
    /// when any are found.
    pub probe_existing: bool,
    /// External-key prefix identifying this dataset's records on the
    /// platform, used by the presence probe.
    pub key_prefix: String,
    /// Fallback unit price for standard price-book seeding.
    pub default_unit_price: Decimal,
}

impl Default for SeederConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            batch_size: MAX_BATCH_SIZE,
            retry: RetryPolicy::default(),
            probe_existing: false,
            key_prefix: "RC-".to_string(),
            default_unit_price: Decimal::ZERO,
        }
    }
}
