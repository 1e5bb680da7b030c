//! Seed loader CLI
//!
//! Loads the CSV datasets into the target org and prints the per-object
//! load report. Expects an authenticated session in the environment
//! (`SEED_ACCESS_TOKEN`, `SEED_INSTANCE_URL`); see `--help` for the rest.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rust_decimal::Decimal;

use crm_seeder::{
    dataset, run_full_load, LoadReport, RestClient, RetryPolicy, SeederConfig, Session,
    MAX_BATCH_SIZE,
};

#[derive(Parser, Debug)]
#[command(
    name = "seeder_cli",
    about = "Load synthetic CRM seed data into a scratch org via the REST API"
)]
struct Args {
    /// Directory holding the per-object CSV datasets
    #[arg(long, env = "SEED_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Records per insertion call (platform maximum 200)
    #[arg(long, env = "SEED_BATCH_SIZE", default_value_t = MAX_BATCH_SIZE)]
    batch_size: usize,

    /// Skip object types whose external keys with this prefix already exist
    #[arg(long, env = "SEED_PROBE_EXISTING")]
    probe_existing: bool,

    /// External-key prefix identifying this dataset's records
    #[arg(long, env = "SEED_KEY_PREFIX", default_value = "RC-")]
    key_prefix: String,

    /// Attempts per batch on transport failure (only honored with
    /// --duplicate-safe; per-record rejections are never retried)
    #[arg(long, env = "SEED_RETRY_ATTEMPTS", default_value_t = 1)]
    retry_attempts: u32,

    /// Initial retry backoff in milliseconds, doubled per attempt
    #[arg(long, env = "SEED_RETRY_BACKOFF_MS", default_value_t = 2000)]
    retry_backoff_ms: u64,

    /// Declare that the platform deduplicates replayed batches, allowing
    /// transport-level retries
    #[arg(long, env = "SEED_DUPLICATE_SAFE")]
    duplicate_safe: bool,

    /// Fallback unit price for standard price-book seeding
    #[arg(long, env = "SEED_DEFAULT_UNIT_PRICE", default_value = "0")]
    default_unit_price: Decimal,

    /// Write the full report as JSON to this path
    #[arg(long)]
    report_json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("crm_seeder=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let session = Session::from_env()?;
    tracing::info!(instance = %session.instance_url, "session ready");
    let client = RestClient::new(session)?;

    let config = SeederConfig {
        data_dir: args.data_dir.clone(),
        batch_size: args.batch_size,
        retry: RetryPolicy {
            max_attempts: args.retry_attempts,
            backoff: Duration::from_millis(args.retry_backoff_ms),
            platform_duplicate_safe: args.duplicate_safe,
        },
        probe_existing: args.probe_existing,
        key_prefix: args.key_prefix.clone(),
        default_unit_price: args.default_unit_price,
    };

    let specs = crm_seeder::standard_objects();
    let datasets = dataset::load_datasets(&config.data_dir, &specs)?;
    let report = run_full_load(&client, config, &datasets).await;

    print_report(&report);

    if let Some(path) = args.report_json {
        std::fs::write(&path, serde_json::to_vec_pretty(&report)?)?;
        println!("report written to {}", path.display());
    }

    Ok(())
}

fn print_report(report: &LoadReport) {
    println!("run {}", report.run_id);
    println!("{:-<72}", "");
    for object in &report.objects {
        let c = &object.counts;
        let status = if object.skipped_existing {
            "skipped (already seeded)"
        } else if !object.completed {
            "INCOMPLETE (transport failure)"
        } else if c.run_failures() == 0 {
            "ok"
        } else {
            "partial"
        };
        println!(
            "{:<16} attempted {:>5}  inserted {:>5}  schema {:>3}  constraint {:>3}  duplicate {:>3}  unresolved {:>3}  other {:>3}  [{status}]",
            object.object,
            c.attempted,
            c.inserted,
            c.rejected_by_schema,
            c.rejected_by_constraint,
            c.rejected_by_duplicate,
            c.rejected_by_unresolved_reference,
            c.rejected_other,
        );
    }
    println!("{:-<72}", "");
    println!(
        "total inserted {}, run failures {}, ledger entries {}",
        report.total_inserted(),
        report.total_run_failures(),
        report.ledger.len()
    );
    if !report.ledger.is_empty() {
        println!("first rejections:");
        for entry in report.ledger.entries().iter().take(5) {
            println!(
                "  {} {}: {}: {}",
                entry.object, entry.local_key, entry.status_code, entry.message
            );
        }
    }
}
