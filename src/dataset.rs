//! CSV-backed source datasets
//!
//! Reads one CSV file per object type from the data directory into candidate
//! record sets, parsing typed columns per the object spec. Empty cells are
//! omitted rather than transmitted as nulls, matching how the authored
//! datasets treat absence.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;

use crate::error::DatasetError;
use crate::object::{FieldKind, ObjectSpec};
use crate::orchestrator::Datasets;
use crate::record::{CandidateRecord, FieldValue, RecordSet};

/// Load every spec's dataset from `data_dir`. A missing file yields an empty
/// set with a warning; a present but unreadable file is an error.
pub fn load_datasets(data_dir: &Path, specs: &[ObjectSpec]) -> Result<Datasets, DatasetError> {
    let mut datasets: Datasets = HashMap::new();
    for spec in specs {
        let path = data_dir.join(&spec.csv_file);
        if !path.exists() {
            tracing::warn!(object = %spec.api_name, path = %path.display(), "dataset file missing, loading nothing");
            datasets.insert(spec.api_name.clone(), RecordSet::new());
            continue;
        }
        let records = read_record_set(&path, spec)?;
        tracing::info!(object = %spec.api_name, records = records.len(), "dataset loaded");
        datasets.insert(spec.api_name.clone(), records);
    }
    Ok(datasets)
}

fn read_record_set(path: &Path, spec: &ObjectSpec) -> Result<RecordSet, DatasetError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    let headers = reader
        .headers()
        .map_err(|source| DatasetError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    let mut records = RecordSet::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|source| DatasetError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        let mut record = CandidateRecord::new(local_key(spec, &headers, &row, index));
        for (column, raw) in headers.iter().zip(row.iter()) {
            if raw.is_empty() {
                continue;
            }
            let value = parse_field(spec.kind_of(column), raw).map_err(|message| {
                DatasetError::BadValue {
                    path: path.to_path_buf(),
                    row: index + 2, // 1-based, after the header line
                    column: column.to_string(),
                    message,
                }
            })?;
            record.fields.insert(column.to_string(), value);
        }
        records.push(record);
    }
    Ok(records)
}

/// Local key for a row: the spec's key column when present and non-empty,
/// else a positional fallback so the ledger can still name the record.
fn local_key(
    spec: &ObjectSpec,
    headers: &csv::StringRecord,
    row: &csv::StringRecord,
    index: usize,
) -> String {
    if let Some(key_column) = spec.key_column() {
        if let Some(position) = headers.iter().position(|h| h == key_column) {
            if let Some(value) = row.get(position) {
                if !value.is_empty() {
                    return value.to_string();
                }
            }
        }
    }
    format!("{}-row-{}", spec.api_name, index + 1)
}

fn parse_field(kind: FieldKind, raw: &str) -> Result<FieldValue, String> {
    match kind {
        FieldKind::Text => Ok(FieldValue::text(raw)),
        FieldKind::Number => Decimal::from_str_exact(raw)
            .map(FieldValue::Number)
            .map_err(|e| format!("not a number: {e}")),
        FieldKind::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(FieldValue::Boolean(true)),
            "false" | "0" | "no" => Ok(FieldValue::Boolean(false)),
            other => Err(format!("not a boolean: '{other}'")),
        },
        FieldKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(FieldValue::Date)
            .map_err(|e| format!("not a YYYY-MM-DD date: {e}")),
        FieldKind::DateTime => DateTime::parse_from_rfc3339(raw)
            .map(|dt| FieldValue::DateTime(dt.into()))
            .map_err(|e| format!("not an RFC 3339 datetime: {e}")),
    }
}
