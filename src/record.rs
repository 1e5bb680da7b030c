//! Candidate records and the closed field-value model
//!
//! Authored data is dynamic (one CSV column set per object), but the value
//! space is deliberately closed: a field is text, a number, a boolean, a
//! date, a datetime, or null. Keeping the set closed makes whitelisting and
//! wire serialization exhaustive instead of duck-typed.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

/// A single authored field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Null,
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            FieldValue::Number(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Wire form of the value. Decimals that fit a JSON number are emitted
    /// as numbers; anything that would lose precision falls back to a
    /// string, which the platform coerces.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Number(d) => match d.to_f64().and_then(serde_json::Number::from_f64) {
                Some(n) => Value::Number(n),
                None => Value::String(d.to_string()),
            },
            FieldValue::Boolean(b) => Value::Bool(*b),
            FieldValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            FieldValue::DateTime(dt) => Value::String(dt.to_rfc3339()),
            FieldValue::Null => Value::Null,
        }
    }
}

/// Ordered field name -> value mapping for one record.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Serialize a field map into the JSON object transmitted for one record.
pub fn to_payload(fields: &FieldMap) -> Value {
    let map: serde_json::Map<String, Value> = fields
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect();
    Value::Object(map)
}

/// One candidate record: a caller-assigned local external key plus its
/// authored fields. Immutable once submitted.
#[derive(Debug, Clone)]
pub struct CandidateRecord {
    pub local_key: String,
    pub fields: FieldMap,
}

impl CandidateRecord {
    pub fn new(local_key: impl Into<String>) -> Self {
        Self {
            local_key: local_key.into(),
            fields: FieldMap::new(),
        }
    }

    /// Builder-style field assignment, used by the dataset provider and tests.
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn with_text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_field(name, FieldValue::Text(value.into()))
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// Ordered collection of candidate records for one object type.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub records: Vec<CandidateRecord>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: CandidateRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CandidateRecord> {
        self.records.iter()
    }
}

impl FromIterator<CandidateRecord> for RecordSet {
    fn from_iter<I: IntoIterator<Item = CandidateRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
