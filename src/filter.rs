//! Field whitelist filtering
//!
//! The live schema may silently diverge from the authored dataset (fields
//! undeployed or invisible to the integration user). Filtering client-side
//! keeps a single drifted column from poisoning every record in a batch.

use crate::object::ObjectSpec;
use crate::record::FieldMap;

/// Produce the outgoing field map for one record: only allow-listed fields,
/// with the external-key field, relation lookup columns, and null values
/// removed. Pure and deterministic.
pub fn filter_outgoing(spec: &ObjectSpec, fields: &FieldMap) -> FieldMap {
    fields
        .iter()
        .filter(|(name, value)| {
            if value.is_null() {
                return false;
            }
            if spec.external_key_field.as_deref() == Some(name.as_str()) {
                return false;
            }
            if spec.is_relation_source(name) {
                return false;
            }
            spec.is_allowed(name)
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
