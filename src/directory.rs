//! External key directory
//!
//! Process-wide map from (object type, local external key) to the
//! platform-assigned identifier. Grows monotonically during a run and is
//! write-once per key: a later write for the same key is an invariant
//! violation and is rejected and logged, never silently overwritten.

use std::collections::HashMap;

/// (object type, local external key) -> remote identifier.
#[derive(Debug, Default, Clone)]
pub struct ExternalKeyDirectory {
    maps: HashMap<String, HashMap<String, String>>,
}

impl ExternalKeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a remote identifier for a key. Returns false (and logs) if the
    /// key already has an entry; the existing entry is kept.
    pub fn record(&mut self, object: &str, local_key: &str, remote_id: &str) -> bool {
        let entries = self.maps.entry(object.to_string()).or_default();
        if let Some(existing) = entries.get(local_key) {
            tracing::warn!(
                object,
                local_key,
                existing,
                rejected = remote_id,
                "duplicate directory write rejected"
            );
            return false;
        }
        entries.insert(local_key.to_string(), remote_id.to_string());
        true
    }

    pub fn lookup(&self, object: &str, local_key: &str) -> Option<&str> {
        self.maps
            .get(object)
            .and_then(|entries| entries.get(local_key))
            .map(String::as_str)
    }

    /// Number of keys recorded for an object type.
    pub fn len_for(&self, object: &str) -> usize {
        self.maps.get(object).map_or(0, HashMap::len)
    }

    /// All (local key, remote id) pairs recorded for an object type.
    pub fn entries_for(&self, object: &str) -> Vec<(String, String)> {
        self.maps
            .get(object)
            .map(|entries| {
                let mut pairs: Vec<(String, String)> = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                // Deterministic order for callers that batch over the pairs.
                pairs.sort();
                pairs
            })
            .unwrap_or_default()
    }
}
