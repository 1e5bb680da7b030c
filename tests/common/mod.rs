//! In-memory remote platform for pipeline tests.
//!
//! Auto-assigns sequential identifiers on insert, records every call, and
//! can be scripted per object: queue a whole-call rejection, fail transport
//! outright, or answer queries matched by substring.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crm_seeder::{RemoteApi, SaveResult, TransportError};

#[derive(Debug, Clone)]
pub struct InsertCall {
    pub object: String,
    pub payloads: Vec<Value>,
}

#[derive(Default)]
struct MockState {
    id_seq: usize,
    calls: Vec<InsertCall>,
    fail_transport: HashSet<String>,
    // One queued entry rejects every record of one insert call.
    rejections: HashMap<String, VecDeque<(String, String)>>,
    query_script: Vec<(String, Vec<Value>)>,
}

#[derive(Default)]
pub struct MockRemote {
    state: Mutex<MockState>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every insert call for `object` fails at the transport level.
    pub fn fail_transport(self, object: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_transport
            .insert(object.to_string());
        self
    }

    /// Queue a rejection for the next unscripted insert call on `object`.
    pub fn push_rejection(self, object: &str, status_code: &str, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .rejections
            .entry(object.to_string())
            .or_default()
            .push_back((status_code.to_string(), message.to_string()));
        self
    }

    /// Answer any query whose SOQL contains `needle` with `rows`.
    pub fn with_query(self, needle: &str, rows: Vec<Value>) -> Self {
        self.state
            .lock()
            .unwrap()
            .query_script
            .push((needle.to_string(), rows));
        self
    }

    pub fn calls(&self) -> Vec<InsertCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_for(&self, object: &str) -> Vec<InsertCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.object == object)
            .collect()
    }
}

#[async_trait]
impl RemoteApi for MockRemote {
    async fn insert(
        &self,
        object: &str,
        payloads: Vec<Value>,
    ) -> Result<Vec<SaveResult>, TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_transport.contains(object) {
            return Err(TransportError::Other("connection reset by peer".to_string()));
        }
        state.calls.push(InsertCall {
            object: object.to_string(),
            payloads: payloads.clone(),
        });
        if let Some((code, message)) = state
            .rejections
            .get_mut(object)
            .and_then(VecDeque::pop_front)
        {
            return Ok(payloads
                .iter()
                .map(|_| SaveResult::rejected(&code, &message))
                .collect());
        }
        Ok(payloads
            .iter()
            .map(|_| {
                state.id_seq += 1;
                SaveResult::inserted(&format!("ID{:05}", state.id_seq))
            })
            .collect())
    }

    async fn query(&self, soql: &str) -> Result<Vec<Value>, TransportError> {
        let state = self.state.lock().unwrap();
        for (needle, rows) in &state.query_script {
            if soql.contains(needle) {
                return Ok(rows.clone());
            }
        }
        Ok(Vec::new())
    }
}
