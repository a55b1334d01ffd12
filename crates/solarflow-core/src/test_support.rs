//! Shared trait doubles for engine tests: an in-memory record store, a
//! recording notification dispatcher, a stub predicate evaluator, and
//! canned action handlers.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use solarflow_types::error::{ActionError, DispatchError, PredicateError, StoreError};
use solarflow_types::notification::{Channel, Message, Priority};
use solarflow_types::workflow::Comparison;

use crate::action::BoxAction;
use crate::notify::NotificationDispatcher;
use crate::predicate::PredicateEvaluator;
use crate::store::RecordStore;
use crate::workflow::condition::evaluate_comparison;
use crate::workflow::context::lookup_path;

// ---------------------------------------------------------------------------
// MemStore
// ---------------------------------------------------------------------------

/// In-memory record store keyed by collection name.
pub struct MemStore {
    collections: Mutex<HashMap<String, Vec<Value>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// Replace a collection's contents.
    pub fn seed(&self, collection: &str, records: Vec<Value>) {
        self.collections
            .lock()
            .unwrap()
            .insert(collection.to_string(), records);
    }

    /// Snapshot a collection's contents.
    pub fn dump(&self, collection: &str) -> Vec<Value> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

impl RecordStore for MemStore {
    async fn insert(&self, collection: &str, record: Value) -> Result<(), StoreError> {
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound(collection.to_string()))?;
        let record = records
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
            .ok_or_else(|| StoreError::NotFound(collection.to_string()))?;
        if let (Some(target), Value::Object(fields)) = (record.as_object_mut(), patch) {
            for (key, value) in fields {
                target.insert(key, value);
            }
        }
        Ok(())
    }

    async fn query(&self, collection: &str, filters: &[Comparison]) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.lock().unwrap();
        let records = collections.get(collection).cloned().unwrap_or_default();
        Ok(records
            .into_iter()
            .filter(|record| {
                filters.iter().all(|cmp| {
                    evaluate_comparison(lookup_path(record, &cmp.field), cmp.op, &cmp.value)
                })
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// RecordingDispatcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub channel: Channel,
    pub recipient: String,
    pub message: Message,
    pub priority: Priority,
}

/// Dispatcher that records every send and fails configured channels.
pub struct RecordingDispatcher {
    sent: Mutex<Vec<SentMessage>>,
    fail: HashSet<Channel>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: HashSet::new(),
        }
    }

    pub fn failing(channels: impl IntoIterator<Item = Channel>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: channels.into_iter().collect(),
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        message: &Message,
        priority: Priority,
    ) -> Result<(), DispatchError> {
        if self.fail.contains(&channel) {
            return Err(DispatchError::SendFailed {
                channel,
                reason: "configured to fail".to_string(),
            });
        }
        self.sent.lock().unwrap().push(SentMessage {
            channel,
            recipient: recipient.to_string(),
            message: message.clone(),
            priority,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StubPredicate
// ---------------------------------------------------------------------------

/// Predicate evaluator with a fixed verdict, optional failure and optional
/// per-call delay. Records every (expression, state) it was asked about.
pub struct StubPredicate {
    verdict: bool,
    fail: bool,
    delay_ms: u64,
    seen: Mutex<Vec<(String, Value)>>,
}

impl StubPredicate {
    pub fn fixed(verdict: bool) -> Self {
        Self {
            verdict,
            fail: false,
            delay_ms: 0,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            verdict: false,
            fail: true,
            delay_ms: 0,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn slow(verdict: bool, delay_ms: u64) -> Self {
        Self {
            verdict,
            fail: false,
            delay_ms,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<(String, Value)> {
        self.seen.lock().unwrap().clone()
    }
}

impl PredicateEvaluator for StubPredicate {
    async fn evaluate(&self, expression: &str, state: &Value) -> Result<bool, PredicateError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        self.seen
            .lock()
            .unwrap()
            .push((expression.to_string(), state.clone()));
        if self.fail {
            return Err(PredicateError::Evaluation("stub failure".to_string()));
        }
        Ok(self.verdict)
    }
}

// ---------------------------------------------------------------------------
// Canned actions
// ---------------------------------------------------------------------------

/// An action that counts its invocations.
pub fn counting_action() -> (Arc<AtomicUsize>, BoxAction) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let action = BoxAction::from_fn(move |_| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });
    (calls, action)
}

/// An action that always fails with the given reason.
pub fn failing_action(reason: &str) -> BoxAction {
    let reason = reason.to_string();
    BoxAction::from_fn(move |_| {
        let reason = reason.clone();
        async move { Err(ActionError::Failed(reason)) }
    })
}
