//! In-memory record store backed by `DashMap`.
//!
//! The production store for this revision: collections of schemaless JSON
//! records keyed by collection name, safe to share across the scheduler
//! host, alert sweeps and workflow runs. Query filters reuse the same
//! comparison semantics workflow condition steps use.

use dashmap::DashMap;
use serde_json::Value;
use solarflow_core::store::RecordStore;
use solarflow_core::workflow::condition::evaluate_comparison;
use solarflow_core::workflow::context::lookup_path;
use solarflow_types::error::StoreError;
use solarflow_types::workflow::Comparison;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
        }
    }

    /// Number of records currently held in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|records| records.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

impl RecordStore for MemoryStore {
    async fn insert(&self, collection: &str, record: Value) -> Result<(), StoreError> {
        if !record.is_object() {
            return Err(StoreError::Serialization(
                "record must be a JSON object".to_string(),
            ));
        }
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        let patch = match patch {
            Value::Object(map) => map,
            _ => {
                return Err(StoreError::Serialization(
                    "patch must be a JSON object".to_string(),
                ));
            }
        };

        let mut records = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound(collection.to_string()))?;

        let record = records
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
            .ok_or_else(|| StoreError::NotFound(collection.to_string()))?;

        if let Value::Object(fields) = record {
            for (key, value) in patch {
                fields.insert(key, value);
            }
        }
        Ok(())
    }

    async fn query(&self, collection: &str, filters: &[Comparison]) -> Result<Vec<Value>, StoreError> {
        let records = match self.collections.get(collection) {
            Some(records) => records,
            None => return Ok(Vec::new()),
        };
        let matches = records
            .iter()
            .filter(|record| {
                filters.iter().all(|filter| {
                    let actual = lookup_path(record, &filter.field);
                    evaluate_comparison(actual, filter.op, &filter.value)
                })
            })
            .cloned()
            .collect();
        Ok(matches)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
