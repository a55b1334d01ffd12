//! Record store port.

use serde_json::Value;
use solarflow_types::error::StoreError;
use solarflow_types::workflow::Comparison;

/// Persistence for engine records: invoices, payments, approval requests,
/// system events.
///
/// Records are schemaless JSON objects grouped into named collections and
/// addressed by their `"id"` field. Queries filter with the same comparison
/// semantics condition steps use, so `status = "pending"` means the same
/// thing in a workflow and in a store lookup.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait RecordStore: Send + Sync {
    /// Insert a record into a collection.
    fn insert(
        &self,
        collection: &str,
        record: Value,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Merge `patch` into the record whose `"id"` field equals `id`.
    fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Return every record in the collection matching all filters.
    fn query(
        &self,
        collection: &str,
        filters: &[Comparison],
    ) -> impl std::future::Future<Output = Result<Vec<Value>, StoreError>> + Send;
}
