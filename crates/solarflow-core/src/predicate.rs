//! Alert predicate evaluation port.

use serde_json::Value;
use solarflow_types::error::PredicateError;

/// Evaluates an alert rule's condition expression against a system-state
/// snapshot.
///
/// Expressions reference snapshot fields by dot path, for example
/// `invoices.overdue > 0`. The evaluator returns the boolean verdict;
/// what expression language backs it is an infrastructure concern.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait PredicateEvaluator: Send + Sync {
    fn evaluate(
        &self,
        expression: &str,
        state: &Value,
    ) -> impl std::future::Future<Output = Result<bool, PredicateError>> + Send;
}
