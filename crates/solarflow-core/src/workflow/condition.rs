//! Comparison evaluation for condition steps and record-store filters.
//!
//! A condition step holds a list of comparisons that are ANDed together;
//! an empty list is vacuously true. Values coming out of the context are
//! JSON, so comparisons coerce: numeric strings compare as numbers, and
//! ordering falls back to lexicographic string comparison when either side
//! is not numeric.

use std::cmp::Ordering;

use serde_json::Value;
use solarflow_types::workflow::{CompareOp, Comparison};

use super::context::ExecutionContext;

/// Evaluate every comparison against the context. All must hold.
pub fn evaluate_all(comparisons: &[Comparison], ctx: &ExecutionContext) -> bool {
    comparisons
        .iter()
        .all(|cmp| evaluate_comparison(ctx.get(&cmp.field), cmp.op, &cmp.value))
}

/// Evaluate one comparison against a resolved field value.
///
/// A field that did not resolve (`None`) fails every operator, including
/// `not_empty`.
pub fn evaluate_comparison(actual: Option<&Value>, op: CompareOp, expected: &Value) -> bool {
    let actual = match actual {
        Some(value) => value,
        None => return false,
    };
    match op {
        CompareOp::NotEmpty => is_non_blank(actual),
        CompareOp::Eq => values_equal(actual, expected),
        CompareOp::Ne => !values_equal(actual, expected),
        CompareOp::Gt => matches!(compare(actual, expected), Some(Ordering::Greater)),
        CompareOp::Gte => matches!(
            compare(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::Lt => matches!(compare(actual, expected), Some(Ordering::Less)),
        CompareOp::Lte => matches!(
            compare(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
    }
}

/// Numeric coercion: JSON numbers pass through, numeric strings parse.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    if let (Some(a), Some(b)) = (as_number(left), as_number(right)) {
        return a == b;
    }
    left == right
}

/// Ordering with coercion. Numeric when both sides coerce, otherwise
/// lexicographic when both sides are strings, otherwise incomparable.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (as_number(left), as_number(right)) {
        return a.partial_cmp(&b);
    }
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => None,
    }
}

/// Blank check for `not_empty`: null, whitespace-only strings and empty
/// arrays count as blank; numbers and booleans never do.
fn is_non_blank(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
