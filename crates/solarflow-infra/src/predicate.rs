//! JEXL predicate evaluator for alert rule conditions.
//!
//! Wraps `jexl_eval::Evaluator` with a small set of standard transforms.
//! The evaluator is rebuilt on every call: its transform closures are not
//! `Send`, while the wrapper itself is shared across tasks behind an `Arc`.
//!
//! **Security note:** system-state snapshots are always passed as context
//! objects, never interpolated into expression strings.

use serde_json::{Value, json};
use solarflow_core::predicate::PredicateEvaluator;
use solarflow_types::error::PredicateError;

/// Evaluates alert conditions such as `invoices.overdue > 0` against the
/// system-state snapshot.
pub struct JexlPredicate;

impl JexlPredicate {
    pub fn new() -> Self {
        Self
    }

    /// Build an evaluator with the standard transforms registered.
    fn evaluator() -> jexl_eval::Evaluator<'static> {
        jexl_eval::Evaluator::new()
            .with_transform("lower", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(s.to_lowercase()))
            })
            .with_transform("upper", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(s.to_uppercase()))
            })
            .with_transform("contains", |args: &[Value]| {
                let subject = args.first().and_then(|v| v.as_str()).unwrap_or("");
                let search = args.get(1).and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(subject.contains(search)))
            })
            // Length works on strings, arrays, and objects.
            .with_transform("length", |args: &[Value]| {
                let val = args.first().cloned().unwrap_or(Value::Null);
                let len = match &val {
                    Value::String(s) => s.len(),
                    Value::Array(a) => a.len(),
                    Value::Object(o) => o.len(),
                    _ => 0,
                };
                Ok(json!(len as f64))
            })
    }

    /// Coerce a JSON value to boolean using JavaScript-like truthiness.
    fn value_to_bool(value: &Value) -> bool {
        match value {
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}

impl Default for JexlPredicate {
    fn default() -> Self {
        Self::new()
    }
}

impl PredicateEvaluator for JexlPredicate {
    async fn evaluate(&self, expression: &str, state: &Value) -> Result<bool, PredicateError> {
        if expression.trim().is_empty() {
            return Err(PredicateError::Parse("empty expression".to_string()));
        }
        if !state.is_object() {
            return Err(PredicateError::Evaluation(
                "state must be a JSON object".to_string(),
            ));
        }

        let result = Self::evaluator()
            .eval_in_context(expression, state)
            .map_err(|err| PredicateError::Evaluation(err.to_string()))?;

        Ok(Self::value_to_bool(&result))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Value {
        json!({
            "invoices": { "total": 12, "pending": 4, "overdue": 2 },
            "payments": { "total": 9, "failed": 0 },
            "energy": { "balance_kwh": 84.0 },
            "errors": { "recent": 7 },
            "distributor": "CEMIG",
        })
    }

    #[tokio::test]
    async fn test_evaluate_numeric_comparison() {
        let predicate = JexlPredicate::new();
        assert!(
            predicate
                .evaluate("invoices.overdue > 0", &snapshot())
                .await
                .unwrap()
        );
        assert!(
            !predicate
                .evaluate("payments.failed > 0", &snapshot())
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_evaluate_compound_condition() {
        let predicate = JexlPredicate::new();
        assert!(
            predicate
                .evaluate(
                    "invoices.overdue > 0 && errors.recent > 5",
                    &snapshot()
                )
                .await
                .unwrap()
        );
        assert!(
            !predicate
                .evaluate(
                    "invoices.overdue > 0 && payments.failed > 0",
                    &snapshot()
                )
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_evaluate_threshold_below() {
        let predicate = JexlPredicate::new();
        assert!(
            predicate
                .evaluate("energy.balance_kwh < 100", &snapshot())
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_evaluate_coerces_number_to_bool() {
        let predicate = JexlPredicate::new();
        assert!(predicate.evaluate("invoices.overdue", &snapshot()).await.unwrap());
        assert!(!predicate.evaluate("payments.failed", &snapshot()).await.unwrap());
    }

    #[tokio::test]
    async fn test_evaluate_transforms() {
        let predicate = JexlPredicate::new();
        assert!(
            predicate
                .evaluate("distributor|lower == 'cemig'", &snapshot())
                .await
                .unwrap()
        );
        assert!(
            predicate
                .evaluate("distributor|length == 5", &snapshot())
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_evaluate_malformed_expression_is_error() {
        let predicate = JexlPredicate::new();
        let err = predicate
            .evaluate("invoices.overdue >", &snapshot())
            .await
            .unwrap_err();
        assert!(matches!(err, PredicateError::Evaluation(_)));
    }

    #[tokio::test]
    async fn test_evaluate_empty_expression_is_parse_error() {
        let predicate = JexlPredicate::new();
        let err = predicate.evaluate("   ", &snapshot()).await.unwrap_err();
        assert!(matches!(err, PredicateError::Parse(_)));
    }

    #[tokio::test]
    async fn test_evaluate_rejects_non_object_state() {
        let predicate = JexlPredicate::new();
        let err = predicate
            .evaluate("invoices.overdue > 0", &json!([1, 2, 3]))
            .await
            .unwrap_err();
        assert!(matches!(err, PredicateError::Evaluation(_)));
    }
}
