//! Alert rule evaluation.
//!
//! A sweep walks every enabled rule, evaluates its condition expression
//! against a system-state snapshot, and on a hit invokes the rule's actions
//! and stamps `last_triggered` for cooldown tracking. Sweeps are
//! single-flight: a second sweep (interval timer racing a manual CLI check)
//! queues behind the first instead of double-firing rules.

use chrono::Utc;
use serde_json::{Value, json};
use solarflow_types::alert::AlertRule;
use solarflow_types::config::AutomationConfig;
use tokio::sync::{Mutex, RwLock};

use std::sync::Arc;

use crate::action::ActionRegistry;
use crate::predicate::PredicateEvaluator;
use crate::workflow::ExecutionContext;

pub struct AlertEvaluator<P> {
    predicate: Arc<P>,
    registry: Arc<ActionRegistry>,
    sweep_lock: Mutex<()>,
}

impl<P> AlertEvaluator<P>
where
    P: PredicateEvaluator,
{
    pub fn new(predicate: Arc<P>, registry: Arc<ActionRegistry>) -> Self {
        Self {
            predicate,
            registry,
            sweep_lock: Mutex::new(()),
        }
    }

    /// Evaluate every rule once and return how many fired.
    ///
    /// Failures are contained per rule: an expression that will not
    /// evaluate is logged and treated as not firing, and a failed action
    /// never stops the remaining actions or rules. `last_triggered` is
    /// stamped even when actions fail, so a broken action cannot put a
    /// rule into a tight refire loop.
    pub async fn sweep(&self, catalog: &RwLock<AutomationConfig>, state: &Value) -> usize {
        let _guard = self.sweep_lock.lock().await;
        let now = Utc::now();

        // Snapshot under the read lock; actions run without holding it.
        let rules: Vec<AlertRule> = catalog.read().await.alerts.clone();

        let mut fired = 0usize;
        for rule in &rules {
            if !rule.enabled {
                continue;
            }
            if rule.in_cooldown(now) {
                tracing::debug!(alert = rule.id.as_str(), "alert in cooldown, skipped");
                continue;
            }

            let verdict = match self.predicate.evaluate(&rule.condition, state).await {
                Ok(verdict) => verdict,
                Err(err) => {
                    tracing::warn!(
                        alert = rule.id.as_str(),
                        condition = rule.condition.as_str(),
                        error = %err,
                        "alert condition failed to evaluate"
                    );
                    false
                }
            };
            if !verdict {
                continue;
            }

            fired += 1;
            tracing::info!(
                alert = rule.id.as_str(),
                severity = %rule.severity,
                "alert triggered"
            );

            let ctx = ExecutionContext::new(json!({
                "alert": {
                    "id": rule.id,
                    "name": rule.name,
                    "severity": rule.severity,
                    "condition": rule.condition,
                },
                "state": state,
            }));
            for action in &rule.actions {
                if let Err(err) = self.registry.invoke(action, &ctx).await {
                    tracing::error!(
                        alert = rule.id.as_str(),
                        action = action.as_str(),
                        error = %err,
                        "alert action failed"
                    );
                }
            }

            let mut config = catalog.write().await;
            if let Some(stored) = config.alerts.iter_mut().find(|a| a.id == rule.id) {
                stored.last_triggered = Some(now);
            }
        }
        fired
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::Duration;
    use solarflow_types::alert::Severity;

    use crate::test_support::{StubPredicate, counting_action, failing_action};

    use super::*;

    fn rule(id: &str, actions: Vec<&str>) -> AlertRule {
        AlertRule {
            id: id.to_string(),
            name: id.to_string(),
            condition: "invoices.overdue > 0".to_string(),
            severity: Severity::High,
            actions: actions.into_iter().map(str::to_string).collect(),
            enabled: true,
            cooldown_minutes: 60,
            last_triggered: None,
        }
    }

    fn catalog_with(alerts: Vec<AlertRule>) -> RwLock<AutomationConfig> {
        RwLock::new(AutomationConfig {
            workflows: vec![],
            alerts,
            schedules: vec![],
        })
    }

    #[tokio::test]
    async fn test_firing_rule_runs_actions_and_stamps_cooldown() {
        let (calls, action) = counting_action();
        let mut registry = ActionRegistry::new();
        registry.register("send_reminder", action);

        let evaluator = AlertEvaluator::new(
            Arc::new(StubPredicate::fixed(true)),
            Arc::new(registry),
        );
        let catalog = catalog_with(vec![rule("invoice_overdue", vec!["send_reminder"])]);

        let fired = evaluator
            .sweep(&catalog, &json!({ "invoices": { "overdue": 3 } }))
            .await;
        assert_eq!(fired, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(catalog.read().await.alerts[0].last_triggered.is_some());
    }

    #[tokio::test]
    async fn test_cooldown_suppresses_refire() {
        let (calls, action) = counting_action();
        let mut registry = ActionRegistry::new();
        registry.register("send_reminder", action);

        let mut recent = rule("invoice_overdue", vec!["send_reminder"]);
        recent.last_triggered = Some(Utc::now() - Duration::minutes(30));

        let evaluator = AlertEvaluator::new(
            Arc::new(StubPredicate::fixed(true)),
            Arc::new(registry),
        );
        let catalog = catalog_with(vec![recent]);

        let fired = evaluator.sweep(&catalog, &json!({})).await;
        assert_eq!(fired, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_elapsed_cooldown_allows_refire() {
        let (_, action) = counting_action();
        let mut registry = ActionRegistry::new();
        registry.register("send_reminder", action);

        let mut stale = rule("invoice_overdue", vec!["send_reminder"]);
        stale.last_triggered = Some(Utc::now() - Duration::minutes(61));

        let evaluator = AlertEvaluator::new(
            Arc::new(StubPredicate::fixed(true)),
            Arc::new(registry),
        );
        let catalog = catalog_with(vec![stale]);

        assert_eq!(evaluator.sweep(&catalog, &json!({})).await, 1);
    }

    #[tokio::test]
    async fn test_disabled_rule_never_fires() {
        let mut disabled = rule("invoice_overdue", vec!["send_reminder"]);
        disabled.enabled = false;

        let evaluator = AlertEvaluator::new(
            Arc::new(StubPredicate::fixed(true)),
            Arc::new(ActionRegistry::new()),
        );
        let catalog = catalog_with(vec![disabled]);

        assert_eq!(evaluator.sweep(&catalog, &json!({})).await, 0);
    }

    #[tokio::test]
    async fn test_predicate_error_means_not_firing() {
        let (calls, action) = counting_action();
        let mut registry = ActionRegistry::new();
        registry.register("send_reminder", action);

        let evaluator = AlertEvaluator::new(
            Arc::new(StubPredicate::failing()),
            Arc::new(registry),
        );
        let catalog = catalog_with(vec![rule("invoice_overdue", vec!["send_reminder"])]);

        assert_eq!(evaluator.sweep(&catalog, &json!({})).await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(catalog.read().await.alerts[0].last_triggered.is_none());
    }

    #[tokio::test]
    async fn test_failed_action_does_not_stop_rule_or_sweep() {
        let (calls, action) = counting_action();
        let mut registry = ActionRegistry::new();
        registry.register("broken", failing_action("smtp down"));
        registry.register("send_reminder", action);

        let evaluator = AlertEvaluator::new(
            Arc::new(StubPredicate::fixed(true)),
            Arc::new(registry),
        );
        let catalog = catalog_with(vec![
            rule("payment_failed", vec!["broken", "send_reminder"]),
            rule("invoice_overdue", vec!["send_reminder"]),
        ]);

        let fired = evaluator.sweep(&catalog, &json!({})).await;
        assert_eq!(fired, 2);
        // send_reminder ran for both rules despite the broken action.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let config = catalog.read().await;
        assert!(config.alerts.iter().all(|a| a.last_triggered.is_some()));
    }

    #[tokio::test]
    async fn test_concurrent_sweeps_do_not_double_fire() {
        let (calls, action) = counting_action();
        let mut registry = ActionRegistry::new();
        registry.register("send_reminder", action);

        let evaluator = AlertEvaluator::new(
            Arc::new(StubPredicate::slow(true, 50)),
            Arc::new(registry),
        );
        let catalog = catalog_with(vec![rule("invoice_overdue", vec!["send_reminder"])]);

        let state = json!({});
        let (a, b) = tokio::join!(
            evaluator.sweep(&catalog, &state),
            evaluator.sweep(&catalog, &state)
        );
        // The second sweep queued behind the first and saw the rule in
        // cooldown.
        assert_eq!(a + b, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
