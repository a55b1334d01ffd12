//! Automation service facade.
//!
//! Owns the catalog and wires together the workflow runner, the alert
//! evaluator and the action registry. This is the API the CLI and the
//! scheduler host talk to; everything below it returns typed errors,
//! everything above it gets the logged boolean/void contract.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde_json::{Value, json};
use solarflow_types::config::{AutomationConfig, ConfigPatch};
use solarflow_types::workflow::{CompareOp, Comparison, RunReport};
use tokio::sync::RwLock;

use crate::action::ActionRegistry;
use crate::alert::AlertEvaluator;
use crate::catalog::{self, CatalogError};
use crate::notify::NotificationDispatcher;
use crate::predicate::PredicateEvaluator;
use crate::store::RecordStore;
use crate::workflow::step_runner::APPROVAL_COLLECTION;
use crate::workflow::{ExecutionContext, RunError, StepRunner, WorkflowRunner};

pub struct AutomationService<S, N, P> {
    catalog: Arc<RwLock<AutomationConfig>>,
    runner: WorkflowRunner<S, N>,
    alerts: AlertEvaluator<P>,
    store: Arc<S>,
    registry: Arc<ActionRegistry>,
}

impl<S, N, P> AutomationService<S, N, P>
where
    S: RecordStore,
    N: NotificationDispatcher,
    P: PredicateEvaluator,
{
    pub fn new(
        config: AutomationConfig,
        store: Arc<S>,
        dispatcher: Arc<N>,
        predicate: Arc<P>,
        registry: ActionRegistry,
    ) -> Self {
        let registry = Arc::new(registry);
        let runner = WorkflowRunner::new(StepRunner::new(
            store.clone(),
            dispatcher,
            registry.clone(),
        ));
        let alerts = AlertEvaluator::new(predicate, registry.clone());
        Self {
            catalog: Arc::new(RwLock::new(config)),
            runner,
            alerts,
            store,
            registry,
        }
    }

    pub fn with_default_catalog(
        store: Arc<S>,
        dispatcher: Arc<N>,
        predicate: Arc<P>,
        registry: ActionRegistry,
    ) -> Self {
        Self::new(catalog::default_catalog(), store, dispatcher, predicate, registry)
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    // -------------------------------------------------------------------
    // Workflow execution
    // -------------------------------------------------------------------

    /// Execute a workflow by id. Missing or disabled workflows (and any
    /// run failure) are logged and reported as `false`; callers that need
    /// the step trace use [`try_execute`](Self::try_execute).
    pub async fn execute_workflow(&self, id: &str, context: Value) -> bool {
        match self.try_execute(id, context).await {
            Ok(report) => {
                tracing::info!(
                    workflow = id,
                    run_id = %report.run_id,
                    steps = report.executed_steps.len(),
                    "workflow execution succeeded"
                );
                true
            }
            Err(err) => {
                tracing::error!(workflow = id, error = %err, "workflow execution failed");
                false
            }
        }
    }

    pub async fn try_execute(&self, id: &str, context: Value) -> Result<RunReport, RunError> {
        // Clone the definition out so a concurrent update_config cannot
        // change the graph mid-run.
        let workflow = {
            let catalog = self.catalog.read().await;
            let workflow = match catalog.workflow(id) {
                Some(workflow) => workflow,
                None => return Err(RunError::WorkflowNotFound(id.to_owned())),
            };
            if !workflow.enabled {
                return Err(RunError::WorkflowDisabled(id.to_owned()));
            }
            workflow.clone()
        };
        let ctx = ExecutionContext::new(context);
        self.runner.run(&workflow, &ctx).await
    }

    // -------------------------------------------------------------------
    // Alerts
    // -------------------------------------------------------------------

    /// Sweep all alert rules against a fresh system-state snapshot.
    /// Returns the number of rules that fired.
    pub async fn check_alerts(&self) -> usize {
        let state = self.system_state().await;
        self.alerts.sweep(&self.catalog, &state).await
    }

    /// Sweep against a caller-supplied snapshot (used by tests and by the
    /// CLI's dry-run mode).
    pub async fn check_alerts_with_state(&self, state: &Value) -> usize {
        self.alerts.sweep(&self.catalog, state).await
    }

    // -------------------------------------------------------------------
    // Scheduled automation entry points
    // -------------------------------------------------------------------

    /// Daily housekeeping: distributor sync, overdue-invoice check and, on
    /// the first day of the month, monthly invoice generation. Sub-steps
    /// are independent; a failure is logged and the next step still runs.
    pub async fn run_daily_automation(&self) {
        self.run_daily_steps(Utc::now().date_naive()).await;
    }

    async fn run_daily_steps(&self, today: NaiveDate) {
        tracing::info!(%today, "daily automation started");
        self.run_admin_action("sync_distributor_data").await;
        self.run_admin_action("check_overdue_invoices").await;
        if today.day() == 1 {
            self.run_admin_action("generate_monthly_invoices").await;
        }
        tracing::info!("daily automation completed");
    }

    /// Weekly housekeeping: reporting and approval-request expiry.
    pub async fn run_weekly_automation(&self) {
        tracing::info!("weekly automation started");
        self.run_admin_action("generate_weekly_report").await;
        self.run_admin_action("expire_stale_approvals").await;
        tracing::info!("weekly automation completed");
    }

    async fn run_admin_action(&self, name: &str) {
        let ctx = ExecutionContext::new(json!({
            "triggered_by": "automation",
            "at": Utc::now(),
        }));
        if let Err(err) = self.registry.invoke(name, &ctx).await {
            tracing::error!(action = name, error = %err, "automation step failed");
        }
    }

    // -------------------------------------------------------------------
    // Catalog access
    // -------------------------------------------------------------------

    pub async fn get_config(&self) -> AutomationConfig {
        self.catalog.read().await.clone()
    }

    /// Replace catalog sections wholesale. Sections absent from the patch
    /// are kept; the patched catalog must validate (against the registry)
    /// before it is installed, so a bad patch leaves the old catalog in
    /// place. Runs already in flight keep the definition they cloned.
    pub async fn update_config(&self, patch: ConfigPatch) -> Result<(), CatalogError> {
        let mut catalog = self.catalog.write().await;
        let mut candidate = catalog.clone();
        if let Some(workflows) = patch.workflows {
            candidate.workflows = workflows;
        }
        if let Some(alerts) = patch.alerts {
            candidate.alerts = alerts;
        }
        if let Some(schedules) = patch.schedules {
            candidate.schedules = schedules;
        }
        catalog::validate_catalog(&candidate, Some(&self.registry))?;
        *catalog = candidate;
        tracing::info!("automation config updated");
        Ok(())
    }

    // -------------------------------------------------------------------
    // System state snapshot
    // -------------------------------------------------------------------

    /// Assemble the snapshot alert conditions evaluate against. Store
    /// failures degrade to empty collections with a warning; an alert
    /// sweep must never abort because one query failed.
    pub async fn system_state(&self) -> Value {
        let now = Utc::now();
        let today = now.date_naive();

        let invoices = self.collection("invoices").await;
        let payments = self.collection("payments").await;
        let events = self.collection("system_events").await;
        let vault = self.collection("energy_vault").await;
        let pending_approvals = match self
            .store
            .query(
                APPROVAL_COLLECTION,
                &[Comparison::new("status", CompareOp::Eq, json!("pending"))],
            )
            .await
        {
            Ok(records) => records.len(),
            Err(err) => {
                tracing::warn!(error = %err, "approval query failed for system state");
                0
            }
        };

        let pending = invoices
            .iter()
            .filter(|r| record_str(r, "status") == Some("pending"))
            .count();
        let overdue = invoices.iter().filter(|r| is_overdue(r, today)).count();
        let failed = payments
            .iter()
            .filter(|r| record_str(r, "status") == Some("failed"))
            .count();
        let recent_errors = events.iter().filter(|r| is_recent_error(r, now)).count();
        let balance_kwh: f64 = vault
            .iter()
            .filter_map(|r| r.get("balance_kwh").and_then(Value::as_f64))
            .sum();

        json!({
            "invoices": { "total": invoices.len(), "pending": pending, "overdue": overdue },
            "payments": { "total": payments.len(), "failed": failed },
            "approvals": { "pending": pending_approvals },
            "energy": { "balance_kwh": balance_kwh },
            "errors": { "recent": recent_errors },
            "now": now.to_rfc3339(),
        })
    }

    async fn collection(&self, name: &str) -> Vec<Value> {
        match self.store.query(name, &[]).await {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(collection = name, error = %err, "system state query failed");
                Vec::new()
            }
        }
    }
}

fn record_str<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

/// Pending invoices whose due date is strictly before today.
fn is_overdue(record: &Value, today: NaiveDate) -> bool {
    if record_str(record, "status") != Some("pending") {
        return false;
    }
    record_str(record, "due_date")
        .and_then(parse_day)
        .is_some_and(|due| due < today)
}

fn parse_day(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Error-level events recorded within the last ten minutes.
fn is_recent_error(record: &Value, now: DateTime<Utc>) -> bool {
    if record_str(record, "level") != Some("error") {
        return false;
    }
    record_str(record, "at")
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .is_some_and(|at| now.signed_duration_since(at.with_timezone(&Utc)) <= Duration::minutes(10))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
