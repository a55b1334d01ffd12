//! Cron host for catalog schedules, wrapping `tokio-cron-scheduler`.
//!
//! Provides:
//! - One cron job per enabled catalog schedule (5-field expressions
//!   normalized to the 6-field form the scheduler runs on)
//! - A fixed-interval alert sweep job
//! - Start/stop lifecycle with `CancellationToken` shutdown

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use solarflow_core::catalog::normalize_cron;
use solarflow_core::notify::NotificationDispatcher;
use solarflow_core::predicate::PredicateEvaluator;
use solarflow_core::service::AutomationService;
use solarflow_core::store::RecordStore;
use solarflow_core::workflow::ExecutionContext;
use solarflow_types::config::EngineSettings;
use solarflow_types::schedule::Schedule;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from scheduler host operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Failed to create or manipulate a cron job.
    #[error("scheduler error: {0}")]
    Job(String),

    /// A schedule carries a cron expression the scheduler cannot run.
    #[error("schedule '{schedule_id}': invalid cron '{cron}': {reason}")]
    InvalidCron {
        schedule_id: String,
        cron: String,
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// ScheduleHost
// ---------------------------------------------------------------------------

/// Callback type invoked when a job fires, with the fire timestamp.
pub type JobCallback =
    Arc<dyn Fn(DateTime<Utc>) -> futures_util::future::BoxFuture<'static, ()> + Send + Sync>;

/// Cron host that wraps `tokio-cron-scheduler::JobScheduler`.
///
/// Jobs are keyed by catalog schedule id. The host itself knows nothing
/// about the automation service; callbacks carry whatever the job needs.
pub struct ScheduleHost {
    /// The underlying tokio-cron-scheduler instance.
    inner: Arc<RwLock<Option<JobScheduler>>>,
    /// Registered jobs: schedule id -> job guid.
    jobs: Arc<RwLock<HashMap<String, Uuid>>>,
    shutdown: CancellationToken,
}

impl ScheduleHost {
    /// Create a new host (not yet started).
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            shutdown: CancellationToken::new(),
        }
    }

    /// Start the scheduler. Must be called before adding jobs.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::Job(e.to_string()))?;

        scheduler
            .start()
            .await
            .map_err(|e| SchedulerError::Job(e.to_string()))?;

        let mut inner = self.inner.write().await;
        *inner = Some(scheduler);

        tracing::info!("schedule host started");
        Ok(())
    }

    /// Stop the scheduler and drop all jobs.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let mut inner = self.inner.write().await;
        if let Some(mut scheduler) = inner.take() {
            scheduler
                .shutdown()
                .await
                .map_err(|e| SchedulerError::Job(e.to_string()))?;
            tracing::info!("schedule host stopped");
        }
        let mut jobs = self.jobs.write().await;
        jobs.clear();
        Ok(())
    }

    /// Token observed by the long-running entry point. Cancelling it makes
    /// [`ScheduleHost::run_until_cancelled`] return.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Wait for the shutdown token, then stop the scheduler.
    pub async fn run_until_cancelled(&self) -> Result<(), SchedulerError> {
        self.shutdown.cancelled().await;
        self.stop().await
    }

    /// Register a cron job for a catalog schedule.
    ///
    /// The schedule's cron expression is normalized and validated before
    /// registration; the callback runs on every fire.
    pub async fn add_schedule(
        &self,
        schedule: &Schedule,
        callback: JobCallback,
    ) -> Result<(), SchedulerError> {
        let cron_expr =
            normalize_cron(&schedule.cron).map_err(|reason| SchedulerError::InvalidCron {
                schedule_id: schedule.id.clone(),
                cron: schedule.cron.clone(),
                reason,
            })?;
        self.add_job(&schedule.id, &cron_expr, callback).await
    }

    /// Register a job firing every `minutes` minutes (the alert sweep).
    pub async fn add_interval_job(
        &self,
        name: &str,
        minutes: u64,
        callback: JobCallback,
    ) -> Result<(), SchedulerError> {
        if minutes == 0 {
            return Err(SchedulerError::InvalidCron {
                schedule_id: name.to_string(),
                cron: String::new(),
                reason: "interval must be > 0".to_string(),
            });
        }
        let cron_expr = format!("0 */{minutes} * * * *");
        self.add_job(name, &cron_expr, callback).await
    }

    async fn add_job(
        &self,
        id: &str,
        cron_expr: &str,
        callback: JobCallback,
    ) -> Result<(), SchedulerError> {
        let inner = self.inner.read().await;
        let scheduler = inner
            .as_ref()
            .ok_or_else(|| SchedulerError::Job("scheduler not started".to_string()))?;

        let job_name = id.to_string();
        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let cb = callback.clone();
            let job_name = job_name.clone();
            Box::pin(async move {
                let now = Utc::now();
                tracing::debug!(job = %job_name, %now, "cron trigger fired");
                cb(now).await;
            })
        })
        .map_err(|e| SchedulerError::InvalidCron {
            schedule_id: id.to_string(),
            cron: cron_expr.to_string(),
            reason: e.to_string(),
        })?;

        let job_id = job.guid();
        scheduler
            .add(job)
            .await
            .map_err(|e| SchedulerError::Job(e.to_string()))?;

        let mut jobs = self.jobs.write().await;
        jobs.insert(id.to_string(), job_id);

        tracing::info!(job = id, cron = cron_expr, %job_id, "job registered");
        Ok(())
    }

    /// Number of registered jobs.
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }
}

impl Default for ScheduleHost {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Catalog job installation
// ---------------------------------------------------------------------------

/// Register the standard job set on a started host: one job per enabled
/// catalog schedule, each invoking its action through the registry, plus
/// the alert sweep at the configured interval.
///
/// Returns the number of catalog schedules installed (the sweep job is
/// always added on top).
pub async fn install_catalog_jobs<S, N, P>(
    host: &ScheduleHost,
    service: &Arc<AutomationService<S, N, P>>,
    settings: &EngineSettings,
) -> Result<usize, SchedulerError>
where
    S: RecordStore + 'static,
    N: NotificationDispatcher + 'static,
    P: PredicateEvaluator + 'static,
{
    let config = service.get_config().await;
    let mut installed = 0usize;

    for schedule in config.schedules.iter().filter(|s| s.enabled) {
        let svc = service.clone();
        let action = schedule.action.clone();
        let schedule_id = schedule.id.clone();
        let callback: JobCallback = Arc::new(move |fired_at| {
            let service = svc.clone();
            let action = action.clone();
            let schedule_id = schedule_id.clone();
            Box::pin(async move {
                let ctx = ExecutionContext::new(json!({
                    "triggered_by": "schedule",
                    "schedule": schedule_id,
                    "at": fired_at.to_rfc3339(),
                }));
                if let Err(err) = service.registry().invoke(&action, &ctx).await {
                    tracing::error!(
                        %err,
                        schedule = %schedule_id,
                        action = %action,
                        "scheduled action failed"
                    );
                }
            })
        });
        host.add_schedule(schedule, callback).await?;
        installed += 1;
    }

    let svc = service.clone();
    let sweep: JobCallback = Arc::new(move |_fired_at| {
        let service = svc.clone();
        Box::pin(async move {
            let triggered = service.check_alerts().await;
            if triggered > 0 {
                tracing::info!(triggered, "alert sweep triggered rules");
            }
        })
    });
    host.add_interval_job("alert_sweep", settings.alert_check_interval_minutes, sweep)
        .await?;

    tracing::info!(
        schedules = installed,
        sweep_minutes = settings.alert_check_interval_minutes,
        "catalog jobs installed"
    );
    Ok(installed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
