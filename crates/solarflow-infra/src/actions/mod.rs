//! Standard action set.
//!
//! Registers the built-in handlers the default catalog and the scheduled
//! automations refer to by name. Every handler works through the record
//! store and the notification dispatcher; none of them keep state of
//! their own.

pub mod alerting;
pub mod housekeeping;
pub mod invoice;

use std::sync::Arc;

use serde_json::Value;
use solarflow_core::action::ActionRegistry;
use solarflow_core::notify::NotificationDispatcher;
use solarflow_core::store::RecordStore;
use solarflow_core::workflow::ExecutionContext;
use solarflow_types::alert::Severity;
use solarflow_types::config::EngineSettings;
use solarflow_types::notification::Priority;

use crate::distributor::DistributorSync;

pub(crate) const INVOICE_COLLECTION: &str = "invoices";
pub(crate) const PAYMENT_COLLECTION: &str = "payments";
pub(crate) const CONTRACT_COLLECTION: &str = "contracts";
pub(crate) const TICKET_COLLECTION: &str = "tickets";
pub(crate) const EVENT_COLLECTION: &str = "system_events";
pub(crate) const REPORT_COLLECTION: &str = "reports";
pub(crate) const BACKUP_COLLECTION: &str = "backups";

/// Build the full standard registry over the given store and dispatcher.
///
/// Covers the workflow actions the default catalog references, the alert
/// actions, and the scheduled housekeeping actions.
pub fn standard_registry<S, N>(
    store: Arc<S>,
    dispatcher: Arc<N>,
    settings: &EngineSettings,
) -> ActionRegistry
where
    S: RecordStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let mut registry = ActionRegistry::new();
    let admin_email = Arc::new(settings.admin_email.clone());
    let sync = Arc::new(DistributorSync::new(&settings.distributors));

    invoice::register(&mut registry, &store);
    alerting::register(&mut registry, &store, &dispatcher, &admin_email);
    housekeeping::register(&mut registry, &store, &dispatcher, &sync);
    registry
}

/// Priority for alert-driven notifications: the rule's severity mapped
/// through the standard severity-to-priority table, `medium` when the
/// context carries no alert.
pub(crate) fn alert_priority(ctx: &ExecutionContext) -> Priority {
    ctx.get("alert.severity")
        .cloned()
        .and_then(|v| serde_json::from_value::<Severity>(v).ok())
        .map(Severity::priority)
        .unwrap_or_default()
}

pub(crate) fn ctx_str(ctx: &ExecutionContext, path: &str) -> Option<String> {
    ctx.get(path).and_then(Value::as_str).map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
