//! Scheduled housekeeping actions.
//!
//! These run from cron schedules and the daily/weekly automation sweeps:
//! distributor sync, invoice lifecycle upkeep, report generation, backups,
//! and approval-request expiry.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde_json::{Value, json};
use solarflow_core::action::{ActionRegistry, BoxAction};
use solarflow_core::notify::NotificationDispatcher;
use solarflow_core::store::RecordStore;
use solarflow_core::workflow::step_runner::APPROVAL_COLLECTION;
use solarflow_types::error::ActionError;
use solarflow_types::notification::{Channel, Message, Priority};
use solarflow_types::workflow::{CompareOp, Comparison};
use uuid::Uuid;

use crate::distributor::DistributorSync;

use super::{
    BACKUP_COLLECTION, CONTRACT_COLLECTION, EVENT_COLLECTION, INVOICE_COLLECTION,
    PAYMENT_COLLECTION, REPORT_COLLECTION, TICKET_COLLECTION,
};

pub(crate) fn register<S, N>(
    registry: &mut ActionRegistry,
    store: &Arc<S>,
    dispatcher: &Arc<N>,
    sync: &Arc<DistributorSync>,
) where
    S: RecordStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let s = store.clone();
    let distributors = sync.clone();
    registry.register(
        "sync_distributor_data",
        BoxAction::from_fn(move |_ctx| {
            let store = s.clone();
            let sync = distributors.clone();
            async move { sync_distributor_data(&sync, store.as_ref()).await }
        }),
    );

    let s = store.clone();
    let d = dispatcher.clone();
    registry.register(
        "check_overdue_invoices",
        BoxAction::from_fn(move |_ctx| {
            let store = s.clone();
            let dispatcher = d.clone();
            async move { check_overdue_invoices(store.as_ref(), dispatcher.as_ref()).await }
        }),
    );

    let s = store.clone();
    registry.register(
        "generate_monthly_invoices",
        BoxAction::from_fn(move |_ctx| {
            let store = s.clone();
            async move { generate_monthly_invoices(store.as_ref()).await }
        }),
    );

    let s = store.clone();
    registry.register(
        "generate_daily_report",
        BoxAction::from_fn(move |_ctx| {
            let store = s.clone();
            async move { write_report(store.as_ref(), "daily").await }
        }),
    );

    let s = store.clone();
    registry.register(
        "generate_weekly_report",
        BoxAction::from_fn(move |_ctx| {
            let store = s.clone();
            async move { write_report(store.as_ref(), "weekly").await }
        }),
    );

    let s = store.clone();
    let d = dispatcher.clone();
    registry.register(
        "send_invoice_reminders",
        BoxAction::from_fn(move |_ctx| {
            let store = s.clone();
            let dispatcher = d.clone();
            async move { send_invoice_reminders(store.as_ref(), dispatcher.as_ref()).await }
        }),
    );

    let s = store.clone();
    registry.register(
        "create_system_backup",
        BoxAction::from_fn(move |_ctx| {
            let store = s.clone();
            async move { create_system_backup(store.as_ref()).await }
        }),
    );

    let s = store.clone();
    registry.register(
        "expire_stale_approvals",
        BoxAction::from_fn(move |_ctx| {
            let store = s.clone();
            async move { expire_stale_approvals(store.as_ref()).await }
        }),
    );
}

/// One sweep over the configured distributors. Individual failures are
/// already recorded in the report; the action only fails when every
/// attempted distributor failed.
async fn sync_distributor_data<S: RecordStore>(
    sync: &DistributorSync,
    store: &S,
) -> Result<(), ActionError> {
    let report = sync.sync_all(store).await;
    if report.synced.is_empty() && !report.failed.is_empty() {
        return Err(ActionError::Failed(format!(
            "all {} attempted distributors failed",
            report.failed.len()
        )));
    }
    Ok(())
}

/// Flips pending invoices past their due date to `overdue` and sends the
/// customer an overdue notice. Notices are best effort.
async fn check_overdue_invoices<S, N>(store: &S, dispatcher: &N) -> Result<(), ActionError>
where
    S: RecordStore,
    N: NotificationDispatcher,
{
    let pending = store
        .query(
            INVOICE_COLLECTION,
            &[Comparison::new("status", CompareOp::Eq, json!("pending"))],
        )
        .await?;
    let today = Utc::now().date_naive();
    let mut flipped = 0usize;

    for invoice in &pending {
        let id = match invoice.get("id").and_then(Value::as_str) {
            Some(id) => id,
            None => continue,
        };
        let due = match parse_due_date(invoice.get("due_date")) {
            Some(due) => due,
            None => continue,
        };
        if due >= today {
            continue;
        }

        store
            .update(INVOICE_COLLECTION, id, json!({ "status": "overdue" }))
            .await?;
        flipped += 1;

        if let Some(email) = invoice.get("customer_email").and_then(Value::as_str) {
            let number = invoice.get("number").and_then(Value::as_str).unwrap_or(id);
            let message = Message {
                subject: "Fatura Vencida".to_string(),
                body: format!("Fatura {number} venceu em {due}"),
            };
            if let Err(err) = dispatcher
                .send(Channel::Email, email, &message, Priority::High)
                .await
            {
                tracing::warn!(%err, invoice = id, "overdue notice failed");
            }
        }
    }

    if flipped > 0 {
        tracing::info!(flipped, "invoices marked overdue");
    }
    Ok(())
}

/// Creates this month's pending invoice for every active contract that does
/// not already have one. Safe to run repeatedly within a month.
async fn generate_monthly_invoices<S: RecordStore>(store: &S) -> Result<(), ActionError> {
    let contracts = store
        .query(
            CONTRACT_COLLECTION,
            &[Comparison::new("status", CompareOp::Eq, json!("active"))],
        )
        .await?;
    let today = Utc::now().date_naive();
    let reference_month = today.format("%Y-%m").to_string();
    let due_date = tenth_of_next_month(today).format("%Y-%m-%d").to_string();
    let mut created = 0usize;

    for contract in &contracts {
        let contract_id = match contract.get("id").and_then(Value::as_str) {
            Some(id) => id,
            None => continue,
        };
        let existing = store
            .query(
                INVOICE_COLLECTION,
                &[
                    Comparison::new("contract", CompareOp::Eq, json!(contract_id)),
                    Comparison::new("reference_month", CompareOp::Eq, json!(reference_month)),
                ],
            )
            .await?;
        if !existing.is_empty() {
            continue;
        }

        store
            .insert(
                INVOICE_COLLECTION,
                json!({
                    "id": Uuid::now_v7().to_string(),
                    "status": "pending",
                    "contract": contract_id,
                    "customer_email": contract.get("customer_email").cloned().unwrap_or(Value::Null),
                    "amount": contract.get("monthly_value").cloned().unwrap_or(Value::Null),
                    "reference_month": reference_month,
                    "due_date": due_date,
                    "created_at": Utc::now().to_rfc3339(),
                }),
            )
            .await?;
        created += 1;
    }

    if created > 0 {
        tracing::info!(created, month = %reference_month, "monthly invoices generated");
    }
    Ok(())
}

/// Revenue and status roll-up over invoices, payments and tickets, stored
/// as a report record. Shared by the daily and weekly schedules.
async fn write_report<S: RecordStore>(store: &S, kind: &str) -> Result<(), ActionError> {
    let invoices = store.query(INVOICE_COLLECTION, &[]).await?;
    let payments = store.query(PAYMENT_COLLECTION, &[]).await?;
    let tickets = store.query(TICKET_COLLECTION, &[]).await?;

    let mut paid = 0usize;
    let mut pending = 0usize;
    let mut overdue = 0usize;
    let mut revenue = 0.0f64;
    for invoice in &invoices {
        match invoice.get("status").and_then(Value::as_str) {
            Some("paid") => {
                paid += 1;
                revenue += invoice.get("amount").and_then(Value::as_f64).unwrap_or(0.0);
            }
            Some("pending") => pending += 1,
            Some("overdue") => overdue += 1,
            _ => {}
        }
    }
    let open_tickets = tickets
        .iter()
        .filter(|ticket| ticket.get("status").and_then(Value::as_str) == Some("open"))
        .count();

    store
        .insert(
            REPORT_COLLECTION,
            json!({
                "id": Uuid::now_v7().to_string(),
                "kind": kind,
                "generated_at": Utc::now().to_rfc3339(),
                "invoices": {
                    "total": invoices.len(),
                    "paid": paid,
                    "pending": pending,
                    "overdue": overdue,
                },
                "revenue": revenue,
                "payments": payments.len(),
                "open_tickets": open_tickets,
            }),
        )
        .await?;
    tracing::info!(kind, revenue, "report generated");
    Ok(())
}

/// Reminder email for every pending invoice that carries a customer email.
async fn send_invoice_reminders<S, N>(store: &S, dispatcher: &N) -> Result<(), ActionError>
where
    S: RecordStore,
    N: NotificationDispatcher,
{
    let pending = store
        .query(
            INVOICE_COLLECTION,
            &[Comparison::new("status", CompareOp::Eq, json!("pending"))],
        )
        .await?;
    let mut sent = 0usize;

    for invoice in &pending {
        let email = match invoice.get("customer_email").and_then(Value::as_str) {
            Some(email) => email,
            None => continue,
        };
        let number = invoice.get("number").and_then(Value::as_str).unwrap_or("-");
        let due = invoice.get("due_date").and_then(Value::as_str).unwrap_or("-");
        let message = Message {
            subject: "Lembrete de Fatura".to_string(),
            body: format!("Fatura {number} com vencimento em {due}"),
        };
        match dispatcher
            .send(Channel::Email, email, &message, Priority::Medium)
            .await
        {
            Ok(()) => sent += 1,
            Err(err) => tracing::warn!(%err, "invoice reminder failed"),
        }
    }

    if sent > 0 {
        tracing::info!(sent, "invoice reminders dispatched");
    }
    Ok(())
}

/// Record-count manifest over the engine collections. The backup collection
/// itself is left out of the manifest.
async fn create_system_backup<S: RecordStore>(store: &S) -> Result<(), ActionError> {
    const MANIFEST_COLLECTIONS: [&str; 7] = [
        INVOICE_COLLECTION,
        PAYMENT_COLLECTION,
        CONTRACT_COLLECTION,
        TICKET_COLLECTION,
        EVENT_COLLECTION,
        REPORT_COLLECTION,
        APPROVAL_COLLECTION,
    ];

    let mut collections = serde_json::Map::new();
    let mut total = 0usize;
    for name in MANIFEST_COLLECTIONS {
        let count = store.query(name, &[]).await?.len();
        total += count;
        collections.insert(name.to_string(), json!(count));
    }

    store
        .insert(
            BACKUP_COLLECTION,
            json!({
                "id": Uuid::now_v7().to_string(),
                "created_at": Utc::now().to_rfc3339(),
                "collections": collections,
                "total_records": total,
            }),
        )
        .await?;
    tracing::info!(total, "system backup recorded");
    Ok(())
}

/// Flips pending approval requests past `expires_at` to `expired`.
async fn expire_stale_approvals<S: RecordStore>(store: &S) -> Result<(), ActionError> {
    let pending = store
        .query(
            APPROVAL_COLLECTION,
            &[Comparison::new("status", CompareOp::Eq, json!("pending"))],
        )
        .await?;
    let now = Utc::now();
    let mut expired = 0usize;

    for request in &pending {
        let id = match request.get("id").and_then(Value::as_str) {
            Some(id) => id,
            None => continue,
        };
        let stale = request
            .get("expires_at")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .is_some_and(|at| at.with_timezone(&Utc) < now);
        if stale {
            store
                .update(APPROVAL_COLLECTION, id, json!({ "status": "expired" }))
                .await?;
            expired += 1;
        }
    }

    if expired > 0 {
        tracing::info!(expired, "stale approval requests expired");
    }
    Ok(())
}

fn parse_due_date(value: Option<&Value>) -> Option<NaiveDate> {
    let raw = value.and_then(Value::as_str)?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|at| at.date_naive())
    })
}

fn tenth_of_next_month(today: NaiveDate) -> NaiveDate {
    let month_start = today.with_day(1).unwrap_or(today);
    month_start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.with_day(10))
        .unwrap_or(today)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use solarflow_types::config::DistributorSettings;

    use crate::distributor::SYNC_COLLECTION;
    use crate::memory_store::MemoryStore;
    use crate::test_support::RecordingDispatcher;

    use super::*;

    fn distributor(name: &str, enabled: bool) -> DistributorSettings {
        DistributorSettings {
            name: name.to_string(),
            base_url: format!("https://api.{name}.example"),
            api_key: None,
            enabled,
        }
    }

    // -----------------------------------------------------------------------
    // Distributor sync
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_sync_distributor_data_records_snapshots() {
        let store = MemoryStore::new();
        let sync = DistributorSync::new(&[distributor("cemig", true), distributor("enel", true)]);

        sync_distributor_data(&sync, &store).await.unwrap();

        let records = store.query(SYNC_COLLECTION, &[]).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_sync_distributor_data_fails_when_all_attempts_fail() {
        let store = MemoryStore::new();
        // An API key forces the live HTTP path; nothing listens on this port.
        let sync = DistributorSync::new(&[DistributorSettings {
            name: "cemig".to_string(),
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: Some("token".to_string()),
            enabled: true,
        }]);

        let err = sync_distributor_data(&sync, &store).await.unwrap_err();
        assert!(matches!(err, ActionError::Failed(_)));
    }

    // -----------------------------------------------------------------------
    // Invoice upkeep
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_check_overdue_flips_and_notifies() {
        let store = MemoryStore::new();
        let dispatcher = RecordingDispatcher::new();
        store
            .insert(
                INVOICE_COLLECTION,
                json!({
                    "id": "inv-1",
                    "status": "pending",
                    "number": "FAT-001",
                    "due_date": "2020-01-15",
                    "customer_email": "maria@example.com",
                }),
            )
            .await
            .unwrap();
        store
            .insert(
                INVOICE_COLLECTION,
                json!({
                    "id": "inv-2",
                    "status": "pending",
                    "due_date": "2999-01-15",
                    "customer_email": "joao@example.com",
                }),
            )
            .await
            .unwrap();

        check_overdue_invoices(&store, &dispatcher).await.unwrap();

        let overdue = store
            .query(
                INVOICE_COLLECTION,
                &[Comparison::new("status", CompareOp::Eq, json!("overdue"))],
            )
            .await
            .unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0]["id"], "inv-1");

        let sent = dispatcher.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "maria@example.com");
        assert_eq!(sent[0].priority, Priority::High);
        assert!(sent[0].message.body.contains("FAT-001"));
    }

    #[tokio::test]
    async fn test_check_overdue_skips_unparseable_due_date() {
        let store = MemoryStore::new();
        let dispatcher = RecordingDispatcher::new();
        store
            .insert(
                INVOICE_COLLECTION,
                json!({ "id": "inv-1", "status": "pending", "due_date": "em breve" }),
            )
            .await
            .unwrap();

        check_overdue_invoices(&store, &dispatcher).await.unwrap();

        let records = store.query(INVOICE_COLLECTION, &[]).await.unwrap();
        assert_eq!(records[0]["status"], "pending");
        assert!(dispatcher.sent().is_empty());
    }

    #[tokio::test]
    async fn test_generate_monthly_invoices_covers_active_contracts() {
        let store = MemoryStore::new();
        store
            .insert(
                CONTRACT_COLLECTION,
                json!({
                    "id": "ctr-1",
                    "status": "active",
                    "customer_email": "maria@example.com",
                    "monthly_value": 450.0,
                }),
            )
            .await
            .unwrap();
        store
            .insert(
                CONTRACT_COLLECTION,
                json!({ "id": "ctr-2", "status": "cancelled", "monthly_value": 300.0 }),
            )
            .await
            .unwrap();

        generate_monthly_invoices(&store).await.unwrap();

        let invoices = store.query(INVOICE_COLLECTION, &[]).await.unwrap();
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0]["status"], "pending");
        assert_eq!(invoices[0]["contract"], "ctr-1");
        assert_eq!(invoices[0]["amount"], 450.0);
        assert_eq!(
            invoices[0]["reference_month"],
            Utc::now().date_naive().format("%Y-%m").to_string()
        );
        let due = invoices[0]["due_date"].as_str().unwrap();
        assert!(due.ends_with("-10"), "due on the 10th, got {due}");
    }

    #[tokio::test]
    async fn test_generate_monthly_invoices_is_idempotent_within_month() {
        let store = MemoryStore::new();
        store
            .insert(
                CONTRACT_COLLECTION,
                json!({ "id": "ctr-1", "status": "active", "monthly_value": 450.0 }),
            )
            .await
            .unwrap();

        generate_monthly_invoices(&store).await.unwrap();
        generate_monthly_invoices(&store).await.unwrap();

        let invoices = store.query(INVOICE_COLLECTION, &[]).await.unwrap();
        assert_eq!(invoices.len(), 1);
    }

    #[tokio::test]
    async fn test_send_invoice_reminders_targets_pending_only() {
        let store = MemoryStore::new();
        let dispatcher = RecordingDispatcher::new();
        store
            .insert(
                INVOICE_COLLECTION,
                json!({
                    "id": "inv-1",
                    "status": "pending",
                    "number": "FAT-001",
                    "due_date": "2025-07-10",
                    "customer_email": "maria@example.com",
                }),
            )
            .await
            .unwrap();
        store
            .insert(
                INVOICE_COLLECTION,
                json!({
                    "id": "inv-2",
                    "status": "paid",
                    "customer_email": "joao@example.com",
                }),
            )
            .await
            .unwrap();

        send_invoice_reminders(&store, &dispatcher).await.unwrap();

        let sent = dispatcher.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "maria@example.com");
        assert_eq!(sent[0].priority, Priority::Medium);
        assert!(sent[0].message.body.contains("2025-07-10"));
    }

    // -----------------------------------------------------------------------
    // Reports, backup, approval expiry
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_reports_aggregate_invoice_status() {
        let store = MemoryStore::new();
        for (id, status, amount) in [
            ("inv-1", "paid", 100.0),
            ("inv-2", "paid", 250.0),
            ("inv-3", "pending", 80.0),
            ("inv-4", "overdue", 60.0),
        ] {
            store
                .insert(
                    INVOICE_COLLECTION,
                    json!({ "id": id, "status": status, "amount": amount }),
                )
                .await
                .unwrap();
        }
        store
            .insert(PAYMENT_COLLECTION, json!({ "id": "pay-1", "amount": 100.0 }))
            .await
            .unwrap();

        write_report(&store, "daily").await.unwrap();
        write_report(&store, "weekly").await.unwrap();

        let reports = store.query(REPORT_COLLECTION, &[]).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0]["kind"], "daily");
        assert_eq!(reports[0]["revenue"], 350.0);
        assert_eq!(reports[0]["invoices"]["paid"], 2);
        assert_eq!(reports[0]["invoices"]["pending"], 1);
        assert_eq!(reports[0]["invoices"]["overdue"], 1);
        assert_eq!(reports[0]["payments"], 1);
        assert_eq!(reports[1]["kind"], "weekly");
    }

    #[tokio::test]
    async fn test_create_system_backup_counts_collections() {
        let store = MemoryStore::new();
        store
            .insert(INVOICE_COLLECTION, json!({ "id": "inv-1" }))
            .await
            .unwrap();
        store
            .insert(INVOICE_COLLECTION, json!({ "id": "inv-2" }))
            .await
            .unwrap();
        store
            .insert(TICKET_COLLECTION, json!({ "id": "tkt-1", "status": "open" }))
            .await
            .unwrap();

        create_system_backup(&store).await.unwrap();

        let backups = store.query(BACKUP_COLLECTION, &[]).await.unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0]["collections"]["invoices"], 2);
        assert_eq!(backups[0]["collections"]["tickets"], 1);
        assert_eq!(backups[0]["total_records"], 3);
    }

    #[tokio::test]
    async fn test_expire_stale_approvals_flips_only_past_due() {
        let store = MemoryStore::new();
        store
            .insert(
                APPROVAL_COLLECTION,
                json!({
                    "id": "req-1",
                    "status": "pending",
                    "expires_at": "2020-01-01T00:00:00Z",
                }),
            )
            .await
            .unwrap();
        store
            .insert(
                APPROVAL_COLLECTION,
                json!({
                    "id": "req-2",
                    "status": "pending",
                    "expires_at": "2999-01-01T00:00:00Z",
                }),
            )
            .await
            .unwrap();

        expire_stale_approvals(&store).await.unwrap();

        let expired = store
            .query(
                APPROVAL_COLLECTION,
                &[Comparison::new("status", CompareOp::Eq, json!("expired"))],
            )
            .await
            .unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0]["id"], "req-1");
    }
}
