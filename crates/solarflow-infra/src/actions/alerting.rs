//! Alert actions: what fires when an alert rule triggers.
//!
//! These run with the alert context (`alert.id`, `alert.name`,
//! `alert.severity`, `alert.condition` plus the system-state snapshot) and
//! notify the operator or record follow-up work.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use solarflow_core::action::{ActionRegistry, BoxAction};
use solarflow_core::notify::NotificationDispatcher;
use solarflow_core::store::RecordStore;
use solarflow_core::workflow::ExecutionContext;
use solarflow_types::error::ActionError;
use solarflow_types::notification::{Channel, Message, Priority};
use uuid::Uuid;

use super::{EVENT_COLLECTION, TICKET_COLLECTION, alert_priority, ctx_str};

pub(crate) fn register<S, N>(
    registry: &mut ActionRegistry,
    store: &Arc<S>,
    dispatcher: &Arc<N>,
    admin_email: &Arc<String>,
) where
    S: RecordStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let d = dispatcher.clone();
    let admin = admin_email.clone();
    registry.register(
        "send_reminder",
        BoxAction::from_fn(move |ctx| {
            let dispatcher = d.clone();
            let admin = admin.clone();
            async move { send_reminder(dispatcher.as_ref(), &admin, &ctx).await }
        }),
    );

    let d = dispatcher.clone();
    let admin = admin_email.clone();
    registry.register(
        "send_alert",
        BoxAction::from_fn(move |ctx| {
            let dispatcher = d.clone();
            let admin = admin.clone();
            async move { send_alert(dispatcher.as_ref(), &admin, &ctx).await }
        }),
    );

    let s = store.clone();
    let d = dispatcher.clone();
    let admin = admin_email.clone();
    registry.register(
        "escalate_to_admin",
        BoxAction::from_fn(move |ctx| {
            let store = s.clone();
            let dispatcher = d.clone();
            let admin = admin.clone();
            async move { escalate_to_admin(store.as_ref(), dispatcher.as_ref(), &admin, &ctx).await }
        }),
    );

    let s = store.clone();
    registry.register(
        "create_ticket",
        BoxAction::from_fn(move |ctx| {
            let store = s.clone();
            async move { create_ticket(store.as_ref(), &ctx).await }
        }),
    );

    let s = store.clone();
    registry.register(
        "restart_service",
        BoxAction::from_fn(move |ctx| {
            let store = s.clone();
            async move { restart_service(store.as_ref(), &ctx).await }
        }),
    );

    let d = dispatcher.clone();
    let admin = admin_email.clone();
    registry.register(
        "send_notification",
        BoxAction::from_fn(move |ctx| {
            let dispatcher = d.clone();
            let admin = admin.clone();
            async move { send_notification(dispatcher.as_ref(), &admin, &ctx).await }
        }),
    );
}

async fn send_reminder<N: NotificationDispatcher>(
    dispatcher: &N,
    admin_email: &str,
    ctx: &ExecutionContext,
) -> Result<(), ActionError> {
    let message = Message {
        subject: "Lembrete".to_string(),
        body: ctx.render("Lembrete: {alert.name}"),
    };
    dispatcher
        .send(Channel::Email, admin_email, &message, alert_priority(ctx))
        .await?;
    Ok(())
}

async fn send_alert<N: NotificationDispatcher>(
    dispatcher: &N,
    admin_email: &str,
    ctx: &ExecutionContext,
) -> Result<(), ActionError> {
    let message = Message {
        subject: "Alerta do Sistema".to_string(),
        body: ctx.render("Alerta {alert.severity}: {alert.name}"),
    };
    dispatcher
        .send(Channel::Email, admin_email, &message, alert_priority(ctx))
        .await?;
    Ok(())
}

/// Urgent notification plus an escalation entry in the system event log.
async fn escalate_to_admin<S: RecordStore, N: NotificationDispatcher>(
    store: &S,
    dispatcher: &N,
    admin_email: &str,
    ctx: &ExecutionContext,
) -> Result<(), ActionError> {
    let message = Message {
        subject: "Escalonamento".to_string(),
        body: ctx.render("Escalonamento: {alert.name} ({alert.condition})"),
    };
    dispatcher
        .send(Channel::Email, admin_email, &message, Priority::Urgent)
        .await?;

    store
        .insert(
            EVENT_COLLECTION,
            json!({
                "id": Uuid::now_v7().to_string(),
                "level": "warn",
                "kind": "escalation",
                "alert": ctx.get("alert.id").cloned().unwrap_or(Value::Null),
                "at": Utc::now().to_rfc3339(),
            }),
        )
        .await?;
    Ok(())
}

async fn create_ticket<S: RecordStore>(
    store: &S,
    ctx: &ExecutionContext,
) -> Result<(), ActionError> {
    let title =
        ctx_str(ctx, "alert.name").unwrap_or_else(|| "Chamado automático".to_string());
    let record = json!({
        "id": Uuid::now_v7().to_string(),
        "status": "open",
        "title": title,
        "severity": ctx.get("alert.severity").cloned().unwrap_or(json!("medium")),
        "alert": ctx.get("alert.id").cloned().unwrap_or(Value::Null),
        "opened_at": Utc::now().to_rfc3339(),
    });
    store.insert(TICKET_COLLECTION, record).await?;
    tracing::info!(
        alert = %ctx_str(ctx, "alert.id").unwrap_or_default(),
        "support ticket opened"
    );
    Ok(())
}

/// Restart request stub: recorded in the event log for the operator, the
/// actual process supervision lives outside the engine.
async fn restart_service<S: RecordStore>(
    store: &S,
    ctx: &ExecutionContext,
) -> Result<(), ActionError> {
    let trigger = ctx_str(ctx, "alert.id").unwrap_or_else(|| "manual".to_string());
    tracing::warn!(%trigger, "service restart requested");
    store
        .insert(
            EVENT_COLLECTION,
            json!({
                "id": Uuid::now_v7().to_string(),
                "level": "info",
                "kind": "service_restart",
                "trigger": trigger,
                "at": Utc::now().to_rfc3339(),
            }),
        )
        .await?;
    Ok(())
}

/// Generic notification: explicit `recipient`/`subject`/`message` context
/// fields when present, otherwise an admin-facing summary of the alert.
async fn send_notification<N: NotificationDispatcher>(
    dispatcher: &N,
    admin_email: &str,
    ctx: &ExecutionContext,
) -> Result<(), ActionError> {
    let recipient = ctx_str(ctx, "recipient").unwrap_or_else(|| admin_email.to_string());
    let subject =
        ctx_str(ctx, "subject").unwrap_or_else(|| "Notificação do Sistema".to_string());
    let body = ctx_str(ctx, "message")
        .or_else(|| ctx_str(ctx, "alert.name").map(|name| format!("Alerta: {name}")))
        .unwrap_or_else(|| "Notificação automática".to_string());

    dispatcher
        .send(
            Channel::Email,
            &recipient,
            &Message { subject, body },
            alert_priority(ctx),
        )
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::memory_store::MemoryStore;
    use crate::test_support::RecordingDispatcher;

    use super::*;

    const ADMIN: &str = "admin@solarflow.dev";

    fn alert_ctx(severity: &str) -> ExecutionContext {
        ExecutionContext::new(json!({
            "alert": {
                "id": "invoice_overdue",
                "name": "Fatura Vencida",
                "severity": severity,
                "condition": "invoices.overdue > 0",
            },
            "state": { "invoices": { "overdue": 3 } },
        }))
    }

    #[tokio::test]
    async fn test_send_reminder_renders_alert_name() {
        let dispatcher = RecordingDispatcher::new();
        send_reminder(&dispatcher, ADMIN, &alert_ctx("high"))
            .await
            .unwrap();

        let sent = dispatcher.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, ADMIN);
        assert_eq!(sent[0].message.body, "Lembrete: Fatura Vencida");
        assert_eq!(sent[0].priority, Priority::High);
    }

    #[tokio::test]
    async fn test_send_alert_maps_critical_to_urgent() {
        let dispatcher = RecordingDispatcher::new();
        send_alert(&dispatcher, ADMIN, &alert_ctx("critical"))
            .await
            .unwrap();

        let sent = dispatcher.sent();
        assert_eq!(sent[0].priority, Priority::Urgent);
        assert_eq!(sent[0].message.body, "Alerta critical: Fatura Vencida");
    }

    #[tokio::test]
    async fn test_escalate_notifies_and_records_event() {
        let store = MemoryStore::new();
        let dispatcher = RecordingDispatcher::new();
        escalate_to_admin(&store, &dispatcher, ADMIN, &alert_ctx("high"))
            .await
            .unwrap();

        let sent = dispatcher.sent();
        assert_eq!(sent[0].priority, Priority::Urgent);

        let events = store.query(EVENT_COLLECTION, &[]).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["kind"], "escalation");
        assert_eq!(events[0]["alert"], "invoice_overdue");
    }

    #[tokio::test]
    async fn test_create_ticket_opens_ticket() {
        let store = MemoryStore::new();
        create_ticket(&store, &alert_ctx("critical")).await.unwrap();

        let tickets = store.query(TICKET_COLLECTION, &[]).await.unwrap();
        assert_eq!(tickets[0]["status"], "open");
        assert_eq!(tickets[0]["title"], "Fatura Vencida");
        assert_eq!(tickets[0]["severity"], "critical");
    }

    #[tokio::test]
    async fn test_restart_service_records_event() {
        let store = MemoryStore::new();
        restart_service(&store, &alert_ctx("critical")).await.unwrap();

        let events = store.query(EVENT_COLLECTION, &[]).await.unwrap();
        assert_eq!(events[0]["kind"], "service_restart");
        assert_eq!(events[0]["trigger"], "invoice_overdue");
        // Restart bookkeeping must not feed the recent-errors counter.
        assert_eq!(events[0]["level"], "info");
    }

    #[tokio::test]
    async fn test_send_notification_defaults_to_admin_summary() {
        let dispatcher = RecordingDispatcher::new();
        send_notification(&dispatcher, ADMIN, &alert_ctx("medium"))
            .await
            .unwrap();

        let sent = dispatcher.sent();
        assert_eq!(sent[0].recipient, ADMIN);
        assert_eq!(sent[0].message.body, "Alerta: Fatura Vencida");
        assert_eq!(sent[0].priority, Priority::Medium);
    }

    #[tokio::test]
    async fn test_send_notification_honors_explicit_fields() {
        let dispatcher = RecordingDispatcher::new();
        let ctx = ExecutionContext::new(json!({
            "recipient": "maria@example.com",
            "subject": "Aviso",
            "message": "Sua fatura fecha amanhã",
        }));
        send_notification(&dispatcher, ADMIN, &ctx).await.unwrap();

        let sent = dispatcher.sent();
        assert_eq!(sent[0].recipient, "maria@example.com");
        assert_eq!(sent[0].message.subject, "Aviso");
        assert_eq!(sent[0].message.body, "Sua fatura fecha amanhã");
    }
}
