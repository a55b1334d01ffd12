//! Workflow actions for the invoice and payment pipelines.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use solarflow_core::action::{ActionRegistry, BoxAction};
use solarflow_core::store::RecordStore;
use solarflow_core::workflow::ExecutionContext;
use solarflow_types::error::ActionError;
use uuid::Uuid;

use super::{INVOICE_COLLECTION, PAYMENT_COLLECTION, ctx_str};

pub(crate) fn register<S>(registry: &mut ActionRegistry, store: &Arc<S>)
where
    S: RecordStore + 'static,
{
    let s = store.clone();
    registry.register(
        "extract_pdf_data",
        BoxAction::from_fn(move |ctx| {
            let store = s.clone();
            async move { extract_pdf_data(store.as_ref(), &ctx).await }
        }),
    );

    let s = store.clone();
    registry.register(
        "create_invoice_record",
        BoxAction::from_fn(move |ctx| {
            let store = s.clone();
            async move { create_invoice_record(store.as_ref(), &ctx).await }
        }),
    );

    let s = store.clone();
    registry.register(
        "update_invoice_status",
        BoxAction::from_fn(move |ctx| {
            let store = s.clone();
            async move { update_invoice_status(store.as_ref(), &ctx).await }
        }),
    );

    let s = store.clone();
    registry.register(
        "reject_payment_record",
        BoxAction::from_fn(move |ctx| {
            let store = s.clone();
            async move { reject_payment_record(store.as_ref(), &ctx).await }
        }),
    );
}

fn field(source: &Value, key: &str) -> Value {
    source.get(key).cloned().unwrap_or(Value::Null)
}

/// Document-extraction stub: records a draft invoice carrying the fields
/// the real parser will fill from distributor PDFs.
async fn extract_pdf_data<S: RecordStore>(
    store: &S,
    ctx: &ExecutionContext,
) -> Result<(), ActionError> {
    let invoice = ctx.get("invoice").cloned().unwrap_or_else(|| json!({}));
    let record = json!({
        "id": Uuid::now_v7().to_string(),
        "status": "draft",
        "number": field(&invoice, "number"),
        "amount": field(&invoice, "amount"),
        "due_date": field(&invoice, "due_date"),
        "distributor": field(&invoice, "distributor"),
        "installation_number": field(&invoice, "installation_number"),
        "customer_email": ctx.get("customer.email").cloned().unwrap_or(Value::Null),
        "extracted_at": Utc::now().to_rfc3339(),
    });
    store.insert(INVOICE_COLLECTION, record).await?;
    tracing::debug!("invoice draft extracted");
    Ok(())
}

async fn create_invoice_record<S: RecordStore>(
    store: &S,
    ctx: &ExecutionContext,
) -> Result<(), ActionError> {
    let invoice = match ctx.get("invoice").filter(|v| v.is_object()) {
        Some(invoice) => invoice.clone(),
        None => {
            return Err(ActionError::InvalidInput(
                "missing invoice object".to_string(),
            ));
        }
    };
    let record = json!({
        "id": Uuid::now_v7().to_string(),
        "status": "pending",
        "number": field(&invoice, "number"),
        "amount": field(&invoice, "amount"),
        "due_date": field(&invoice, "due_date"),
        "customer_email": ctx.get("customer.email").cloned().unwrap_or(Value::Null),
        "created_at": Utc::now().to_rfc3339(),
    });
    store.insert(INVOICE_COLLECTION, record).await?;
    tracing::info!(
        number = %ctx_str(ctx, "invoice.number").unwrap_or_default(),
        "invoice record created"
    );
    Ok(())
}

async fn update_invoice_status<S: RecordStore>(
    store: &S,
    ctx: &ExecutionContext,
) -> Result<(), ActionError> {
    let id = ctx_str(ctx, "invoice.id")
        .or_else(|| ctx_str(ctx, "payment.invoice_id"))
        .ok_or_else(|| ActionError::InvalidInput("missing invoice id".to_string()))?;
    store
        .update(
            INVOICE_COLLECTION,
            &id,
            json!({ "status": "paid", "paid_at": Utc::now().to_rfc3339() }),
        )
        .await?;
    tracing::info!(invoice = %id, "invoice marked paid");
    Ok(())
}

async fn reject_payment_record<S: RecordStore>(
    store: &S,
    ctx: &ExecutionContext,
) -> Result<(), ActionError> {
    let payment = ctx.get("payment").cloned().unwrap_or_else(|| json!({}));
    let record = json!({
        "id": Uuid::now_v7().to_string(),
        "status": "rejected",
        "amount": field(&payment, "amount"),
        "invoice_id": field(&payment, "invoice_id"),
        "gateway_status": field(&payment, "status"),
        "rejected_at": Utc::now().to_rfc3339(),
    });
    store.insert(PAYMENT_COLLECTION, record).await?;
    tracing::warn!(
        invoice = %ctx_str(ctx, "payment.invoice_id").unwrap_or_default(),
        "payment rejected"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
