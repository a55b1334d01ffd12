//! Executes a single workflow step.
//!
//! The step runner owns the per-kind semantics: condition steps produce a
//! branch verdict, action steps call into the registry, notification steps
//! fan out best-effort across channels, and approval steps persist a
//! pending request without blocking the run.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value;
use solarflow_types::error::{ActionError, StoreError};
use solarflow_types::notification::Message;
use solarflow_types::workflow::{ApprovalRequest, ApprovalStatus, StepConfig, StepDefinition};
use thiserror::Error;
use uuid::Uuid;

use crate::action::ActionRegistry;
use crate::notify::NotificationDispatcher;
use crate::store::RecordStore;

use super::condition;
use super::context::ExecutionContext;

/// Collection approval steps write their requests into.
pub const APPROVAL_COLLECTION: &str = "approval_requests";

/// A step failed in a way that aborts the run.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("action '{action}' failed")]
    Action {
        action: String,
        #[source]
        source: ActionError,
    },

    #[error("recipient path '{path}' did not resolve to an address")]
    MissingRecipient { path: String },

    #[error("no notification channel accepted the message")]
    AllChannelsFailed,

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// StepRunner
// ---------------------------------------------------------------------------

pub struct StepRunner<S, N> {
    store: Arc<S>,
    dispatcher: Arc<N>,
    registry: Arc<ActionRegistry>,
}

impl<S, N> StepRunner<S, N>
where
    S: RecordStore,
    N: NotificationDispatcher,
{
    pub fn new(store: Arc<S>, dispatcher: Arc<N>, registry: Arc<ActionRegistry>) -> Self {
        Self {
            store,
            dispatcher,
            registry,
        }
    }

    /// Execute one step. The returned bool is the branch signal: condition
    /// steps report their verdict, every other kind reports `true` on
    /// success.
    pub async fn run(
        &self,
        run_id: Uuid,
        workflow_id: &str,
        step: &StepDefinition,
        ctx: &ExecutionContext,
    ) -> Result<bool, StepError> {
        match &step.config {
            StepConfig::Condition { comparisons } => {
                let verdict = condition::evaluate_all(comparisons, ctx);
                tracing::debug!(
                    %run_id,
                    step = step.id.as_str(),
                    verdict,
                    comparisons = comparisons.len(),
                    "condition evaluated"
                );
                Ok(verdict)
            }
            StepConfig::Action { action } => {
                self.registry
                    .invoke(action, ctx)
                    .await
                    .map_err(|source| StepError::Action {
                        action: action.clone(),
                        source,
                    })?;
                tracing::debug!(%run_id, step = step.id.as_str(), action = action.as_str(), "action completed");
                Ok(true)
            }
            StepConfig::Notification {
                channels,
                recipient_path,
                subject,
                message,
                priority,
            } => {
                let recipient = self.resolve_recipient(ctx, recipient_path)?;
                let rendered = Message {
                    subject: ctx.render(subject),
                    body: ctx.render(message),
                };

                // Best effort: one delivered channel makes the step succeed.
                let mut delivered = 0usize;
                for channel in channels {
                    match self
                        .dispatcher
                        .send(*channel, &recipient, &rendered, *priority)
                        .await
                    {
                        Ok(()) => {
                            delivered += 1;
                            tracing::debug!(
                                %run_id,
                                step = step.id.as_str(),
                                %channel,
                                "notification delivered"
                            );
                        }
                        Err(err) => {
                            tracing::warn!(
                                %run_id,
                                step = step.id.as_str(),
                                %channel,
                                error = %err,
                                "notification channel failed"
                            );
                        }
                    }
                }

                if delivered == 0 {
                    return Err(StepError::AllChannelsFailed);
                }
                Ok(true)
            }
            StepConfig::Approval {
                approvers,
                timeout_hours,
            } => {
                let now = Utc::now();
                let request = ApprovalRequest {
                    id: Uuid::now_v7(),
                    run_id,
                    workflow_id: workflow_id.to_owned(),
                    step_id: step.id.clone(),
                    context: ctx.snapshot(),
                    approvers: approvers.clone(),
                    status: ApprovalStatus::Pending,
                    created_at: now,
                    expires_at: now + Duration::hours(*timeout_hours),
                };
                let record = serde_json::to_value(&request)
                    .map_err(|err| StoreError::Serialization(err.to_string()))?;
                self.store.insert(APPROVAL_COLLECTION, record).await?;
                tracing::info!(
                    %run_id,
                    step = step.id.as_str(),
                    request_id = %request.id,
                    approvers = approvers.len(),
                    "approval request recorded"
                );
                Ok(true)
            }
        }
    }

    /// The recipient path must resolve to a non-blank string address.
    fn resolve_recipient(
        &self,
        ctx: &ExecutionContext,
        path: &str,
    ) -> Result<String, StepError> {
        match ctx.get(path) {
            Some(Value::String(address)) if !address.trim().is_empty() => {
                Ok(address.trim().to_owned())
            }
            _ => Err(StepError::MissingRecipient {
                path: path.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
