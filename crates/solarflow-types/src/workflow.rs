//! Workflow domain types for Solarflow.
//!
//! Defines the canonical representation of an automation workflow: an ordered
//! catalog of steps forming a branching graph, walked sequentially by the
//! runner in `solarflow-core`. Also contains the execution tracking types
//! (`RunReport`, `ApprovalRequest`) produced while a workflow runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notification::{Channel, Priority};

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A named, triggerable graph of steps executed to completion or failure.
///
/// YAML catalog files and the built-in defaults both deserialize into this
/// struct. It is the single source of truth for a workflow's shape; steps
/// have no existence outside their owning workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Stable identifier (e.g. "invoice_processing"). Unique in the catalog.
    pub id: String,
    /// Human-readable workflow name.
    pub name: String,
    /// Optional longer description.
    #[serde(default)]
    pub description: String,
    /// Business event classification that starts this workflow.
    pub trigger: TriggerKind,
    /// Ordered step definitions. The first step is the entry step.
    pub steps: Vec<StepDefinition>,
    /// Disabled workflows are rejected by the automation service.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

impl Workflow {
    /// The entry step: first in catalog order. `None` only for malformed
    /// (empty) definitions, which catalog validation rejects.
    pub fn entry_step(&self) -> Option<&StepDefinition> {
        self.steps.first()
    }

    /// Look up a step by id within this workflow.
    pub fn step(&self, id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == id)
    }
}

/// Business event classification that can start a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    InvoiceDue,
    PaymentReceived,
    ContractSigned,
    SystemAlert,
    Manual,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TriggerKind::InvoiceDue => "invoice_due",
            TriggerKind::PaymentReceived => "payment_received",
            TriggerKind::ContractSigned => "contract_signed",
            TriggerKind::SystemAlert => "system_alert",
            TriggerKind::Manual => "manual",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Step Definition
// ---------------------------------------------------------------------------

/// A single step in a workflow's graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    /// User-defined step ID (e.g. "validate_data"). Unique within a workflow.
    pub id: String,
    /// Human-readable step name.
    pub name: String,
    /// Kind-specific configuration payload.
    pub config: StepConfig,
    /// Successor step ids. Absent successors are terminal.
    #[serde(default)]
    pub next: Branch,
}

/// Successor selection for a step.
///
/// Condition steps follow `on_true` when all comparisons hold and `on_false`
/// otherwise; every other kind follows `on_true` on success. An absent
/// successor ends the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_true: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_false: Option<String>,
}

impl Branch {
    /// Terminal step: no successors.
    pub fn end() -> Self {
        Self::default()
    }

    /// Single outgoing edge.
    pub fn to(step_id: impl Into<String>) -> Self {
        Self {
            on_true: Some(step_id.into()),
            on_false: None,
        }
    }

    /// Two-way branch for condition steps.
    pub fn fork(on_true: impl Into<String>, on_false: impl Into<String>) -> Self {
        Self {
            on_true: Some(on_true.into()),
            on_false: Some(on_false.into()),
        }
    }
}

/// Step-specific configuration payload.
///
/// Internally tagged by `kind` to match the catalog YAML structure:
/// ```yaml
/// config:
///   kind: condition
///   comparisons:
///     - { field: invoice.amount, op: ">", value: 0 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepConfig {
    /// Evaluate comparisons against the run context; all must hold (AND).
    Condition {
        #[serde(default)]
        comparisons: Vec<Comparison>,
    },
    /// Invoke a named handler from the action registry.
    Action { action: String },
    /// Fan a rendered message out over the listed channels.
    Notification {
        channels: Vec<Channel>,
        /// Dot path into the run context resolving to the recipient address.
        #[serde(default = "default_recipient_path")]
        recipient_path: String,
        #[serde(default)]
        subject: String,
        /// Message body; `{dot.path}` placeholders resolve against the context.
        message: String,
        #[serde(default)]
        priority: Priority,
    },
    /// Persist an approval request; does not block on a human decision.
    Approval {
        approvers: Vec<String>,
        #[serde(default = "default_approval_timeout_hours")]
        timeout_hours: i64,
    },
}

fn default_recipient_path() -> String {
    "customer.email".to_string()
}

fn default_approval_timeout_hours() -> i64 {
    24
}

impl StepConfig {
    /// Short kind label for logs and display.
    pub fn kind(&self) -> &'static str {
        match self {
            StepConfig::Condition { .. } => "condition",
            StepConfig::Action { .. } => "action",
            StepConfig::Notification { .. } => "notification",
            StepConfig::Approval { .. } => "approval",
        }
    }
}

// ---------------------------------------------------------------------------
// Comparisons
// ---------------------------------------------------------------------------

/// One atomic comparison inside a condition step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    /// Dot path into the run context (e.g. "invoice.amount").
    pub field: String,
    pub op: CompareOp,
    /// Expected value; ignored by `not_empty`.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub value: serde_json::Value,
}

impl Comparison {
    pub fn new(field: impl Into<String>, op: CompareOp, value: serde_json::Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Presence check; carries no expected value.
    pub fn not_empty(field: impl Into<String>) -> Self {
        Self::new(field, CompareOp::NotEmpty, serde_json::Value::Null)
    }
}

/// Comparison operators. A closed set: catalogs naming any other operator
/// fail at deserialization, never at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "not_empty")]
    NotEmpty,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::NotEmpty => "not_empty",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Run Report (execution tracking)
// ---------------------------------------------------------------------------

/// Summary of one completed workflow run. Used for logging and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// UUIDv7 run ID.
    pub run_id: Uuid,
    /// ID of the workflow that ran.
    pub workflow_id: String,
    /// Step ids in execution order.
    pub executed_steps: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Approval Request
// ---------------------------------------------------------------------------

/// Persisted request produced by an approval step.
///
/// The step completes as soon as this record is stored; the human decision
/// arrives later through a separate trigger, outside this engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// UUIDv7 request ID.
    pub id: Uuid,
    /// Run that created the request.
    pub run_id: Uuid,
    pub workflow_id: String,
    pub step_id: String,
    /// Snapshot of the run context at the time of the request.
    pub context: serde_json::Value,
    pub approvers: Vec<String>,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    /// Requests past this instant are flipped to `Expired` by housekeeping.
    pub expires_at: DateTime<Utc>,
}

/// Lifecycle of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
