//! Automation catalog: built-in defaults, YAML round-trip, validation.
//!
//! The catalog is everything the engine executes: workflow definitions,
//! alert rules and schedule metadata. `default_catalog` is what a fresh
//! install runs; `validate_catalog` is the load-time gate that keeps
//! malformed definitions (dangling successors, cycles, unknown actions,
//! bad cron strings) from ever reaching the runner.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde_json::json;
use solarflow_types::alert::{AlertRule, Severity};
use solarflow_types::config::AutomationConfig;
use solarflow_types::notification::{Channel, Priority};
use solarflow_types::schedule::Schedule;
use solarflow_types::workflow::{
    Branch, CompareOp, Comparison, StepConfig, StepDefinition, TriggerKind, Workflow,
};
use thiserror::Error;

use crate::action::ActionRegistry;

/// A catalog failed to parse or validate.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog parse error: {0}")]
    Parse(String),

    #[error("duplicate workflow id '{0}'")]
    DuplicateWorkflow(String),

    #[error("workflow '{workflow_id}': {reason}")]
    InvalidWorkflow { workflow_id: String, reason: String },

    #[error("workflow '{workflow_id}': duplicate step id '{step_id}'")]
    DuplicateStep {
        workflow_id: String,
        step_id: String,
    },

    #[error("workflow '{workflow_id}': step '{step_id}' points to unknown step '{successor}'")]
    UnknownSuccessor {
        workflow_id: String,
        step_id: String,
        successor: String,
    },

    #[error("workflow '{workflow_id}' has a cycle through step '{step_id}'")]
    Cycle {
        workflow_id: String,
        step_id: String,
    },

    #[error("duplicate alert id '{0}'")]
    DuplicateAlert(String),

    #[error("alert '{alert_id}': {reason}")]
    InvalidAlert { alert_id: String, reason: String },

    #[error("duplicate schedule id '{0}'")]
    DuplicateSchedule(String),

    #[error("schedule '{schedule_id}': invalid cron '{cron}': {reason}")]
    InvalidCron {
        schedule_id: String,
        cron: String,
        reason: String,
    },

    #[error("unknown action '{action}' referenced by {referrer}")]
    UnknownAction { action: String, referrer: String },
}

// ---------------------------------------------------------------------------
// YAML round-trip
// ---------------------------------------------------------------------------

pub fn parse_catalog(yaml: &str) -> Result<AutomationConfig, CatalogError> {
    serde_yaml_ng::from_str(yaml).map_err(|err| CatalogError::Parse(err.to_string()))
}

pub fn to_yaml(config: &AutomationConfig) -> Result<String, CatalogError> {
    serde_yaml_ng::to_string(config).map_err(|err| CatalogError::Parse(err.to_string()))
}

// ---------------------------------------------------------------------------
// Cron normalization
// ---------------------------------------------------------------------------

/// Normalize a 5-field cron expression to the 6-field (with seconds) form
/// the scheduler runs on, validating it with croner.
pub fn normalize_cron(expr: &str) -> Result<String, String> {
    let trimmed = expr.trim();
    let fields = trimmed.split_whitespace().count();
    let six_field = match fields {
        5 => format!("0 {trimmed}"),
        6 => trimmed.to_string(),
        n => return Err(format!("expected 5 or 6 fields, found {n}")),
    };
    six_field
        .parse::<croner::Cron>()
        .map_err(|err| err.to_string())?;
    Ok(six_field)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a catalog before it is installed.
///
/// When a registry is supplied, every action name referenced by a step,
/// alert or schedule must resolve in it; pass `None` to validate structure
/// only (e.g. `sflow validate` on a file, where the registry is implied).
pub fn validate_catalog(
    config: &AutomationConfig,
    registry: Option<&ActionRegistry>,
) -> Result<(), CatalogError> {
    let mut workflow_ids = HashSet::new();
    for workflow in &config.workflows {
        if !workflow_ids.insert(workflow.id.as_str()) {
            return Err(CatalogError::DuplicateWorkflow(workflow.id.clone()));
        }
        validate_workflow(workflow, registry)?;
    }

    let mut alert_ids = HashSet::new();
    for alert in &config.alerts {
        if !alert_ids.insert(alert.id.as_str()) {
            return Err(CatalogError::DuplicateAlert(alert.id.clone()));
        }
        validate_alert(alert, registry)?;
    }

    let mut schedule_ids = HashSet::new();
    for schedule in &config.schedules {
        if !schedule_ids.insert(schedule.id.as_str()) {
            return Err(CatalogError::DuplicateSchedule(schedule.id.clone()));
        }
        normalize_cron(&schedule.cron).map_err(|reason| CatalogError::InvalidCron {
            schedule_id: schedule.id.clone(),
            cron: schedule.cron.clone(),
            reason,
        })?;
        if let Some(registry) = registry {
            if !registry.contains(&schedule.action) {
                return Err(CatalogError::UnknownAction {
                    action: schedule.action.clone(),
                    referrer: format!("schedule '{}'", schedule.id),
                });
            }
        }
    }

    Ok(())
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn validate_workflow(
    workflow: &Workflow,
    registry: Option<&ActionRegistry>,
) -> Result<(), CatalogError> {
    let invalid = |reason: &str| CatalogError::InvalidWorkflow {
        workflow_id: workflow.id.clone(),
        reason: reason.to_string(),
    };

    if !is_valid_id(&workflow.id) {
        return Err(invalid("id must be non-empty snake_case"));
    }
    if workflow.steps.is_empty() {
        return Err(invalid("has no steps"));
    }

    let mut step_ids = HashSet::new();
    for step in &workflow.steps {
        if !is_valid_id(&step.id) {
            return Err(invalid(&format!(
                "step id '{}' must be non-empty snake_case",
                step.id
            )));
        }
        if !step_ids.insert(step.id.as_str()) {
            return Err(CatalogError::DuplicateStep {
                workflow_id: workflow.id.clone(),
                step_id: step.id.clone(),
            });
        }
    }

    for step in &workflow.steps {
        for successor in [&step.next.on_true, &step.next.on_false]
            .into_iter()
            .flatten()
        {
            if !step_ids.contains(successor.as_str()) {
                return Err(CatalogError::UnknownSuccessor {
                    workflow_id: workflow.id.clone(),
                    step_id: step.id.clone(),
                    successor: successor.clone(),
                });
            }
        }

        match &step.config {
            StepConfig::Condition { .. } => {}
            other => {
                if step.next.on_false.is_some() {
                    return Err(invalid(&format!(
                        "step '{}' is a {} step and cannot have on_false",
                        step.id,
                        other.kind()
                    )));
                }
            }
        }

        match &step.config {
            StepConfig::Action { action } => {
                if let Some(registry) = registry {
                    if !registry.contains(action) {
                        return Err(CatalogError::UnknownAction {
                            action: action.clone(),
                            referrer: format!("workflow '{}' step '{}'", workflow.id, step.id),
                        });
                    }
                }
            }
            StepConfig::Notification { channels, .. } => {
                if channels.is_empty() {
                    return Err(invalid(&format!(
                        "notification step '{}' has no channels",
                        step.id
                    )));
                }
            }
            StepConfig::Approval {
                approvers,
                timeout_hours,
            } => {
                if approvers.is_empty() {
                    return Err(invalid(&format!(
                        "approval step '{}' has no approvers",
                        step.id
                    )));
                }
                if *timeout_hours <= 0 {
                    return Err(invalid(&format!(
                        "approval step '{}' timeout must be positive",
                        step.id
                    )));
                }
            }
            StepConfig::Condition { .. } => {}
        }
    }

    detect_cycle(workflow)
}

/// Static cycle detection over the successor graph. The runner keeps its
/// own visited-set guard for catalogs that bypassed validation.
fn detect_cycle(workflow: &Workflow) -> Result<(), CatalogError> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
    for step in &workflow.steps {
        nodes.insert(step.id.as_str(), graph.add_node(step.id.as_str()));
    }
    for step in &workflow.steps {
        let from = nodes[step.id.as_str()];
        for successor in [&step.next.on_true, &step.next.on_false]
            .into_iter()
            .flatten()
        {
            if let Some(&to) = nodes.get(successor.as_str()) {
                graph.add_edge(from, to, ());
            }
        }
    }
    match toposort(&graph, None) {
        Ok(_) => Ok(()),
        Err(cycle) => Err(CatalogError::Cycle {
            workflow_id: workflow.id.clone(),
            step_id: graph[cycle.node_id()].to_string(),
        }),
    }
}

fn validate_alert(alert: &AlertRule, registry: Option<&ActionRegistry>) -> Result<(), CatalogError> {
    let invalid = |reason: &str| CatalogError::InvalidAlert {
        alert_id: alert.id.clone(),
        reason: reason.to_string(),
    };

    if !is_valid_id(&alert.id) {
        return Err(invalid("id must be non-empty snake_case"));
    }
    if alert.condition.trim().is_empty() {
        return Err(invalid("has an empty condition"));
    }
    if alert.actions.is_empty() {
        return Err(invalid("has no actions"));
    }
    if alert.cooldown_minutes < 0 {
        return Err(invalid("cooldown must not be negative"));
    }
    if let Some(registry) = registry {
        for action in &alert.actions {
            if !registry.contains(action) {
                return Err(CatalogError::UnknownAction {
                    action: action.clone(),
                    referrer: format!("alert '{}'", alert.id),
                });
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Built-in catalog
// ---------------------------------------------------------------------------

/// The catalog a fresh install runs when no `catalog.yaml` is supplied.
pub fn default_catalog() -> AutomationConfig {
    AutomationConfig {
        workflows: vec![invoice_processing(), payment_confirmation()],
        alerts: default_alerts(),
        schedules: default_schedules(),
    }
}

fn invoice_processing() -> Workflow {
    let now = Utc::now();
    Workflow {
        id: "invoice_processing".to_string(),
        name: "Processamento de Faturas".to_string(),
        description: "Processamento automático de faturas recebidas".to_string(),
        trigger: TriggerKind::InvoiceDue,
        steps: vec![
            StepDefinition {
                id: "extract_data".to_string(),
                name: "Extrair Dados".to_string(),
                config: StepConfig::Action {
                    action: "extract_pdf_data".to_string(),
                },
                next: Branch::to("validate_data"),
            },
            StepDefinition {
                id: "validate_data".to_string(),
                name: "Validar Dados".to_string(),
                config: StepConfig::Condition {
                    comparisons: vec![
                        Comparison::new("invoice.amount", CompareOp::Gt, json!(0)),
                        Comparison::not_empty("invoice.due_date"),
                    ],
                },
                next: Branch::fork("create_invoice", "manual_review"),
            },
            StepDefinition {
                id: "create_invoice".to_string(),
                name: "Criar Fatura".to_string(),
                config: StepConfig::Action {
                    action: "create_invoice_record".to_string(),
                },
                next: Branch::to("send_notification"),
            },
            StepDefinition {
                id: "send_notification".to_string(),
                name: "Enviar Notificação".to_string(),
                config: StepConfig::Notification {
                    channels: vec![Channel::Email, Channel::Whatsapp],
                    recipient_path: "customer.email".to_string(),
                    subject: "Fatura {invoice.number} disponível".to_string(),
                    message: "Olá {customer.name}, sua fatura {invoice.number} no valor de \
                              R$ {invoice.amount} vence em {invoice.due_date}."
                        .to_string(),
                    priority: Priority::Medium,
                },
                next: Branch::end(),
            },
            StepDefinition {
                id: "manual_review".to_string(),
                name: "Revisão Manual".to_string(),
                config: StepConfig::Approval {
                    approvers: vec!["admin@solarflow.dev".to_string()],
                    timeout_hours: 24,
                },
                next: Branch::end(),
            },
        ],
        enabled: true,
        created_at: now,
        updated_at: now,
    }
}

fn payment_confirmation() -> Workflow {
    let now = Utc::now();
    Workflow {
        id: "payment_confirmation".to_string(),
        name: "Confirmação de Pagamento".to_string(),
        description: "Confirmação automática de pagamentos recebidos".to_string(),
        trigger: TriggerKind::PaymentReceived,
        steps: vec![
            StepDefinition {
                id: "validate_payment".to_string(),
                name: "Validar Pagamento".to_string(),
                config: StepConfig::Condition {
                    comparisons: vec![
                        Comparison::new("payment.amount", CompareOp::Gt, json!(0)),
                        Comparison::new("payment.status", CompareOp::Eq, json!("approved")),
                    ],
                },
                next: Branch::fork("update_invoice", "reject_payment"),
            },
            StepDefinition {
                id: "update_invoice".to_string(),
                name: "Atualizar Fatura".to_string(),
                config: StepConfig::Action {
                    action: "update_invoice_status".to_string(),
                },
                next: Branch::to("send_confirmation"),
            },
            StepDefinition {
                id: "send_confirmation".to_string(),
                name: "Enviar Confirmação".to_string(),
                config: StepConfig::Notification {
                    channels: vec![Channel::Email, Channel::Whatsapp],
                    recipient_path: "customer.email".to_string(),
                    subject: "Pagamento confirmado".to_string(),
                    message: "Olá {customer.name}, confirmamos o pagamento de \
                              R$ {payment.amount} da fatura {invoice.number}."
                        .to_string(),
                    priority: Priority::Medium,
                },
                next: Branch::end(),
            },
            StepDefinition {
                id: "reject_payment".to_string(),
                name: "Rejeitar Pagamento".to_string(),
                config: StepConfig::Action {
                    action: "reject_payment_record".to_string(),
                },
                next: Branch::to("send_rejection"),
            },
            StepDefinition {
                id: "send_rejection".to_string(),
                name: "Enviar Rejeição".to_string(),
                config: StepConfig::Notification {
                    channels: vec![Channel::Email],
                    recipient_path: "customer.email".to_string(),
                    subject: "Pagamento rejeitado".to_string(),
                    message: "Olá {customer.name}, o pagamento da fatura {invoice.number} \
                              foi rejeitado. Entre em contato com o suporte."
                        .to_string(),
                    priority: Priority::High,
                },
                next: Branch::end(),
            },
        ],
        enabled: true,
        created_at: now,
        updated_at: now,
    }
}

fn default_alerts() -> Vec<AlertRule> {
    let rule = |id: &str, name: &str, condition: &str, severity, cooldown, actions: &[&str]| {
        AlertRule {
            id: id.to_string(),
            name: name.to_string(),
            condition: condition.to_string(),
            severity,
            actions: actions.iter().map(|a| a.to_string()).collect(),
            enabled: true,
            cooldown_minutes: cooldown,
            last_triggered: None,
        }
    };
    vec![
        rule(
            "invoice_overdue",
            "Fatura Vencida",
            "invoices.overdue > 0",
            Severity::High,
            60,
            &["send_reminder", "escalate_to_admin"],
        ),
        rule(
            "payment_failed",
            "Pagamento Falhou",
            "payments.failed > 0",
            Severity::Critical,
            30,
            &["send_alert", "create_ticket"],
        ),
        rule(
            "system_error",
            "Erro do Sistema",
            "errors.recent > 5",
            Severity::Critical,
            15,
            &["send_alert", "restart_service"],
        ),
        rule(
            "low_balance",
            "Saldo Baixo",
            "energy.balance_kwh < 100",
            Severity::Medium,
            120,
            &["send_notification"],
        ),
    ]
}

fn default_schedules() -> Vec<Schedule> {
    let schedule = |id: &str, name: &str, cron: &str, action: &str| Schedule {
        id: id.to_string(),
        name: name.to_string(),
        cron: cron.to_string(),
        action: action.to_string(),
        enabled: true,
    };
    vec![
        schedule(
            "daily_report",
            "Relatório Diário",
            "0 8 * * *",
            "generate_daily_report",
        ),
        schedule(
            "invoice_reminder",
            "Lembrete de Faturas",
            "0 9 * * 1-5",
            "send_invoice_reminders",
        ),
        schedule(
            "system_backup",
            "Backup do Sistema",
            "0 2 * * *",
            "create_system_backup",
        ),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
