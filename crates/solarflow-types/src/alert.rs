//! Alert rule domain types.
//!
//! An `AlertRule` is a standing condition-action binding evaluated on a
//! schedule and rate-limited by a cooldown window. The evaluation algorithm
//! lives in `solarflow-core::alert`; this module holds the data shape and the
//! pure cooldown arithmetic.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::notification::Priority;

/// A standing alert rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    /// Stable identifier (e.g. "invoice_overdue"). Unique in the catalog.
    pub id: String,
    /// Human-readable rule name.
    pub name: String,
    /// Opaque condition expression handed to the predicate evaluator.
    pub condition: String,
    pub severity: Severity,
    /// Action names executed in order when the rule fires.
    pub actions: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Minimum minutes between successive firings.
    pub cooldown_minutes: i64,
    /// Set by the alert evaluator after every firing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

impl AlertRule {
    /// True while the rule sits inside its cooldown window.
    ///
    /// A rule that never fired is never in cooldown.
    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        match self.last_triggered {
            Some(fired) => now - fired < Duration::minutes(self.cooldown_minutes),
            None => false,
        }
    }
}

/// Alert severity. Closed set; informational metadata attached to dispatched
/// notifications, it does not change the evaluation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Notification priority used when dispatching for this severity.
    pub fn priority(self) -> Priority {
        match self {
            Severity::Low => Priority::Low,
            Severity::Medium => Priority::Medium,
            Severity::High => Priority::High,
            Severity::Critical => Priority::Urgent,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}
