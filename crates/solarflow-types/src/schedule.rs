//! Schedule metadata.
//!
//! Read-only entries consumed by the scheduler host in `solarflow-infra`;
//! the engine itself performs no time-based triggering beyond the alert
//! cooldown check.

use serde::{Deserialize, Serialize};

/// A cron-driven standing job: run `action` on the `cron` schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    /// Stable identifier (e.g. "daily_report"). Unique in the catalog.
    pub id: String,
    pub name: String,
    /// Five-field cron expression (minute hour day month weekday).
    pub cron: String,
    /// Action registry name invoked on each tick.
    pub action: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}
