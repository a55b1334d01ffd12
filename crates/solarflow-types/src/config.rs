//! Catalog and engine configuration types.
//!
//! `AutomationConfig` is the in-memory catalog owned by the automation
//! service (workflows, alert rules, schedules). `EngineSettings` represents
//! the top-level `settings.toml` controlling the notifier channels, the
//! distributor integrations, and the alert sweep interval. All fields have
//! sensible defaults so an absent file yields a working engine.

use serde::{Deserialize, Serialize};

use crate::alert::AlertRule;
use crate::schedule::Schedule;
use crate::workflow::Workflow;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The automation catalog: everything the engine can execute.
///
/// Loaded once at process start and owned by the automation service; updates
/// replace whole sections (see [`ConfigPatch`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutomationConfig {
    #[serde(default)]
    pub workflows: Vec<Workflow>,
    #[serde(default)]
    pub alerts: Vec<AlertRule>,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
}

impl AutomationConfig {
    /// Look up a workflow by id.
    pub fn workflow(&self, id: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.id == id)
    }

    /// Look up an alert rule by id.
    pub fn alert(&self, id: &str) -> Option<&AlertRule> {
        self.alerts.iter().find(|a| a.id == id)
    }
}

/// Partial catalog update: present sections replace the current ones
/// wholesale, absent sections are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflows: Option<Vec<Workflow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<AlertRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedules: Option<Vec<Schedule>>,
}

// ---------------------------------------------------------------------------
// Engine settings (settings.toml)
// ---------------------------------------------------------------------------

/// Top-level engine settings, loaded from `settings.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Recipient for escalations and admin-facing alert notifications.
    #[serde(default = "default_admin_email")]
    pub admin_email: String,

    /// Interval between alert sweeps in scheduler mode.
    #[serde(default = "default_alert_check_interval")]
    pub alert_check_interval_minutes: u64,

    #[serde(default)]
    pub notifier: NotifierSettings,

    /// Energy distributor integrations polled by the daily sync.
    #[serde(default = "default_distributors")]
    pub distributors: Vec<DistributorSettings>,
}

fn default_admin_email() -> String {
    "admin@solarflow.dev".to_string()
}

fn default_alert_check_interval() -> u64 {
    5
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            admin_email: default_admin_email(),
            alert_check_interval_minutes: default_alert_check_interval(),
            notifier: NotifierSettings::default(),
            distributors: default_distributors(),
        }
    }
}

/// Per-channel notifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierSettings {
    #[serde(default = "default_true")]
    pub email_enabled: bool,

    /// WhatsApp delivery goes through an HTTP gateway; disabled without a URL.
    #[serde(default)]
    pub whatsapp_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp_api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp_api_key: Option<String>,

    #[serde(default)]
    pub sms_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            email_enabled: true,
            whatsapp_enabled: false,
            whatsapp_api_url: None,
            whatsapp_api_key: None,
            sms_enabled: false,
        }
    }
}

/// One energy distributor integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributorSettings {
    /// Distributor slug (e.g. "cemig").
    pub name: String,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// The three distributors the platform integrates with, disabled until an
/// API key is configured.
fn default_distributors() -> Vec<DistributorSettings> {
    [
        ("cemig", "https://api.cemig.com.br/v1"),
        ("enel", "https://api.enel.com.br/v1"),
        ("cpfl", "https://api.cpfl.com.br/v1"),
    ]
    .into_iter()
    .map(|(name, base_url)| DistributorSettings {
        name: name.to_string(),
        base_url: base_url.to_string(),
        api_key: None,
        enabled: false,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_settings_default_values() {
        let settings = EngineSettings::default();
        assert_eq!(settings.admin_email, "admin@solarflow.dev");
        assert_eq!(settings.alert_check_interval_minutes, 5);
        assert!(settings.notifier.email_enabled);
        assert!(!settings.notifier.whatsapp_enabled);
        assert_eq!(settings.distributors.len(), 3);
        assert!(settings.distributors.iter().all(|d| !d.enabled));
    }

    #[test]
    fn test_engine_settings_deserialize_empty_toml() {
        let settings: EngineSettings = toml::from_str("").unwrap();
        assert_eq!(settings.admin_email, "admin@solarflow.dev");
        assert_eq!(settings.distributors.len(), 3);
    }

    #[test]
    fn test_engine_settings_deserialize_with_values() {
        let toml_str = r#"
admin_email = "ops@example.com"
alert_check_interval_minutes = 10

[notifier]
whatsapp_enabled = true
whatsapp_api_url = "https://wa.example.com/send"
whatsapp_api_key = "key-123"

[[distributors]]
name = "cemig"
base_url = "https://api.cemig.com.br/v1"
api_key = "cemig-key"
"#;
        let settings: EngineSettings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.admin_email, "ops@example.com");
        assert_eq!(settings.alert_check_interval_minutes, 10);
        assert!(settings.notifier.whatsapp_enabled);
        assert_eq!(
            settings.notifier.whatsapp_api_url.as_deref(),
            Some("https://wa.example.com/send")
        );
        assert_eq!(settings.distributors.len(), 1);
        assert!(settings.distributors[0].enabled, "enabled defaults to true");
    }

    #[test]
    fn test_config_patch_sections_optional() {
        let patch: ConfigPatch = serde_json::from_str(r#"{"alerts": []}"#).unwrap();
        assert!(patch.workflows.is_none());
        assert!(patch.alerts.as_ref().is_some_and(|a| a.is_empty()));
        assert!(patch.schedules.is_none());
    }

    #[test]
    fn test_catalog_lookups() {
        let mut config = AutomationConfig::default();
        assert!(config.workflow("missing").is_none());
        config.alerts.push(AlertRule {
            id: "low_balance".to_string(),
            name: "Low Balance".to_string(),
            condition: "energy.balance < 100".to_string(),
            severity: crate::alert::Severity::Medium,
            actions: vec!["send_notification".to_string()],
            enabled: true,
            cooldown_minutes: 120,
            last_triggered: None,
        });
        assert!(config.alert("low_balance").is_some());
    }
}
