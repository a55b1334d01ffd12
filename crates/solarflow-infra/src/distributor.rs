//! Energy distributor sync clients (CEMIG, Enel, CPFL).
//!
//! Each client pulls a consumption/billing snapshot for its distributor and
//! the sweep records one sync entry per distributor. Without an API key the
//! client answers with deterministic data shaped like the gateway payloads;
//! with a key it calls the configured base URL.

use chrono::{Datelike, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use solarflow_core::store::RecordStore;
use solarflow_types::config::DistributorSettings;
use uuid::Uuid;

/// Collection the sweep writes one record per successful sync into.
pub const SYNC_COLLECTION: &str = "distributor_syncs";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("distributor '{0}' is disabled")]
    Disabled(String),

    #[error("distributor '{distributor}' request failed: {reason}")]
    Http { distributor: String, reason: String },
}

// ---------------------------------------------------------------------------
// Snapshot + client
// ---------------------------------------------------------------------------

/// One consumption/billing snapshot as reported by a distributor gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributorSnapshot {
    pub distributor: String,
    /// Billing reference month, `YYYY-MM`.
    pub reference_month: String,
    pub energy_consumed_kwh: f64,
    pub energy_compensated_kwh: f64,
    pub billed_amount: f64,
    pub taxes: f64,
    /// `YYYY-MM-DD`.
    pub due_date: String,
    pub status: String,
}

pub struct DistributorClient {
    settings: DistributorSettings,
    http: reqwest::Client,
}

impl DistributorClient {
    pub fn new(settings: DistributorSettings) -> Self {
        Self {
            settings,
            http: reqwest::Client::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Pull the current snapshot for this distributor.
    pub async fn fetch_snapshot(&self) -> Result<DistributorSnapshot, SyncError> {
        if !self.settings.enabled {
            return Err(SyncError::Disabled(self.settings.name.clone()));
        }
        match &self.settings.api_key {
            Some(key) => self.fetch_live(key).await,
            // No credentials configured: deterministic data keeps the daily
            // sync exercisable end to end.
            None => Ok(stub_snapshot(&self.settings.name, Utc::now().date_naive())),
        }
    }

    async fn fetch_live(&self, key: &str) -> Result<DistributorSnapshot, SyncError> {
        let url = format!(
            "{}/consumption/current",
            self.settings.base_url.trim_end_matches('/')
        );
        tracing::debug!(distributor = %self.settings.name, %url, "fetching distributor snapshot");

        let response = self
            .http
            .get(&url)
            .bearer_auth(key)
            .send()
            .await
            .map_err(|err| SyncError::Http {
                distributor: self.settings.name.clone(),
                reason: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(SyncError::Http {
                distributor: self.settings.name.clone(),
                reason: format!("gateway returned {}", response.status()),
            });
        }
        response.json().await.map_err(|err| SyncError::Http {
            distributor: self.settings.name.clone(),
            reason: err.to_string(),
        })
    }
}

/// Deterministic per-distributor snapshot for keyless configurations.
fn stub_snapshot(name: &str, today: NaiveDate) -> DistributorSnapshot {
    let salt = name
        .bytes()
        .enumerate()
        .map(|(i, b)| (i as u64 + 1) * u64::from(b))
        .sum::<u64>()
        % 97;
    let salt = salt as f64;

    let month_start = today.with_day(1).unwrap_or(today);
    // Bills fall due on the 10th of the following month.
    let due = month_start
        .checked_add_months(Months::new(1))
        .map(|d| d + Duration::days(9))
        .unwrap_or(month_start);

    DistributorSnapshot {
        distributor: name.to_string(),
        reference_month: month_start.format("%Y-%m").to_string(),
        energy_consumed_kwh: 1500.0 + salt,
        energy_compensated_kwh: 1200.0 + salt,
        billed_amount: 1250.0 + salt,
        taxes: 150.0 + salt / 10.0,
        due_date: due.format("%Y-%m-%d").to_string(),
        status: "pending".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub distributor: String,
    pub reason: String,
}

/// Per-distributor outcome of one sync sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub synced: Vec<String>,
    pub failed: Vec<SyncFailure>,
    pub skipped: Vec<String>,
}

pub struct DistributorSync {
    clients: Vec<DistributorClient>,
}

impl DistributorSync {
    pub fn new(settings: &[DistributorSettings]) -> Self {
        Self {
            clients: settings
                .iter()
                .cloned()
                .map(DistributorClient::new)
                .collect(),
        }
    }

    /// Sync every enabled distributor. Disabled ones are skipped; a failed
    /// gateway is recorded and the sweep moves on to the next distributor.
    pub async fn sync_all<S: RecordStore>(&self, store: &S) -> SyncReport {
        let mut report = SyncReport::default();

        for client in &self.clients {
            if !client.enabled() {
                report.skipped.push(client.name().to_string());
                continue;
            }
            match client.fetch_snapshot().await {
                Ok(snapshot) => match self.record(store, &snapshot).await {
                    Ok(()) => report.synced.push(client.name().to_string()),
                    Err(reason) => {
                        tracing::warn!(distributor = %client.name(), %reason, "sync record insert failed");
                        report.failed.push(SyncFailure {
                            distributor: client.name().to_string(),
                            reason,
                        });
                    }
                },
                Err(err) => {
                    tracing::warn!(distributor = %client.name(), error = %err, "distributor sync failed");
                    report.failed.push(SyncFailure {
                        distributor: client.name().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            synced = report.synced.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "distributor sync completed"
        );
        report
    }

    async fn record<S: RecordStore>(
        &self,
        store: &S,
        snapshot: &DistributorSnapshot,
    ) -> Result<(), String> {
        let mut record = serde_json::to_value(snapshot).map_err(|err| err.to_string())?;
        if let Some(fields) = record.as_object_mut() {
            fields.insert("id".to_string(), json!(Uuid::now_v7().to_string()));
            fields.insert("synced_at".to_string(), json!(Utc::now().to_rfc3339()));
        }
        store
            .insert(SYNC_COLLECTION, record)
            .await
            .map_err(|err| err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
