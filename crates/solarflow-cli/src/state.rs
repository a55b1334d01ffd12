//! Application state wiring the engine together.
//!
//! The automation service is generic over its store, dispatcher and
//! predicate traits; AppState pins them to the concrete infra
//! implementations and loads configuration from disk.

use std::path::Path;
use std::sync::Arc;

use solarflow_core::catalog;
use solarflow_core::service::AutomationService;
use solarflow_infra::actions::standard_registry;
use solarflow_infra::config::{load_catalog_file, load_settings};
use solarflow_infra::memory_store::MemoryStore;
use solarflow_infra::notifier::ChannelNotifier;
use solarflow_infra::predicate::JexlPredicate;
use solarflow_types::config::EngineSettings;

/// Concrete type alias for the service generics pinned to infra implementations.
pub type ConcreteAutomationService = AutomationService<MemoryStore, ChannelNotifier, JexlPredicate>;

/// Shared application state holding the wired engine.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConcreteAutomationService>,
    pub settings: EngineSettings,
}

impl AppState {
    /// Initialize the application state: load settings and catalog, wire
    /// the store, notifier, predicate and action registry into the service.
    ///
    /// The loaded catalog is validated against the registry so a catalog
    /// referencing an unknown action fails here rather than at fire time.
    pub async fn init(settings_path: &Path, catalog_path: &Path) -> anyhow::Result<Self> {
        let settings = load_settings(settings_path).await;
        let config = load_catalog_file(catalog_path).await?;
        tracing::debug!(
            workflows = config.workflows.len(),
            alerts = config.alerts.len(),
            schedules = config.schedules.len(),
            "catalog loaded"
        );

        let store = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(ChannelNotifier::new(settings.notifier.clone()));
        let registry = standard_registry(store.clone(), dispatcher.clone(), &settings);
        catalog::validate_catalog(&config, Some(&registry))?;

        let service = AutomationService::new(
            config,
            store,
            dispatcher,
            Arc::new(JexlPredicate::new()),
            registry,
        );

        Ok(Self {
            service: Arc::new(service),
            settings,
        })
    }
}
