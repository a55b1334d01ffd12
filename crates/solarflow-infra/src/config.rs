//! Engine configuration loaders.
//!
//! Deployment settings live in `settings.toml` (admin email, alert sweep
//! interval, notifier channels, distributor credentials) and fall back to
//! [`EngineSettings::default()`] when the file is missing or malformed. The
//! automation catalog lives in `catalog.yaml` and is validated on load; a
//! missing catalog file means the built-in default catalog.

use std::path::{Path, PathBuf};

use solarflow_core::catalog::{self, CatalogError};
use solarflow_types::config::{AutomationConfig, EngineSettings};
use thiserror::Error;

/// A catalog file could not be loaded or saved.
///
/// Unlike settings, a malformed catalog does not fall back to defaults;
/// parse and validation failures surface here.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Load engine settings from a `settings.toml` path.
///
/// - If the file does not exist, returns [`EngineSettings::default()`].
/// - If the file exists but fails to read or parse, logs a warning and
///   returns the default.
pub async fn load_settings(path: &Path) -> EngineSettings {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No settings file at {}, using defaults", path.display());
            return EngineSettings::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return EngineSettings::default();
        }
    };

    match toml::from_str::<EngineSettings>(&content) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            EngineSettings::default()
        }
    }
}

/// Load and validate an automation catalog from a `catalog.yaml` path.
///
/// A missing file yields the built-in default catalog. Validation here is
/// structural only; action names are checked against the registry when the
/// catalog is installed into the service.
pub async fn load_catalog_file(path: &Path) -> Result<AutomationConfig, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No catalog file at {}, using the default catalog",
                path.display()
            );
            return Ok(catalog::default_catalog());
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: err,
            });
        }
    };

    let config = catalog::parse_catalog(&content)?;
    catalog::validate_catalog(&config, None)?;
    Ok(config)
}

/// Serialize a catalog back to YAML at the given path.
pub async fn save_catalog_file(path: &Path, config: &AutomationConfig) -> Result<(), ConfigError> {
    let yaml = catalog::to_yaml(config)?;
    tokio::fs::write(path, yaml)
        .await
        .map_err(|err| ConfigError::Write {
            path: path.to_path_buf(),
            source: err,
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
