//! Configuration Management
//!
//! Persistent defaults for gcpsync, layered under CLI flags and over the
//! environment/gcloud configuration.

use crate::gcp::auth;
use crate::resource::Defaults;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
    /// Alternative Compute API root, e.g. a private endpoint
    #[serde(default)]
    pub compute_endpoint: Option<String>,
    /// Overrides every resource kind's operation timeout
    #[serde(default)]
    pub operation_timeout_secs: Option<u64>,
    /// Overrides every resource kind's minimum poll interval
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcpsync").join("config.json"))
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from `path`; a missing or unreadable file yields
    /// the defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read config {:?}: {}", path, e);
                Self::default()
            },
        }
    }

    /// Get effective project (CLI > config > environment/gcloud)
    pub fn effective_project(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.project.clone())
            .or_else(auth::get_default_project)
    }

    /// Get effective region (CLI > config > environment/gcloud)
    pub fn effective_region(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.region.clone())
            .or_else(auth::get_default_region)
    }

    /// Get effective zone (CLI > config > environment/gcloud)
    pub fn effective_zone(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.zone.clone())
            .or_else(auth::get_default_zone)
    }

    /// Resolve the ambient defaults for a run
    pub fn defaults(
        &self,
        project: Option<&str>,
        region: Option<&str>,
        zone: Option<&str>,
    ) -> Defaults {
        Defaults {
            project: self.effective_project(project),
            region: self.effective_region(region),
            zone: self.effective_zone(zone),
        }
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_secs.map(Duration::from_secs)
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_ms.map(Duration::from_millis)
    }
}
