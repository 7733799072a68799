//! Configuration types for the fbads bridge
//!
//! [`AdsConfig`] is the flat settings record; [`ConfigStore`] owns the
//! process-wide copy and hands out immutable snapshots.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::telemetry::{DefaultTelemetryService, NoopTelemetryService, Telemetry, TelemetryService};
use crate::utils::{read, write};

/// Global ad caching strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
    /// Cache all ad data and assets
    Aggressive,
    /// Cache only when explicitly requested
    #[default]
    Lazy,
    /// Never cache
    None,
}

/// Global bridge configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdsConfig {
    /// Log every configuration change
    #[serde(default)]
    pub enable_debug_logging: bool,

    /// Report errors and events to the telemetry sink
    #[serde(default = "default_enable_telemetry")]
    pub enable_telemetry: bool,

    /// Custom telemetry sink
    #[serde(skip)]
    pub telemetry_service: Option<Arc<dyn TelemetryService>>,

    /// Deadline for native ad requests, in milliseconds (0 disables it)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub cache_policy: CachePolicy,

    /// Report operation timings to the telemetry sink
    #[serde(default)]
    pub enable_performance_monitoring: bool,

    /// Endpoint for telemetry when no custom sink is provided
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry_endpoint: Option<String>,
}

impl AdsConfig {
    /// Request deadline as a [`std::time::Duration`]
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.telemetry_endpoint {
            if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
                return Err(Error::invalid_config(
                    "AdsConfig",
                    format!("telemetryEndpoint must use HTTP or HTTPS scheme. Got: {}", endpoint),
                ));
            }
        }
        Ok(())
    }

    fn apply(&mut self, patch: ConfigPatch) {
        if let Some(v) = patch.enable_debug_logging {
            self.enable_debug_logging = v;
        }
        if let Some(v) = patch.enable_telemetry {
            self.enable_telemetry = v;
        }
        if let Some(v) = patch.telemetry_service {
            self.telemetry_service = Some(v);
        }
        if let Some(v) = patch.request_timeout_ms {
            self.request_timeout_ms = v;
        }
        if let Some(v) = patch.cache_policy {
            self.cache_policy = v;
        }
        if let Some(v) = patch.enable_performance_monitoring {
            self.enable_performance_monitoring = v;
        }
        if let Some(v) = patch.telemetry_endpoint {
            self.telemetry_endpoint = Some(v);
        }
    }
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            enable_debug_logging: false,
            enable_telemetry: default_enable_telemetry(),
            telemetry_service: None,
            request_timeout_ms: default_request_timeout_ms(),
            cache_policy: CachePolicy::default(),
            enable_performance_monitoring: false,
            telemetry_endpoint: None,
        }
    }
}

impl std::fmt::Debug for AdsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdsConfig")
            .field("enable_debug_logging", &self.enable_debug_logging)
            .field("enable_telemetry", &self.enable_telemetry)
            .field("telemetry_service", &self.telemetry_service.as_ref().map(|_| "<custom>"))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("cache_policy", &self.cache_policy)
            .field("enable_performance_monitoring", &self.enable_performance_monitoring)
            .field("telemetry_endpoint", &self.telemetry_endpoint)
            .finish()
    }
}

fn default_enable_telemetry() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

/// Partial configuration merged by [`ConfigStore::configure`]
///
/// Absent fields leave the current value untouched.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    pub enable_debug_logging: Option<bool>,
    pub enable_telemetry: Option<bool>,
    #[serde(skip)]
    pub telemetry_service: Option<Arc<dyn TelemetryService>>,
    pub request_timeout_ms: Option<u64>,
    pub cache_policy: Option<CachePolicy>,
    pub enable_performance_monitoring: Option<bool>,
    pub telemetry_endpoint: Option<String>,
}

impl ConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable_debug_logging(mut self, enabled: bool) -> Self {
        self.enable_debug_logging = Some(enabled);
        self
    }

    pub fn enable_telemetry(mut self, enabled: bool) -> Self {
        self.enable_telemetry = Some(enabled);
        self
    }

    pub fn telemetry_service(mut self, service: Arc<dyn TelemetryService>) -> Self {
        self.telemetry_service = Some(service);
        self
    }

    pub fn request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = Some(policy);
        self
    }

    pub fn enable_performance_monitoring(mut self, enabled: bool) -> Self {
        self.enable_performance_monitoring = Some(enabled);
        self
    }

    pub fn telemetry_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.telemetry_endpoint = Some(endpoint.into());
        self
    }
}

/// Owner of the process-wide configuration
///
/// Cloning the store yields another handle to the same configuration.
/// Snapshots returned by [`ConfigStore::get`] never change after the fact.
#[derive(Clone, Debug)]
pub struct ConfigStore {
    current: Arc<RwLock<Arc<AdsConfig>>>,
    telemetry: Telemetry,
}

impl ConfigStore {
    /// Create a store holding the defaults
    pub fn new(telemetry: Telemetry) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(AdsConfig::default()))),
            telemetry,
        }
    }

    /// Immutable snapshot of the current configuration
    pub fn get(&self) -> Arc<AdsConfig> {
        Arc::clone(&read(&self.current))
    }

    /// Merge a partial configuration
    ///
    /// A telemetry service in the patch becomes the active sink. Turning
    /// telemetry on without one reinstalls the default sink; turning it off
    /// installs a sink that discards everything.
    pub fn configure(&self, patch: ConfigPatch) {
        let service = patch.telemetry_service.clone();
        let enable_telemetry = patch.enable_telemetry;

        let snapshot = {
            let mut guard = write(&self.current);
            let mut next = AdsConfig::clone(&guard);
            next.apply(patch);
            *guard = Arc::new(next);
            Arc::clone(&guard)
        };

        match (service, enable_telemetry) {
            (_, Some(false)) => self.telemetry.set_service(Arc::new(NoopTelemetryService)),
            (Some(service), _) => self.telemetry.set_service(service),
            (None, Some(true)) => self.telemetry.set_service(Arc::new(DefaultTelemetryService)),
            (None, None) => {}
        }

        if snapshot.enable_debug_logging {
            info!("[FacebookAds] Configuration updated: {:?}", snapshot);
        }
    }

    /// Change individual fields in place
    pub fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut AdsConfig),
    {
        let snapshot = {
            let mut guard = write(&self.current);
            let mut next = AdsConfig::clone(&guard);
            change(&mut next);
            *guard = Arc::new(next);
            Arc::clone(&guard)
        };

        if snapshot.enable_debug_logging {
            info!("[FacebookAds] Config updated to: {:?}", snapshot);
        }
    }

    /// Restore the defaults
    pub fn reset(&self) {
        *write(&self.current) = Arc::new(AdsConfig::default());
        debug!("Configuration reset to defaults");
    }

    /// Merge a JSON patch read from `path`
    ///
    /// The merged result is validated before it replaces the current
    /// configuration; a rejected file leaves the store untouched.
    pub async fn load_json_file<P: AsRef<Path>>(&self, path: P) -> Result<Arc<AdsConfig>> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::invalid_config(
                "ConfigStore",
                format!("Failed to read config file {}: {}", path.display(), e),
            )
            .with_cause(e)
        })?;

        let patch: ConfigPatch = serde_json::from_str(&contents).map_err(|e| {
            Error::invalid_config(
                "ConfigStore",
                format!("Invalid config file {}: {}", path.display(), e),
            )
            .with_cause(e)
        })?;

        let mut candidate = AdsConfig::clone(&self.get());
        candidate.apply(patch.clone());
        candidate.validate()?;

        self.configure(patch);
        Ok(self.get())
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(Telemetry::new())
    }
}
