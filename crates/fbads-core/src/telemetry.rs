//! Telemetry sink
//!
//! The bridge reports swallowed failures, panicking callbacks and (when
//! enabled) operation timings to a pluggable [`TelemetryService`]. The active
//! service lives behind a [`Telemetry`] handle that every component shares,
//! so replacing it takes effect everywhere at once.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{Error, ErrorCode};
use crate::utils::{read, write};

/// Category of a telemetry event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryKind {
    Error,
    Event,
    Performance,
}

/// A single telemetry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    #[serde(rename = "type")]
    pub kind: TelemetryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl TelemetryEvent {
    /// Create a plain event for `context`
    pub fn new(kind: TelemetryKind, context: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            context: context.into(),
            duration_ms: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Trait for telemetry sinks
pub trait TelemetryService: Send + Sync {
    fn record_event(&self, event: &TelemetryEvent);

    fn record_error(&self, error: &Error);

    fn record_performance(&self, context: &str, duration: Duration);
}

/// Sink that writes everything to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTelemetryService;

impl TelemetryService for DefaultTelemetryService {
    fn record_event(&self, event: &TelemetryEvent) {
        debug!(?event, "[FacebookAds] Event");
    }

    fn record_error(&self, err: &Error) {
        let record = err.to_record();
        error!(
            code = %record.code,
            native_module = %record.native_module,
            timestamp = %record.timestamp,
            "[FacebookAds] Error recorded: {}",
            record.message
        );
    }

    fn record_performance(&self, context: &str, duration: Duration) {
        debug!("[FacebookAds] Performance {}: {}ms", context, duration.as_millis());
    }
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetryService;

impl TelemetryService for NoopTelemetryService {
    fn record_event(&self, _event: &TelemetryEvent) {}

    fn record_error(&self, _error: &Error) {}

    fn record_performance(&self, _context: &str, _duration: Duration) {}
}

/// Shared handle to the active telemetry sink
#[derive(Clone)]
pub struct Telemetry {
    service: Arc<RwLock<Arc<dyn TelemetryService>>>,
}

impl Telemetry {
    /// Handle backed by [`DefaultTelemetryService`]
    pub fn new() -> Self {
        Self::with_service(Arc::new(DefaultTelemetryService))
    }

    /// Handle backed by [`NoopTelemetryService`]
    pub fn noop() -> Self {
        Self::with_service(Arc::new(NoopTelemetryService))
    }

    pub fn with_service(service: Arc<dyn TelemetryService>) -> Self {
        Self {
            service: Arc::new(RwLock::new(service)),
        }
    }

    /// Replace the sink for every holder of this handle
    pub fn set_service(&self, service: Arc<dyn TelemetryService>) {
        *write(&self.service) = service;
    }

    /// Currently active sink
    pub fn service(&self) -> Arc<dyn TelemetryService> {
        Arc::clone(&read(&self.service))
    }

    pub fn record_event(&self, event: &TelemetryEvent) {
        self.service().record_event(event);
    }

    pub fn record_error(&self, error: &Error) {
        self.service().record_error(error);
    }

    pub fn record_performance(&self, context: &str, duration: Duration) {
        self.service().record_performance(context, duration);
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry").finish_non_exhaustive()
    }
}
