//! SDK-wide ad settings
//!
//! [`AdSettings`] wraps the settings capability with the bridge's failure
//! policy:
//!
//! - the device hash getter degrades to an empty string
//! - setters log failures and report them to telemetry, never returning them
//! - tracking permission queries return typed errors to the caller
//!
//! Tracking and advertiser settings only exist on iOS. Elsewhere the queries
//! answer [`TrackingStatus::Unavailable`] and the setters do nothing, without
//! touching the native layer.

use tracing::{debug, error, warn};

use crate::error::{Error, ErrorCode, NativeResult, Result};
use crate::native::NativeModules;
use crate::telemetry::Telemetry;
use crate::traits::{AdSettingsModule, Platform, SdkLogLevel, TrackingStatus};
use crate::utils::with_error_handling;

/// Settings facade
#[derive(Debug, Clone)]
pub struct AdSettings {
    modules: NativeModules,
    telemetry: Telemetry,
}

impl AdSettings {
    pub fn new(modules: NativeModules, telemetry: Telemetry) -> Self {
        Self { modules, telemetry }
    }

    /// Hash of the device id for test ads, or `""` when unavailable
    pub fn current_device_hash(&self) -> String {
        let result = self.modules.ad_settings().and_then(|module| {
            module.current_device_hash().map_err(|e| {
                Error::native("AdSettings.currentDeviceHash", e.message()).with_cause(e)
            })
        });

        match result {
            Ok(hash) => hash,
            Err(err) => {
                warn!("[FacebookAds] Failed to get device hash: {}", err);
                String::new()
            }
        }
    }

    /// Register a device to receive test ads
    ///
    /// An empty hash is rejected before reaching the native layer.
    pub fn add_test_device(&self, device_hash: &str) {
        if device_hash.is_empty() {
            let err = Error::invalid_config(
                "AdSettings.addTestDevice",
                "Device hash must be a non-empty string",
            );
            error!("[FacebookAds] Failed to add test device: {}", err);
            self.telemetry.record_error(&err);
            return;
        }

        self.command("add test device", "AdSettings.addTestDevice", |module| {
            module.add_test_device(device_hash)
        });
    }

    pub fn clear_test_devices(&self) {
        self.command("clear test devices", "AdSettings.clearTestDevices", |module| {
            module.clear_test_devices()
        });
    }

    pub fn set_log_level(&self, level: SdkLogLevel) {
        self.command("set log level", "AdSettings.setLogLevel", |module| {
            module.set_log_level(level)
        });
    }

    pub fn set_is_child_directed(&self, is_directed: bool) {
        self.command(
            "set child-directed status",
            "AdSettings.setIsChildDirected",
            |module| module.set_is_child_directed(is_directed),
        );
    }

    pub fn set_mediation_service(&self, mediation_service: &str) {
        self.command(
            "set mediation service",
            "AdSettings.setMediationService",
            |module| module.set_mediation_service(mediation_service),
        );
    }

    pub fn set_url_prefix(&self, url_prefix: &str) {
        self.command("set URL prefix", "AdSettings.setUrlPrefix", |module| {
            module.set_url_prefix(url_prefix)
        });
    }

    /// Prompt for app tracking permission (iOS 14+)
    pub async fn request_tracking_permission(&self) -> Result<TrackingStatus> {
        if !self.is_ios() {
            return Ok(TrackingStatus::Unavailable);
        }

        let module = self.modules.ad_settings()?;
        with_error_handling(
            module.request_tracking_permission(),
            "requestTrackingPermission",
            ErrorCode::NativeError,
        )
        .await
    }

    /// Current app tracking permission (iOS 14+)
    pub async fn get_tracking_status(&self) -> Result<TrackingStatus> {
        if !self.is_ios() {
            return Ok(TrackingStatus::Unavailable);
        }

        let module = self.modules.ad_settings()?;
        with_error_handling(
            module.get_tracking_status(),
            "getTrackingStatus",
            ErrorCode::NativeError,
        )
        .await
    }

    pub fn set_advertiser_id_collection_enabled(&self, enabled: bool) {
        if !self.is_ios() {
            debug!("Advertiser ID collection is iOS only, ignoring");
            return;
        }
        self.command(
            "set advertiser ID collection",
            "AdSettings.setAdvertiserIDCollectionEnabled",
            |module| module.set_advertiser_id_collection_enabled(enabled),
        );
    }

    pub fn set_advertiser_tracking_enabled(&self, enabled: bool) {
        if !self.is_ios() {
            debug!("Advertiser tracking is iOS only, ignoring");
            return;
        }
        self.command(
            "set advertiser tracking",
            "AdSettings.setAdvertiserTrackingEnabled",
            |module| module.set_advertiser_tracking_enabled(enabled),
        );
    }

    fn is_ios(&self) -> bool {
        self.modules.platform() == Platform::Ios
    }

    /// Run a setter, logging and reporting any failure
    fn command<F>(&self, action: &str, context: &str, call: F)
    where
        F: FnOnce(&dyn AdSettingsModule) -> NativeResult<()>,
    {
        let result = self.modules.ad_settings().and_then(|module| {
            call(module.as_ref()).map_err(|e| Error::native(context, e.message()).with_cause(e))
        });

        if let Err(err) = result {
            error!("[FacebookAds] Failed to {}: {}", action, err);
            self.telemetry.record_error(&err);
        }
    }
}
