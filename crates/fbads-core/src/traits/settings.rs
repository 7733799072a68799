// # Ad Settings Capability
//
// SDK-wide settings exposed by the native layer (`CTKAdSettingsManager`).
//
// Setters are fire-and-forget on the native side; only the tracking
// permission queries resolve asynchronously.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::NativeResult;

/// SDK log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdkLogLevel {
    None,
    Debug,
    Verbose,
    Warning,
    Error,
    Notification,
}

impl SdkLogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SdkLogLevel::None => "none",
            SdkLogLevel::Debug => "debug",
            SdkLogLevel::Verbose => "verbose",
            SdkLogLevel::Warning => "warning",
            SdkLogLevel::Error => "error",
            SdkLogLevel::Notification => "notification",
        }
    }
}

impl fmt::Display for SdkLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// App tracking authorization status (iOS 14+)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackingStatus {
    Unavailable,
    Denied,
    Authorized,
    Restricted,
    NotDetermined,
}

/// Trait for the native settings capability
///
/// The optional advertiser setters default to a no-op so that native
/// layers lacking them (older SDKs, Android) need not implement them.
#[async_trait]
pub trait AdSettingsModule: Send + Sync {
    /// Hash of the device id, used to register test devices
    fn current_device_hash(&self) -> NativeResult<String>;

    /// Register a device to receive test ads
    fn add_test_device(&self, device_hash: &str) -> NativeResult<()>;

    /// Forget all registered test devices
    fn clear_test_devices(&self) -> NativeResult<()>;

    fn set_log_level(&self, level: SdkLogLevel) -> NativeResult<()>;

    fn set_is_child_directed(&self, is_directed: bool) -> NativeResult<()>;

    fn set_mediation_service(&self, mediation_service: &str) -> NativeResult<()>;

    fn set_url_prefix(&self, url_prefix: &str) -> NativeResult<()>;

    /// Prompt the user for tracking permission
    async fn request_tracking_permission(&self) -> NativeResult<TrackingStatus>;

    /// Current tracking permission, without prompting
    async fn get_tracking_status(&self) -> NativeResult<TrackingStatus>;

    fn set_advertiser_id_collection_enabled(&self, _enabled: bool) -> NativeResult<()> {
        Ok(())
    }

    fn set_advertiser_tracking_enabled(&self, _enabled: bool) -> NativeResult<()> {
        Ok(())
    }
}
