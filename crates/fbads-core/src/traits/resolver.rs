// # Module Resolver
//
// Yields handles to the native capability groups. A resolver returning
// `None` means the group is not linked into the host application; the
// facade (`crate::native::NativeModules`) turns that into a
// `MODULE_NOT_FOUND` error.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{AdEventEmitterModule, AdSettingsModule, InterstitialModule, NativeAdManagerModule};

/// Host operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    #[default]
    Android,
}

/// Helper trait for locating native capability groups
pub trait ModuleResolver: Send + Sync {
    fn resolve_ad_settings(&self) -> Option<Arc<dyn AdSettingsModule>>;

    fn resolve_interstitial(&self) -> Option<Arc<dyn InterstitialModule>>;

    fn resolve_native_ad_manager(&self) -> Option<Arc<dyn NativeAdManagerModule>>;

    fn resolve_native_ad_emitter(&self) -> Option<Arc<dyn AdEventEmitterModule>>;

    /// Platform the native layer runs on
    fn platform(&self) -> Platform {
        Platform::default()
    }
}
