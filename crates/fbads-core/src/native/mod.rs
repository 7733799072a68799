//! Native capability facade
//!
//! [`NativeModules`] resolves each capability group through a
//! [`ModuleResolver`] the first time it is needed and caches the handle.
//! A group the resolver cannot provide surfaces as
//! [`ErrorCode::ModuleNotFound`](crate::error::ErrorCode::ModuleNotFound),
//! which callers can tell apart from a failure inside a resolved capability.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fbads_core::native::NativeModules;
//!
//! let modules = NativeModules::new(resolver);
//! let manager = modules.native_ad_manager()?;
//! manager.init("placement", 10)?;
//! ```

use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::{
    AdEventEmitterModule, AdSettingsModule, InterstitialModule, ModuleResolver,
    NativeAdManagerModule, Platform,
};
use crate::utils::{read, write};

/// Native name of the settings capability
pub const AD_SETTINGS_MODULE: &str = "CTKAdSettingsManager";
/// Native name of the interstitial capability
pub const INTERSTITIAL_MODULE: &str = "CTKInterstitialAdManager";
/// Native name of the ad manager capability
pub const NATIVE_AD_MANAGER_MODULE: &str = "CTKNativeAdManager";
/// Native name of the event source
pub const NATIVE_AD_EMITTER_MODULE: &str = "CTKNativeAdEmitter";

#[derive(Default)]
struct ModuleCache {
    ad_settings: Option<Arc<dyn AdSettingsModule>>,
    interstitial: Option<Arc<dyn InterstitialModule>>,
    native_ad_manager: Option<Arc<dyn NativeAdManagerModule>>,
    native_ad_emitter: Option<Arc<dyn AdEventEmitterModule>>,
}

/// Lazily resolved, cached handles to the native capability groups
///
/// ## Thread Safety
///
/// The cache uses interior mutability with RwLock; clones share it.
#[derive(Clone)]
pub struct NativeModules {
    resolver: Arc<dyn ModuleResolver>,
    cache: Arc<RwLock<ModuleCache>>,
}

impl NativeModules {
    /// Create a facade over `resolver`; nothing is resolved yet
    pub fn new(resolver: Arc<dyn ModuleResolver>) -> Self {
        Self {
            resolver,
            cache: Arc::new(RwLock::new(ModuleCache::default())),
        }
    }

    pub fn ad_settings(&self) -> Result<Arc<dyn AdSettingsModule>> {
        self.cached(
            AD_SETTINGS_MODULE,
            |cache| &mut cache.ad_settings,
            || self.resolver.resolve_ad_settings(),
        )
    }

    pub fn interstitial(&self) -> Result<Arc<dyn InterstitialModule>> {
        self.cached(
            INTERSTITIAL_MODULE,
            |cache| &mut cache.interstitial,
            || self.resolver.resolve_interstitial(),
        )
    }

    pub fn native_ad_manager(&self) -> Result<Arc<dyn NativeAdManagerModule>> {
        self.cached(
            NATIVE_AD_MANAGER_MODULE,
            |cache| &mut cache.native_ad_manager,
            || self.resolver.resolve_native_ad_manager(),
        )
    }

    pub fn native_ad_emitter(&self) -> Result<Arc<dyn AdEventEmitterModule>> {
        self.cached(
            NATIVE_AD_EMITTER_MODULE,
            |cache| &mut cache.native_ad_emitter,
            || self.resolver.resolve_native_ad_emitter(),
        )
    }

    /// Platform reported by the resolver
    pub fn platform(&self) -> Platform {
        self.resolver.platform()
    }

    /// Drop every cached handle; the next access resolves again
    pub fn reset(&self) {
        *write(&self.cache) = ModuleCache::default();
        debug!("Native module cache cleared");
    }

    fn cached<T: ?Sized>(
        &self,
        name: &str,
        slot: fn(&mut ModuleCache) -> &mut Option<Arc<T>>,
        resolve: impl FnOnce() -> Option<Arc<T>>,
    ) -> Result<Arc<T>> {
        {
            let mut cache = write(&self.cache);
            if let Some(handle) = slot(&mut cache) {
                return Ok(Arc::clone(handle));
            }
        }

        // Resolve outside the lock; the resolver is host code.
        let handle = resolve().ok_or_else(|| Error::module_not_found(name))?;
        debug!(module = name, "Resolved native module");

        let mut cache = write(&self.cache);
        Ok(Arc::clone(slot(&mut cache).get_or_insert(handle)))
    }

    /// Whether `name` is currently cached (for diagnostics)
    pub fn is_cached(&self, name: &str) -> bool {
        let cache = read(&self.cache);
        match name {
            AD_SETTINGS_MODULE => cache.ad_settings.is_some(),
            INTERSTITIAL_MODULE => cache.interstitial.is_some(),
            NATIVE_AD_MANAGER_MODULE => cache.native_ad_manager.is_some(),
            NATIVE_AD_EMITTER_MODULE => cache.native_ad_emitter.is_some(),
            _ => false,
        }
    }
}

impl std::fmt::Debug for NativeModules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeModules")
            .field("platform", &self.platform())
            .finish_non_exhaustive()
    }
}
