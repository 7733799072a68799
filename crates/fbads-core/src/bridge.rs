//! Bridge entry point
//!
//! [`AdsBridge`] wires one native layer to every facade of this crate. An
//! application builds it once and hands out clones; there is no global
//! state.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fbads_core::AdsBridge;
//!
//! let bridge = AdsBridge::new(Arc::new(resolver));
//! bridge.settings().add_test_device("hash");
//!
//! let manager = bridge.create_manager("placement")?;
//! manager.on_ads_loaded(Arc::new(|| println!("ready")));
//! ```

use std::sync::Arc;

use crate::config::{AdsConfig, ConfigPatch, ConfigStore};
use crate::context::NativeAdsManagerContext;
use crate::error::Result;
use crate::hooks::{
    use_native_ad_events, use_native_ads_manager, InterstitialAdHook, NativeAdEvents, NativeAdRef,
    NativeAdsManagerHook,
};
use crate::interstitial::InterstitialAdManager;
use crate::manager::{AdsManagerRegistry, NativeAdsManager};
use crate::native::NativeModules;
use crate::settings::AdSettings;
use crate::telemetry::Telemetry;
use crate::traits::ModuleResolver;

/// Everything the bridge offers, over one native layer
#[derive(Debug, Clone)]
pub struct AdsBridge {
    modules: NativeModules,
    telemetry: Telemetry,
    config: ConfigStore,
    registry: AdsManagerRegistry,
    context: NativeAdsManagerContext,
}

impl AdsBridge {
    /// Build a bridge with default configuration and the default telemetry sink
    pub fn new(resolver: Arc<dyn ModuleResolver>) -> Self {
        Self::with_telemetry(resolver, Telemetry::new())
    }

    pub fn with_telemetry(resolver: Arc<dyn ModuleResolver>, telemetry: Telemetry) -> Self {
        let modules = NativeModules::new(resolver);
        let config = ConfigStore::new(telemetry.clone());
        let registry = AdsManagerRegistry::new(modules.clone(), telemetry.clone());
        let context = NativeAdsManagerContext::new(&modules, telemetry.clone());

        Self {
            modules,
            telemetry,
            config,
            registry,
            context,
        }
    }

    /// Merge `patch` into the configuration
    pub fn configure(&self, patch: ConfigPatch) -> Arc<AdsConfig> {
        self.config.configure(patch);
        self.config.get()
    }

    pub fn settings(&self) -> AdSettings {
        AdSettings::new(self.modules.clone(), self.telemetry.clone())
    }

    pub fn interstitial(&self) -> InterstitialAdManager {
        InterstitialAdManager::new(self.modules.clone(), self.config.clone(), self.telemetry.clone())
    }

    /// Create a manager requesting the default number of ads
    pub fn create_manager(&self, placement_id: &str) -> Result<NativeAdsManager> {
        NativeAdsManager::new(&self.registry, placement_id)
    }

    pub fn create_manager_with(
        &self,
        placement_id: &str,
        ads_to_request: u32,
    ) -> Result<NativeAdsManager> {
        NativeAdsManager::with_ads_to_request(&self.registry, placement_id, ads_to_request)
    }

    pub fn use_native_ads_manager(
        &self,
        placement_id: &str,
        ads_to_request: u32,
    ) -> NativeAdsManagerHook {
        use_native_ads_manager(&self.context, &self.modules, placement_id, ads_to_request)
    }

    pub fn use_interstitial_ad(&self) -> InterstitialAdHook {
        InterstitialAdHook::new(self.interstitial())
    }

    pub fn use_native_ad_ref(&self) -> NativeAdRef {
        NativeAdRef::new(self.modules.clone())
    }

    pub fn use_native_ad_events(&self, placement_id: &str) -> NativeAdEvents {
        use_native_ad_events(&self.modules, placement_id)
    }

    pub fn context(&self) -> &NativeAdsManagerContext {
        &self.context
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn modules(&self) -> &NativeModules {
        &self.modules
    }

    pub fn registry(&self) -> &AdsManagerRegistry {
        &self.registry
    }
}
