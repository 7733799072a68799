//! Test doubles and common utilities for contract tests
//!
//! [`FakeNative`] stands in for all four native capability groups. It
//! records every call, keeps a real listener table that tests can inspect
//! and drive, and can be scripted to fail.

#![allow(dead_code)]

use async_trait::async_trait;
use fbads_core::error::{NativeError, NativeResult};
use fbads_core::native::NativeModules;
use fbads_core::telemetry::{Telemetry, TelemetryEvent, TelemetryService};
use fbads_core::traits::{
    AdEventEmitterModule, AdSettingsModule, EventHandler, InterstitialModule, MediaCachePolicy,
    ModuleResolver, NativeAdManagerModule, Platform, SdkLogLevel, TrackingStatus, ViewTag,
};
use fbads_core::Error;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Arguments of one `register_views_for_interaction` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterCall {
    pub view: ViewTag,
    pub media: ViewTag,
    pub icon: ViewTag,
    pub clickable: Vec<ViewTag>,
}

/// A scriptable in-process native layer
#[derive(Default)]
pub struct FakeNative {
    listeners: Mutex<Vec<(String, EventHandler)>>,
    add_listener_calls: AtomicUsize,
    remove_listener_calls: AtomicUsize,
    init_calls: Mutex<Vec<(String, u32)>>,
    register_calls: Mutex<Vec<RegisterCall>>,
    settings_calls: Mutex<Vec<String>>,
    interstitial_calls: Mutex<Vec<String>>,
    fail_init: AtomicBool,
    fail_register: AtomicBool,
    fail_settings: AtomicBool,
    fail_interstitial: AtomicBool,
    interstitial_delay: Mutex<Option<Duration>>,
}

impl FakeNative {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deliver an event to every listener registered for `event_name`
    pub fn emit(&self, event_name: &str, payload: Value) {
        let handlers: Vec<EventHandler> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == event_name)
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in handlers {
            handler(&payload);
        }
    }

    /// Emit an inventory change for the given placements
    pub fn emit_inventory(&self, entries: &[(&str, bool)]) {
        let payload: serde_json::Map<String, Value> = entries
            .iter()
            .map(|(id, ready)| (id.to_string(), Value::Bool(*ready)))
            .collect();
        self.emit("CTKNativeAdsManagersChanged", Value::Object(payload));
    }

    /// Emit a load error, optionally naming a placement
    pub fn emit_error(&self, message: &str, placement_id: Option<&str>) {
        let payload = match placement_id {
            Some(id) => json!({ "message": message, "placementId": id }),
            None => json!({ "message": message }),
        };
        self.emit("onAdError", payload);
    }

    pub fn listener_count(&self, event_name: &str) -> usize {
        self.listeners
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == event_name)
            .count()
    }

    pub fn total_listeners(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn add_listener_calls(&self) -> usize {
        self.add_listener_calls.load(Ordering::SeqCst)
    }

    pub fn remove_listener_calls(&self) -> usize {
        self.remove_listener_calls.load(Ordering::SeqCst)
    }

    pub fn init_calls(&self) -> Vec<(String, u32)> {
        self.init_calls.lock().unwrap().clone()
    }

    pub fn register_calls(&self) -> Vec<RegisterCall> {
        self.register_calls.lock().unwrap().clone()
    }

    pub fn settings_calls(&self) -> Vec<String> {
        self.settings_calls.lock().unwrap().clone()
    }

    pub fn interstitial_calls(&self) -> Vec<String> {
        self.interstitial_calls.lock().unwrap().clone()
    }

    pub fn fail_init(&self, fail: bool) {
        self.fail_init.store(fail, Ordering::SeqCst);
    }

    pub fn fail_register(&self, fail: bool) {
        self.fail_register.store(fail, Ordering::SeqCst);
    }

    pub fn fail_settings(&self, fail: bool) {
        self.fail_settings.store(fail, Ordering::SeqCst);
    }

    pub fn fail_interstitial(&self, fail: bool) {
        self.fail_interstitial.store(fail, Ordering::SeqCst);
    }

    pub fn delay_interstitial(&self, delay: Duration) {
        *self.interstitial_delay.lock().unwrap() = Some(delay);
    }

    fn settings_call(&self, call: String) -> NativeResult<()> {
        if self.fail_settings.load(Ordering::SeqCst) {
            return Err(NativeError::new(format!("{call} failed")));
        }
        self.settings_calls.lock().unwrap().push(call);
        Ok(())
    }

    async fn interstitial_call(&self, method: &str, placement_id: &str) -> NativeResult<bool> {
        let delay = *self.interstitial_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_interstitial.load(Ordering::SeqCst) {
            return Err(NativeError::new("No fill"));
        }
        self.interstitial_calls
            .lock()
            .unwrap()
            .push(format!("{method}:{placement_id}"));
        Ok(true)
    }
}

#[async_trait]
impl AdSettingsModule for FakeNative {
    fn current_device_hash(&self) -> NativeResult<String> {
        if self.fail_settings.load(Ordering::SeqCst) {
            return Err(NativeError::new("device hash unavailable"));
        }
        Ok("fake-device-hash".to_string())
    }

    fn add_test_device(&self, device_hash: &str) -> NativeResult<()> {
        self.settings_call(format!("addTestDevice:{device_hash}"))
    }

    fn clear_test_devices(&self) -> NativeResult<()> {
        self.settings_call("clearTestDevices".to_string())
    }

    fn set_log_level(&self, level: SdkLogLevel) -> NativeResult<()> {
        self.settings_call(format!("setLogLevel:{level}"))
    }

    fn set_is_child_directed(&self, is_directed: bool) -> NativeResult<()> {
        self.settings_call(format!("setIsChildDirected:{is_directed}"))
    }

    fn set_mediation_service(&self, mediation_service: &str) -> NativeResult<()> {
        self.settings_call(format!("setMediationService:{mediation_service}"))
    }

    fn set_url_prefix(&self, url_prefix: &str) -> NativeResult<()> {
        self.settings_call(format!("setUrlPrefix:{url_prefix}"))
    }

    async fn request_tracking_permission(&self) -> NativeResult<TrackingStatus> {
        if self.fail_settings.load(Ordering::SeqCst) {
            return Err(NativeError::new("Permission request failed"));
        }
        Ok(TrackingStatus::Authorized)
    }

    async fn get_tracking_status(&self) -> NativeResult<TrackingStatus> {
        if self.fail_settings.load(Ordering::SeqCst) {
            return Err(NativeError::new("Status unavailable"));
        }
        Ok(TrackingStatus::NotDetermined)
    }

    fn set_advertiser_tracking_enabled(&self, enabled: bool) -> NativeResult<()> {
        self.settings_call(format!("setAdvertiserTrackingEnabled:{enabled}"))
    }

    fn set_advertiser_id_collection_enabled(&self, enabled: bool) -> NativeResult<()> {
        self.settings_call(format!("setAdvertiserIDCollectionEnabled:{enabled}"))
    }
}

#[async_trait]
impl InterstitialModule for FakeNative {
    async fn show_ad(&self, placement_id: &str) -> NativeResult<bool> {
        self.interstitial_call("showAd", placement_id).await
    }

    async fn preload_ad(&self, placement_id: &str) -> NativeResult<bool> {
        self.interstitial_call("preloadAd", placement_id).await
    }

    async fn show_preloaded_ad(&self, placement_id: &str) -> NativeResult<bool> {
        self.interstitial_call("showPreloadedAd", placement_id).await
    }
}

#[async_trait]
impl NativeAdManagerModule for FakeNative {
    fn init(&self, placement_id: &str, ads_to_request: u32) -> NativeResult<()> {
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(NativeError::new("SDK not initialized"));
        }
        self.init_calls
            .lock()
            .unwrap()
            .push((placement_id.to_string(), ads_to_request));
        Ok(())
    }

    async fn register_views_for_interaction(
        &self,
        native_ad_view_tag: ViewTag,
        media_view_tag: ViewTag,
        ad_icon_view_tag: ViewTag,
        clickable: &[ViewTag],
    ) -> NativeResult<bool> {
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(NativeError::new("View not found"));
        }
        self.register_calls.lock().unwrap().push(RegisterCall {
            view: native_ad_view_tag,
            media: media_view_tag,
            icon: ad_icon_view_tag,
            clickable: clickable.to_vec(),
        });
        Ok(true)
    }

    fn disable_auto_refresh(&self, placement_id: &str) -> NativeResult<()> {
        self.settings_call(format!("disableAutoRefresh:{placement_id}"))
    }

    fn set_media_cache_policy(
        &self,
        placement_id: &str,
        policy: MediaCachePolicy,
    ) -> NativeResult<()> {
        self.settings_call(format!("setMediaCachePolicy:{placement_id}:{policy}"))
    }
}

impl AdEventEmitterModule for FakeNative {
    fn add_listener(&self, event_name: &str, handler: EventHandler) {
        self.add_listener_calls.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .lock()
            .unwrap()
            .push((event_name.to_string(), handler));
    }

    fn remove_listener(&self, event_name: &str, handler: &EventHandler) {
        self.remove_listener_calls.fetch_add(1, Ordering::SeqCst);
        let mut listeners = self.listeners.lock().unwrap();
        if let Some(pos) = listeners
            .iter()
            .position(|(name, h)| {
                name == event_name && std::ptr::addr_eq(Arc::as_ptr(h), Arc::as_ptr(handler))
            })
        {
            listeners.remove(pos);
        }
    }
}

/// Resolver over a [`FakeNative`], with capability groups that can be hidden
pub struct FakeResolver {
    native: Arc<FakeNative>,
    missing: HashSet<&'static str>,
    platform: Platform,
}

impl FakeResolver {
    pub fn new(native: Arc<FakeNative>) -> Self {
        Self {
            native,
            missing: HashSet::new(),
            platform: Platform::Android,
        }
    }

    /// Pretend `module` is not linked ("settings", "interstitial", "manager", "emitter")
    pub fn without(mut self, module: &'static str) -> Self {
        self.missing.insert(module);
        self
    }

    pub fn on(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    fn provides(&self, module: &str) -> bool {
        !self.missing.contains(module)
    }
}

impl ModuleResolver for FakeResolver {
    fn resolve_ad_settings(&self) -> Option<Arc<dyn AdSettingsModule>> {
        self.provides("settings")
            .then(|| self.native.clone() as Arc<dyn AdSettingsModule>)
    }

    fn resolve_interstitial(&self) -> Option<Arc<dyn InterstitialModule>> {
        self.provides("interstitial")
            .then(|| self.native.clone() as Arc<dyn InterstitialModule>)
    }

    fn resolve_native_ad_manager(&self) -> Option<Arc<dyn NativeAdManagerModule>> {
        self.provides("manager")
            .then(|| self.native.clone() as Arc<dyn NativeAdManagerModule>)
    }

    fn resolve_native_ad_emitter(&self) -> Option<Arc<dyn AdEventEmitterModule>> {
        self.provides("emitter")
            .then(|| self.native.clone() as Arc<dyn AdEventEmitterModule>)
    }

    fn platform(&self) -> Platform {
        self.platform
    }
}

/// A fake native layer and a facade over it
pub fn fake_modules() -> (Arc<FakeNative>, NativeModules) {
    let native = FakeNative::new();
    let modules = NativeModules::new(Arc::new(FakeResolver::new(native.clone())));
    (native, modules)
}

/// Telemetry sink that counts what it receives
#[derive(Default)]
pub struct CountingTelemetry {
    events: AtomicUsize,
    errors: Mutex<Vec<Error>>,
    timings: Mutex<Vec<String>>,
}

impl CountingTelemetry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn handle(self: &Arc<Self>) -> Telemetry {
        Telemetry::with_service(self.clone())
    }

    pub fn errors(&self) -> Vec<Error> {
        self.errors.lock().unwrap().clone()
    }

    pub fn timings(&self) -> Vec<String> {
        self.timings.lock().unwrap().clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.load(Ordering::SeqCst)
    }
}

impl TelemetryService for CountingTelemetry {
    fn record_event(&self, _event: &TelemetryEvent) {
        self.events.fetch_add(1, Ordering::SeqCst);
    }

    fn record_error(&self, error: &Error) {
        self.errors.lock().unwrap().push(error.clone());
    }

    fn record_performance(&self, context: &str, _duration: Duration) {
        self.timings.lock().unwrap().push(context.to_string());
    }
}

/// Yield long enough for spawned replay tasks to run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
