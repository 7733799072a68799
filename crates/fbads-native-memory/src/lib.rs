// # In-memory native layer
//
// This crate implements the four native capability groups of the fbads
// bridge entirely in process. It stands in for the platform SDK in the
// simulator binary and in integration tests.
//
// ## What it models
//
// - Placements initialized through `init`, with a scriptable readiness
//   outcome (`fail_placement`) resolved by `complete_requests`
// - A listener table per event name that can be inspected and driven
// - Interstitial preloads that are consumed by `show_preloaded_ad`
// - Settings state (test devices, log level, tracking status, ...)
// - Capability groups that can be withheld to exercise "module not found"
//
// ## What it does not model
//
// - Timers or background work: nothing happens until the caller drives it
// - Real view hierarchies: view tags are only recorded

use async_trait::async_trait;
use fbads_core::error::{NativeError, NativeResult};
use fbads_core::events::{AD_ERROR_EVENT, MANAGERS_CHANGED_EVENT, NATIVE_AD_LOADED_EVENT};
use fbads_core::traits::{
    AdEventEmitterModule, AdSettingsModule, EventHandler, InterstitialModule, MediaCachePolicy,
    ModuleResolver, NativeAdManagerModule, Platform, SdkLogLevel, TrackingStatus, ViewTag,
};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Device hash reported when none was scripted
pub const DEFAULT_DEVICE_HASH: &str = "memory-device-0000";

/// Capability group that can be withheld from the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    Settings,
    Interstitial,
    NativeAdManager,
    Emitter,
}

/// Arguments of one view registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub native_ad_view: ViewTag,
    pub media_view: ViewTag,
    pub ad_icon_view: ViewTag,
    pub clickable: Vec<ViewTag>,
}

/// Native-side state of one initialized placement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementState {
    pub ads_requested: u32,
    pub ready: bool,
    pub auto_refresh: bool,
    pub cache_policy: Option<MediaCachePolicy>,
}

impl PlacementState {
    fn requested(ads_requested: u32) -> Self {
        Self {
            ads_requested,
            ready: false,
            auto_refresh: true,
            cache_policy: None,
        }
    }
}

/// Settings written through the settings capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsState {
    pub device_hash: String,
    pub test_devices: Vec<String>,
    pub log_level: Option<SdkLogLevel>,
    pub child_directed: Option<bool>,
    pub mediation_service: Option<String>,
    pub url_prefix: Option<String>,
    pub tracking_status: TrackingStatus,
    /// Status granted by the next permission prompt
    pub prompt_result: TrackingStatus,
    pub advertiser_id_collection: Option<bool>,
    pub advertiser_tracking: Option<bool>,
}

impl Default for SettingsState {
    fn default() -> Self {
        Self {
            device_hash: DEFAULT_DEVICE_HASH.to_string(),
            test_devices: Vec::new(),
            log_level: None,
            child_directed: None,
            mediation_service: None,
            url_prefix: None,
            tracking_status: TrackingStatus::NotDetermined,
            prompt_result: TrackingStatus::Authorized,
            advertiser_id_collection: None,
            advertiser_tracking: None,
        }
    }
}

#[derive(Default)]
struct LayerState {
    listeners: Vec<(String, EventHandler)>,
    placements: BTreeMap<String, PlacementState>,
    failing: BTreeSet<String>,
    preloaded: BTreeSet<String>,
    shown: Vec<String>,
    registrations: Vec<Registration>,
    settings: SettingsState,
    withheld: BTreeSet<Capability>,
    fail_registration: bool,
}

struct Inner {
    platform: Platform,
    state: Mutex<LayerState>,
}

/// In-process implementation of every native capability group
///
/// Cheap to clone; clones share the same state. The layer is its own
/// [`ModuleResolver`], so it plugs straight into `NativeModules::new`.
#[derive(Clone)]
pub struct MemoryNativeLayer {
    inner: Arc<Inner>,
}

impl MemoryNativeLayer {
    pub fn new() -> Self {
        Self::with_platform(Platform::default())
    }

    pub fn with_platform(platform: Platform) -> Self {
        Self {
            inner: Arc::new(Inner {
                platform,
                state: Mutex::new(LayerState::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, LayerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ---- scripting ----

    /// Requests for this placement will complete as not ready
    pub fn fail_placement(&self, placement_id: &str) {
        self.state().failing.insert(placement_id.to_string());
    }

    /// Undo [`fail_placement`](Self::fail_placement)
    pub fn clear_failure(&self, placement_id: &str) {
        self.state().failing.remove(placement_id);
    }

    /// Hide a capability group from the resolver
    pub fn withhold(&self, capability: Capability) {
        self.state().withheld.insert(capability);
    }

    /// Make the capability group resolvable again
    pub fn restore(&self, capability: Capability) {
        self.state().withheld.remove(&capability);
    }

    /// Make every view registration fail
    pub fn fail_registrations(&self, fail: bool) {
        self.state().fail_registration = fail;
    }

    /// Status granted by the next tracking permission prompt
    pub fn set_prompt_result(&self, status: TrackingStatus) {
        self.state().settings.prompt_result = status;
    }

    pub fn set_device_hash(&self, hash: impl Into<String>) {
        self.state().settings.device_hash = hash.into();
    }

    /// Resolve every pending ad request
    ///
    /// Placements not marked failing become ready and report their
    /// requested count; a `nativeAdLoaded` event follows for each of them.
    /// Failing placements report `false`. Returns the emitted inventory.
    pub fn complete_requests(&self) -> Value {
        let (inventory, loaded) = {
            let mut state = self.state();
            let LayerState {
                placements,
                failing,
                ..
            } = &mut *state;

            let mut inventory = Map::new();
            let mut loaded = Vec::new();
            for (placement_id, placement) in placements.iter_mut() {
                placement.ready = !failing.contains(placement_id);
                inventory.insert(
                    placement_id.clone(),
                    inventory_value(placement.ready, placement.ads_requested),
                );
                if placement.ready {
                    loaded.push(placement_id.clone());
                }
            }
            (Value::Object(inventory), loaded)
        };

        info!(placements = %inventory, "Completing ad requests");
        self.emit(MANAGERS_CHANGED_EVENT, &inventory);

        for placement_id in loaded {
            let payload = json!({
                "placementId": placement_id,
                "ad": sample_ad(&placement_id),
            });
            self.emit(NATIVE_AD_LOADED_EVENT, &payload);
        }

        inventory
    }

    /// Report the readiness of one placement with an explicit count
    pub fn set_inventory(&self, placement_id: &str, ready: bool, ads_available: u32) {
        {
            let mut state = self.state();
            let placement = state
                .placements
                .entry(placement_id.to_string())
                .or_insert_with(|| PlacementState::requested(ads_available));
            placement.ready = ready;
        }

        let mut payload = Map::new();
        payload.insert(placement_id.to_string(), inventory_value(ready, ads_available));
        self.emit(MANAGERS_CHANGED_EVENT, &Value::Object(payload));
    }

    /// Emit an `onAdError` event, optionally naming a placement
    pub fn report_error(&self, placement_id: Option<&str>, message: &str) {
        let payload = match placement_id {
            Some(placement_id) => json!({ "message": message, "placementId": placement_id }),
            None => json!({ "message": message }),
        };
        warn!(placement_id = ?placement_id, reason = message, "Reporting ad error");
        self.emit(AD_ERROR_EVENT, &payload);
    }

    /// Deliver `payload` to every listener registered for `event_name`
    ///
    /// Handlers are snapshotted first, so a handler may add or remove
    /// listeners while it runs.
    pub fn emit(&self, event_name: &str, payload: &Value) {
        let handlers: Vec<EventHandler> = self
            .state()
            .listeners
            .iter()
            .filter(|(name, _)| name == event_name)
            .map(|(_, handler)| handler.clone())
            .collect();

        debug!(event = event_name, listeners = handlers.len(), "Emitting native event");
        for handler in handlers {
            handler(payload);
        }
    }

    // ---- inspection ----

    pub fn listener_count(&self, event_name: &str) -> usize {
        self.state()
            .listeners
            .iter()
            .filter(|(name, _)| name == event_name)
            .count()
    }

    pub fn total_listeners(&self) -> usize {
        self.state().listeners.len()
    }

    pub fn placement(&self, placement_id: &str) -> Option<PlacementState> {
        self.state().placements.get(placement_id).cloned()
    }

    pub fn placements(&self) -> BTreeMap<String, PlacementState> {
        self.state().placements.clone()
    }

    pub fn registrations(&self) -> Vec<Registration> {
        self.state().registrations.clone()
    }

    pub fn is_preloaded(&self, placement_id: &str) -> bool {
        self.state().preloaded.contains(placement_id)
    }

    /// Placements whose interstitial was displayed, in order
    pub fn shown(&self) -> Vec<String> {
        self.state().shown.clone()
    }

    pub fn settings(&self) -> SettingsState {
        self.state().settings.clone()
    }

    fn resolves(&self, capability: Capability) -> bool {
        !self.state().withheld.contains(&capability)
    }
}

impl Default for MemoryNativeLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryNativeLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("MemoryNativeLayer")
            .field("platform", &self.inner.platform)
            .field("listeners", &state.listeners.len())
            .field("placements", &state.placements.keys().collect::<Vec<_>>())
            .field("failing", &state.failing)
            .finish()
    }
}

/// Inventory value for one placement
///
/// Readiness is read by truthiness, so a ready placement with nothing
/// available is reported as `true` rather than `0`.
fn inventory_value(ready: bool, ads_available: u32) -> Value {
    match (ready, ads_available) {
        (false, _) => Value::Bool(false),
        (true, 0) => Value::Bool(true),
        (true, count) => json!(count),
    }
}

fn sample_ad(placement_id: &str) -> Value {
    json!({
        "headline": format!("Sponsored ({placement_id})"),
        "bodyText": "In-memory native ad",
        "callToActionText": "Learn More",
        "advertiserName": "fbads-native-memory",
        "socialContext": "",
    })
}

#[async_trait]
impl NativeAdManagerModule for MemoryNativeLayer {
    fn init(&self, placement_id: &str, ads_to_request: u32) -> NativeResult<()> {
        if placement_id.is_empty() {
            return Err(NativeError::new("Placement id is empty"));
        }

        let mut state = self.state();
        let placement = state
            .placements
            .entry(placement_id.to_string())
            .or_insert_with(|| PlacementState::requested(ads_to_request));
        placement.ads_requested = ads_to_request;
        placement.ready = false;
        debug!(placement_id, ads_to_request, "Native ads requested");
        Ok(())
    }

    async fn register_views_for_interaction(
        &self,
        native_ad_view_tag: ViewTag,
        media_view_tag: ViewTag,
        ad_icon_view_tag: ViewTag,
        clickable: &[ViewTag],
    ) -> NativeResult<bool> {
        let mut state = self.state();
        if state.fail_registration {
            return Err(NativeError::new("View registration rejected"));
        }

        state.registrations.push(Registration {
            native_ad_view: native_ad_view_tag,
            media_view: media_view_tag,
            ad_icon_view: ad_icon_view_tag,
            clickable: clickable.to_vec(),
        });
        Ok(true)
    }

    fn disable_auto_refresh(&self, placement_id: &str) -> NativeResult<()> {
        let mut state = self.state();
        let placement = state
            .placements
            .get_mut(placement_id)
            .ok_or_else(|| NativeError::new(format!("Unknown placement {placement_id}")))?;
        placement.auto_refresh = false;
        Ok(())
    }

    fn set_media_cache_policy(
        &self,
        placement_id: &str,
        policy: MediaCachePolicy,
    ) -> NativeResult<()> {
        let mut state = self.state();
        let placement = state
            .placements
            .get_mut(placement_id)
            .ok_or_else(|| NativeError::new(format!("Unknown placement {placement_id}")))?;
        placement.cache_policy = Some(policy);
        Ok(())
    }
}

impl AdEventEmitterModule for MemoryNativeLayer {
    fn add_listener(&self, event_name: &str, handler: EventHandler) {
        debug!(event = event_name, "Native listener added");
        self.state().listeners.push((event_name.to_string(), handler));
    }

    fn remove_listener(&self, event_name: &str, handler: &EventHandler) {
        let mut state = self.state();
        let position = state.listeners.iter().position(|(name, registered)| {
            name == event_name && std::ptr::addr_eq(Arc::as_ptr(registered), Arc::as_ptr(handler))
        });
        if let Some(index) = position {
            state.listeners.remove(index);
            debug!(event = event_name, "Native listener removed");
        }
    }
}

#[async_trait]
impl InterstitialModule for MemoryNativeLayer {
    async fn show_ad(&self, placement_id: &str) -> NativeResult<bool> {
        let mut state = self.state();
        if state.failing.contains(placement_id) {
            return Err(NativeError::new("No fill"));
        }
        state.shown.push(placement_id.to_string());
        Ok(true)
    }

    async fn preload_ad(&self, placement_id: &str) -> NativeResult<bool> {
        let mut state = self.state();
        if state.failing.contains(placement_id) {
            return Err(NativeError::new("No fill"));
        }
        state.preloaded.insert(placement_id.to_string());
        Ok(true)
    }

    async fn show_preloaded_ad(&self, placement_id: &str) -> NativeResult<bool> {
        let mut state = self.state();
        if !state.preloaded.remove(placement_id) {
            return Err(NativeError::new(format!(
                "No preloaded interstitial for {placement_id}"
            )));
        }
        state.shown.push(placement_id.to_string());
        Ok(true)
    }
}

#[async_trait]
impl AdSettingsModule for MemoryNativeLayer {
    fn current_device_hash(&self) -> NativeResult<String> {
        Ok(self.state().settings.device_hash.clone())
    }

    fn add_test_device(&self, device_hash: &str) -> NativeResult<()> {
        let mut state = self.state();
        if !state.settings.test_devices.iter().any(|d| d == device_hash) {
            state.settings.test_devices.push(device_hash.to_string());
        }
        Ok(())
    }

    fn clear_test_devices(&self) -> NativeResult<()> {
        self.state().settings.test_devices.clear();
        Ok(())
    }

    fn set_log_level(&self, level: SdkLogLevel) -> NativeResult<()> {
        self.state().settings.log_level = Some(level);
        Ok(())
    }

    fn set_is_child_directed(&self, is_directed: bool) -> NativeResult<()> {
        self.state().settings.child_directed = Some(is_directed);
        Ok(())
    }

    fn set_mediation_service(&self, mediation_service: &str) -> NativeResult<()> {
        self.state().settings.mediation_service = Some(mediation_service.to_string());
        Ok(())
    }

    fn set_url_prefix(&self, url_prefix: &str) -> NativeResult<()> {
        self.state().settings.url_prefix = Some(url_prefix.to_string());
        Ok(())
    }

    async fn request_tracking_permission(&self) -> NativeResult<TrackingStatus> {
        let mut state = self.state();
        if state.settings.tracking_status == TrackingStatus::NotDetermined {
            state.settings.tracking_status = state.settings.prompt_result;
        }
        Ok(state.settings.tracking_status)
    }

    async fn get_tracking_status(&self) -> NativeResult<TrackingStatus> {
        Ok(self.state().settings.tracking_status)
    }

    fn set_advertiser_id_collection_enabled(&self, enabled: bool) -> NativeResult<()> {
        self.state().settings.advertiser_id_collection = Some(enabled);
        Ok(())
    }

    fn set_advertiser_tracking_enabled(&self, enabled: bool) -> NativeResult<()> {
        self.state().settings.advertiser_tracking = Some(enabled);
        Ok(())
    }
}

impl ModuleResolver for MemoryNativeLayer {
    fn resolve_ad_settings(&self) -> Option<Arc<dyn AdSettingsModule>> {
        self.resolves(Capability::Settings)
            .then(|| Arc::new(self.clone()) as Arc<dyn AdSettingsModule>)
    }

    fn resolve_interstitial(&self) -> Option<Arc<dyn InterstitialModule>> {
        self.resolves(Capability::Interstitial)
            .then(|| Arc::new(self.clone()) as Arc<dyn InterstitialModule>)
    }

    fn resolve_native_ad_manager(&self) -> Option<Arc<dyn NativeAdManagerModule>> {
        self.resolves(Capability::NativeAdManager)
            .then(|| Arc::new(self.clone()) as Arc<dyn NativeAdManagerModule>)
    }

    fn resolve_native_ad_emitter(&self) -> Option<Arc<dyn AdEventEmitterModule>> {
        self.resolves(Capability::Emitter)
            .then(|| Arc::new(self.clone()) as Arc<dyn AdEventEmitterModule>)
    }

    fn platform(&self) -> Platform {
        self.inner.platform
    }
}
