//! Native ads managers
//!
//! A [`NativeAdsManager`] tracks ad inventory for one placement. It is
//! created against an [`AdsManagerRegistry`], which listens to the native
//! event source on behalf of every live manager.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fbads_core::manager::{AdsManagerRegistry, NativeAdsManager};
//!
//! let manager = NativeAdsManager::new(&registry, "placement")?;
//! let loaded = manager.on_ads_loaded(Arc::new(|| println!("ads ready")));
//! let failed = manager.on_ads_error(Arc::new(|msg: &str| eprintln!("{msg}")));
//!
//! // later
//! loaded.remove();
//! failed.remove();
//! manager.dispose();
//! ```
//!
//! Construction never fails because the native `init` call failed: the
//! manager starts out errored instead, and the failure is logged and
//! reported to telemetry.

mod instance;
mod registry;

pub use instance::{ErroredCallback, LoadedCallback};
pub use registry::AdsManagerRegistry;

use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

use instance::ManagerCore;
use crate::error::{Error, ErrorCode, Result};
use crate::native::NativeModules;
use crate::subscription::Subscription;
use crate::telemetry::Telemetry;
use crate::traits::{MediaCachePolicy, ViewTag};
use crate::utils::{invoke_guarded, with_error_handling};
use crate::validation::validate_placement_id;

/// Number of ads requested when none is given
pub const DEFAULT_ADS_TO_REQUEST: u32 = 10;

const INIT_CONTEXT: &str = "NativeAdsManager.init";
const REGISTER_VIEWS_CONTEXT: &str = "NativeAdsManager.registerViewsForInteractionAsync";

/// Point-in-time view of a manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSnapshot {
    pub placement_id: String,
    pub is_valid: bool,
    pub is_loading: bool,
}

/// Handle to the native ads of one placement
pub struct NativeAdsManager {
    id: u64,
    core: Arc<ManagerCore>,
    registry: AdsManagerRegistry,
    disposed: AtomicBool,
}

impl NativeAdsManager {
    /// Create a manager requesting [`DEFAULT_ADS_TO_REQUEST`] ads
    pub fn new(registry: &AdsManagerRegistry, placement_id: &str) -> Result<Self> {
        Self::with_ads_to_request(registry, placement_id, DEFAULT_ADS_TO_REQUEST)
    }

    /// Create a manager and ask the native layer for `ads_to_request` ads
    ///
    /// # Errors
    ///
    /// - `INVALID_PLACEMENT_ID` for an empty or blank placement id
    /// - `MODULE_NOT_FOUND` when the native event source is missing
    pub fn with_ads_to_request(
        registry: &AdsManagerRegistry,
        placement_id: &str,
        ads_to_request: u32,
    ) -> Result<Self> {
        validate_placement_id(placement_id)?;

        let core = Arc::new(ManagerCore::new(placement_id, registry.telemetry().clone()));
        let id = registry.register(Arc::clone(&core))?;
        let manager = Self {
            id,
            core,
            registry: registry.clone(),
            disposed: AtomicBool::new(false),
        };

        manager.request_ads(ads_to_request);
        Ok(manager)
    }

    fn request_ads(&self, ads_to_request: u32) {
        let result = self.modules().native_ad_manager().and_then(|module| {
            module
                .init(self.placement_id(), ads_to_request)
                .map_err(|e| Error::native(INIT_CONTEXT, e.message()).with_cause(e))
        });

        match result {
            Ok(()) => debug!(
                placement_id = self.placement_id(),
                ads_to_request, "Requested native ads"
            ),
            Err(err) => {
                error!(
                    "[FacebookAds] Failed to initialize NativeAdsManager for {}: {}",
                    self.placement_id(),
                    err
                );
                self.telemetry().record_error(&err);
                self.core.mark_errored(err.message());
            }
        }
    }

    pub fn placement_id(&self) -> &str {
        self.core.placement_id()
    }

    pub fn is_valid(&self) -> bool {
        self.core.flags().0
    }

    pub fn is_loading(&self) -> bool {
        self.core.flags().1
    }

    pub fn state(&self) -> ManagerSnapshot {
        let (is_valid, is_loading) = self.core.flags();
        ManagerSnapshot {
            placement_id: self.placement_id().to_string(),
            is_valid,
            is_loading,
        }
    }

    /// Call `callback` whenever inventory becomes ready
    ///
    /// If the manager is already ready, `callback` also runs once on a later
    /// turn: a task on the current tokio runtime, or a short-lived thread
    /// outside one. Registering the same `Arc` twice stores it once.
    pub fn on_ads_loaded(&self, callback: Arc<LoadedCallback>) -> Subscription {
        if self.is_disposed() {
            return Subscription::noop();
        }

        if self.core.add_loaded(Arc::clone(&callback)) {
            schedule_replay(self.telemetry().clone(), Arc::clone(&callback));
        }

        let core = Arc::downgrade(&self.core);
        Subscription::new(move || {
            if let Some(core) = core.upgrade() {
                core.remove_loaded(&callback);
            }
        })
    }

    /// Call `callback` with a message whenever loading fails
    ///
    /// A manager that already failed does not replay its error.
    pub fn on_ads_error(&self, callback: Arc<ErroredCallback>) -> Subscription {
        if self.is_disposed() {
            return Subscription::noop();
        }

        self.core.add_errored(Arc::clone(&callback));

        let core = Arc::downgrade(&self.core);
        Subscription::new(move || {
            if let Some(core) = core.upgrade() {
                core.remove_errored(&callback);
            }
        })
    }

    /// Unregister and drop every callback; safe to call repeatedly
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.registry.unregister(self.id);
        // The registry may already have been reset.
        self.core.clear_callbacks();
        debug!(placement_id = self.placement_id(), "Disposed native ads manager");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Stop the native layer refreshing this placement; failures are logged
    pub fn disable_auto_refresh(&self) {
        let result = self.modules().native_ad_manager().and_then(|module| {
            module
                .disable_auto_refresh(self.placement_id())
                .map_err(|e| {
                    Error::native("NativeAdsManager.disableAutoRefresh", e.message()).with_cause(e)
                })
        });

        if let Err(err) = result {
            error!("[FacebookAds] Failed to disable auto refresh: {}", err);
            self.telemetry().record_error(&err);
        }
    }

    /// Choose which assets the native layer caches; failures are logged
    pub fn set_media_cache_policy(&self, policy: MediaCachePolicy) {
        let result = self.modules().native_ad_manager().and_then(|module| {
            module
                .set_media_cache_policy(self.placement_id(), policy)
                .map_err(|e| {
                    Error::native("NativeAdsManager.setMediaCachePolicy", e.message()).with_cause(e)
                })
        });

        if let Err(err) = result {
            error!("[FacebookAds] Failed to set media cache policy: {}", err);
            self.telemetry().record_error(&err);
        }
    }

    /// Make ad views respond to clicks
    ///
    /// The media and icon views are added to `clickable` when present, so
    /// they are always clickable.
    ///
    /// # Errors
    ///
    /// - `MODULE_NOT_FOUND` when the ad manager capability is missing
    /// - `NATIVE_ERROR` when the native call fails
    pub async fn register_views_for_interaction(
        modules: &NativeModules,
        native_ad_view_tag: ViewTag,
        media_view_tag: ViewTag,
        ad_icon_view_tag: ViewTag,
        clickable: &[ViewTag],
    ) -> Result<bool> {
        let module = modules.native_ad_manager()?;
        let clickable = effective_clickable(media_view_tag, ad_icon_view_tag, clickable);

        with_error_handling(
            module.register_views_for_interaction(
                native_ad_view_tag,
                media_view_tag,
                ad_icon_view_tag,
                &clickable,
            ),
            REGISTER_VIEWS_CONTEXT,
            ErrorCode::NativeError,
        )
        .await
    }

    pub(crate) fn modules(&self) -> &NativeModules {
        self.registry.modules()
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        self.core.telemetry()
    }

    /// `(loaded, errored)` callbacks currently registered
    pub fn callback_counts(&self) -> (usize, usize) {
        self.core.callback_counts()
    }
}

/// `clickable` plus the media and icon views when present, without repeats
pub fn effective_clickable(
    media_view_tag: ViewTag,
    ad_icon_view_tag: ViewTag,
    clickable: &[ViewTag],
) -> Vec<ViewTag> {
    let extra = [media_view_tag, ad_icon_view_tag]
        .into_iter()
        .filter(|tag| *tag > 0);

    let mut tags: Vec<ViewTag> = Vec::with_capacity(clickable.len() + 2);
    for tag in clickable.iter().copied().chain(extra) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn schedule_replay(telemetry: Telemetry, callback: Arc<LoadedCallback>) {
    let replay = move || {
        invoke_guarded(&telemetry, "ads loaded callback", || callback());
    };

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move { replay() });
        }
        Err(_) => {
            std::thread::spawn(replay);
        }
    }
}

impl Drop for NativeAdsManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Serialize for NativeAdsManager {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.placement_id())
    }
}

impl fmt::Debug for NativeAdsManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (is_valid, is_loading) = self.core.flags();
        f.debug_struct("NativeAdsManager")
            .field("placement_id", &self.placement_id())
            .field("is_valid", &is_valid)
            .field("is_loading", &is_loading)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
