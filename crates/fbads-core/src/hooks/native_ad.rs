// # Native Ad Binding
//
// View plumbing for a component rendering ads from a `NativeAdsManager`:
//
// - follows the manager's loaded/errored callbacks as `can_request_ads`
// - tracks the root, media, icon and clickable view handles
// - registers the views for interaction once both media and icon views
//   exist, and again whenever one of them or the clickable set changes
//
// The native layer requires both a media view and an icon view before it
// accepts a registration.

use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::Result;
use crate::manager::{ErroredCallback, LoadedCallback, NativeAdsManager};
use crate::native::NativeModules;
use crate::subscription::Subscription;
use crate::telemetry::Telemetry;
use crate::traits::{ViewTag, NO_VIEW_TAG};
use crate::utils::{invoke_guarded, lock};

/// Callback receiving each ad rendered by the bound view
pub type AdLoadedCallback = dyn Fn(&Value) + Send + Sync;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Registration {
    media_view: ViewTag,
    ad_icon_view: ViewTag,
    clickable: Vec<ViewTag>,
}

struct BindingState {
    can_request_ads: bool,
    native_ad_view: Option<ViewTag>,
    media_view: ViewTag,
    ad_icon_view: ViewTag,
    clickable: Vec<ViewTag>,
    registered: Option<Registration>,
    ad: Option<Value>,
}

impl BindingState {
    /// Registration to perform now, if any
    fn pending(&self) -> Option<(ViewTag, Registration)> {
        if self.media_view == NO_VIEW_TAG || self.ad_icon_view == NO_VIEW_TAG {
            return None;
        }
        let view = self.native_ad_view?;

        let next = Registration {
            media_view: self.media_view,
            ad_icon_view: self.ad_icon_view,
            clickable: self.clickable.clone(),
        };
        (self.registered.as_ref() != Some(&next)).then_some((view, next))
    }
}

/// Binds a native ad view to a [`NativeAdsManager`]
pub struct NativeAdBinding {
    modules: NativeModules,
    telemetry: Telemetry,
    state: Arc<Mutex<BindingState>>,
    on_ad_loaded: Option<Arc<AdLoadedCallback>>,
    loaded: Subscription,
    errored: Subscription,
}

impl NativeAdBinding {
    pub fn new(manager: &NativeAdsManager) -> Self {
        let state = Arc::new(Mutex::new(BindingState {
            can_request_ads: false,
            native_ad_view: None,
            media_view: NO_VIEW_TAG,
            ad_icon_view: NO_VIEW_TAG,
            clickable: Vec::new(),
            registered: None,
            ad: None,
        }));

        let on_loaded: Arc<LoadedCallback> = {
            let state = Arc::clone(&state);
            Arc::new(move || lock(&state).can_request_ads = true)
        };
        let on_errored: Arc<ErroredCallback> = {
            let state = Arc::clone(&state);
            Arc::new(move |_: &str| lock(&state).can_request_ads = false)
        };

        Self {
            modules: manager.modules().clone(),
            telemetry: manager.telemetry().clone(),
            loaded: manager.on_ads_loaded(on_loaded),
            errored: manager.on_ads_error(on_errored),
            state,
            on_ad_loaded: None,
        }
    }

    /// Also call `callback` with every ad passed to [`NativeAdBinding::handle_ad_loaded`]
    pub fn with_on_ad_loaded(mut self, callback: Arc<AdLoadedCallback>) -> Self {
        self.on_ad_loaded = Some(callback);
        self
    }

    /// Whether the manager currently has inventory
    pub fn can_request_ads(&self) -> bool {
        lock(&self.state).can_request_ads
    }

    pub fn set_native_ad_view(&self, tag: Option<ViewTag>) {
        lock(&self.state).native_ad_view = tag.filter(|tag| *tag > 0);
    }

    /// A missing handle (`None` or not positive) unregisters the media view
    pub fn register_media_view(&self, tag: Option<ViewTag>) {
        lock(&self.state).media_view = present(tag);
    }

    pub fn unregister_media_view(&self) {
        lock(&self.state).media_view = NO_VIEW_TAG;
    }

    /// A missing handle (`None` or not positive) unregisters the icon view
    pub fn register_ad_icon_view(&self, tag: Option<ViewTag>) {
        lock(&self.state).ad_icon_view = present(tag);
    }

    pub fn unregister_ad_icon_view(&self) {
        lock(&self.state).ad_icon_view = NO_VIEW_TAG;
    }

    /// Views without a handle are ignored
    pub fn register_clickable_child(&self, tag: Option<ViewTag>) {
        let Some(tag) = tag.filter(|tag| *tag > 0) else {
            return;
        };
        let mut state = lock(&self.state);
        if !state.clickable.contains(&tag) {
            state.clickable.push(tag);
        }
    }

    pub fn unregister_clickable_child(&self, tag: ViewTag) {
        lock(&self.state).clickable.retain(|t| *t != tag);
    }

    pub fn clickable_children(&self) -> Vec<ViewTag> {
        lock(&self.state).clickable.clone()
    }

    /// Register the views for interaction if anything relevant changed
    ///
    /// # Returns
    ///
    /// - `Ok(None)`: nothing to do (a view is missing or nothing changed)
    /// - `Ok(Some(registered))`: the native result
    /// - `Err(Error)`: the native call failed; the next call retries
    pub async fn sync_registration(&self) -> Result<Option<bool>> {
        let Some((view, next)) = lock(&self.state).pending() else {
            return Ok(None);
        };

        let registered = NativeAdsManager::register_views_for_interaction(
            &self.modules,
            view,
            next.media_view,
            next.ad_icon_view,
            &next.clickable,
        )
        .await?;

        debug!(view, clickable = next.clickable.len(), "Registered native ad views");
        lock(&self.state).registered = Some(next);
        Ok(Some(registered))
    }

    /// Record the ad rendered by the native view
    pub fn handle_ad_loaded(&self, ad: Value) {
        lock(&self.state).ad = Some(ad.clone());
        if let Some(callback) = &self.on_ad_loaded {
            invoke_guarded(&self.telemetry, "ad loaded callback", || callback(&ad));
        }
    }

    /// Latest rendered ad
    pub fn ad(&self) -> Option<Value> {
        lock(&self.state).ad.clone()
    }
}

fn present(tag: Option<ViewTag>) -> ViewTag {
    tag.filter(|tag| *tag > 0).unwrap_or(NO_VIEW_TAG)
}

impl Drop for NativeAdBinding {
    fn drop(&mut self) {
        self.loaded.remove();
        self.errored.remove();
    }
}
