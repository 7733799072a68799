// # Native Ad Ref
//
// Holds the view handles of a rendered native ad and registers them for
// interaction on demand. Absent media and icon views are `NO_VIEW_TAG`.

use std::sync::Mutex;
use tracing::error;

use crate::manager::NativeAdsManager;
use crate::native::NativeModules;
use crate::traits::{ViewTag, NO_VIEW_TAG};
use crate::utils::lock;

struct AdRefState {
    native_ad_view: Option<ViewTag>,
    media_view: ViewTag,
    ad_icon_view: ViewTag,
    clickable: Vec<ViewTag>,
}

/// View handles of one native ad
pub struct NativeAdRef {
    modules: NativeModules,
    state: Mutex<AdRefState>,
}

impl NativeAdRef {
    pub fn new(modules: NativeModules) -> Self {
        Self {
            modules,
            state: Mutex::new(AdRefState {
                native_ad_view: None,
                media_view: NO_VIEW_TAG,
                ad_icon_view: NO_VIEW_TAG,
                clickable: Vec::new(),
            }),
        }
    }

    /// Set (or clear) the root view of the ad
    pub fn set_native_ad_view(&self, tag: Option<ViewTag>) {
        lock(&self.state).native_ad_view = tag.filter(|tag| *tag != 0);
    }

    pub fn native_ad_view(&self) -> Option<ViewTag> {
        lock(&self.state).native_ad_view
    }

    pub fn register_media_view(&self, tag: ViewTag) {
        lock(&self.state).media_view = tag;
    }

    pub fn unregister_media_view(&self) {
        lock(&self.state).media_view = NO_VIEW_TAG;
    }

    pub fn media_view(&self) -> ViewTag {
        lock(&self.state).media_view
    }

    pub fn register_ad_icon_view(&self, tag: ViewTag) {
        lock(&self.state).ad_icon_view = tag;
    }

    pub fn unregister_ad_icon_view(&self) {
        lock(&self.state).ad_icon_view = NO_VIEW_TAG;
    }

    pub fn ad_icon_view(&self) -> ViewTag {
        lock(&self.state).ad_icon_view
    }

    pub fn register_clickable_child(&self, tag: ViewTag) {
        let mut state = lock(&self.state);
        if !state.clickable.contains(&tag) {
            state.clickable.push(tag);
        }
    }

    pub fn unregister_clickable_child(&self, tag: ViewTag) {
        lock(&self.state).clickable.retain(|t| *t != tag);
    }

    /// Clickable children in registration order
    pub fn clickable_children(&self) -> Vec<ViewTag> {
        lock(&self.state).clickable.clone()
    }

    /// Register the current views for interaction
    ///
    /// Returns `false` without a native call when no root view is set, and
    /// `false` (after logging) when the native call fails.
    pub async fn register_views_for_interaction(&self) -> bool {
        let (view, media, icon, clickable) = {
            let state = lock(&self.state);
            let Some(view) = state.native_ad_view else {
                return false;
            };
            (view, state.media_view, state.ad_icon_view, state.clickable.clone())
        };

        match NativeAdsManager::register_views_for_interaction(
            &self.modules,
            view,
            media,
            icon,
            &clickable,
        )
        .await
        {
            Ok(registered) => registered,
            Err(err) => {
                error!("[FacebookAds] Failed to register views for interaction: {}", err);
                false
            }
        }
    }
}
