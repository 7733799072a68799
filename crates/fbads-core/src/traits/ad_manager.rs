// # Native Ad Manager Capability
//
// Per-placement native ad managers owned by the native layer
// (`CTKNativeAdManager`).
//
// `init` only *requests* inventory. Readiness is reported later through the
// event source (see `crate::events`), never as the result of `init`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::NativeResult;

/// Native view handle
pub type ViewTag = i32;

/// Sentinel for "no view registered"
pub const NO_VIEW_TAG: ViewTag = -1;

/// Which ad assets the native layer caches up front
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCachePolicy {
    None,
    Icon,
    Image,
    All,
}

impl MediaCachePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCachePolicy::None => "none",
            MediaCachePolicy::Icon => "icon",
            MediaCachePolicy::Image => "image",
            MediaCachePolicy::All => "all",
        }
    }
}

impl fmt::Display for MediaCachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for the native ad manager capability
///
/// # Thread Safety
///
/// Implementations must be thread-safe; the bridge calls them from whichever
/// task owns the manager handle.
#[async_trait]
pub trait NativeAdManagerModule: Send + Sync {
    /// Start loading `ads_to_request` native ads for a placement
    fn init(&self, placement_id: &str, ads_to_request: u32) -> NativeResult<()>;

    /// Make the given views respond to ad clicks
    ///
    /// # Parameters
    ///
    /// - `native_ad_view_tag`: root view of the ad
    /// - `media_view_tag`: media view, or [`NO_VIEW_TAG`]
    /// - `ad_icon_view_tag`: icon view, or [`NO_VIEW_TAG`]
    /// - `clickable`: every view that should trigger the ad
    async fn register_views_for_interaction(
        &self,
        native_ad_view_tag: ViewTag,
        media_view_tag: ViewTag,
        ad_icon_view_tag: ViewTag,
        clickable: &[ViewTag],
    ) -> NativeResult<bool>;

    /// Stop the native layer from refreshing a placement on its own
    fn disable_auto_refresh(&self, _placement_id: &str) -> NativeResult<()> {
        Ok(())
    }

    fn set_media_cache_policy(
        &self,
        _placement_id: &str,
        _policy: MediaCachePolicy,
    ) -> NativeResult<()> {
        Ok(())
    }
}
