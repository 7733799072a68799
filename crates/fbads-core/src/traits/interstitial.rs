// # Interstitial Capability
//
// Full-screen ads controlled by the native layer (`CTKInterstitialAdManager`).
// Every operation resolves to whether the ad was shown/loaded.

use async_trait::async_trait;

use crate::error::NativeResult;

/// Trait for the native interstitial capability
#[async_trait]
pub trait InterstitialModule: Send + Sync {
    /// Load and display an interstitial immediately
    async fn show_ad(&self, placement_id: &str) -> NativeResult<bool>;

    /// Load an interstitial without displaying it
    async fn preload_ad(&self, placement_id: &str) -> NativeResult<bool>;

    /// Display an interstitial loaded by [`InterstitialModule::preload_ad`]
    async fn show_preloaded_ad(&self, placement_id: &str) -> NativeResult<bool>;
}
