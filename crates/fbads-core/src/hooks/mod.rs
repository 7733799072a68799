//! Hook adapters
//!
//! Stateful handles mirroring the hook API: each one owns its observable
//! state and publishes every change through a `tokio::sync::watch` channel,
//! so a UI layer can re-render on [`changes`](NativeAdsManagerHook::changes).
//! Dropping a handle releases whatever it subscribed to.

mod ad_events;
mod ad_ref;
mod ads_manager;
mod interstitial;
mod native_ad;

pub use ad_events::{use_native_ad_events, NativeAdEvents, NativeAdEventsState};
pub use ad_ref::NativeAdRef;
pub use ads_manager::{use_native_ads_manager, NativeAdsManagerHook};
pub use interstitial::{InterstitialAdHook, InterstitialHookState};
pub use native_ad::{AdLoadedCallback, NativeAdBinding};
