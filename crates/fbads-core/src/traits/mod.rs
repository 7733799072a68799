//! Native capability traits
//!
//! The bridge never talks to the advertising SDK directly. It consumes four
//! capability groups, each described by a trait here, and obtains them through
//! a [`ModuleResolver`].
//!
//! - [`AdSettingsModule`]: SDK-wide settings and tracking permission
//! - [`InterstitialModule`]: full-screen ad control
//! - [`NativeAdManagerModule`]: per-placement native ad managers
//! - [`AdEventEmitterModule`]: native event source

pub mod ad_manager;
pub mod event_emitter;
pub mod interstitial;
pub mod resolver;
pub mod settings;

pub use ad_manager::{MediaCachePolicy, NativeAdManagerModule, ViewTag, NO_VIEW_TAG};
pub use event_emitter::{AdEventEmitterModule, EventHandler};
pub use interstitial::InterstitialModule;
pub use resolver::{ModuleResolver, Platform};
pub use settings::{AdSettingsModule, SdkLogLevel, TrackingStatus};
