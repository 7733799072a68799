// # fbads-core
//
// Core library of the Audience Network bridge.
//
// ## Architecture Overview
//
// The bridge never talks to the advertising SDK itself. It consumes four
// native capability groups through a `ModuleResolver` and adds:
// - **Validation**: placement ids are checked before any native call
// - **Error taxonomy**: every failure becomes one `Error` with a stable code
// - **AdsManagerRegistry**: one native listener pair shared by all live
//   `NativeAdsManager`s, fanned out by placement id
// - **NativeAdsManagerContext**: the same events projected into reactive
//   per-placement state for the hook adapters
// - **Facades**: settings, interstitials, configuration and telemetry
//
// ## Design Principles
//
// 1. **Explicit state**: registry, context and configuration are constructed
//    objects, bundled by `AdsBridge`
// 2. **No lock across a callback**: handlers snapshot state first
// 3. **Contained failures**: user callbacks cannot break event delivery

pub mod bridge;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod hooks;
pub mod interstitial;
pub mod manager;
pub mod native;
pub mod settings;
pub mod subscription;
pub mod telemetry;
pub mod traits;
pub mod utils;
pub mod validation;

// Re-export core types for convenience
pub use bridge::AdsBridge;
pub use config::{AdsConfig, CachePolicy, ConfigPatch, ConfigStore};
pub use context::{ManagerState, NativeAdsManagerContext};
pub use error::{Error, ErrorCode, ErrorRecord, NativeError, NativeResult, Result};
pub use interstitial::InterstitialAdManager;
pub use manager::{AdsManagerRegistry, ManagerSnapshot, NativeAdsManager};
pub use native::NativeModules;
pub use settings::AdSettings;
pub use subscription::Subscription;
pub use telemetry::{Telemetry, TelemetryService};
pub use traits::{
    AdEventEmitterModule, AdSettingsModule, InterstitialModule, ModuleResolver,
    NativeAdManagerModule, Platform,
};
