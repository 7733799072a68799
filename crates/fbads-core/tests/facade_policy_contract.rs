//! Contract Test: Facade Failure Policy
//!
//! Every native failure funnels through the one error taxonomy, with the
//! handling each kind of operation calls for.
//!
//! Constraints verified:
//! - Passive getters degrade to a default value
//! - Command setters log and swallow failures
//! - Operations with an outcome return typed errors with their default code
//! - Placement ids are validated before any native call
//! - iOS-only settings never reach the native layer on other platforms
//! - A slow interstitial fails with TIMEOUT after the configured deadline
//!
//! If this test fails, someone has:
//! - Let a raw native error escape
//! - Propagated a failure from a fire-and-forget setter

mod common;

use common::*;
use fbads_core::config::ConfigPatch;
use fbads_core::traits::{Platform, SdkLogLevel, TrackingStatus};
use fbads_core::{AdsBridge, ErrorCode};
use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;

fn bridge() -> (Arc<FakeNative>, AdsBridge) {
    bridge_on(Platform::Android)
}

fn bridge_on(platform: Platform) -> (Arc<FakeNative>, AdsBridge) {
    let native = FakeNative::new();
    let resolver = FakeResolver::new(native.clone()).on(platform);
    (native, AdsBridge::with_telemetry(Arc::new(resolver), fbads_core::Telemetry::noop()))
}

#[test]
fn device_hash_degrades_to_empty_string() {
    let (native, bridge) = bridge();
    assert_eq!(bridge.settings().current_device_hash(), "fake-device-hash");

    native.fail_settings(true);
    assert_eq!(bridge.settings().current_device_hash(), "");
}

#[test]
fn device_hash_without_settings_module_is_empty() {
    let native = FakeNative::new();
    let bridge = AdsBridge::new(Arc::new(FakeResolver::new(native).without("settings")));

    assert_eq!(bridge.settings().current_device_hash(), "");
}

#[test]
fn setters_swallow_native_failures() {
    let (native, bridge) = bridge();
    let sink = CountingTelemetry::new();
    bridge.telemetry().set_service(sink.clone());
    let settings = bridge.settings();

    settings.set_log_level(SdkLogLevel::Debug);
    settings.set_is_child_directed(true);
    settings.set_mediation_service("admob");
    settings.set_url_prefix("https://ads.example");
    settings.clear_test_devices();
    assert_eq!(
        native.settings_calls(),
        vec![
            "setLogLevel:debug",
            "setIsChildDirected:true",
            "setMediationService:admob",
            "setUrlPrefix:https://ads.example",
            "clearTestDevices",
        ]
    );

    native.fail_settings(true);
    settings.set_log_level(SdkLogLevel::None);
    settings.clear_test_devices();

    assert_eq!(sink.errors().len(), 2);
    assert_eq!(sink.errors()[0].native_module(), "AdSettings.setLogLevel");
}

#[test]
fn empty_test_device_never_reaches_native() {
    let (native, bridge) = bridge();

    bridge.settings().add_test_device("");
    bridge.settings().add_test_device("abc");

    assert_eq!(native.settings_calls(), vec!["addTestDevice:abc"]);
}

#[tokio::test]
async fn tracking_is_unavailable_off_ios() {
    let (native, bridge) = bridge();
    native.fail_settings(true);

    assert_eq!(
        bridge.settings().request_tracking_permission().await.unwrap(),
        TrackingStatus::Unavailable
    );
    assert_eq!(
        bridge.settings().get_tracking_status().await.unwrap(),
        TrackingStatus::Unavailable
    );
}

#[tokio::test]
async fn tracking_failures_are_typed_on_ios() {
    let (native, bridge) = bridge_on(Platform::Ios);
    assert_eq!(
        bridge.settings().request_tracking_permission().await.unwrap(),
        TrackingStatus::Authorized
    );

    native.fail_settings(true);
    let err = bridge.settings().get_tracking_status().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NativeError);
    assert_eq!(err.native_module(), "getTrackingStatus");
    assert_eq!(err.source().map(|s| s.to_string()), Some("Status unavailable".to_string()));
}

#[test]
fn advertiser_settings_are_ios_only() {
    let (android, bridge) = bridge();
    bridge.settings().set_advertiser_tracking_enabled(true);
    bridge.settings().set_advertiser_id_collection_enabled(false);
    assert!(android.settings_calls().is_empty());

    let (ios, bridge) = bridge_on(Platform::Ios);
    bridge.settings().set_advertiser_tracking_enabled(true);
    bridge.settings().set_advertiser_id_collection_enabled(false);
    assert_eq!(
        ios.settings_calls(),
        vec![
            "setAdvertiserTrackingEnabled:true",
            "setAdvertiserIDCollectionEnabled:false",
        ]
    );
}

#[tokio::test]
async fn interstitial_failures_carry_operation_codes() {
    let (native, bridge) = bridge();
    let interstitial = bridge.interstitial();
    assert!(interstitial.show_ad("placement").await.unwrap());

    native.fail_interstitial(true);

    let show = interstitial.show_ad("placement").await.unwrap_err();
    assert_eq!(show.code(), ErrorCode::AdDisplayFailed);
    assert_eq!(show.native_module(), "InterstitialAdManager.showAd");
    assert_eq!(show.message(), "No fill");

    let preload = interstitial.preload_ad("placement").await.unwrap_err();
    assert_eq!(preload.code(), ErrorCode::AdLoadFailed);
    assert_eq!(preload.native_module(), "InterstitialAdManager.preloadAd");

    let shown = interstitial.show_preloaded_ad("placement").await.unwrap_err();
    assert_eq!(shown.code(), ErrorCode::AdDisplayFailed);
    assert_eq!(shown.native_module(), "InterstitialAdManager.showPreloadedAd");
}

#[tokio::test]
async fn interstitial_validates_before_native_call() {
    let (native, bridge) = bridge();

    let err = bridge.interstitial().show_ad(" ").await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::InvalidPlacementId);
    assert!(native.interstitial_calls().is_empty());
}

#[tokio::test]
async fn missing_interstitial_module_is_distinguishable() {
    let native = FakeNative::new();
    let bridge = AdsBridge::new(Arc::new(FakeResolver::new(native).without("interstitial")));

    let err = bridge.interstitial().preload_ad("placement").await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::ModuleNotFound);
    assert_eq!(err.native_module(), "CTKInterstitialAdManager");
}

#[tokio::test]
async fn slow_interstitial_times_out() {
    let (native, bridge) = bridge();
    native.delay_interstitial(Duration::from_millis(200));
    bridge.configure(ConfigPatch::new().request_timeout_ms(20));

    let err = bridge.interstitial().show_ad("placement").await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::Timeout);
    assert_eq!(err.native_module(), "InterstitialAdManager.showAd");
}

#[tokio::test]
async fn performance_monitoring_reports_timings() {
    let (_native, bridge) = bridge();
    let sink = CountingTelemetry::new();
    bridge.configure(
        ConfigPatch::new()
            .enable_performance_monitoring(true)
            .telemetry_service(sink.clone()),
    );

    bridge.interstitial().preload_ad("placement").await.unwrap();

    assert_eq!(sink.timings(), vec!["InterstitialAdManager.preloadAd"]);
}

#[tokio::test]
async fn interstitial_hook_tracks_loading_and_error() {
    let (native, bridge) = bridge();
    let hook = bridge.use_interstitial_ad();

    assert!(hook.show_ad("placement").await.unwrap());
    assert!(!hook.loading());
    assert!(hook.error().is_none());

    native.fail_interstitial(true);
    let err = hook.preload_ad("placement").await.unwrap_err();
    assert_eq!(err.native_module(), "useInterstitialAd.preloadAd");
    assert_eq!(hook.error(), Some(err));
    assert!(!hook.loading());

    let invalid = hook.show_preloaded_ad("").await.unwrap_err();
    assert_eq!(invalid.code(), ErrorCode::InvalidPlacementId);
    assert_eq!(hook.error().map(|e| e.code()), Some(ErrorCode::InvalidPlacementId));
}
