//! End-to-end behavior of the bridge over the in-memory native layer
//!
//! Verifies that:
//! 1. Managers and hooks share one native listener pair each, released on teardown
//! 2. Completed requests reach both the manager instances and the reactive context
//! 3. Failed placements surface as errored managers and errored context state
//! 4. A withheld emitter fails construction with MODULE_NOT_FOUND, while a
//!    withheld manager module leaves an errored manager
//! 5. Settings and interstitial facades write through to native state
//! 6. A ready placement with no ads available still reads as ready

use fbads_core::events::{AD_ERROR_EVENT, MANAGERS_CHANGED_EVENT};
use fbads_core::traits::{Platform, SdkLogLevel, TrackingStatus};
use fbads_core::{AdsBridge, ErrorCode};
use fbads_native_memory::{Capability, MemoryNativeLayer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn bridge_over(layer: &MemoryNativeLayer) -> AdsBridge {
    AdsBridge::new(Arc::new(layer.clone()))
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn test_managers_share_one_listener_pair() {
    let layer = MemoryNativeLayer::new();
    let bridge = bridge_over(&layer);
    // the context attaches its own pair at construction
    let baseline = layer.total_listeners();

    let a = bridge.create_manager("a").unwrap();
    let b = bridge.create_manager("b").unwrap();

    assert_eq!(layer.total_listeners(), baseline + 2);
    assert_eq!(layer.listener_count(MANAGERS_CHANGED_EVENT), 2);
    assert_eq!(layer.listener_count(AD_ERROR_EVENT), 2);

    a.dispose();
    assert_eq!(layer.total_listeners(), baseline + 2);
    b.dispose();
    assert_eq!(layer.total_listeners(), baseline);
}

#[tokio::test]
async fn test_completed_requests_reach_managers_and_context() {
    let layer = MemoryNativeLayer::new();
    let bridge = bridge_over(&layer);
    layer.fail_placement("b");

    let a = bridge.create_manager_with("a", 4).unwrap();
    let b = bridge.create_manager_with("b", 4).unwrap();
    let hook = bridge.use_native_ads_manager("a", 4);

    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    let _sub = b.on_ads_error(Arc::new(move |message: &str| {
        sink.lock().unwrap().push(message.to_string());
    }));

    layer.complete_requests();

    assert!(a.is_valid());
    assert!(!a.is_loading());
    assert!(!b.is_valid());
    assert_eq!(errors.lock().unwrap().as_slice(), &["Failed to load native ads"]);

    let state = hook.state();
    assert!(state.is_valid);
    assert!(!state.is_loading);
    assert_eq!(state.ads_available, 4);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_loaded_callback_replays_after_ready() {
    let layer = MemoryNativeLayer::new();
    let bridge = bridge_over(&layer);
    let manager = bridge.create_manager("a").unwrap();
    layer.complete_requests();

    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    let _sub = manager.on_ads_loaded(Arc::new(move || {
        c.fetch_add(1, Ordering::SeqCst);
    }));

    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_placement_error_updates_context() {
    let layer = MemoryNativeLayer::new();
    let bridge = bridge_over(&layer);
    let hook = bridge.use_native_ads_manager("a", 2);

    layer.report_error(Some("a"), "No fill");

    let state = hook.state();
    let err = state.error.expect("error state");
    assert_eq!(err.code(), ErrorCode::AdLoadFailed);
    assert_eq!(err.message(), "No fill");
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_withheld_emitter_fails_manager_construction() {
    let layer = MemoryNativeLayer::new();
    layer.withhold(Capability::Emitter);
    let bridge = bridge_over(&layer);

    let err = bridge.create_manager("a").unwrap_err();

    assert_eq!(err.code(), ErrorCode::ModuleNotFound);
    assert_eq!(layer.total_listeners(), 0);
}

#[tokio::test]
async fn test_settings_write_through() {
    let layer = MemoryNativeLayer::with_platform(Platform::Ios);
    layer.set_prompt_result(TrackingStatus::Authorized);
    let bridge = bridge_over(&layer);
    let settings = bridge.settings();

    settings.add_test_device(&settings.current_device_hash());
    settings.set_log_level(SdkLogLevel::Debug);
    settings.set_advertiser_tracking_enabled(true);

    let status = settings.request_tracking_permission().await.unwrap();
    assert_eq!(status, TrackingStatus::Authorized);

    let native = layer.settings();
    assert_eq!(native.test_devices, vec![native.device_hash.clone()]);
    assert_eq!(native.log_level, Some(SdkLogLevel::Debug));
    assert_eq!(native.advertiser_tracking, Some(true));
}

#[tokio::test]
async fn test_interstitial_preload_then_show() {
    let layer = MemoryNativeLayer::new();
    let bridge = bridge_over(&layer);
    let interstitial = bridge.interstitial();

    let err = interstitial.show_preloaded_ad("p").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::AdDisplayFailed);

    assert!(interstitial.preload_ad("p").await.unwrap());
    assert!(interstitial.show_preloaded_ad("p").await.unwrap());
    assert_eq!(layer.shown(), vec!["p".to_string()]);
}

#[tokio::test]
async fn test_ready_inventory_without_ads_marks_manager_valid() {
    let layer = MemoryNativeLayer::new();
    let bridge = bridge_over(&layer);
    let manager = bridge.create_manager_with("p", 1).unwrap();

    layer.set_inventory("p", true, 0);

    assert!(manager.is_valid());
    assert!(!manager.is_loading());
}

#[tokio::test]
async fn test_withheld_manager_module_errors_the_manager() {
    let layer = MemoryNativeLayer::new();
    layer.withhold(Capability::NativeAdManager);
    let bridge = bridge_over(&layer);

    let manager = bridge.create_manager("a").unwrap();

    assert!(!manager.is_valid());
    assert!(!manager.is_loading());
    assert!(layer.placement("a").is_none());
}
