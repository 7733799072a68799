//! Contract Test: Reactive Manager Context
//!
//! The context projects the same native events as the registry into
//! per-placement state for the hook adapters.
//!
//! Constraints verified:
//! - Subscribing creates the placement's subscriber entry, and the last
//!   unsubscribe removes it together with the tracked state
//! - Blank placement ids are rejected before any state is created
//! - Events update tracked placements only and notify their subscribers
//!   synchronously with the new state
//! - Load errors without a placement id leave the context untouched
//! - The context keeps its own listener pair, independent of the registry
//! - The manager hook follows context state and records init failures
//!
//! If this test fails, someone has:
//! - Left empty subscriber entries behind
//! - Coupled the context to the class-based registry

mod common;

use common::*;
use fbads_core::context::{ManagerState, NativeAdsManagerContext, StateCallback};
use fbads_core::hooks::use_native_ads_manager;
use fbads_core::manager::{AdsManagerRegistry, NativeAdsManager};
use fbads_core::native::NativeModules;
use fbads_core::telemetry::Telemetry;
use fbads_core::ErrorCode;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio_stream::StreamExt;

fn context() -> (Arc<FakeNative>, NativeModules, NativeAdsManagerContext) {
    let (native, modules) = fake_modules();
    let context = NativeAdsManagerContext::new(&modules, Telemetry::noop());
    (native, modules, context)
}

fn recording_states() -> (Arc<Mutex<Vec<ManagerState>>>, Arc<StateCallback>) {
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = states.clone();
    let callback: Arc<StateCallback> = Arc::new(move |state: &ManagerState| {
        sink.lock().unwrap().push(state.clone());
    });
    (states, callback)
}

#[test]
fn last_unsubscribe_removes_subscriber_entry() {
    let (_native, _modules, context) = context();
    let (_, first) = recording_states();
    let (_, second) = recording_states();

    let sub_a = context.subscribe("placement-a", first).unwrap();
    let sub_b = context.subscribe("placement-a", second).unwrap();
    assert_eq!(context.subscriber_count("placement-a"), 2);

    sub_a.remove();
    assert!(context.has_subscribers("placement-a"));

    sub_b.remove();
    assert!(!context.has_subscribers("placement-a"));
    assert_eq!(context.subscriber_count("placement-a"), 0);

    // Removing again is harmless.
    sub_b.remove();
}

#[test]
fn inventory_event_notifies_tracked_placement() {
    let (native, _modules, context) = context();
    context.ensure_manager("placement-a").unwrap();
    let (states, callback) = recording_states();
    context.subscribe("placement-a", callback).unwrap();

    native.emit("CTKNativeAdsManagersChanged", json!({"placement-a": 4, "untracked": true}));

    let states = states.lock().unwrap();
    assert_eq!(states.len(), 1);
    assert!(states[0].is_valid);
    assert!(!states[0].is_loading);
    assert_eq!(states[0].ads_available, 4);
    assert_eq!(context.get_manager_state("placement-a"), Some(states[0].clone()));
    assert!(context.get_manager_state("untracked").is_none());
}

#[test]
fn untracked_placement_is_not_notified() {
    let (native, _modules, context) = context();
    let (states, callback) = recording_states();
    context.subscribe("placement-a", callback).unwrap();

    native.emit_inventory(&[("placement-a", true)]);

    assert!(states.lock().unwrap().is_empty());
}

#[test]
fn attributed_error_sets_state_error() {
    let (native, _modules, context) = context();
    context.ensure_manager("placement-a").unwrap();
    let (states, callback) = recording_states();
    context.subscribe("placement-a", callback).unwrap();

    native.emit_error("No fill", Some("placement-a"));
    native.emit_error("ignored", None);

    let states = states.lock().unwrap();
    assert_eq!(states.len(), 1);
    let err = states[0].error.as_ref().expect("error recorded");
    assert_eq!(err.code(), ErrorCode::AdLoadFailed);
    assert_eq!(err.native_module(), "NativeAdManager");
    assert_eq!(err.message(), "No fill");
    assert!(!states[0].is_loading);
}

#[test]
fn ready_event_clears_previous_error() {
    let (native, _modules, context) = context();
    context.ensure_manager("placement-a").unwrap();

    native.emit("onAdError", json!({"placementId": "placement-a"}));
    let failed = context.get_manager_state("placement-a").unwrap();
    assert_eq!(failed.error.unwrap().message(), "Failed to load ads");

    native.emit_inventory(&[("placement-a", true)]);
    let recovered = context.get_manager_state("placement-a").unwrap();
    assert!(recovered.error.is_none());
    assert!(recovered.is_valid);
}

#[test]
fn panicking_subscriber_does_not_block_others() {
    let (native, _modules, context) = context();
    context.ensure_manager("placement-a").unwrap();
    let (states, callback) = recording_states();
    let panicking: Arc<StateCallback> = Arc::new(|_: &ManagerState| panic!("render failed"));
    context.subscribe("placement-a", panicking).unwrap();
    context.subscribe("placement-a", callback).unwrap();

    native.emit_inventory(&[("placement-a", true)]);

    assert_eq!(states.lock().unwrap().len(), 1);
}

#[test]
fn context_and_registry_keep_separate_listener_pairs() {
    let (native, modules, context) = context();
    assert_eq!(native.total_listeners(), 2);

    let registry = AdsManagerRegistry::new(modules, Telemetry::noop());
    let manager = NativeAdsManager::new(&registry, "placement-a").unwrap();
    assert_eq!(native.total_listeners(), 4);

    manager.dispose();
    assert_eq!(native.total_listeners(), 2);
    assert!(context.is_attached());

    context.detach();
    assert_eq!(native.total_listeners(), 0);
    assert!(!context.is_attached());
}

#[test]
fn missing_event_source_leaves_context_detached() {
    let native = FakeNative::new();
    let modules = NativeModules::new(Arc::new(FakeResolver::new(native).without("emitter")));
    let sink = CountingTelemetry::new();

    let context = NativeAdsManagerContext::new(&modules, sink.handle());

    assert!(!context.is_attached());
    assert_eq!(sink.errors()[0].code(), ErrorCode::ModuleNotFound);
}

#[tokio::test]
async fn manager_hook_follows_context_state() {
    let (native, modules, context) = context();

    let hook = use_native_ads_manager(&context, &modules, "placement-a", 5);
    assert!(hook.state().is_loading);
    assert_eq!(native.init_calls(), vec![("placement-a".to_string(), 5)]);
    assert_eq!(context.subscriber_count("placement-a"), 1);

    let mut changes = hook.changes();
    assert!(changes.next().await.unwrap().is_loading);

    native.emit_inventory(&[("placement-a", true)]);
    let next = changes.next().await.unwrap();
    assert!(next.is_valid);
    assert!(hook.state().is_valid);

    drop(hook);
    assert!(!context.has_subscribers("placement-a"));
    assert!(context.get_manager_state("placement-a").is_none());
}

#[test]
fn manager_hook_records_init_failure() {
    let (native, modules, context) = context();
    native.fail_init(true);

    let hook = use_native_ads_manager(&context, &modules, "placement-a", 10);

    let state = hook.state();
    assert!(!state.is_loading);
    let err = state.error.expect("init failure recorded");
    assert_eq!(err.code(), ErrorCode::InvalidConfig);
    assert_eq!(err.native_module(), "useNativeAdsManager");
    assert_eq!(context.subscriber_count("placement-a"), 0);
}

#[test]
fn manager_hook_rejects_blank_placement() {
    let (native, modules, context) = context();

    let hook = use_native_ads_manager(&context, &modules, "  ", 10);

    assert_eq!(
        hook.state().error.map(|e| e.code()),
        Some(ErrorCode::InvalidPlacementId)
    );
    assert!(native.init_calls().is_empty());
    assert!(context.managers().is_empty());
}

#[test]
fn last_unsubscribe_untracks_placement() {
    let (_native, _modules, context) = context();
    context.ensure_manager("placement-a").unwrap();
    let (_, first) = recording_states();
    let (_, second) = recording_states();
    let sub_a = context.subscribe("placement-a", first).unwrap();
    let sub_b = context.subscribe("placement-a", second).unwrap();

    sub_a.remove();
    assert!(context.get_manager_state("placement-a").is_some());

    sub_b.remove();
    assert!(context.get_manager_state("placement-a").is_none());
    assert!(context.managers().is_empty());
}

#[test]
fn blank_placement_ids_are_rejected() {
    let (_native, _modules, context) = context();

    for blank in ["", "   "] {
        let err = context.ensure_manager(blank).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPlacementId);

        let (_, callback) = recording_states();
        let err = context.subscribe(blank, callback).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPlacementId);

        let failure = fbads_core::Error::ad_load_failed("test", "boom");
        let err = context.report_error(blank, failure).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPlacementId);

        assert!(!context.has_subscribers(blank));
    }
    assert!(context.managers().is_empty());
}
