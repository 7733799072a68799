//! Reactive manager state
//!
//! [`NativeAdsManagerContext`] keeps per-placement [`ManagerState`] for the
//! hook adapters. It listens to the same native events as the
//! [`AdsManagerRegistry`](crate::manager::AdsManagerRegistry) but with its
//! own listener pair; neither depends on the other.
//!
//! Subscribers are keyed by placement id. When the last subscriber of a
//! placement leaves, both its subscriber entry and its tracked state go.
//!
//! Every entry point taking a placement id rejects blank ids with
//! `INVALID_PLACEMENT_ID` before touching any state.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, error};

use crate::error::{Error, ErrorCode, Result};
use crate::events::{
    AdErrorEvent, EmitterSubscription, InventoryChanged, AD_ERROR_EVENT, MANAGERS_CHANGED_EVENT,
};
use crate::native::NativeModules;
use crate::subscription::{CallbackSet, Subscription};
use crate::telemetry::Telemetry;
use crate::traits::EventHandler;
use crate::utils::{invoke_guarded, lock};
use crate::validation::validate_placement_id;

/// Origin recorded on load errors reported through the context
pub const CONTEXT_ERROR_ORIGIN: &str = "NativeAdManager";

const DEFAULT_LOAD_ERROR: &str = "Failed to load ads";

/// Subscriber notified with every new state of a placement
pub type StateCallback = dyn Fn(&ManagerState) + Send + Sync;

/// State of one placement as seen by the hook adapters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerState {
    pub placement_id: String,
    pub is_valid: bool,
    pub is_loading: bool,
    pub error: Option<Error>,
    pub ads_available: u32,
}

impl ManagerState {
    /// Fresh state: loading, nothing available
    pub fn new(placement_id: impl Into<String>) -> Self {
        Self {
            placement_id: placement_id.into(),
            is_valid: false,
            is_loading: true,
            error: None,
            ads_available: 0,
        }
    }
}

#[derive(Default)]
struct ContextState {
    managers: HashMap<String, ManagerState>,
    subscribers: HashMap<String, CallbackSet<StateCallback>>,
    listeners: Vec<EmitterSubscription>,
}

struct ContextInner {
    telemetry: Telemetry,
    state: Mutex<ContextState>,
}

impl ContextInner {
    fn on_inventory(&self, payload: &serde_json::Value) {
        let event = InventoryChanged::from_payload(payload);
        for (placement_id, entry) in event.iter() {
            self.update(placement_id, |state| {
                state.is_valid = entry.ready;
                state.is_loading = false;
                if entry.ready {
                    state.error = None;
                }
                state.ads_available = entry
                    .ads_available
                    .unwrap_or(if entry.ready { state.ads_available } else { 0 });
            });
        }
    }

    fn on_error(&self, payload: &serde_json::Value) {
        let event = AdErrorEvent::from_payload(payload);
        let Some(placement_id) = event.placement_id.as_deref() else {
            debug!("Ignoring ad error without placement id");
            return;
        };

        let err = Error::new(
            ErrorCode::AdLoadFailed,
            CONTEXT_ERROR_ORIGIN,
            event.message_or(DEFAULT_LOAD_ERROR),
        );
        self.update(placement_id, |state| {
            state.error = Some(err);
            state.is_loading = false;
            state.is_valid = false;
        });
    }

    /// Apply `change` to an existing entry and notify its subscribers
    fn update<F>(&self, placement_id: &str, change: F)
    where
        F: FnOnce(&mut ManagerState),
    {
        let (snapshot, subscribers) = {
            let mut state = lock(&self.state);
            let Some(entry) = state.managers.get_mut(placement_id) else {
                return;
            };
            change(entry);
            let snapshot = entry.clone();
            let subscribers = state
                .subscribers
                .get(placement_id)
                .map(CallbackSet::snapshot)
                .unwrap_or_default();
            (snapshot, subscribers)
        };
        debug!(
            placement_id,
            is_valid = snapshot.is_valid,
            subscribers = subscribers.len(),
            "Manager state changed"
        );

        for callback in subscribers {
            invoke_guarded(&self.telemetry, "manager state subscriber", || {
                callback(&snapshot)
            });
        }
    }
}

/// Shared placement-state table backing the hook adapters
///
/// Cheap to clone; clones share the same table and listeners.
#[derive(Clone)]
pub struct NativeAdsManagerContext {
    inner: Arc<ContextInner>,
}

impl NativeAdsManagerContext {
    /// Create the context and attach its listener pair
    ///
    /// When the event source cannot be resolved the failure is logged and
    /// the context works without native events.
    pub fn new(modules: &NativeModules, telemetry: Telemetry) -> Self {
        let context = Self {
            inner: Arc::new(ContextInner {
                telemetry,
                state: Mutex::new(ContextState::default()),
            }),
        };

        match modules.native_ad_emitter() {
            Ok(emitter) => {
                let weak = Arc::downgrade(&context.inner);
                let listeners = vec![
                    EmitterSubscription::attach(
                        Arc::clone(&emitter),
                        MANAGERS_CHANGED_EVENT,
                        handler(weak.clone(), ContextInner::on_inventory),
                    ),
                    EmitterSubscription::attach(
                        emitter,
                        AD_ERROR_EVENT,
                        handler(weak, ContextInner::on_error),
                    ),
                ];
                lock(&context.inner.state).listeners = listeners;
            }
            Err(err) => {
                error!("[FacebookAds] Failed to setup native event emitter: {}", err);
                context.inner.telemetry.record_error(&err);
            }
        }

        context
    }

    /// Register `callback` for state changes of `placement_id`
    pub fn subscribe(
        &self,
        placement_id: &str,
        callback: Arc<StateCallback>,
    ) -> Result<Subscription> {
        validate_placement_id(placement_id)?;
        lock(&self.inner.state)
            .subscribers
            .entry(placement_id.to_string())
            .or_default()
            .insert(Arc::clone(&callback));

        let inner = Arc::downgrade(&self.inner);
        let placement_id = placement_id.to_string();
        Ok(Subscription::new(move || {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let mut state = lock(&inner.state);
            if let Some(set) = state.subscribers.get_mut(&placement_id) {
                set.remove(&callback);
                if set.is_empty() {
                    state.subscribers.remove(&placement_id);
                    state.managers.remove(&placement_id);
                    debug!(placement_id = %placement_id, "Last subscriber left, placement untracked");
                }
            }
        }))
    }

    pub fn get_manager_state(&self, placement_id: &str) -> Option<ManagerState> {
        lock(&self.inner.state).managers.get(placement_id).cloned()
    }

    /// Copy of every tracked placement state
    pub fn managers(&self) -> BTreeMap<String, ManagerState> {
        lock(&self.inner.state)
            .managers
            .iter()
            .map(|(id, state)| (id.clone(), state.clone()))
            .collect()
    }

    /// Start tracking `placement_id` if it is not tracked yet
    pub fn ensure_manager(&self, placement_id: &str) -> Result<ManagerState> {
        validate_placement_id(placement_id)?;
        Ok(lock(&self.inner.state)
            .managers
            .entry(placement_id.to_string())
            .or_insert_with(|| ManagerState::new(placement_id))
            .clone())
    }

    /// Stop tracking `placement_id`; subscribers stay registered
    pub fn remove_manager(&self, placement_id: &str) -> Option<ManagerState> {
        lock(&self.inner.state).managers.remove(placement_id)
    }

    /// Record a failure for a tracked placement and notify its subscribers
    pub fn report_error(&self, placement_id: &str, err: Error) -> Result<()> {
        validate_placement_id(placement_id)?;
        self.inner.update(placement_id, |state| {
            state.error = Some(err);
            state.is_loading = false;
        });
        Ok(())
    }

    pub fn subscriber_count(&self, placement_id: &str) -> usize {
        lock(&self.inner.state)
            .subscribers
            .get(placement_id)
            .map_or(0, CallbackSet::len)
    }

    /// Whether `placement_id` has a subscriber entry
    pub fn has_subscribers(&self, placement_id: &str) -> bool {
        lock(&self.inner.state).subscribers.contains_key(placement_id)
    }

    /// Whether the native listener pair is attached
    pub fn is_attached(&self) -> bool {
        !lock(&self.inner.state).listeners.is_empty()
    }

    /// Detach from the native event source
    pub fn detach(&self) {
        let listeners = std::mem::take(&mut lock(&self.inner.state).listeners);
        drop(listeners);
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.inner.telemetry
    }
}

fn handler(
    inner: Weak<ContextInner>,
    dispatch: fn(&ContextInner, &serde_json::Value),
) -> EventHandler {
    Arc::new(move |payload: &serde_json::Value| {
        if let Some(inner) = inner.upgrade() {
            dispatch(&inner, payload);
        }
    })
}

impl fmt::Debug for NativeAdsManagerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("NativeAdsManagerContext")
            .field("managers", &state.managers.len())
            .field("subscribed_placements", &state.subscribers.len())
            .field("attached", &!state.listeners.is_empty())
            .finish()
    }
}
