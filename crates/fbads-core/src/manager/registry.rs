//! Live manager registry and native event multiplexer
//!
//! Every live [`NativeAdsManager`](super::NativeAdsManager) is registered
//! here. The registry owns the single pair of native listeners
//! ([`MANAGERS_CHANGED_EVENT`], [`AD_ERROR_EVENT`]) and fans each event out
//! to the matching managers.
//!
//! ## Listener lifecycle
//!
//! - The pair is attached when a manager registers and no pair exists.
//! - It is detached when the last manager unregisters.
//! - At most one pair is attached at any time.
//!
//! ## Thread Safety
//!
//! State lives behind a Mutex. The lock is never held while a native call
//! or a manager callback runs.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

use super::instance::ManagerCore;
use crate::error::Result;
use crate::events::{
    AdErrorEvent, EmitterSubscription, InventoryChanged, AD_ERROR_EVENT,
    DEFAULT_AD_ERROR_MESSAGE, MANAGERS_CHANGED_EVENT,
};
use crate::native::NativeModules;
use crate::telemetry::Telemetry;
use crate::traits::{AdEventEmitterModule, EventHandler};
use crate::utils::lock;

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    instances: BTreeMap<u64, Arc<ManagerCore>>,
    managers_changed: Option<EmitterSubscription>,
    ad_error: Option<EmitterSubscription>,
}

impl RegistryState {
    fn take_subscriptions(&mut self) -> Vec<EmitterSubscription> {
        self.managers_changed
            .take()
            .into_iter()
            .chain(self.ad_error.take())
            .collect()
    }
}

struct RegistryInner {
    modules: NativeModules,
    telemetry: Telemetry,
    state: Mutex<RegistryState>,
}

impl RegistryInner {
    fn dispatch_inventory(&self, payload: &serde_json::Value) {
        let event = InventoryChanged::from_payload(payload);
        let targets: Vec<(Arc<ManagerCore>, bool)> = {
            let state = lock(&self.state);
            state
                .instances
                .values()
                .filter_map(|core| {
                    event
                        .get(core.placement_id())
                        .map(|entry| (Arc::clone(core), entry.ready))
                })
                .collect()
        };
        debug!(
            placements = event.len(),
            matched = targets.len(),
            "Dispatching inventory change"
        );

        for (core, ready) in targets {
            core.apply_inventory(ready);
        }
    }

    fn dispatch_error(&self, payload: &serde_json::Value) {
        let event = AdErrorEvent::from_payload(payload);
        let message = event.message_or(DEFAULT_AD_ERROR_MESSAGE);
        let targets: Vec<Arc<ManagerCore>> = {
            let state = lock(&self.state);
            state.instances.values().cloned().collect()
        };
        debug!(reason = message, managers = targets.len(), "Broadcasting ad error");

        for core in targets {
            core.apply_unattributed_error(message);
        }
    }
}

/// Registry of live native ads managers
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct AdsManagerRegistry {
    inner: Arc<RegistryInner>,
}

impl AdsManagerRegistry {
    pub fn new(modules: NativeModules, telemetry: Telemetry) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                modules,
                telemetry,
                state: Mutex::new(RegistryState::default()),
            }),
        }
    }

    pub fn modules(&self) -> &NativeModules {
        &self.inner.modules
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.inner.telemetry
    }

    /// Number of registered managers
    pub fn live_count(&self) -> usize {
        lock(&self.inner.state).instances.len()
    }

    /// Whether the native listener pair is attached
    pub fn has_subscriptions(&self) -> bool {
        let state = lock(&self.inner.state);
        state.managers_changed.is_some() && state.ad_error.is_some()
    }

    /// Placement ids of the registered managers, in registration order
    pub fn placement_ids(&self) -> Vec<String> {
        lock(&self.inner.state)
            .instances
            .values()
            .map(|core| core.placement_id().to_string())
            .collect()
    }

    /// Add a manager and make sure the listener pair is attached
    ///
    /// Fails with `MODULE_NOT_FOUND` when the event source cannot be
    /// resolved; the manager is not left registered in that case.
    pub(crate) fn register(&self, core: Arc<ManagerCore>) -> Result<u64> {
        let id = {
            let mut state = lock(&self.inner.state);
            let id = state.next_id;
            state.next_id += 1;
            state.instances.insert(id, core);
            id
        };

        if let Err(err) = self.ensure_subscriptions() {
            self.unregister(id);
            return Err(err);
        }

        debug!(id, live = self.live_count(), "Registered native ads manager");
        Ok(id)
    }

    /// Remove a manager, clear its callbacks and release the listener pair
    /// when no manager remains
    ///
    /// Returns `false` when `id` was not registered.
    pub(crate) fn unregister(&self, id: u64) -> bool {
        let (core, released) = {
            let mut state = lock(&self.inner.state);
            let core = state.instances.remove(&id);
            let released = if state.instances.is_empty() {
                state.take_subscriptions()
            } else {
                Vec::new()
            };
            (core, released)
        };

        if !released.is_empty() {
            debug!("Last native ads manager gone, releasing listeners");
        }
        // Dropping the handles detaches them from the event source.
        drop(released);

        match core {
            Some(core) => {
                core.clear_callbacks();
                debug!(id, "Unregistered native ads manager");
                true
            }
            None => false,
        }
    }

    /// Forget every manager and detach the listener pair
    pub fn reset(&self) {
        let (cores, released) = {
            let mut state = lock(&self.inner.state);
            let cores = std::mem::take(&mut state.instances);
            (cores, state.take_subscriptions())
        };
        drop(released);

        for core in cores.values() {
            core.clear_callbacks();
        }
        debug!(cleared = cores.len(), "Native ads manager registry reset");
    }

    fn ensure_subscriptions(&self) -> Result<()> {
        let (need_changed, need_error) = {
            let state = lock(&self.inner.state);
            (state.managers_changed.is_none(), state.ad_error.is_none())
        };
        if !need_changed && !need_error {
            return Ok(());
        }

        let emitter = self.inner.modules.native_ad_emitter()?;
        let weak = Arc::downgrade(&self.inner);

        let changed = need_changed.then(|| {
            attach(&emitter, MANAGERS_CHANGED_EVENT, weak.clone(), |inner, payload| {
                inner.dispatch_inventory(payload)
            })
        });
        let error = need_error.then(|| {
            attach(&emitter, AD_ERROR_EVENT, weak, |inner, payload| {
                inner.dispatch_error(payload)
            })
        });

        // Another registration may have raced us; keep whichever pair landed
        // first and detach the rest once the lock is released.
        let surplus = {
            let mut state = lock(&self.inner.state);
            let mut surplus = Vec::new();
            install(&mut state.managers_changed, changed, &mut surplus);
            install(&mut state.ad_error, error, &mut surplus);
            if state.instances.is_empty() {
                surplus.extend(state.take_subscriptions());
            }
            surplus
        };
        drop(surplus);

        Ok(())
    }
}

fn attach<F>(
    emitter: &Arc<dyn AdEventEmitterModule>,
    event_name: &'static str,
    registry: Weak<RegistryInner>,
    dispatch: F,
) -> EmitterSubscription
where
    F: Fn(&RegistryInner, &serde_json::Value) + Send + Sync + 'static,
{
    let handler: EventHandler = Arc::new(move |payload: &serde_json::Value| {
        if let Some(inner) = registry.upgrade() {
            dispatch(&inner, payload);
        }
    });
    EmitterSubscription::attach(Arc::clone(emitter), event_name, handler)
}

fn install(
    slot: &mut Option<EmitterSubscription>,
    candidate: Option<EmitterSubscription>,
    surplus: &mut Vec<EmitterSubscription>,
) {
    if let Some(candidate) = candidate {
        if slot.is_none() {
            *slot = Some(candidate);
        } else {
            surplus.push(candidate);
        }
    }
}

impl fmt::Debug for AdsManagerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdsManagerRegistry")
            .field("live", &self.live_count())
            .field("subscribed", &self.has_subscriptions())
            .finish()
    }
}
