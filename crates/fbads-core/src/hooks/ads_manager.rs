// # Native Ads Manager Hook
//
// Tracks one placement through the reactive context. The context entry is
// created before the native `init` call so that no inventory event for the
// placement is lost.

use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error};

use crate::context::{ManagerState, NativeAdsManagerContext, StateCallback};
use crate::error::{Error, Result};
use crate::native::NativeModules;
use crate::subscription::Subscription;
use crate::validation::validate_placement_id;

const HOOK_ORIGIN: &str = "useNativeAdsManager";

/// Live view of one placement's [`ManagerState`]
pub struct NativeAdsManagerHook {
    placement_id: String,
    state: Arc<watch::Sender<ManagerState>>,
    subscription: Subscription,
}

/// Start tracking `placement_id` and request `ads_to_request` ads
///
/// Failures never escape: they are recorded as the hook state's `error`
/// with loading stopped.
pub fn use_native_ads_manager(
    context: &NativeAdsManagerContext,
    modules: &NativeModules,
    placement_id: &str,
    ads_to_request: u32,
) -> NativeAdsManagerHook {
    let initial = context
        .get_manager_state(placement_id)
        .unwrap_or_else(|| ManagerState::new(placement_id));
    let (sender, _) = watch::channel(initial);
    let state = Arc::new(sender);

    let subscription = match start(context, modules, placement_id, ads_to_request, &state) {
        Ok(subscription) => subscription,
        Err(err) => {
            error!("[FacebookAds] {} failed for {}: {}", HOOK_ORIGIN, placement_id, err);
            context.telemetry().record_error(&err);
            state.send_modify(|state| {
                state.error = Some(err);
                state.is_loading = false;
            });
            Subscription::noop()
        }
    };

    NativeAdsManagerHook {
        placement_id: placement_id.to_string(),
        state,
        subscription,
    }
}

fn start(
    context: &NativeAdsManagerContext,
    modules: &NativeModules,
    placement_id: &str,
    ads_to_request: u32,
    state: &Arc<watch::Sender<ManagerState>>,
) -> Result<Subscription> {
    validate_placement_id(placement_id)?;
    let module = modules.native_ad_manager()?;

    state.send_replace(context.ensure_manager(placement_id)?);
    let sender = Arc::clone(state);
    let callback: Arc<StateCallback> = Arc::new(move |next: &ManagerState| {
        sender.send_replace(next.clone());
    });
    let subscription = context.subscribe(placement_id, callback)?;

    if let Err(e) = module.init(placement_id, ads_to_request) {
        subscription.remove();
        return Err(Error::invalid_config(HOOK_ORIGIN, e.message()).with_cause(e));
    }

    debug!(placement_id, ads_to_request, "Native ads manager hook started");
    Ok(subscription)
}

impl NativeAdsManagerHook {
    pub fn placement_id(&self) -> &str {
        &self.placement_id
    }

    /// Current state
    pub fn state(&self) -> ManagerState {
        self.state.borrow().clone()
    }

    /// Receiver observing every state change
    pub fn watch(&self) -> watch::Receiver<ManagerState> {
        self.state.subscribe()
    }

    /// Stream of states, starting with the current one
    pub fn changes(&self) -> WatchStream<ManagerState> {
        WatchStream::new(self.watch())
    }
}

impl Drop for NativeAdsManagerHook {
    fn drop(&mut self) {
        self.subscription.remove();
    }
}
