// # Native Ad Events Hook
//
// Follows `nativeAdLoaded` / `nativeAdError` for one placement. Events for
// other placements are ignored.

use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::error;

use crate::error::{Error, ErrorCode, Result};
use crate::events::{
    AdErrorEvent, EmitterSubscription, NativeAdLoaded, NATIVE_AD_ERROR_EVENT,
    NATIVE_AD_LOADED_EVENT,
};
use crate::native::NativeModules;
use crate::traits::EventHandler;
use crate::validation::validate_placement_id;

const DEFAULT_AD_ERROR: &str = "Failed to load native ad";

/// Observable state of a [`NativeAdEvents`] hook
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeAdEventsState {
    /// Latest ad payload
    pub ad: Option<Value>,
    pub is_loading: bool,
    pub error: Option<Error>,
}

type StateSender = watch::Sender<NativeAdEventsState>;

/// Single-ad events for one placement
pub struct NativeAdEvents {
    placement_id: String,
    state: Arc<StateSender>,
    _listeners: Vec<EmitterSubscription>,
}

/// Listen for single-ad events of `placement_id`
///
/// A blank placement id or a missing event source leaves the returned hook
/// carrying the error, not loading and with no listener attached.
pub fn use_native_ad_events(modules: &NativeModules, placement_id: &str) -> NativeAdEvents {
    let (sender, _) = watch::channel(NativeAdEventsState::default());
    let state = Arc::new(sender);

    let listeners = match attach(modules, placement_id, &state) {
        Ok(listeners) => listeners,
        Err(err) => {
            error!("[FacebookAds] Failed to setup native ad events: {}", err);
            state.send_modify(|state| {
                state.error = Some(err);
                state.is_loading = false;
            });
            Vec::new()
        }
    };

    NativeAdEvents {
        placement_id: placement_id.to_string(),
        state,
        _listeners: listeners,
    }
}

fn attach(
    modules: &NativeModules,
    placement_id: &str,
    state: &Arc<StateSender>,
) -> Result<Vec<EmitterSubscription>> {
    validate_placement_id(placement_id)?;
    let emitter = modules.native_ad_emitter()?;

    state.send_modify(|state| state.is_loading = true);
    let weak = Arc::downgrade(state);
    Ok(vec![
        EmitterSubscription::attach(
            Arc::clone(&emitter),
            NATIVE_AD_LOADED_EVENT,
            loaded_handler(weak.clone(), placement_id.to_string()),
        ),
        EmitterSubscription::attach(
            emitter,
            NATIVE_AD_ERROR_EVENT,
            error_handler(weak, placement_id.to_string()),
        ),
    ])
}

fn loaded_handler(state: Weak<StateSender>, placement_id: String) -> EventHandler {
    Arc::new(move |payload: &Value| {
        let Some(event) = NativeAdLoaded::from_payload(payload) else {
            return;
        };
        if event.placement_id != placement_id {
            return;
        }
        if let Some(state) = state.upgrade() {
            state.send_modify(|state| {
                state.ad = Some(event.ad);
                state.is_loading = false;
                state.error = None;
            });
        }
    })
}

fn error_handler(state: Weak<StateSender>, placement_id: String) -> EventHandler {
    Arc::new(move |payload: &Value| {
        let event = AdErrorEvent::from_payload(payload);
        if event.placement_id.as_deref() != Some(placement_id.as_str()) {
            return;
        }
        let err = Error::new(
            ErrorCode::AdLoadFailed,
            "NativeAdManager",
            event.message_or(DEFAULT_AD_ERROR),
        );
        if let Some(state) = state.upgrade() {
            state.send_modify(|state| {
                state.error = Some(err);
                state.is_loading = false;
            });
        }
    })
}

impl NativeAdEvents {
    pub fn placement_id(&self) -> &str {
        &self.placement_id
    }

    pub fn state(&self) -> NativeAdEventsState {
        self.state.borrow().clone()
    }

    pub fn ad(&self) -> Option<Value> {
        self.state.borrow().ad.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn error(&self) -> Option<Error> {
        self.state.borrow().error.clone()
    }

    pub fn changes(&self) -> WatchStream<NativeAdEventsState> {
        WatchStream::new(self.state.subscribe())
    }
}
