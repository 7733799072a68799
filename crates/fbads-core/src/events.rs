//! Native events consumed by the bridge
//!
//! The event source delivers untyped JSON payloads. This module names the
//! events, parses their payloads into typed values and owns the listener
//! handle ([`EmitterSubscription`]) that detaches itself from the source.
//!
//! Payload parsing is lenient: malformed entries are skipped, never fatal,
//! because the payload shape is controlled by native code.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::traits::{AdEventEmitterModule, EventHandler};

/// Readiness of every known placement changed
pub const MANAGERS_CHANGED_EVENT: &str = "CTKNativeAdsManagersChanged";
/// An ad request failed, placement id optional
pub const AD_ERROR_EVENT: &str = "onAdError";
/// A single native ad finished loading
pub const NATIVE_AD_LOADED_EVENT: &str = "nativeAdLoaded";
/// A single native ad failed to load
pub const NATIVE_AD_ERROR_EVENT: &str = "nativeAdError";

/// Message used when an error payload carries none
pub const DEFAULT_AD_ERROR_MESSAGE: &str = "Native ad request failed";

/// Readiness reported for one placement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryEntry {
    pub ready: bool,
    /// Inventory count, when the native layer reports one
    pub ads_available: Option<u32>,
}

/// Payload of [`MANAGERS_CHANGED_EVENT`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryChanged {
    entries: BTreeMap<String, InventoryEntry>,
}

impl InventoryChanged {
    /// Parse a `{ placementId: ready }` mapping
    ///
    /// A value may be a boolean, a number (inventory count, ready when
    /// positive) or any other JSON value judged by truthiness.
    pub fn from_payload(payload: &Value) -> Self {
        let Some(map) = payload.as_object() else {
            debug!("Ignoring non-object inventory payload");
            return Self::default();
        };

        let entries = map
            .iter()
            .filter(|(placement_id, _)| !placement_id.is_empty())
            .map(|(placement_id, value)| {
                let ads_available = value
                    .as_u64()
                    .map(|count| u32::try_from(count).unwrap_or(u32::MAX));
                let entry = InventoryEntry {
                    ready: truthy(value),
                    ads_available,
                };
                (placement_id.clone(), entry)
            })
            .collect();

        Self { entries }
    }

    pub fn get(&self, placement_id: &str) -> Option<InventoryEntry> {
        self.entries.get(placement_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, InventoryEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), *entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Payload of [`AD_ERROR_EVENT`] and [`NATIVE_AD_ERROR_EVENT`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdErrorEvent {
    pub message: Option<String>,
    pub placement_id: Option<String>,
}

impl AdErrorEvent {
    /// Accepts a bare message string or `{ message?, placementId? }`
    pub fn from_payload(payload: &Value) -> Self {
        match payload {
            Value::String(message) => Self {
                message: non_empty(message),
                placement_id: None,
            },
            Value::Object(map) => Self {
                message: map.get("message").and_then(Value::as_str).and_then(non_empty),
                placement_id: map
                    .get("placementId")
                    .and_then(Value::as_str)
                    .and_then(non_empty),
            },
            _ => Self::default(),
        }
    }

    /// Message, or `default` when the payload had none
    pub fn message_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.message.as_deref().unwrap_or(default)
    }
}

/// Payload of [`NATIVE_AD_LOADED_EVENT`]
#[derive(Debug, Clone, PartialEq)]
pub struct NativeAdLoaded {
    pub placement_id: String,
    pub ad: Value,
}

impl NativeAdLoaded {
    /// `None` when the payload names no placement
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let placement_id = payload.get("placementId")?.as_str()?.to_string();
        let ad = payload.get("ad").cloned().unwrap_or(Value::Null);
        Some(Self { placement_id, ad })
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// A listener attached to the native event source
///
/// Removing it (explicitly or by dropping it) detaches the handler from the
/// source exactly once.
pub struct EmitterSubscription {
    emitter: Arc<dyn AdEventEmitterModule>,
    event_name: &'static str,
    handler: EventHandler,
    removed: AtomicBool,
}

impl EmitterSubscription {
    /// Add `handler` to `emitter` for `event_name`
    pub fn attach(
        emitter: Arc<dyn AdEventEmitterModule>,
        event_name: &'static str,
        handler: EventHandler,
    ) -> Self {
        emitter.add_listener(event_name, Arc::clone(&handler));
        debug!(event = event_name, "Attached native event listener");
        Self {
            emitter,
            event_name,
            handler,
            removed: AtomicBool::new(false),
        }
    }

    pub fn event_name(&self) -> &'static str {
        self.event_name
    }

    /// Detach the handler; later calls do nothing
    pub fn remove(&self) {
        if self.removed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.emitter.remove_listener(self.event_name, &self.handler);
        debug!(event = self.event_name, "Detached native event listener");
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::SeqCst)
    }
}

impl Drop for EmitterSubscription {
    fn drop(&mut self) {
        self.remove();
    }
}

impl fmt::Debug for EmitterSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmitterSubscription")
            .field("event_name", &self.event_name)
            .field("removed", &self.is_removed())
            .finish()
    }
}
