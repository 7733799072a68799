// # Native Event Source
//
// The native layer (`CTKNativeAdEmitter`) pushes events by name with a JSON
// payload. Handlers are identified by `Arc` identity: removing a listener
// requires the same `Arc` that was added.

use serde_json::Value;
use std::sync::Arc;

/// Callback invoked with an event payload
pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Trait for the native event source
///
/// Implementations deliver events synchronously on the thread that emits
/// them and must not hold internal locks while a handler runs: handlers may
/// add or remove listeners.
pub trait AdEventEmitterModule: Send + Sync {
    /// Start delivering `event_name` events to `handler`
    fn add_listener(&self, event_name: &str, handler: EventHandler);

    /// Stop delivering `event_name` events to `handler`
    fn remove_listener(&self, event_name: &str, handler: &EventHandler);
}
