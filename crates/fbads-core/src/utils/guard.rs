use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::error;

use crate::error::Error;
use crate::telemetry::Telemetry;

/// Run a user-supplied callback, containing any panic it raises
///
/// A panic is logged and reported to `telemetry` as an `UNKNOWN` error
/// originating from `label`; it never propagates to the caller.
///
/// Returns `true` when the callback completed normally.
pub fn invoke_guarded<F>(telemetry: &Telemetry, label: &str, callback: F) -> bool
where
    F: FnOnce(),
{
    match panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(()) => true,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("[FacebookAds] Error in {}: {}", label, message);
            telemetry.record_error(&Error::unknown(label, message));
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "Unknown error".to_string()
    }
}
