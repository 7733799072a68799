// # Manager Core
//
// Per-placement state and callback hub shared between the public
// `NativeAdsManager` handle and the registry's event handlers.
//
// Transitions:
//
//   Loading ──ready──▶ Ready
//      │                 │
//      └──error──▶ Errored ◀──not ready / broadcast error
//
// Callbacks are snapshotted under the cell lock and invoked after it is
// released, each through `invoke_guarded`.

use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::subscription::CallbackSet;
use crate::telemetry::Telemetry;
use crate::utils::{invoke_guarded, lock};

/// Zero-argument callback fired when inventory becomes ready
pub type LoadedCallback = dyn Fn() + Send + Sync;

/// Callback fired with an error message when loading fails
pub type ErroredCallback = dyn Fn(&str) + Send + Sync;

/// Message delivered when the inventory event reports a placement not ready
pub(crate) const NOT_READY_MESSAGE: &str = "Failed to load native ads";

const LOADED_LABEL: &str = "ads loaded callback";
const ERRORED_LABEL: &str = "ads error callback";

struct ManagerCell {
    is_valid: bool,
    is_loading: bool,
    loaded: CallbackSet<LoadedCallback>,
    errored: CallbackSet<ErroredCallback>,
}

pub(crate) struct ManagerCore {
    placement_id: String,
    telemetry: Telemetry,
    cell: Mutex<ManagerCell>,
}

impl ManagerCore {
    pub(crate) fn new(placement_id: &str, telemetry: Telemetry) -> Self {
        Self {
            placement_id: placement_id.to_string(),
            telemetry,
            cell: Mutex::new(ManagerCell {
                is_valid: false,
                is_loading: true,
                loaded: CallbackSet::new(),
                errored: CallbackSet::new(),
            }),
        }
    }

    pub(crate) fn placement_id(&self) -> &str {
        &self.placement_id
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// `(is_valid, is_loading)`
    pub(crate) fn flags(&self) -> (bool, bool) {
        let cell = lock(&self.cell);
        (cell.is_valid, cell.is_loading)
    }

    /// Store `callback`; returns whether the manager was already ready
    pub(crate) fn add_loaded(&self, callback: Arc<LoadedCallback>) -> bool {
        let mut cell = lock(&self.cell);
        cell.loaded.insert(callback);
        cell.is_valid
    }

    pub(crate) fn remove_loaded(&self, callback: &Arc<LoadedCallback>) {
        lock(&self.cell).loaded.remove(callback);
    }

    pub(crate) fn add_errored(&self, callback: Arc<ErroredCallback>) {
        lock(&self.cell).errored.insert(callback);
    }

    pub(crate) fn remove_errored(&self, callback: &Arc<ErroredCallback>) {
        lock(&self.cell).errored.remove(callback);
    }

    /// `(loaded, errored)` callback counts
    pub(crate) fn callback_counts(&self) -> (usize, usize) {
        let cell = lock(&self.cell);
        (cell.loaded.len(), cell.errored.len())
    }

    pub(crate) fn clear_callbacks(&self) {
        let mut cell = lock(&self.cell);
        cell.loaded.clear();
        cell.errored.clear();
    }

    pub(crate) fn mark_ready(&self) {
        let callbacks = {
            let mut cell = lock(&self.cell);
            cell.is_valid = true;
            cell.is_loading = false;
            cell.loaded.snapshot()
        };
        debug!(placement_id = %self.placement_id, callbacks = callbacks.len(), "Native ads ready");

        for callback in callbacks {
            invoke_guarded(&self.telemetry, LOADED_LABEL, || callback());
        }
    }

    pub(crate) fn mark_errored(&self, message: &str) {
        let callbacks = {
            let mut cell = lock(&self.cell);
            cell.is_valid = false;
            cell.is_loading = false;
            cell.errored.snapshot()
        };
        debug!(placement_id = %self.placement_id, reason = message, "Native ads errored");

        for callback in callbacks {
            invoke_guarded(&self.telemetry, ERRORED_LABEL, || callback(message));
        }
    }

    /// Apply the readiness reported for this placement
    ///
    /// Every ready report fires the loaded callbacks again. A not-ready
    /// report only errors a manager that is loading or was valid.
    pub(crate) fn apply_inventory(&self, ready: bool) {
        if ready {
            self.mark_ready();
            return;
        }

        let (is_valid, is_loading) = self.flags();
        if is_loading || is_valid {
            self.mark_errored(NOT_READY_MESSAGE);
        }
    }

    /// Apply an error that names no placement
    ///
    /// Only managers still loading or not valid are affected.
    pub(crate) fn apply_unattributed_error(&self, message: &str) {
        let (is_valid, is_loading) = self.flags();
        if is_loading || !is_valid {
            self.mark_errored(message);
        }
    }
}
