// # Interstitial Hook
//
// Wraps the interstitial facade with `loading`/`error` state. Errors are
// both recorded and returned.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::error::{Error, Result};
use crate::interstitial::{InterstitialAction, InterstitialAdManager};
use crate::validation::validate_placement_id;

/// Observable state of an [`InterstitialAdHook`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InterstitialHookState {
    pub loading: bool,
    pub error: Option<Error>,
}

/// Interstitial operations with observable progress
pub struct InterstitialAdHook {
    manager: InterstitialAdManager,
    state: Arc<watch::Sender<InterstitialHookState>>,
}

impl InterstitialAdHook {
    pub fn new(manager: InterstitialAdManager) -> Self {
        let (sender, _) = watch::channel(InterstitialHookState::default());
        Self {
            manager,
            state: Arc::new(sender),
        }
    }

    pub async fn show_ad(&self, placement_id: &str) -> Result<bool> {
        self.run(InterstitialAction::Show, placement_id).await
    }

    pub async fn preload_ad(&self, placement_id: &str) -> Result<bool> {
        self.run(InterstitialAction::Preload, placement_id).await
    }

    pub async fn show_preloaded_ad(&self, placement_id: &str) -> Result<bool> {
        self.run(InterstitialAction::ShowPreloaded, placement_id).await
    }

    pub fn state(&self) -> InterstitialHookState {
        self.state.borrow().clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<Error> {
        self.state.borrow().error.clone()
    }

    pub fn changes(&self) -> WatchStream<InterstitialHookState> {
        WatchStream::new(self.state.subscribe())
    }

    async fn run(&self, action: InterstitialAction, placement_id: &str) -> Result<bool> {
        if let Err(err) = validate_placement_id(placement_id) {
            self.finish(Some(err.clone()));
            return Err(err);
        }

        self.state.send_replace(InterstitialHookState {
            loading: true,
            error: None,
        });

        let context = format!("useInterstitialAd.{}", action.method());
        let result = self.manager.execute(action, &context, placement_id).await;
        self.finish(result.as_ref().err().cloned());
        result
    }

    fn finish(&self, error: Option<Error>) {
        self.state.send_modify(|state| {
            state.loading = false;
            if error.is_some() {
                state.error = error;
            }
        });
    }
}
