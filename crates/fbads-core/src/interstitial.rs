//! Interstitial ads
//!
//! Every operation validates the placement id, then awaits the native call
//! under the configured request deadline. Failures are returned as typed
//! errors: display operations default to `AD_DISPLAY_FAILED`, preloading to
//! `AD_LOAD_FAILED`.

use std::fmt;
use std::time::Instant;
use tracing::debug;

use crate::config::ConfigStore;
use crate::error::{ErrorCode, Result};
use crate::native::NativeModules;
use crate::telemetry::Telemetry;
use crate::utils::with_timeout;
use crate::validation::validate_placement_id;

/// The three interstitial operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterstitialAction {
    /// Load and display immediately
    Show,
    /// Load without displaying
    Preload,
    /// Display what [`InterstitialAction::Preload`] loaded
    ShowPreloaded,
}

impl InterstitialAction {
    /// Native method name
    pub fn method(&self) -> &'static str {
        match self {
            InterstitialAction::Show => "showAd",
            InterstitialAction::Preload => "preloadAd",
            InterstitialAction::ShowPreloaded => "showPreloadedAd",
        }
    }

    /// Code assigned to a native failure of this operation
    pub fn default_code(&self) -> ErrorCode {
        match self {
            InterstitialAction::Preload => ErrorCode::AdLoadFailed,
            InterstitialAction::Show | InterstitialAction::ShowPreloaded => {
                ErrorCode::AdDisplayFailed
            }
        }
    }
}

impl fmt::Display for InterstitialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

/// Interstitial facade
#[derive(Debug, Clone)]
pub struct InterstitialAdManager {
    modules: NativeModules,
    config: ConfigStore,
    telemetry: Telemetry,
}

impl InterstitialAdManager {
    pub fn new(modules: NativeModules, config: ConfigStore, telemetry: Telemetry) -> Self {
        Self {
            modules,
            config,
            telemetry,
        }
    }

    /// Load and display an interstitial ad
    pub async fn show_ad(&self, placement_id: &str) -> Result<bool> {
        self.run(InterstitialAction::Show, placement_id).await
    }

    /// Load an interstitial ad without displaying it
    pub async fn preload_ad(&self, placement_id: &str) -> Result<bool> {
        self.run(InterstitialAction::Preload, placement_id).await
    }

    /// Display an interstitial ad loaded by [`InterstitialAdManager::preload_ad`]
    pub async fn show_preloaded_ad(&self, placement_id: &str) -> Result<bool> {
        self.run(InterstitialAction::ShowPreloaded, placement_id).await
    }

    async fn run(&self, action: InterstitialAction, placement_id: &str) -> Result<bool> {
        let context = format!("InterstitialAdManager.{}", action.method());
        self.execute(action, &context, placement_id).await
    }

    /// Run `action`, labelling failures with `context`
    pub(crate) async fn execute(
        &self,
        action: InterstitialAction,
        context: &str,
        placement_id: &str,
    ) -> Result<bool> {
        validate_placement_id(placement_id)?;
        let module = self.modules.interstitial()?;
        let config = self.config.get();

        let started = Instant::now();
        let operation = match action {
            InterstitialAction::Show => module.show_ad(placement_id),
            InterstitialAction::Preload => module.preload_ad(placement_id),
            InterstitialAction::ShowPreloaded => module.show_preloaded_ad(placement_id),
        };
        let result = with_timeout(
            operation,
            context,
            action.default_code(),
            config.request_timeout(),
        )
        .await;

        if config.enable_performance_monitoring {
            self.telemetry.record_performance(context, started.elapsed());
        }
        debug!(placement_id, %action, ok = result.is_ok(), "Interstitial operation finished");

        result
    }
}
