// # fbads-sim - bridge simulator
//
// Drives the fbads bridge over the in-memory native layer and logs what a
// React Native screen would observe.
//
// This binary is a THIN integration layer:
// - All bridge behavior lives in fbads-core
// - All native behavior lives in fbads-native-memory
// - Configuration is via environment variables (plus an optional JSON file)
//
// The simulator:
// 1. Reads configuration from environment variables
// 2. Builds an `AdsBridge` over a `MemoryNativeLayer`
// 3. Creates one manager and one reactive hook per placement
// 4. Completes the pending ad requests, reports failures
// 5. Logs the resulting manager and context states
//
// ## Configuration
//
// - `FBADS_PLACEMENTS`: Comma-separated placement ids (required)
// - `FBADS_ADS_TO_REQUEST`: Ads requested per placement (1..=100, default 10)
// - `FBADS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `FBADS_CONFIG_PATH`: JSON configuration patch merged at startup
// - `FBADS_PLATFORM`: ios or android (default android)
// - `FBADS_FAIL_PLACEMENTS`: Placements whose inventory reports not ready
//
// ## Example
//
// ```bash
// export FBADS_PLACEMENTS=home_feed,article_footer
// export FBADS_FAIL_PLACEMENTS=article_footer
// export FBADS_LOG_LEVEL=debug
//
// fbads-sim
// ```

use anyhow::{Context, Result};
use fbads_core::traits::Platform;
use fbads_core::{AdsBridge, NativeAdsManager};
use fbads_native_memory::MemoryNativeLayer;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the simulator
///
/// - 0: Scenario completed
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum SimExitCode {
    Completed = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<SimExitCode> for ExitCode {
    fn from(code: SimExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Message reported for placements scripted to fail
const NO_FILL_MESSAGE: &str = "No fill";

/// Time given to deferred loaded-callback replays before states are logged
const SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Simulator configuration
#[derive(Debug, Clone, PartialEq)]
struct Config {
    placements: Vec<String>,
    ads_to_request: u32,
    log_level: String,
    config_path: Option<String>,
    platform: String,
    fail_placements: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from any variable lookup
    fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ads_to_request = match var("FBADS_ADS_TO_REQUEST") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("FBADS_ADS_TO_REQUEST is not a number: '{}'", raw))?,
            None => fbads_core::manager::DEFAULT_ADS_TO_REQUEST,
        };

        Ok(Self {
            placements: split_list(var("FBADS_PLACEMENTS").as_deref()),
            ads_to_request,
            log_level: var("FBADS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            config_path: var("FBADS_CONFIG_PATH").filter(|p| !p.is_empty()),
            platform: var("FBADS_PLATFORM").unwrap_or_else(|| "android".to_string()),
            fail_placements: split_list(var("FBADS_FAIL_PLACEMENTS").as_deref()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.placements.is_empty() {
            anyhow::bail!(
                "FBADS_PLACEMENTS must contain at least one placement. \
                Set it via: export FBADS_PLACEMENTS=home_feed,article_footer"
            );
        }

        if !(1..=100).contains(&self.ads_to_request) {
            anyhow::bail!(
                "FBADS_ADS_TO_REQUEST must be between 1 and 100. Got: {}",
                self.ads_to_request
            );
        }

        for placement in &self.fail_placements {
            if !self.placements.contains(placement) {
                anyhow::bail!(
                    "FBADS_FAIL_PLACEMENTS names '{}', which is not in FBADS_PLACEMENTS",
                    placement
                );
            }
        }

        self.platform()?;
        self.level()?;
        Ok(())
    }

    fn platform(&self) -> Result<Platform> {
        match self.platform.to_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            _ => anyhow::bail!(
                "FBADS_PLATFORM '{}' is not valid. Valid platforms: ios, android",
                self.platform
            ),
        }
    }

    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "FBADS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in raw.unwrap_or_default().split(',').map(str::trim) {
        if !item.is_empty() && !items.iter().any(|seen| seen == item) {
            items.push(item.to_string());
        }
    }
    items
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return SimExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return SimExitCode::ConfigError.into();
    }

    let log_level = config.level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SimExitCode::ConfigError.into();
    }

    info!("Starting fbads simulator");
    info!("Configuration loaded: {} placement(s)", config.placements.len());

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SimExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_scenario(config).await {
            error!("Simulation error: {:#}", e);
            SimExitCode::RuntimeError
        } else {
            SimExitCode::Completed
        }
    });

    result.into()
}

/// Run the scripted scenario
async fn run_scenario(config: Config) -> Result<()> {
    let layer = MemoryNativeLayer::with_platform(config.platform()?);
    for placement in &config.fail_placements {
        layer.fail_placement(placement);
    }

    let bridge = AdsBridge::new(Arc::new(layer.clone()));

    if let Some(path) = &config.config_path {
        let merged = bridge
            .config()
            .load_json_file(path)
            .await
            .with_context(|| format!("Failed to apply FBADS_CONFIG_PATH={}", path))?;
        info!("Configuration file applied: {:?}", merged);
    }

    let mut managers = Vec::with_capacity(config.placements.len());
    let mut hooks = Vec::with_capacity(config.placements.len());

    for placement in &config.placements {
        let manager = bridge
            .create_manager_with(placement, config.ads_to_request)
            .with_context(|| format!("Failed to create manager for '{}'", placement))?;
        let subscriptions = watch_manager(&manager);
        managers.push((manager, subscriptions));

        hooks.push(bridge.use_native_ads_manager(placement, config.ads_to_request));
    }

    info!(
        "Requested {} ad(s) for {} placement(s), {} native listener(s) attached",
        config.ads_to_request,
        managers.len(),
        layer.total_listeners()
    );

    let inventory = layer.complete_requests();
    info!("Inventory delivered: {}", inventory);

    for placement in &config.fail_placements {
        layer.report_error(Some(placement), NO_FILL_MESSAGE);
    }

    tokio::time::sleep(SETTLE_DELAY).await;

    for (manager, _) in &managers {
        let snapshot = serde_json::to_string(&manager.state())?;
        info!("Manager state: {}", snapshot);
    }

    for hook in &hooks {
        let state = serde_json::to_string(&hook.state())?;
        info!("Context state: {}", state);
    }

    if let Some(ready) = managers.iter().find(|(m, _)| m.is_valid()) {
        let interstitial = bridge.interstitial();
        let placement = ready.0.placement_id();
        interstitial.preload_ad(placement).await?;
        interstitial.show_preloaded_ad(placement).await?;
        info!("Interstitial shown for '{}'", placement);
    } else {
        warn!("No placement became ready; skipping interstitial");
    }

    for (manager, subscriptions) in managers {
        for subscription in subscriptions {
            subscription.remove();
        }
        manager.dispose();
    }
    drop(hooks);

    info!(
        "Scenario finished, {} native listener(s) left attached",
        layer.total_listeners()
    );
    Ok(())
}

/// Log loaded and errored callbacks of one manager
fn watch_manager(manager: &NativeAdsManager) -> Vec<fbads_core::Subscription> {
    let loaded_id = manager.placement_id().to_string();
    let errored_id = loaded_id.clone();

    vec![
        manager.on_ads_loaded(Arc::new(move || {
            info!("Ads loaded for '{}'", loaded_id);
        })),
        manager.on_ads_error(Arc::new(move |message: &str| {
            warn!("Ads failed for '{}': {}", errored_id, message);
        })),
    ]
}
