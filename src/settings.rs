//! Host settings
//!
//! Persisted in LocalStorage in the browser; read from a JSON file natively.
//! Missing fields fall back to their defaults.

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SettingsError;
use crate::renderer::RenderStyle;
use crate::sim::CatchUpPolicy;

/// Everything the host needs to load, drive and draw the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Where to fetch the compiled module from
    pub module_url: String,

    // === Simulation ===
    /// Container radius passed to `init`
    pub container_radius: f32,
    /// Second `init` argument, forwarded untouched
    pub body_param: f32,
    /// Fixed simulation step (milliseconds)
    pub step_ms: f64,
    /// Period of the frame timer (milliseconds)
    pub tick_interval_ms: u32,
    /// How much backlog a single tick may replay
    pub catch_up: CatchUpPolicy,

    // === Diagnostics ===
    pub log_level: LevelFilter,

    // === Drawing ===
    pub style: RenderStyle,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            module_url: DEFAULT_MODULE_URL.to_string(),
            container_radius: CONTAINER_RADIUS,
            body_param: BODY_PARAM,
            step_ms: STEP_MS,
            tick_interval_ms: TICK_INTERVAL_MS,
            catch_up: CatchUpPolicy::default(),
            log_level: LevelFilter::Info,
            style: RenderStyle::default(),
        }
    }
}

impl HostSettings {
    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "ballpit_settings";

    /// Reject values the frame loop cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |field, reason| Err(SettingsError::Invalid { field, reason });

        if self.module_url.trim().is_empty() {
            return invalid("module_url", "must not be empty");
        }
        if !(self.container_radius.is_finite() && self.container_radius > 0.0) {
            return invalid("container_radius", "must be a positive number");
        }
        if !self.body_param.is_finite() {
            return invalid("body_param", "must be finite");
        }
        if !(self.step_ms.is_finite() && self.step_ms > 0.0) {
            return invalid("step_ms", "must be a positive number");
        }
        if self.tick_interval_ms == 0 {
            return invalid("tick_interval_ms", "must be at least 1");
        }
        if self.catch_up == (CatchUpPolicy::Clamp { max_steps: 0 }) {
            return invalid("catch_up", "clamp must allow at least one step");
        }
        if self.style.container_line_width < 0.0 || self.style.ball_ring_width < 0.0 {
            return invalid("style", "line widths must not be negative");
        }
        Ok(())
    }

    /// Parse and validate settings from JSON
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Load settings from a JSON file
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_file(path: impl AsRef<std::path::Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
