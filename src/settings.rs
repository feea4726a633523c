//! Machine tuning: odds and timings
//!
//! Persisted separately from collection counts in LocalStorage.

use serde::{Deserialize, Serialize};

use crate::error::ClawError;

/// Lowest slip probability the difficulty lever will go to
pub const MIN_TUNED_SLIP_PROBABILITY: f32 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Odds ===
    /// Chance a grabbed prize slips when the claw is not over the chute
    pub slip_probability: f32,
    /// Chance a slot draws from the primary pool
    pub primary_probability: f32,

    // === Timing (milliseconds) ===
    /// Stepped-motion tick interval; also the fixed simulation step
    pub motion_interval_ms: u32,
    /// Maximum substeps per update call to prevent spiral of death
    pub max_substeps: u32,
    /// Slip check fires uniformly in [0, this) after a grab
    pub slip_delay_max_ms: u32,
    /// Eased fall of a slipped prize back to its spawn height
    pub slip_fall_ms: u32,
    /// Eased fall of a released prize into the chute
    pub drop_fall_ms: u32,
    /// Open-claw animation before closing at full reach
    pub claw_open_ms: u32,
    /// Close-claw animation before retracting
    pub claw_close_ms: u32,
    /// Pause after release before the machine is idle again
    pub drop_settle_ms: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            slip_probability: 0.4,
            primary_probability: 0.25,

            motion_interval_ms: 10,
            max_substeps: 8,
            slip_delay_max_ms: 4000,
            slip_fall_ms: 500,
            drop_fall_ms: 400,
            claw_open_ms: 300,
            claw_close_ms: 300,
            drop_settle_ms: 500,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, ClawError> {
        let settings: Settings = serde_json::from_str(json)
            .map_err(|e| ClawError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ClawError> {
        for (name, p) in [
            ("slip_probability", self.slip_probability),
            ("primary_probability", self.primary_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ClawError::InvalidSettings(format!(
                    "{name} must be within [0, 1], got {p}"
                )));
            }
        }
        if self.motion_interval_ms == 0 {
            return Err(ClawError::InvalidSettings(
                "motion_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.max_substeps == 0 {
            return Err(ClawError::InvalidSettings(
                "max_substeps must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Difficulty lever: lower (or raise) the slip odds, never below the floor
    ///
    /// Returns the probability actually applied.
    pub fn tune_slip_probability(&mut self, p: f32) -> f32 {
        self.slip_probability = if p.is_nan() {
            MIN_TUNED_SLIP_PROBABILITY
        } else {
            p.clamp(MIN_TUNED_SLIP_PROBABILITY, 1.0)
        };
        self.slip_probability
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "claw_machine_settings";

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
    pub fn save(&self) -> Result<(), ClawError> {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| ClawError::Storage("LocalStorage unavailable".into()))?;
        let json = serde_json::to_string(self).map_err(|e| ClawError::Storage(e.to_string()))?;
        storage
            .set_item(Self::STORAGE_KEY, &json)
            .map_err(|e| ClawError::Storage(format!("{:?}", e)))?;
        log::info!("Settings saved");
        Ok(())
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) -> Result<(), ClawError> {
        Ok(())
    }
}
