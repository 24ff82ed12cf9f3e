//! # Calibration Presets
//!
//! JSON interchange document for a full set of pedal calibrations.
//!
//! ```json
//! {
//!   "name": "Stock",
//!   "description": "No calibration",
//!   "gas":    { "deadzone": 0.0, "min": 0.0, "max": 100.0, "curve": "linear", "invert": false },
//!   "brake":  { "deadzone": 0.0, "min": 0.0, "max": 100.0, "curve": "linear", "invert": false },
//!   "clutch": { "deadzone": 0.0, "min": 0.0, "max": 100.0, "curve": "linear", "invert": false }
//! }
//! ```
//!
//! Managing a directory of named presets is left to the front-end.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use super::calibrator::Calibrator;
use super::profile::{CalibrationProfile, Pedal, Setting};
use crate::error::Result;

/// Named calibration for all three pedals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub gas: CalibrationProfile,
    #[serde(default)]
    pub brake: CalibrationProfile,
    #[serde(default)]
    pub clutch: CalibrationProfile,
}

impl Preset {
    /// The "no calibration" preset
    #[must_use]
    pub fn stock() -> Self {
        Self {
            name: "Stock".to_string(),
            description: "No calibration".to_string(),
            gas: CalibrationProfile::default(),
            brake: CalibrationProfile::default(),
            clutch: CalibrationProfile::default(),
        }
    }

    /// Captures the current settings of a calibrator.
    #[must_use]
    pub fn from_calibrator(calibrator: &Calibrator, name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            gas: calibrator.profile(Pedal::Gas),
            brake: calibrator.profile(Pedal::Brake),
            clutch: calibrator.profile(Pedal::Clutch),
        }
    }

    #[must_use]
    pub fn profile(&self, pedal: Pedal) -> &CalibrationProfile {
        match pedal {
            Pedal::Gas => &self.gas,
            Pedal::Brake => &self.brake,
            Pedal::Clutch => &self.clutch,
        }
    }

    /// Pushes every setting into `calibrator`.
    ///
    /// Values go through the regular setters, so out-of-range percentages
    /// are clamped exactly as slider input would be.
    ///
    /// # Errors
    ///
    /// Returns an error if a percentage in the document is not finite.
    pub fn apply_to(&self, calibrator: &Calibrator) -> Result<()> {
        for pedal in Pedal::ALL {
            let profile = self.profile(pedal);
            for setting in Setting::ALL {
                calibrator.set_setting(pedal, setting, profile.get(setting))?;
            }
        }
        info!("Applied calibration preset '{}'", self.name);
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a preset from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a valid preset
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Save the preset as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::stock()
    }
}
