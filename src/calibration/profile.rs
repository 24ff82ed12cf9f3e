//! Calibration profile data and the per-value pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CalibrationError;

/// Span of the symmetric raw axis range (`-32767..=32767`)
const RAW_SPAN: f64 = 65534.0;

/// Offset that shifts the raw range to start at zero
const RAW_OFFSET: f64 = 32767.0;

/// Logical pedal identity, independent of physical wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pedal {
    Gas,
    Brake,
    Clutch,
}

impl Pedal {
    /// All pedals in routing order
    pub const ALL: [Pedal; 3] = [Pedal::Gas, Pedal::Brake, Pedal::Clutch];

    /// Lowercase name used in presets and on the command line
    pub fn name(self) -> &'static str {
        match self {
            Pedal::Gas => "gas",
            Pedal::Brake => "brake",
            Pedal::Clutch => "clutch",
        }
    }
}

impl fmt::Display for Pedal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Pedal {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gas" => Ok(Pedal::Gas),
            "brake" => Ok(Pedal::Brake),
            "clutch" => Ok(Pedal::Clutch),
            other => Err(CalibrationError::UnknownPedal(other.to_string())),
        }
    }
}

/// Response curve applied to the normalized pedal value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
    #[default]
    Linear,
    /// `x²`: less sensitive near zero
    Exponential,
    /// `√x`: more sensitive near zero
    Logarithmic,
}

impl CurveKind {
    fn apply(self, normalized: f64) -> f64 {
        match self {
            CurveKind::Linear => normalized,
            CurveKind::Exponential => normalized * normalized,
            CurveKind::Logarithmic if normalized > 0.0 => normalized.sqrt(),
            CurveKind::Logarithmic => 0.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CurveKind::Linear => "linear",
            CurveKind::Exponential => "exponential",
            CurveKind::Logarithmic => "logarithmic",
        }
    }
}

impl fmt::Display for CurveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CurveKind {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(CurveKind::Linear),
            "exponential" => Ok(CurveKind::Exponential),
            "logarithmic" => Ok(CurveKind::Logarithmic),
            other => Err(CalibrationError::UnknownCurve(other.to_string())),
        }
    }
}

/// Name of one field of a [`CalibrationProfile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    Deadzone,
    Min,
    Max,
    Curve,
    Invert,
}

impl Setting {
    pub const ALL: [Setting; 5] = [
        Setting::Deadzone,
        Setting::Min,
        Setting::Max,
        Setting::Curve,
        Setting::Invert,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Setting::Deadzone => "deadzone",
            Setting::Min => "min",
            Setting::Max => "max",
            Setting::Curve => "curve",
            Setting::Invert => "invert",
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Setting {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Setting::ALL
            .into_iter()
            .find(|setting| setting.name() == s)
            .ok_or_else(|| CalibrationError::UnknownSetting(s.to_string()))
    }
}

/// Value of a single setting
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingValue {
    /// Percentage in `0..=100` (deadzone, min, max)
    Percent(f64),
    Curve(CurveKind),
    Flag(bool),
}

/// Calibration settings for one pedal
///
/// All percentages are in `0..=100`. `min < max` is expected but not
/// enforced: a reversed range simply disables the range step, since slider
/// drags pass through such states.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    pub deadzone: f64,
    pub min: f64,
    pub max: f64,
    pub curve: CurveKind,
    pub invert: bool,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self {
            deadzone: 0.0,
            min: 0.0,
            max: 100.0,
            curve: CurveKind::Linear,
            invert: false,
        }
    }
}

impl CalibrationProfile {
    /// Read one setting.
    #[must_use]
    pub fn get(&self, setting: Setting) -> SettingValue {
        match setting {
            Setting::Deadzone => SettingValue::Percent(self.deadzone),
            Setting::Min => SettingValue::Percent(self.min),
            Setting::Max => SettingValue::Percent(self.max),
            Setting::Curve => SettingValue::Curve(self.curve),
            Setting::Invert => SettingValue::Flag(self.invert),
        }
    }

    /// Write one setting. Percentages are clamped to `0..=100`.
    ///
    /// # Errors
    ///
    /// - `WrongKind` if the value does not match the setting
    /// - `NotFinite` for NaN or infinite percentages
    pub fn set(&mut self, setting: Setting, value: SettingValue) -> Result<(), CalibrationError> {
        match (setting, value) {
            (Setting::Deadzone, SettingValue::Percent(v)) => {
                self.deadzone = clamp_percent(setting, v)?
            }
            (Setting::Min, SettingValue::Percent(v)) => self.min = clamp_percent(setting, v)?,
            (Setting::Max, SettingValue::Percent(v)) => self.max = clamp_percent(setting, v)?,
            (Setting::Curve, SettingValue::Curve(curve)) => self.curve = curve,
            (Setting::Invert, SettingValue::Flag(flag)) => self.invert = flag,
            (setting, _) => {
                return Err(CalibrationError::WrongKind {
                    setting: setting.name(),
                    expected: match setting {
                        Setting::Deadzone | Setting::Min | Setting::Max => "percentage",
                        Setting::Curve => "curve",
                        Setting::Invert => "boolean",
                    },
                })
            }
        }
        Ok(())
    }

    /// Runs the full pipeline on a raw axis value.
    #[must_use]
    pub fn apply(&self, raw: i16) -> i16 {
        let mut pct = raw_to_percent(raw);

        if self.invert {
            pct = 100.0 - pct;
        }

        let pct = apply_range(pct, self.min, self.max);
        let pct = apply_deadzone(pct, self.deadzone);
        let pct = self.curve.apply(pct / 100.0) * 100.0;

        percent_to_raw(pct)
    }
}

fn clamp_percent(setting: Setting, value: f64) -> Result<f64, CalibrationError> {
    if !value.is_finite() {
        return Err(CalibrationError::NotFinite {
            setting: setting.name(),
            value,
        });
    }
    Ok(value.clamp(0.0, 100.0))
}

/// Converts `-32767..=32767` to `0..=100`.
#[must_use]
pub fn raw_to_percent(raw: i16) -> f64 {
    (f64::from(raw) + RAW_OFFSET) / RAW_SPAN * 100.0
}

/// Converts `0..=100` back to `-32767..=32767`, rounding to nearest.
#[must_use]
pub fn percent_to_raw(pct: f64) -> i16 {
    let raw = (pct / 100.0 * RAW_SPAN - RAW_OFFSET).round();
    // pct is already within 0..=100; the clamp only absorbs float noise
    raw.clamp(-RAW_OFFSET, RAW_OFFSET) as i16
}

/// Stretches `min..max` to `0..100`. A reversed or empty range is a no-op.
fn apply_range(pct: f64, min: f64, max: f64) -> f64 {
    if min >= max {
        return pct;
    }
    if pct < min {
        0.0
    } else if pct > max {
        100.0
    } else {
        (pct - min) / (max - min) * 100.0
    }
}

/// Zeroes values below `deadzone` and rescales the remainder to `0..100`.
/// A deadzone of 100 swallows the whole travel.
fn apply_deadzone(pct: f64, deadzone: f64) -> f64 {
    if pct < deadzone || deadzone >= 100.0 {
        0.0
    } else {
        (pct - deadzone) / (100.0 - deadzone) * 100.0
    }
}
