//! # Calibration Module
//!
//! Per-pedal calibration of raw joystick axis values.
//!
//! Each pedal (gas, brake, clutch) owns a [`CalibrationProfile`]. A raw value
//! is converted to a percentage and passed through a fixed pipeline:
//!
//! 1. **Invert** - `pct = 100 - pct`
//! 2. **Range** - `min..max` is stretched to `0..100`, values outside clip
//! 3. **Deadzone** - values below the deadzone become 0, the rest is rescaled
//! 4. **Curve** - linear, exponential (`x²`) or logarithmic (`√x`)
//!
//! The order is significant and must not change.
//!
//! ## Usage
//!
//! ```
//! use pedal_relay::calibration::{Calibrator, CurveKind, Pedal};
//!
//! let calibrator = Calibrator::new();
//! calibrator.set_enabled(true);
//! calibrator.set_deadzone(Pedal::Brake, 10.0).unwrap();
//! calibrator.set_curve(Pedal::Brake, CurveKind::Exponential);
//!
//! // Fully released stays released, fully pressed stays pressed
//! assert_eq!(calibrator.transform(-32767, Pedal::Brake), -32767);
//! assert_eq!(calibrator.transform(32767, Pedal::Brake), 32767);
//! ```

pub mod calibrator;
pub mod preset;
pub mod profile;

pub use calibrator::Calibrator;
pub use preset::Preset;
pub use profile::{CalibrationProfile, CurveKind, Pedal, Setting, SettingValue};
