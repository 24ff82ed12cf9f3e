//! Shared, thread-safe calibrator for the three pedals

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use super::profile::{CalibrationProfile, CurveKind, Pedal, Setting, SettingValue};
use crate::error::CalibrationError;

/// Owns one [`CalibrationProfile`] per pedal plus a global enable flag.
///
/// Shared as `Arc<Calibrator>` between the controlling thread (setters) and
/// the relay task (`transform` on every axis event). Each profile sits behind
/// its own lock, so a reader always sees a whole profile; there is no
/// consistency across pedals or across successive calls.
///
/// # Examples
///
/// ```
/// use pedal_relay::calibration::{Calibrator, Pedal};
///
/// let calibrator = Calibrator::new();
///
/// // Disabled calibrators pass values through untouched
/// calibrator.set_invert(Pedal::Gas, true);
/// assert_eq!(calibrator.transform(1000, Pedal::Gas), 1000);
///
/// calibrator.set_enabled(true);
/// assert_eq!(calibrator.transform(1000, Pedal::Gas), -1000);
/// ```
#[derive(Debug, Default)]
pub struct Calibrator {
    gas: RwLock<CalibrationProfile>,
    brake: RwLock<CalibrationProfile>,
    clutch: RwLock<CalibrationProfile>,
    enabled: AtomicBool,
}

impl Calibrator {
    /// Creates a disabled calibrator with default profiles.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, pedal: Pedal) -> &RwLock<CalibrationProfile> {
        match pedal {
            Pedal::Gas => &self.gas,
            Pedal::Brake => &self.brake,
            Pedal::Clutch => &self.clutch,
        }
    }

    fn update<R>(&self, pedal: Pedal, f: impl FnOnce(&mut CalibrationProfile) -> R) -> R {
        // Profiles are plain data; a panicked writer cannot leave one half-built
        let mut guard = self
            .slot(pedal)
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Calibrates one raw axis value for `pedal`.
    ///
    /// Identity when the calibrator is disabled.
    #[must_use]
    pub fn transform(&self, value: i16, pedal: Pedal) -> i16 {
        if !self.is_enabled() {
            return value;
        }
        self.profile(pedal).apply(value)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        debug!("Calibration {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Snapshot of all settings of one pedal.
    #[must_use]
    pub fn profile(&self, pedal: Pedal) -> CalibrationProfile {
        *self
            .slot(pedal)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces all settings of one pedal at once.
    pub fn set_profile(&self, pedal: Pedal, profile: CalibrationProfile) {
        self.update(pedal, |current| *current = profile);
    }

    #[must_use]
    pub fn get_setting(&self, pedal: Pedal, setting: Setting) -> SettingValue {
        self.profile(pedal).get(setting)
    }

    /// Writes one setting of one pedal.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError`] if the value kind does not match the
    /// setting or the number is not finite. The profile is left unchanged.
    pub fn set_setting(
        &self,
        pedal: Pedal,
        setting: Setting,
        value: SettingValue,
    ) -> Result<(), CalibrationError> {
        self.update(pedal, |profile| profile.set(setting, value))?;
        debug!("{pedal}.{setting} = {value:?}");
        Ok(())
    }

    /// String-keyed variant of [`Calibrator::set_setting`] for presets and
    /// the command line.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError`] for unknown pedal or setting names.
    pub fn set_named(
        &self,
        pedal: &str,
        setting: &str,
        value: SettingValue,
    ) -> Result<(), CalibrationError> {
        self.set_setting(pedal.parse()?, setting.parse()?, value)
    }

    pub fn set_deadzone(&self, pedal: Pedal, percent: f64) -> Result<(), CalibrationError> {
        self.set_setting(pedal, Setting::Deadzone, SettingValue::Percent(percent))
    }

    /// Sets `min` and `max` under a single lock.
    pub fn set_range(&self, pedal: Pedal, min: f64, max: f64) -> Result<(), CalibrationError> {
        self.update(pedal, |profile| {
            let mut next = *profile;
            next.set(Setting::Min, SettingValue::Percent(min))?;
            next.set(Setting::Max, SettingValue::Percent(max))?;
            *profile = next;
            Ok(())
        })
    }

    pub fn set_curve(&self, pedal: Pedal, curve: CurveKind) {
        self.update(pedal, |profile| profile.curve = curve);
    }

    pub fn set_invert(&self, pedal: Pedal, invert: bool) {
        self.update(pedal, |profile| profile.invert = invert);
    }

    /// Restores the default profile of one pedal.
    pub fn reset_pedal(&self, pedal: Pedal) {
        self.set_profile(pedal, CalibrationProfile::default());
    }

    /// Restores the default profile of every pedal. `enabled` is unchanged.
    pub fn reset_all(&self) {
        for pedal in Pedal::ALL {
            self.reset_pedal(pedal);
        }
    }
}
