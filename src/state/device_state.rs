// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Last-pushed device state.

use crate::capabilities::Capability;
use crate::types::{Brightness, ColorMode, ColorTemp, Hue, PowerState, Saturation};

use super::StateChange;

/// The values last pushed to the host for one device.
///
/// Every field is optional: `None` means nothing has been pushed yet, so the
/// first reading of a metric always counts as a change. Values are compared
/// with strict inequality.
///
/// # Examples
///
/// ```
/// use kasa_poller::state::{ObservedState, StateChange};
///
/// let mut state = ObservedState::new();
/// assert!(state.apply(&StateChange::ActivePower(42.3)));
/// assert!(!state.apply(&StateChange::ActivePower(42.3)));
/// assert!(state.apply(&StateChange::ActivePower(42.4)));
/// assert_eq!(state.active_power(), Some(42.4));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservedState {
    power: Option<PowerState>,
    led: Option<PowerState>,
    brightness: Option<Brightness>,
    hue: Option<Hue>,
    saturation: Option<Saturation>,
    color_temp: Option<ColorTemp>,
    color_mode: Option<ColorMode>,
    active_power: Option<f64>,
    voltage: Option<f64>,
    current: Option<f64>,
    /// Corrected total as pushed to the host.
    energy_total: Option<f64>,
    /// Last raw total reported by the device, never pushed.
    raw_energy_total: Option<f64>,
}

/// Stores `new` in `slot` and reports whether it differed.
fn replace<T: PartialEq + Copy>(slot: &mut Option<T>, new: T) -> bool {
    if *slot == Some(new) {
        false
    } else {
        *slot = Some(new);
        true
    }
}

impl ObservedState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a fresh reading.
    ///
    /// Returns `true` if the reading differs from what was last pushed.
    pub fn apply(&mut self, change: &StateChange) -> bool {
        match change {
            StateChange::Power(state) => replace(&mut self.power, *state),
            StateChange::Led(state) => replace(&mut self.led, *state),
            StateChange::Brightness(level) => replace(&mut self.brightness, *level),
            StateChange::Hue(hue) => replace(&mut self.hue, *hue),
            StateChange::Saturation(saturation) => replace(&mut self.saturation, *saturation),
            StateChange::ColorTemp(ct) => replace(&mut self.color_temp, *ct),
            StateChange::ColorMode(mode) => replace(&mut self.color_mode, *mode),
            StateChange::ActivePower(value) => replace(&mut self.active_power, *value),
            StateChange::Voltage(value) => replace(&mut self.voltage, *value),
            StateChange::Current(value) => replace(&mut self.current, *value),
            StateChange::EnergyTotal { raw, corrected } => {
                self.raw_energy_total = Some(*raw);
                replace(&mut self.energy_total, *corrected)
            }
        }
    }

    /// Forgets the value of one capability, so the next reading is pushed
    /// again.
    pub fn forget(&mut self, capability: Capability) {
        match capability {
            Capability::OnOff => self.power = None,
            Capability::LedOnOff => self.led = None,
            Capability::Dim => self.brightness = None,
            Capability::LightHue => self.hue = None,
            Capability::LightSaturation => self.saturation = None,
            Capability::LightTemperature => self.color_temp = None,
            Capability::LightMode => self.color_mode = None,
            Capability::MeasurePower => self.active_power = None,
            Capability::MeasureVoltage => self.voltage = None,
            Capability::MeasureCurrent => self.current = None,
            Capability::MeterPower => self.energy_total = None,
        }
    }

    /// Last pushed power state.
    #[must_use]
    pub fn power(&self) -> Option<PowerState> {
        self.power
    }

    /// Last pushed LED state.
    #[must_use]
    pub fn led(&self) -> Option<PowerState> {
        self.led
    }

    /// Last pushed brightness.
    #[must_use]
    pub fn brightness(&self) -> Option<Brightness> {
        self.brightness
    }

    /// Last pushed hue.
    #[must_use]
    pub fn hue(&self) -> Option<Hue> {
        self.hue
    }

    /// Last pushed saturation.
    #[must_use]
    pub fn saturation(&self) -> Option<Saturation> {
        self.saturation
    }

    /// Last pushed color temperature.
    #[must_use]
    pub fn color_temp(&self) -> Option<ColorTemp> {
        self.color_temp
    }

    /// Last pushed color mode.
    #[must_use]
    pub fn color_mode(&self) -> Option<ColorMode> {
        self.color_mode
    }

    /// Last pushed instantaneous power in Watts.
    #[must_use]
    pub fn active_power(&self) -> Option<f64> {
        self.active_power
    }

    /// Last pushed voltage.
    #[must_use]
    pub fn voltage(&self) -> Option<f64> {
        self.voltage
    }

    /// Last pushed current.
    #[must_use]
    pub fn current(&self) -> Option<f64> {
        self.current
    }

    /// Last pushed (corrected) energy total.
    #[must_use]
    pub fn energy_total(&self) -> Option<f64> {
        self.energy_total
    }

    /// Last raw energy total reported by the device.
    #[must_use]
    pub fn raw_energy_total(&self) -> Option<f64> {
        self.raw_energy_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_reading_is_a_change() {
        let mut state = ObservedState::new();
        assert!(state.apply(&StateChange::Led(PowerState::Off)));
        assert_eq!(state.led(), Some(PowerState::Off));
    }

    #[test]
    fn identical_readings_are_not_changes() {
        let mut state = ObservedState::new();
        let reading = [
            StateChange::Power(PowerState::On),
            StateChange::ActivePower(42.3),
            StateChange::energy_total(10.0, 0.0),
        ];
        assert!(reading.iter().all(|c| state.apply(c)));
        assert!(!reading.iter().any(|c| state.apply(c)));
    }

    #[test]
    fn only_the_moved_metric_changes() {
        let mut state = ObservedState::new();
        state.apply(&StateChange::Power(PowerState::On));
        state.apply(&StateChange::Voltage(230.1));

        assert!(!state.apply(&StateChange::Power(PowerState::On)));
        assert!(state.apply(&StateChange::Voltage(229.8)));
        assert_eq!(state.voltage(), Some(229.8));
    }

    #[test]
    fn raw_total_is_recorded_even_without_change() {
        let mut state = ObservedState::new();
        assert!(state.apply(&StateChange::energy_total(5.0, 5.0)));
        // Raw moved but corrected value (0.0) stayed put.
        assert!(!state.apply(&StateChange::EnergyTotal {
            raw: 6.0,
            corrected: 0.0
        }));
        assert_eq!(state.raw_energy_total(), Some(6.0));
        assert_eq!(state.energy_total(), Some(0.0));
    }

    #[test]
    fn forget_makes_next_reading_a_change() {
        let mut state = ObservedState::new();
        state.apply(&StateChange::Current(0.18));
        state.forget(Capability::MeasureCurrent);
        assert!(state.apply(&StateChange::Current(0.18)));
    }
}
