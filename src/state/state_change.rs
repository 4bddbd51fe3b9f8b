// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State change representation.
//!
//! A fetched device status is turned into a list of [`StateChange`]s, one per
//! tracked metric. Each change is applied to the
//! [`ObservedState`](super::ObservedState); only the ones that actually
//! changed something are pushed to the host.
//!
//! # Examples
//!
//! ```
//! use kasa_poller::state::{ObservedState, StateChange};
//! use kasa_poller::types::PowerState;
//!
//! let mut state = ObservedState::new();
//!
//! // Apply returns true if state actually changed
//! assert!(state.apply(&StateChange::Power(PowerState::On)));
//!
//! // Applying the same reading again returns false
//! assert!(!state.apply(&StateChange::Power(PowerState::On)));
//! ```

use serde::{Deserialize, Serialize};

use crate::capabilities::{Capability, CapabilityValue};
use crate::types::{Brightness, ColorMode, ColorTemp, Hue, KelvinRange, PowerState, Saturation};

/// A single fresh reading of one tracked metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateChange {
    /// Relay, socket or bulb power.
    Power(PowerState),

    /// Status LED.
    Led(PowerState),

    /// Brightness level.
    Brightness(Brightness),

    /// Bulb hue.
    Hue(Hue),

    /// Bulb saturation.
    Saturation(Saturation),

    /// Bulb color temperature (`0` in color mode).
    ColorTemp(ColorTemp),

    /// Whether the bulb runs on color or on temperature.
    ColorMode(ColorMode),

    /// Instantaneous power in Watts.
    ActivePower(f64),

    /// Voltage in Volts.
    Voltage(f64),

    /// Current in Amperes.
    Current(f64),

    /// Cumulative energy in kWh.
    EnergyTotal {
        /// Total reported by the device.
        raw: f64,
        /// Total after subtracting the energy offset; this is what the host sees.
        corrected: f64,
    },
}

impl StateChange {
    /// Creates an energy total change from a raw reading and an offset.
    ///
    /// ```
    /// use kasa_poller::state::StateChange;
    ///
    /// let change = StateChange::energy_total(12.5, 2.5);
    /// assert_eq!(change, StateChange::EnergyTotal { raw: 12.5, corrected: 10.0 });
    /// ```
    #[must_use]
    pub fn energy_total(raw: f64, offset: f64) -> Self {
        Self::EnergyTotal {
            raw,
            corrected: raw - offset,
        }
    }

    /// Returns the host capability this change updates.
    #[must_use]
    pub fn capability(&self) -> Capability {
        match self {
            Self::Power(_) => Capability::OnOff,
            Self::Led(_) => Capability::LedOnOff,
            Self::Brightness(_) => Capability::Dim,
            Self::Hue(_) => Capability::LightHue,
            Self::Saturation(_) => Capability::LightSaturation,
            Self::ColorTemp(_) => Capability::LightTemperature,
            Self::ColorMode(_) => Capability::LightMode,
            Self::ActivePower(_) => Capability::MeasurePower,
            Self::Voltage(_) => Capability::MeasureVoltage,
            Self::Current(_) => Capability::MeasureCurrent,
            Self::EnergyTotal { .. } => Capability::MeterPower,
        }
    }

    /// Returns the value pushed to the host for this change.
    ///
    /// `range` is the Kelvin range of the device, used to express color
    /// temperature as a fraction.
    #[must_use]
    pub fn host_value(&self, range: KelvinRange) -> CapabilityValue {
        match self {
            Self::Power(state) | Self::Led(state) => CapabilityValue::Bool(state.is_on()),
            Self::Brightness(level) => CapabilityValue::Number(level.as_fraction()),
            Self::Hue(hue) => CapabilityValue::Number(hue.as_fraction()),
            Self::Saturation(saturation) => CapabilityValue::Number(saturation.as_fraction()),
            Self::ColorTemp(ct) => CapabilityValue::Number(ct.as_fraction(range)),
            Self::ColorMode(mode) => CapabilityValue::Mode(*mode),
            Self::ActivePower(value) | Self::Voltage(value) | Self::Current(value) => {
                CapabilityValue::Number(*value)
            }
            Self::EnergyTotal { corrected, .. } => CapabilityValue::Number(*corrected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_total_subtracts_offset() {
        let change = StateChange::energy_total(100.0, 40.0);
        assert_eq!(
            change.host_value(KelvinRange::COLOR),
            CapabilityValue::Number(60.0)
        );
        assert_eq!(change.capability(), Capability::MeterPower);
    }

    #[test]
    fn host_values() {
        assert_eq!(
            StateChange::Power(PowerState::On).host_value(KelvinRange::COLOR),
            CapabilityValue::Bool(true)
        );
        assert_eq!(
            StateChange::Brightness(Brightness::clamped(42)).host_value(KelvinRange::COLOR),
            CapabilityValue::Number(0.42)
        );
        assert_eq!(
            StateChange::ColorTemp(ColorTemp::from_kelvin(2700)).host_value(KelvinRange::TUNABLE),
            CapabilityValue::Number(1.0)
        );
    }

    #[test]
    fn led_and_power_map_to_distinct_capabilities() {
        assert_eq!(
            StateChange::Led(PowerState::On).capability(),
            Capability::LedOnOff
        );
        assert_eq!(
            StateChange::Power(PowerState::On).capability(),
            Capability::OnOff
        );
        assert_eq!(
            StateChange::ColorMode(ColorMode::Temperature).host_value(KelvinRange::COLOR),
            CapabilityValue::Mode(ColorMode::Temperature)
        );
    }
}
