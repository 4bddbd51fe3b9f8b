// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host capabilities and the capability sets of each model family.
//!
//! A capability is a named property the host platform displays or controls
//! (`onoff`, `measure_power`, ...). Which capabilities a device exposes
//! depends on its [`ModelFamily`] and on whether it is a child socket.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ColorMode, ModelFamily};

/// A named host capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Relay or bulb on/off.
    #[serde(rename = "onoff")]
    OnOff,
    /// Status LED on/off.
    #[serde(rename = "ledonoff")]
    LedOnOff,
    /// Brightness as a fraction.
    Dim,
    /// Hue as a fraction.
    LightHue,
    /// Saturation as a fraction.
    LightSaturation,
    /// Color temperature as a fraction (1.0 is warmest).
    LightTemperature,
    /// Color or temperature mode.
    LightMode,
    /// Instantaneous power in Watts.
    MeasurePower,
    /// Voltage in Volts.
    MeasureVoltage,
    /// Current in Amperes.
    MeasureCurrent,
    /// Cumulative energy in kWh, after the energy offset.
    MeterPower,
}

impl Capability {
    /// Returns the host capability name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnOff => "onoff",
            Self::LedOnOff => "ledonoff",
            Self::Dim => "dim",
            Self::LightHue => "light_hue",
            Self::LightSaturation => "light_saturation",
            Self::LightTemperature => "light_temperature",
            Self::LightMode => "light_mode",
            Self::MeasurePower => "measure_power",
            Self::MeasureVoltage => "measure_voltage",
            Self::MeasureCurrent => "measure_current",
            Self::MeterPower => "meter_power",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value pushed to a host capability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    /// Boolean capabilities (`onoff`, `ledonoff`).
    Bool(bool),
    /// Numeric capabilities (fractions and measurements).
    Number(f64),
    /// The `light_mode` capability.
    Mode(ColorMode),
}

impl CapabilityValue {
    /// Returns the boolean value, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the numeric value, if this is a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for CapabilityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Mode(mode) => write!(f, "{mode}"),
        }
    }
}

/// Capabilities of a polled device.
///
/// `onoff` is always present; the flags below add the optional groups.
///
/// # Examples
///
/// ```
/// use kasa_poller::{Capabilities, Capability};
/// use kasa_poller::types::ModelFamily;
///
/// let plug = Capabilities::for_family(ModelFamily::EnergyPlug, false);
/// assert!(plug.supports(Capability::MeterPower));
///
/// // Power strip sockets meter energy but have no LED of their own.
/// let socket = Capabilities::for_family(ModelFamily::PowerStrip, true);
/// assert!(!socket.supports(Capability::LedOnOff));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
// Each boolean is an independent capability group.
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// Has a controllable status LED.
    pub led: bool,
    /// Supports brightness.
    pub dimmer: bool,
    /// Supports color temperature and the `light_mode` capability.
    pub color_temp: bool,
    /// Supports hue and saturation.
    pub color: bool,
    /// Reports power, voltage, current and cumulative energy.
    pub energy: bool,
}

impl Capabilities {
    /// Returns the capability set for a model family.
    ///
    /// `is_child` is set for a single socket of a power strip.
    #[must_use]
    pub const fn for_family(family: ModelFamily, is_child: bool) -> Self {
        match family {
            ModelFamily::Plug => Self {
                led: true,
                dimmer: false,
                color_temp: false,
                color: false,
                energy: false,
            },
            ModelFamily::EnergyPlug => Self {
                led: true,
                dimmer: false,
                color_temp: false,
                color: false,
                energy: true,
            },
            ModelFamily::Dimmer => Self {
                led: true,
                dimmer: true,
                color_temp: false,
                color: false,
                energy: false,
            },
            ModelFamily::PowerStrip => Self {
                led: !is_child,
                dimmer: false,
                color_temp: false,
                color: false,
                energy: true,
            },
            ModelFamily::Bulb => Self {
                led: false,
                dimmer: true,
                color_temp: false,
                color: false,
                energy: false,
            },
            ModelFamily::TunableBulb => Self {
                led: false,
                dimmer: true,
                color_temp: true,
                color: false,
                energy: false,
            },
            ModelFamily::ColorBulb => Self {
                led: false,
                dimmer: true,
                color_temp: true,
                color: true,
                energy: false,
            },
        }
    }

    /// Returns `true` if the capability is exposed.
    #[must_use]
    pub const fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::OnOff => true,
            Capability::LedOnOff => self.led,
            Capability::Dim => self.dimmer,
            Capability::LightHue | Capability::LightSaturation => self.color,
            Capability::LightTemperature | Capability::LightMode => self.color_temp,
            Capability::MeasurePower
            | Capability::MeasureVoltage
            | Capability::MeasureCurrent
            | Capability::MeterPower => self.energy,
        }
    }

    /// Returns every exposed capability, in a stable order.
    #[must_use]
    pub fn list(&self) -> Vec<Capability> {
        [
            Capability::OnOff,
            Capability::LedOnOff,
            Capability::Dim,
            Capability::LightHue,
            Capability::LightSaturation,
            Capability::LightTemperature,
            Capability::LightMode,
            Capability::MeasurePower,
            Capability::MeasureVoltage,
            Capability::MeasureCurrent,
            Capability::MeterPower,
        ]
        .into_iter()
        .filter(|c| self.supports(*c))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_plug_has_relay_and_led_only() {
        let caps = Capabilities::for_family(ModelFamily::Plug, false);
        assert_eq!(caps.list(), vec![Capability::OnOff, Capability::LedOnOff]);
    }

    #[test]
    fn color_bulb_has_all_light_capabilities() {
        let caps = Capabilities::for_family(ModelFamily::ColorBulb, false);
        assert!(caps.supports(Capability::LightHue));
        assert!(caps.supports(Capability::LightMode));
        assert!(!caps.supports(Capability::MeterPower));
        assert!(!caps.supports(Capability::LedOnOff));
    }

    #[test]
    fn tunable_bulb_has_no_hue() {
        let caps = Capabilities::for_family(ModelFamily::TunableBulb, false);
        assert!(caps.supports(Capability::LightTemperature));
        assert!(!caps.supports(Capability::LightSaturation));
    }

    #[test]
    fn capability_names() {
        assert_eq!(Capability::OnOff.as_str(), "onoff");
        assert_eq!(Capability::MeterPower.to_string(), "meter_power");
        let json = serde_json::to_string(&Capability::LedOnOff).unwrap();
        assert_eq!(json, "\"ledonoff\"");
        let json = serde_json::to_string(&Capability::MeasureVoltage).unwrap();
        assert_eq!(json, "\"measure_voltage\"");
    }

    #[test]
    fn capability_value_serializes_untagged() {
        assert_eq!(
            serde_json::to_string(&CapabilityValue::Bool(true)).unwrap(),
            "true"
        );
        assert_eq!(
            serde_json::to_string(&CapabilityValue::Mode(ColorMode::Color)).unwrap(),
            "\"color\""
        );
        assert_eq!(CapabilityValue::Number(42.3).as_f64(), Some(42.3));
    }
}
