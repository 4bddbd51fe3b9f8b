// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power-related types for Kasa devices.
//!
//! Kasa devices report relay and LED state as integers (`relay_state: 1`,
//! `led_off: 0`). This module turns those into a typed on/off state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// On/off state of a relay, socket, bulb or status LED.
///
/// # Examples
///
/// ```
/// use kasa_poller::types::PowerState;
///
/// assert_eq!(PowerState::from_relay(1), PowerState::On);
/// assert_eq!(PowerState::from_relay(0), PowerState::Off);
/// assert!(PowerState::On.is_on());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    /// Power is off.
    Off,
    /// Power is on.
    On,
}

impl PowerState {
    /// Converts a vendor `relay_state` / `on_off` / `state` integer.
    ///
    /// Any non-zero value is treated as on.
    #[must_use]
    pub const fn from_relay(value: u8) -> Self {
        if value == 0 { Self::Off } else { Self::On }
    }

    /// Converts a vendor `led_off` flag, which is inverted.
    #[must_use]
    pub const fn from_led_off(led_off: u8) -> Self {
        if led_off == 0 { Self::On } else { Self::Off }
    }

    /// Returns the integer used in vendor payloads.
    #[must_use]
    pub const fn as_relay(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::On => 1,
        }
    }

    /// Returns `true` if the state is on.
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "0" | "false" => Ok(Self::Off),
            "on" | "1" | "true" => Ok(Self::On),
            _ => Err(ValueError::InvalidPowerState(s.to_string())),
        }
    }
}

impl From<bool> for PowerState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl From<PowerState> for bool {
    fn from(state: PowerState) -> Self {
        state.is_on()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_values() {
        assert_eq!(PowerState::from_relay(0), PowerState::Off);
        assert_eq!(PowerState::from_relay(1), PowerState::On);
        assert_eq!(PowerState::from_relay(7), PowerState::On);
        assert_eq!(PowerState::On.as_relay(), 1);
    }

    #[test]
    fn led_flag_is_inverted() {
        assert_eq!(PowerState::from_led_off(0), PowerState::On);
        assert_eq!(PowerState::from_led_off(1), PowerState::Off);
    }

    #[test]
    fn from_str_accepts_common_spellings() {
        assert_eq!("ON".parse::<PowerState>().unwrap(), PowerState::On);
        assert_eq!("false".parse::<PowerState>().unwrap(), PowerState::Off);
        assert!("maybe".parse::<PowerState>().is_err());
    }

    #[test]
    fn bool_conversions() {
        assert_eq!(PowerState::from(true), PowerState::On);
        assert!(!bool::from(PowerState::Off));
    }
}
