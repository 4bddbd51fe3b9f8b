// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light mode types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Operating mode reported by a bulb in its light state.
///
/// `Circadian` bulbs follow the time of day on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightMode {
    /// Manual control.
    #[default]
    Normal,
    /// Automatic color temperature following the time of day.
    Circadian,
}

impl LightMode {
    /// Returns the vendor string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Circadian => "circadian",
        }
    }
}

impl fmt::Display for LightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LightMode {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "circadian" => Ok(Self::Circadian),
            other => Err(ValueError::InvalidLightMode(other.to_string())),
        }
    }
}

/// Which color channel a bulb is currently driven by.
///
/// This is the host's `light_mode` capability. A bulb reporting a non-zero
/// color temperature is in `Temperature` mode, otherwise in `Color` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Hue and saturation drive the light.
    Color,
    /// Color temperature drives the light.
    Temperature,
}

impl ColorMode {
    /// Returns the host string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Temperature => "temperature",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorMode {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "color" => Ok(Self::Color),
            "temperature" => Ok(Self::Temperature),
            other => Err(ValueError::InvalidLightMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_mode_parses_vendor_strings() {
        assert_eq!("circadian".parse::<LightMode>().unwrap(), LightMode::Circadian);
        assert_eq!(LightMode::default(), LightMode::Normal);
        assert!(matches!(
            "party".parse::<LightMode>(),
            Err(ValueError::InvalidLightMode(_))
        ));
    }

    #[test]
    fn light_mode_deserializes_lowercase() {
        let mode: LightMode = serde_json::from_str("\"normal\"").unwrap();
        assert_eq!(mode, LightMode::Normal);
    }

    #[test]
    fn color_mode_strings() {
        assert_eq!(ColorMode::Temperature.to_string(), "temperature");
        assert_eq!("color".parse::<ColorMode>().unwrap(), ColorMode::Color);
    }
}
