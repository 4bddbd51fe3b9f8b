// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model families.
//!
//! Kasa models that share a status layout are grouped into one family. The
//! family decides which metrics are fetched and pushed for a device.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::KelvinRange;

/// A group of device models with the same status layout.
///
/// # Examples
///
/// ```
/// use kasa_poller::types::ModelFamily;
///
/// assert_eq!(ModelFamily::from_model("HS110(EU)"), ModelFamily::EnergyPlug);
/// assert_eq!(ModelFamily::from_model("KL130(US)"), ModelFamily::ColorBulb);
/// assert_eq!(ModelFamily::from_model("HS300(US)"), ModelFamily::PowerStrip);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Plain switchable plug or wall switch without metering.
    Plug,
    /// Plug with an energy meter.
    EnergyPlug,
    /// Dimmer switch.
    Dimmer,
    /// Power strip whose sockets are polled as child devices.
    PowerStrip,
    /// Dimmable white bulb.
    Bulb,
    /// Tunable white bulb.
    TunableBulb,
    /// Full color bulb.
    ColorBulb,
}

impl ModelFamily {
    /// Maps a vendor model string (for example `"KP115(EU)"`) to its family.
    ///
    /// Unknown models fall back to [`ModelFamily::Plug`], which only tracks
    /// the relay and the LED.
    #[must_use]
    pub fn from_model(model: &str) -> Self {
        let base = model
            .split('(')
            .next()
            .unwrap_or(model)
            .trim()
            .to_ascii_uppercase();

        match base.as_str() {
            "HS110" | "KP115" | "KP125" | "EP25" => Self::EnergyPlug,
            "HS220" | "ES20M" => Self::Dimmer,
            "HS300" | "KP303" | "KP400" | "EP40" => Self::PowerStrip,
            "KL130" | "LB130" | "KL125" => Self::ColorBulb,
            "KL120" | "LB120" => Self::TunableBulb,
            "KL50" | "KL60" | "KL110" | "LB100" | "LB110" => Self::Bulb,
            _ => Self::Plug,
        }
    }

    /// Returns `true` for families reporting through `light_state`.
    #[must_use]
    pub const fn is_bulb(self) -> bool {
        matches!(self, Self::Bulb | Self::TunableBulb | Self::ColorBulb)
    }

    /// Returns the Kelvin range used for color temperature conversion.
    #[must_use]
    pub const fn kelvin_range(self) -> KelvinRange {
        match self {
            Self::ColorBulb => KelvinRange::COLOR,
            _ => KelvinRange::TUNABLE,
        }
    }

    /// Returns the snake case family name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plug => "plug",
            Self::EnergyPlug => "energy_plug",
            Self::Dimmer => "dimmer",
            Self::PowerStrip => "power_strip",
            Self::Bulb => "bulb",
            Self::TunableBulb => "tunable_bulb",
            Self::ColorBulb => "color_bulb",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
