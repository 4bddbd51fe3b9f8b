// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Color types for bulbs.
//!
//! Kasa bulbs report hue in degrees (0-360), saturation in percent (0-100)
//! and color temperature in Kelvin, where `0` means the bulb is in color
//! (hue/saturation) mode. The host platform wants every one of these as a
//! fraction in `0.0..=1.0`; the conversions live here.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Rounds to two decimals, the precision the host displays.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Hue in degrees (0-360).
///
/// # Examples
///
/// ```
/// use kasa_poller::types::Hue;
///
/// let hue = Hue::new(180).unwrap();
/// assert!((hue.as_fraction() - 0.5).abs() < f64::EPSILON);
/// assert!(Hue::new(361).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Hue(u16);

impl Hue {
    /// Maximum hue in degrees.
    pub const MAX: u16 = 360;

    /// Creates a hue value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value exceeds 360.
    pub fn new(value: u16) -> Result<Self, ValueError> {
        if value > Self::MAX {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: Self::MAX,
                actual: value,
            });
        }
        Ok(Self(value))
    }

    /// Creates a hue from a host fraction, rounding and clamping.
    #[must_use]
    pub fn from_fraction(fraction: f64) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = (fraction * 360.0).round().clamp(0.0, 360.0) as u16;
        Self(value)
    }

    /// Returns the hue in degrees.
    #[must_use]
    pub const fn value(&self) -> u16 {
        self.0
    }

    /// Returns the hue as a host fraction rounded to two decimals.
    #[must_use]
    pub fn as_fraction(&self) -> f64 {
        round2(f64::from(self.0) / 360.0)
    }
}

impl TryFrom<u16> for Hue {
    type Error = ValueError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Hue> for u16 {
    fn from(value: Hue) -> Self {
        value.0
    }
}

/// Saturation in percent (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Saturation(u8);

impl Saturation {
    /// Creates a saturation value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value exceeds 100.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value > 100 {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: u16::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Creates a saturation from a host fraction, rounding and clamping.
    #[must_use]
    pub fn from_fraction(fraction: f64) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = (fraction * 100.0).round().clamp(0.0, 100.0) as u8;
        Self(value)
    }

    /// Returns the saturation in percent.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns the saturation as a host fraction.
    #[must_use]
    pub fn as_fraction(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl TryFrom<u8> for Saturation {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Saturation> for u8 {
    fn from(value: Saturation) -> Self {
        value.0
    }
}

/// Color temperature in Kelvin as reported by a bulb.
///
/// A value of `0` is what the bulb reports while in color mode; it is kept
/// as-is so that the observed state compares exactly with the next reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorTemp(u16);

impl ColorTemp {
    /// The value reported while the bulb is in color mode.
    pub const COLOR_MODE: Self = Self(0);

    /// Creates a color temperature from a raw Kelvin reading.
    #[must_use]
    pub const fn from_kelvin(kelvin: u16) -> Self {
        Self(kelvin)
    }

    /// Returns the raw Kelvin value.
    #[must_use]
    pub const fn kelvin(&self) -> u16 {
        self.0
    }

    /// Returns `true` when the bulb reports color mode (temperature `0`).
    #[must_use]
    pub const fn is_color_mode(&self) -> bool {
        self.0 == 0
    }

    /// Returns the host fraction for this temperature within `range`.
    ///
    /// Warm (low Kelvin) maps to `1.0`, cool maps to `0.0`. Color mode maps
    /// to `0.0`.
    #[must_use]
    pub fn as_fraction(&self, range: KelvinRange) -> f64 {
        if self.is_color_mode() {
            return 0.0;
        }
        let span = f64::from(range.max - range.min);
        let offset = f64::from(self.0) - f64::from(range.min);
        round2(1.0 - offset / span)
    }

    /// Creates a Kelvin value from a host fraction within `range`.
    #[must_use]
    pub fn from_fraction(fraction: f64, range: KelvinRange) -> Self {
        let span = f64::from(range.max - range.min);
        let kelvin = ((1.0 - fraction) * span + f64::from(range.min)).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let kelvin = kelvin.clamp(f64::from(range.min), f64::from(range.max)) as u16;
        Self(kelvin)
    }
}

impl fmt::Display for ColorTemp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}K", self.0)
    }
}

/// The Kelvin range a bulb model supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KelvinRange {
    /// Warmest supported temperature.
    pub min: u16,
    /// Coolest supported temperature.
    pub max: u16,
}

impl KelvinRange {
    /// Range of full color bulbs (KL130, LB130).
    pub const COLOR: Self = Self {
        min: 2500,
        max: 9000,
    };

    /// Range of tunable white bulbs.
    pub const TUNABLE: Self = Self {
        min: 2700,
        max: 6500,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hue_fraction_is_rounded() {
        assert!((Hue::new(100).unwrap().as_fraction() - 0.28).abs() < 1e-9);
        assert_eq!(Hue::from_fraction(0.5).value(), 180);
    }

    #[test]
    fn saturation_bounds() {
        assert!(Saturation::new(100).is_ok());
        assert!(Saturation::new(101).is_err());
        assert!((Saturation::new(40).unwrap().as_fraction() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn color_temp_fraction_within_range() {
        let warm = ColorTemp::from_kelvin(2500);
        let cool = ColorTemp::from_kelvin(9000);
        assert!((warm.as_fraction(KelvinRange::COLOR) - 1.0).abs() < 1e-9);
        assert!(cool.as_fraction(KelvinRange::COLOR).abs() < 1e-9);
        let middle = ColorTemp::from_kelvin(4600).as_fraction(KelvinRange::TUNABLE);
        assert!((middle - 0.5).abs() < 1e-9);
    }

    #[test]
    fn color_mode_maps_to_zero() {
        assert!(ColorTemp::COLOR_MODE.is_color_mode());
        assert!(ColorTemp::COLOR_MODE.as_fraction(KelvinRange::COLOR).abs() < 1e-9);
    }

    #[test]
    fn color_temp_from_fraction_is_clamped() {
        assert_eq!(
            ColorTemp::from_fraction(0.0, KelvinRange::TUNABLE).kelvin(),
            6500
        );
        assert_eq!(
            ColorTemp::from_fraction(1.0, KelvinRange::TUNABLE).kelvin(),
            2700
        );
        assert_eq!(
            ColorTemp::from_fraction(-3.0, KelvinRange::TUNABLE).kelvin(),
            6500
        );
    }
}
