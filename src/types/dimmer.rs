// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Brightness type for dimmers and bulbs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Brightness level as a percentage (0-100).
///
/// The host platform expresses brightness as a fraction in `0.0..=1.0`;
/// [`Brightness::as_fraction`] and [`Brightness::from_fraction`] convert.
///
/// # Examples
///
/// ```
/// use kasa_poller::types::Brightness;
///
/// let level = Brightness::new(75).unwrap();
/// assert_eq!(level.value(), 75);
/// assert!((level.as_fraction() - 0.75).abs() < f64::EPSILON);
///
/// assert!(Brightness::new(101).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Brightness(u8);

impl Brightness {
    /// Minimum brightness (0%).
    pub const MIN: Self = Self(0);

    /// Maximum brightness (100%).
    pub const MAX: Self = Self(100);

    /// Creates a new brightness value.
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

    /// Creates a brightness value, clamping to the valid range.
    #[must_use]
    pub const fn clamped(value: u8) -> Self {
        if value > 100 { Self(100) } else { Self(value) }
    }

    /// Creates a brightness from a host fraction (`0.0..=1.0`), rounding and
    /// clamping.
    #[must_use]
    pub fn from_fraction(fraction: f64) -> Self {
        // Clamped to 0..=100 before the cast.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = (fraction * 100.0).round().clamp(0.0, 100.0) as u8;
        Self(value)
    }

    /// Returns the percentage.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns the brightness as a host fraction.
    #[must_use]
    pub fn as_fraction(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl TryFrom<u8> for Brightness {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Brightness> for u8 {
    fn from(value: Brightness) -> Self {
        value.0
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_range() {
        assert_eq!(Brightness::new(0).unwrap(), Brightness::MIN);
        assert_eq!(Brightness::new(100).unwrap(), Brightness::MAX);
        assert!(matches!(
            Brightness::new(150),
            Err(ValueError::OutOfRange { actual: 150, .. })
        ));
    }

    #[test]
    fn fraction_round_trip_is_rounded() {
        assert_eq!(Brightness::from_fraction(0.426).value(), 43);
        assert_eq!(Brightness::from_fraction(1.4).value(), 100);
        assert_eq!(Brightness::from_fraction(-0.2).value(), 0);
    }

    #[test]
    fn display() {
        assert_eq!(Brightness::clamped(250).to_string(), "100%");
    }
}
