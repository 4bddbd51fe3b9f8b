// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Poller-side device keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key of one polled endpoint: a plug, a bulb, or one socket of a strip.
///
/// The host hands the id to the poller and keeps it in its own registry, so
/// it survives restarts as a plain UUID string. It never changes when the
/// device moves, unlike the address, and it exists before the vendor
/// `deviceId` has been learned.
///
/// Logs and `Debug` output only show the first eight hex digits.
///
/// # Examples
///
/// ```
/// use kasa_poller::event::DeviceId;
///
/// let stored = "5f0c1d2e-3a4b-4c5d-8e6f-708192a3b4c5";
/// let id: DeviceId = stored.parse().unwrap();
///
/// assert_eq!(id.to_string(), stored);
/// assert_eq!(id.short(), "5f0c1d2e");
/// assert_eq!(format!("{id:?}"), "DeviceId(5f0c1d2e..)");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(Uuid);

impl DeviceId {
    /// Allocates a fresh random id for a newly paired endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the leading eight hex digits.
    #[must_use]
    pub fn short(&self) -> String {
        let mut digits = self.0.simple().to_string();
        digits.truncate(8);
        digits
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for DeviceId {
    type Err = uuid::Error;

    /// Parses an id persisted by the host, in any UUID text form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for DeviceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({}..)", self.short())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}
