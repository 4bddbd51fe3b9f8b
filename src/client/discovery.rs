// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast discovery types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default interval between discovery broadcasts.
const DEFAULT_DISCOVERY_INTERVAL: Duration = Duration::from_secs(10);

/// Default time a device has to answer a broadcast.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of missed broadcasts before a device is reported offline.
const DEFAULT_OFFLINE_TOLERANCE: u32 = 3;

/// Kind of device a discovery run looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Plugs, strips, switches and dimmers.
    Plug,
    /// Bulbs.
    Bulb,
}

/// Options for a broadcast discovery run.
///
/// # Examples
///
/// ```
/// use kasa_poller::client::{DeviceKind, DiscoveryOptions};
/// use std::time::Duration;
///
/// let options = DiscoveryOptions::new()
///     .with_device_kind(DeviceKind::Bulb)
///     .with_timeout(Duration::from_secs(3));
///
/// assert_eq!(options.timeout(), Duration::from_secs(3));
/// assert_eq!(options.interval(), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoveryOptions {
    device_kind: Option<DeviceKind>,
    interval: Option<Duration>,
    timeout: Option<Duration>,
    offline_tolerance: Option<u32>,
}

impl DiscoveryOptions {
    /// Creates options with default settings.
    ///
    /// Broadcasts every 10 seconds, waits 5 seconds for answers and reports a
    /// device offline after 3 missed broadcasts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts discovery to one kind of device.
    #[must_use]
    pub fn with_device_kind(mut self, kind: DeviceKind) -> Self {
        self.device_kind = Some(kind);
        self
    }

    /// Sets the interval between broadcasts.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Sets the time devices have to answer.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets how many missed broadcasts mark a device offline.
    #[must_use]
    pub fn with_offline_tolerance(mut self, tolerance: u32) -> Self {
        self.offline_tolerance = Some(tolerance);
        self
    }

    /// Returns the device kind filter, if any.
    #[must_use]
    pub fn device_kind(&self) -> Option<DeviceKind> {
        self.device_kind
    }

    /// Returns the broadcast interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval.unwrap_or(DEFAULT_DISCOVERY_INTERVAL)
    }

    /// Returns the answer timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_DISCOVERY_TIMEOUT)
    }

    /// Returns the offline tolerance.
    #[must_use]
    pub fn offline_tolerance(&self) -> u32 {
        self.offline_tolerance.unwrap_or(DEFAULT_OFFLINE_TOLERANCE)
    }
}

/// A device announced during discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    /// Network address the device answered from.
    pub host: String,
    /// Vendor identity.
    pub device_id: String,
    /// Model string.
    pub model: String,
    /// User-assigned name.
    pub alias: Option<String>,
    /// Socket ids, for power strips.
    pub child_ids: Vec<String>,
}

/// An event emitted while discovery runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A device answered for the first time.
    DeviceFound(DiscoveredDevice),
    /// A device previously reported offline answered again.
    DeviceOnline(DiscoveredDevice),
    /// A device missed too many broadcasts.
    DeviceOffline(DiscoveredDevice),
}

impl DiscoveryEvent {
    /// Returns the device the event is about.
    #[must_use]
    pub fn device(&self) -> &DiscoveredDevice {
        match self {
            Self::DeviceFound(device)
            | Self::DeviceOnline(device)
            | Self::DeviceOffline(device) => device,
        }
    }

    /// Returns `true` for announcements of a reachable device.
    #[must_use]
    pub fn is_announcement(&self) -> bool {
        matches!(self, Self::DeviceFound(_) | Self::DeviceOnline(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = DiscoveryOptions::new();
        assert_eq!(options.timeout(), Duration::from_secs(5));
        assert_eq!(options.offline_tolerance(), 3);
        assert_eq!(options.device_kind(), None);
    }

    #[test]
    fn offline_is_not_an_announcement() {
        let device = DiscoveredDevice::default();
        assert!(DiscoveryEvent::DeviceOnline(device.clone()).is_announcement());
        assert!(!DiscoveryEvent::DeviceOffline(device).is_announcement());
    }
}
