// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device event types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capabilities::{Capability, CapabilityValue};

use super::DeviceId;

/// Events emitted by the poller.
///
/// These events report the device lifecycle, polling sessions, capability
/// pushes and the unreachable/rediscovery cycle. All events carry the
/// device id they concern.
///
/// # Examples
///
/// ```
/// use kasa_poller::event::{DeviceEvent, DeviceId};
///
/// let device_id = DeviceId::new();
///
/// let added = DeviceEvent::DeviceAdded { device_id };
/// let offline = DeviceEvent::Unreachable { device_id, count: 3 };
///
/// assert_eq!(offline.device_id(), device_id);
/// assert!(!added.is_availability_event());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// A device was registered with the poller.
    DeviceAdded {
        /// The ID of the added device.
        device_id: DeviceId,
    },

    /// A device was removed from the poller.
    DeviceRemoved {
        /// The ID of the removed device.
        device_id: DeviceId,
    },

    /// A polling session started.
    PollingStarted {
        /// The ID of the device.
        device_id: DeviceId,
        /// Effective tick period, jitter included.
        period: Duration,
    },

    /// A polling session stopped.
    PollingStopped {
        /// The ID of the device.
        device_id: DeviceId,
    },

    /// A changed value was pushed to the host.
    CapabilityChanged {
        /// The ID of the device.
        device_id: DeviceId,
        /// The capability.
        capability: Capability,
        /// The pushed value.
        value: CapabilityValue,
    },

    /// A tick failed because the device was unreachable.
    Unreachable {
        /// The ID of the device.
        device_id: DeviceId,
        /// Consecutive unreachable failures so far.
        count: u64,
    },

    /// The device was marked available or unavailable on the host.
    AvailabilityChanged {
        /// The ID of the device.
        device_id: DeviceId,
        /// Whether the device is now available.
        available: bool,
        /// Reason given when marked unavailable.
        reason: Option<String>,
    },

    /// A rediscovery run started.
    RediscoveryStarted {
        /// The ID of the device.
        device_id: DeviceId,
    },

    /// A rediscovery run found the device.
    Rediscovered {
        /// The ID of the device.
        device_id: DeviceId,
        /// The device's new address.
        address: String,
    },

    /// A rediscovery run ended without finding the device.
    RediscoveryFailed {
        /// The ID of the device.
        device_id: DeviceId,
    },
}

impl DeviceEvent {
    /// Returns the device ID associated with this event.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        match self {
            Self::DeviceAdded { device_id }
            | Self::DeviceRemoved { device_id }
            | Self::PollingStarted { device_id, .. }
            | Self::PollingStopped { device_id }
            | Self::CapabilityChanged { device_id, .. }
            | Self::Unreachable { device_id, .. }
            | Self::AvailabilityChanged { device_id, .. }
            | Self::RediscoveryStarted { device_id }
            | Self::Rediscovered { device_id, .. }
            | Self::RediscoveryFailed { device_id } => *device_id,
        }
    }

    /// Creates a device added event.
    #[must_use]
    pub fn device_added(device_id: DeviceId) -> Self {
        Self::DeviceAdded { device_id }
    }

    /// Creates a device removed event.
    #[must_use]
    pub fn device_removed(device_id: DeviceId) -> Self {
        Self::DeviceRemoved { device_id }
    }

    /// Creates an availability event for a device coming back.
    #[must_use]
    pub fn available(device_id: DeviceId) -> Self {
        Self::AvailabilityChanged {
            device_id,
            available: true,
            reason: None,
        }
    }

    /// Creates an availability event for a device going away.
    #[must_use]
    pub fn unavailable(device_id: DeviceId, reason: impl Into<String>) -> Self {
        Self::AvailabilityChanged {
            device_id,
            available: false,
            reason: Some(reason.into()),
        }
    }

    /// Returns `true` if this is an availability event.
    #[must_use]
    pub fn is_availability_event(&self) -> bool {
        matches!(self, Self::AvailabilityChanged { .. })
    }

    /// Returns `true` if this is part of the rediscovery cycle.
    #[must_use]
    pub fn is_rediscovery_event(&self) -> bool {
        matches!(
            self,
            Self::RediscoveryStarted { .. }
                | Self::Rediscovered { .. }
                | Self::RediscoveryFailed { .. }
        )
    }
}
