// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory host platform.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use super::{DeviceSettings, HostPlatform, SettingsPatch};
use crate::capabilities::{Capability, CapabilityValue};
use crate::error::HostError;
use crate::event::DeviceId;

#[derive(Debug)]
struct HostDevice {
    settings: DeviceSettings,
    values: HashMap<Capability, CapabilityValue>,
    pushes: Vec<(Capability, CapabilityValue)>,
    rejected: HashSet<Capability>,
    available: bool,
    unavailable_reason: Option<String>,
}

impl HostDevice {
    fn new(settings: DeviceSettings) -> Self {
        Self {
            settings,
            values: HashMap::new(),
            pushes: Vec::new(),
            rejected: HashSet::new(),
            available: true,
            unavailable_reason: None,
        }
    }
}

/// A [`HostPlatform`] that keeps everything in memory.
///
/// Besides implementing the trait it records every capability push, so
/// callers can check exactly what was written and when.
///
/// # Examples
///
/// ```
/// use kasa_poller::event::DeviceId;
/// use kasa_poller::host::{DeviceSettings, HostPlatform, MemoryHost};
/// use kasa_poller::{Capability, CapabilityValue};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let host = MemoryHost::new();
/// let id = DeviceId::new();
/// host.add_device(id, DeviceSettings::new("192.168.1.10"));
///
/// host.set_capability_value(id, Capability::OnOff, CapabilityValue::Bool(true))
///     .await
///     .unwrap();
///
/// assert_eq!(host.push_count(id), 1);
/// assert_eq!(host.value(id, Capability::OnOff), Some(CapabilityValue::Bool(true)));
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryHost {
    devices: Mutex<HashMap<DeviceId, HostDevice>>,
}

impl MemoryHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a device with its initial settings.
    pub fn add_device(&self, device: DeviceId, settings: DeviceSettings) {
        self.devices.lock().insert(device, HostDevice::new(settings));
    }

    /// Forgets a device.
    pub fn remove_device(&self, device: DeviceId) -> bool {
        self.devices.lock().remove(&device).is_some()
    }

    /// Returns the device's current settings.
    #[must_use]
    pub fn settings(&self, device: DeviceId) -> Option<DeviceSettings> {
        self.devices.lock().get(&device).map(|d| d.settings.clone())
    }

    /// Returns the stored value of a capability.
    #[must_use]
    pub fn value(&self, device: DeviceId, capability: Capability) -> Option<CapabilityValue> {
        self.devices
            .lock()
            .get(&device)
            .and_then(|d| d.values.get(&capability).copied())
    }

    /// Returns every push so far, oldest first.
    #[must_use]
    pub fn pushes(&self, device: DeviceId) -> Vec<(Capability, CapabilityValue)> {
        self.devices
            .lock()
            .get(&device)
            .map(|d| d.pushes.clone())
            .unwrap_or_default()
    }

    /// Returns the number of pushes so far.
    #[must_use]
    pub fn push_count(&self, device: DeviceId) -> usize {
        self.devices.lock().get(&device).map_or(0, |d| d.pushes.len())
    }

    /// Clears the push log.
    pub fn clear_pushes(&self, device: DeviceId) {
        if let Some(d) = self.devices.lock().get_mut(&device) {
            d.pushes.clear();
        }
    }

    /// Returns whether the device is marked available.
    #[must_use]
    pub fn is_available(&self, device: DeviceId) -> bool {
        self.devices.lock().get(&device).is_some_and(|d| d.available)
    }

    /// Returns the reason the device was marked unavailable.
    #[must_use]
    pub fn unavailable_reason(&self, device: DeviceId) -> Option<String> {
        self.devices
            .lock()
            .get(&device)
            .and_then(|d| d.unavailable_reason.clone())
    }

    /// Makes pushes to `capability` fail until [`accept`](Self::accept) is
    /// called.
    pub fn reject(&self, device: DeviceId, capability: Capability) {
        if let Some(d) = self.devices.lock().get_mut(&device) {
            d.rejected.insert(capability);
        }
    }

    /// Accepts pushes to `capability` again.
    pub fn accept(&self, device: DeviceId, capability: Capability) {
        if let Some(d) = self.devices.lock().get_mut(&device) {
            d.rejected.remove(&capability);
        }
    }

    fn with_device<T>(
        &self,
        device: DeviceId,
        f: impl FnOnce(&mut HostDevice) -> Result<T, HostError>,
    ) -> Result<T, HostError> {
        let mut devices = self.devices.lock();
        let entry = devices
            .get_mut(&device)
            .ok_or_else(|| HostError::UnknownDevice(device.to_string()))?;
        f(entry)
    }
}

impl HostPlatform for MemoryHost {
    async fn get_capability_value(
        &self,
        device: DeviceId,
        capability: Capability,
    ) -> Option<CapabilityValue> {
        self.value(device, capability)
    }

    async fn set_capability_value(
        &self,
        device: DeviceId,
        capability: Capability,
        value: CapabilityValue,
    ) -> Result<(), HostError> {
        self.with_device(device, |d| {
            if d.rejected.contains(&capability) {
                return Err(HostError::CapabilityRejected {
                    capability: capability.to_string(),
                    message: "rejected by host".to_string(),
                });
            }
            d.values.insert(capability, value);
            d.pushes.push((capability, value));
            Ok(())
        })
    }

    async fn get_settings(&self, device: DeviceId) -> Result<DeviceSettings, HostError> {
        self.with_device(device, |d| Ok(d.settings.clone()))
    }

    async fn set_settings(&self, device: DeviceId, patch: &SettingsPatch) -> Result<(), HostError> {
        self.with_device(device, |d| {
            d.settings.apply(patch);
            Ok(())
        })
    }

    async fn set_available(&self, device: DeviceId) -> Result<(), HostError> {
        self.with_device(device, |d| {
            d.available = true;
            d.unavailable_reason = None;
            Ok(())
        })
    }

    async fn set_unavailable(&self, device: DeviceId, reason: &str) -> Result<(), HostError> {
        self.with_device(device, |d| {
            d.available = false;
            d.unavailable_reason = Some(reason.to_string());
            Ok(())
        })
    }
}
