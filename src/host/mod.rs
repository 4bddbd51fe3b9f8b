// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The host platform seam.
//!
//! The host owns the device registry, the capability store, the settings
//! store and the availability flags. The poller only talks to it through
//! [`HostPlatform`]. [`MemoryHost`] is an in-memory implementation for
//! tests and headless use.

mod memory;
mod settings;

use std::future::Future;

pub use memory::MemoryHost;
pub use settings::{DEFAULT_POLLING_INTERVAL, DeviceSettings, MAX_POLLING_INTERVAL, SettingsPatch};

use crate::capabilities::{Capability, CapabilityValue};
use crate::error::HostError;
use crate::event::DeviceId;

/// Trait for home-automation hosts the poller mirrors device state into.
pub trait HostPlatform: Send + Sync + 'static {
    /// Returns the value last stored for a capability.
    fn get_capability_value(
        &self,
        device: DeviceId,
        capability: Capability,
    ) -> impl Future<Output = Option<CapabilityValue>> + Send;

    /// Stores a capability value.
    ///
    /// # Errors
    ///
    /// Returns a `HostError` if the host rejects the value.
    fn set_capability_value(
        &self,
        device: DeviceId,
        capability: Capability,
        value: CapabilityValue,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    /// Loads the device's settings.
    ///
    /// # Errors
    ///
    /// Returns a `HostError` if the device is unknown or the store fails.
    fn get_settings(
        &self,
        device: DeviceId,
    ) -> impl Future<Output = Result<DeviceSettings, HostError>> + Send;

    /// Merges a partial update into the device's settings.
    ///
    /// # Errors
    ///
    /// Returns a `HostError` if the device is unknown or the store fails.
    fn set_settings(
        &self,
        device: DeviceId,
        patch: &SettingsPatch,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    /// Marks the device available.
    ///
    /// # Errors
    ///
    /// Returns a `HostError` if the device is unknown.
    fn set_available(&self, device: DeviceId)
    -> impl Future<Output = Result<(), HostError>> + Send;

    /// Marks the device unavailable with a reason shown to the user.
    ///
    /// # Errors
    ///
    /// Returns a `HostError` if the device is unknown.
    fn set_unavailable(
        &self,
        device: DeviceId,
        reason: &str,
    ) -> impl Future<Output = Result<(), HostError>> + Send;
}
