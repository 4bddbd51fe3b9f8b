// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persisted per-device settings.

use serde::{Deserialize, Serialize};

/// Polling interval used when none is stored.
pub const DEFAULT_POLLING_INTERVAL: u64 = 10;

/// Longest accepted polling interval in seconds (one day).
pub const MAX_POLLING_INTERVAL: u64 = 86_400;

/// Settings the host stores for one device.
///
/// Keys are kept in the host's existing JSON layout, so settings written by
/// earlier driver versions load unchanged.
///
/// # Examples
///
/// ```
/// use kasa_poller::host::DeviceSettings;
///
/// let settings: DeviceSettings =
///     serde_json::from_str(r#"{"settingIPAddress":"192.168.1.23","totalOffset":1.5}"#).unwrap();
///
/// assert_eq!(settings.address, "192.168.1.23");
/// assert_eq!(settings.polling_interval(), 10);
/// assert!(!settings.is_dynamic_ip());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSettings {
    /// Network address of the device.
    #[serde(rename = "settingIPAddress", default)]
    pub address: String,

    /// Vendor identity, learned on the first successful fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    /// Whether the address may change and must be rediscovered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_ip: Option<bool>,

    /// Polling interval in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_interval: Option<u64>,

    /// Energy subtracted from the device's cumulative total, in kWh.
    #[serde(default)]
    pub total_offset: f64,
}

impl DeviceSettings {
    /// Creates settings for a device at `address`.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Returns `true` if dynamic addressing is on.
    #[must_use]
    pub fn is_dynamic_ip(&self) -> bool {
        self.dynamic_ip.unwrap_or(false)
    }

    /// Returns the polling interval in seconds, falling back to 10 for a
    /// missing or zero value.
    #[must_use]
    pub fn polling_interval(&self) -> u64 {
        match self.polling_interval {
            Some(0) | None => DEFAULT_POLLING_INTERVAL,
            Some(seconds) => seconds,
        }
    }

    /// Returns the patch that fills in missing defaults, if any.
    #[must_use]
    pub fn missing_defaults(&self) -> Option<SettingsPatch> {
        let mut patch = SettingsPatch::new();
        if self.dynamic_ip.is_none() {
            patch = patch.with_dynamic_ip(false);
        }
        if self.polling_interval.is_none() {
            patch = patch.with_polling_interval(DEFAULT_POLLING_INTERVAL);
        }
        (!patch.is_empty()).then_some(patch)
    }

    /// Applies a patch in place.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(address) = &patch.address {
            self.address.clone_from(address);
        }
        if let Some(device_id) = &patch.device_id {
            self.device_id = Some(device_id.clone());
        }
        if let Some(dynamic_ip) = patch.dynamic_ip {
            self.dynamic_ip = Some(dynamic_ip);
        }
        if let Some(interval) = patch.polling_interval {
            self.polling_interval = Some(interval);
        }
        if let Some(offset) = patch.total_offset {
            self.total_offset = offset;
        }
    }
}

/// A partial settings update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    /// New network address.
    #[serde(rename = "settingIPAddress", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Learned vendor identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    /// New dynamic addressing flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_ip: Option<bool>,

    /// New polling interval in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_interval: Option<u64>,

    /// New energy offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_offset: Option<f64>,
}

impl SettingsPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the vendor identity.
    #[must_use]
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Sets the dynamic addressing flag.
    #[must_use]
    pub fn with_dynamic_ip(mut self, dynamic_ip: bool) -> Self {
        self.dynamic_ip = Some(dynamic_ip);
        self
    }

    /// Sets the polling interval in seconds.
    #[must_use]
    pub fn with_polling_interval(mut self, seconds: u64) -> Self {
        self.polling_interval = Some(seconds);
        self
    }

    /// Sets the energy offset.
    #[must_use]
    pub fn with_total_offset(mut self, offset: f64) -> Self {
        self.total_offset = Some(offset);
        self
    }

    /// Returns `true` if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
