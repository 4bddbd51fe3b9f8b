// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The device client seam.
//!
//! The poller never speaks the vendor protocol itself. Everything it needs
//! from a device goes through a [`DeviceClient`], which also classifies its
//! own failures into a [`FailureKind`](crate::error::FailureKind).
//!
//! One client instance is shared by every polled device, so implementations
//! must be `Send + Sync`.

mod command;
mod discovery;

use std::future::Future;

pub use command::{LightCommand, relay_payload};
pub use discovery::{DeviceKind, DiscoveredDevice, DiscoveryEvent, DiscoveryOptions};

use tokio::sync::broadcast;

use crate::error::ClientError;
use crate::status::{RealtimeMetering, SysInfo};
use crate::types::{Brightness, PowerState};

/// Trait for vendor clients that reach devices on the local network.
///
/// Every method takes the device's current address, since addresses can
/// change after rediscovery.
pub trait DeviceClient: Send + Sync + 'static {
    /// Fetches `system.get_sysinfo`.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` classified by failure kind.
    fn get_sys_info(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<SysInfo, ClientError>> + Send;

    /// Fetches `emeter.get_realtime`, for the whole device or one socket.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` classified by failure kind.
    fn get_realtime(
        &self,
        address: &str,
        child_id: Option<&str>,
    ) -> impl Future<Output = Result<RealtimeMetering, ClientError>> + Send;

    /// Switches the relay of a single-relay device or a bulb.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` classified by failure kind.
    fn set_power_state(
        &self,
        address: &str,
        state: PowerState,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Switches the status LED.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` classified by failure kind.
    fn set_led_state(
        &self,
        address: &str,
        state: PowerState,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Sets the brightness of a dimmer switch.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` classified by failure kind.
    fn set_brightness(
        &self,
        address: &str,
        brightness: Brightness,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Applies a light state change to a bulb.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` classified by failure kind.
    fn set_light_state(
        &self,
        address: &str,
        command: &LightCommand,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Sends a raw JSON payload, optionally scoped to one socket.
    ///
    /// Returns the raw response body.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` classified by failure kind.
    fn send_command(
        &self,
        address: &str,
        payload: &str,
        child_id: Option<&str>,
    ) -> impl Future<Output = Result<String, ClientError>> + Send;

    /// Starts broadcasting discovery requests.
    ///
    /// Events are delivered on the returned receiver until
    /// [`stop_discovery`](Self::stop_discovery) is called. The poller shares
    /// one session between all devices it is looking for, so it never starts
    /// a second one before stopping the first.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` if the broadcast socket cannot be opened.
    fn start_discovery(
        &self,
        options: &DiscoveryOptions,
    ) -> Result<broadcast::Receiver<DiscoveryEvent>, ClientError>;

    /// Stops broadcasting discovery requests.
    fn stop_discovery(&self);
}
