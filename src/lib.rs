// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `KasaPoller` - Keeps TP-Link Kasa devices mirrored into a home automation
//! host.
//!
//! The library polls plugs, power strip sockets, dimmers and bulbs on a
//! per-device timer, translates their status into host capabilities and
//! pushes only the values that changed.
//!
//! # Supported Features
//!
//! - **Polling**: Per-device interval with random jitter, single fetch in
//!   flight per device
//! - **Change detection**: Unchanged readings are never pushed
//! - **Energy monitoring**: Power, voltage, current and cumulative energy
//!   with a user offset and meter reset
//! - **Light control**: Brightness, hue, saturation, color temperature and
//!   circadian mode
//! - **Rediscovery**: Devices on a dynamic address are found again after a
//!   run of unreachable ticks
//!
//! # Supported Families
//!
//! - Plugs, energy plugs and power strip sockets
//! - Dimmer switches
//! - White, tunable and color bulbs
//!
//! # Quick Start
//!
//! The device protocol and the host platform are both traits. Plug in a
//! [`DeviceClient`] for the network side and a [`HostPlatform`] for the host
//! side; [`MemoryHost`] is a ready-made in-memory host.
//!
//! ```no_run
//! use std::sync::Arc;
//! use kasa_poller::{DeviceClient, DeviceHandle, DevicePoller, MemoryHost};
//! use kasa_poller::event::DeviceId;
//! use kasa_poller::host::DeviceSettings;
//! use kasa_poller::types::ModelFamily;
//!
//! # async fn example(client: Arc<impl DeviceClient>) -> kasa_poller::Result<()> {
//! let host = Arc::new(MemoryHost::new());
//! let poller = DevicePoller::new(client, Arc::clone(&host));
//!
//! let id = DeviceId::new();
//! host.add_device(id, DeviceSettings::new("192.168.1.20"));
//! poller
//!     .register_device(id, DeviceHandle::for_model("192.168.1.20", "KP115(EU)"))
//!     .await?;
//!
//! // Reset the reported energy total to zero
//! poller.meter_reset(id).await?;
//! # Ok(())
//! # }
//! ```

mod capabilities;
pub mod client;
pub mod discovery;
pub mod error;
pub mod event;
pub mod host;
pub mod poller;
pub mod state;
pub mod status;
pub mod types;

pub use capabilities::{Capabilities, Capability, CapabilityValue};
pub use client::DeviceClient;
pub use error::{ClientError, Error, FailureKind, HostError, ParseError, Result, ValueError};
pub use event::{DeviceEvent, DeviceId};
pub use host::{HostPlatform, MemoryHost};
pub use poller::{DeviceHandle, DevicePoller, PollerConfig, RediscoveryPolicy, TickOutcome};
pub use state::{ObservedState, StateChange};
pub use types::{Brightness, ColorTemp, Hue, ModelFamily, PowerState, Saturation};
