// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device poller keeping Kasa devices mirrored into a host platform.
//!
//! # Overview
//!
//! The [`DevicePoller`] owns one polling session per registered device. It
//! provides:
//!
//! - **Per-device timers**: Each device is polled on its own interval, offset
//!   by a random jitter so devices do not all fire at once
//! - **Change detection**: Only capabilities whose value changed are pushed
//!   to the host
//! - **Single-flight fetches**: A tick is skipped while the previous fetch
//!   for the same device is still running
//! - **Rediscovery**: Devices on a dynamic address are looked up again after
//!   a run of unreachable ticks
//! - **Event system**: Subscribe to poller events via a broadcast channel
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use kasa_poller::client::DeviceClient;
//! use kasa_poller::event::DeviceId;
//! use kasa_poller::host::{DeviceSettings, MemoryHost};
//! use kasa_poller::poller::{DeviceHandle, DevicePoller};
//! use kasa_poller::types::{Brightness, ModelFamily};
//!
//! # async fn example(client: Arc<impl DeviceClient>) -> kasa_poller::Result<()> {
//! let host = Arc::new(MemoryHost::new());
//! let poller = DevicePoller::new(client, Arc::clone(&host));
//!
//! let id = DeviceId::new();
//! host.add_device(id, DeviceSettings::new("192.168.1.30"));
//! poller
//!     .register_device(id, DeviceHandle::new("192.168.1.30", ModelFamily::Dimmer))
//!     .await?;
//!
//! poller.set_brightness(id, Brightness::new(40)?).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Event Subscription
//!
//! ```no_run
//! use std::sync::Arc;
//! use kasa_poller::client::DeviceClient;
//! use kasa_poller::event::DeviceEvent;
//! use kasa_poller::host::MemoryHost;
//! use kasa_poller::poller::DevicePoller;
//!
//! # fn example(client: Arc<impl DeviceClient>) {
//! let poller = DevicePoller::new(client, Arc::new(MemoryHost::new()));
//! let mut events = poller.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             DeviceEvent::CapabilityChanged { device_id, capability, value } => {
//!                 println!("{device_id}: {capability} = {value}");
//!             }
//!             DeviceEvent::Unreachable { device_id, count } => {
//!                 println!("{device_id} missed {count} ticks");
//!             }
//!             _ => {}
//!         }
//!     }
//! });
//! # }
//! ```

mod device_config;
mod device_poller;
mod session;

pub use device_config::{DeviceHandle, PollerConfig, RediscoveryPolicy};
pub use device_poller::{DevicePoller, TickOutcome};
pub use session::{FetchState, SessionStatus};
