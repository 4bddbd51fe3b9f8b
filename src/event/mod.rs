// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Poller events.
//!
//! The poller publishes a [`DeviceEvent`] for every lifecycle step, pushed
//! capability and unreachable/rediscovery transition. Consumers subscribe
//! through [`DevicePoller::subscribe`](crate::DevicePoller::subscribe) or
//! directly on an [`EventBus`].
//!
//! # Examples
//!
//! ```
//! use kasa_poller::event::{DeviceId, DeviceEvent, EventBus};
//!
//! let bus = EventBus::new();
//!
//! let mut rx = bus.subscribe();
//!
//! let device_id = DeviceId::new();
//! bus.publish(DeviceEvent::DeviceAdded { device_id });
//! assert_eq!(rx.try_recv().unwrap().device_id(), device_id);
//! ```

mod device_event;
mod device_id;
mod event_bus;

pub use device_event::DeviceEvent;
pub use device_id::DeviceId;
pub use event_bus::EventBus;
