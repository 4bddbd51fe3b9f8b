// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast channel for poller events.

use tokio::sync::broadcast;

use super::DeviceEvent;

const DEFAULT_CAPACITY: usize = 256;

/// Fan-out of [`DeviceEvent`]s to any number of subscribers.
///
/// Publishing never waits: a tick must not stall because nobody listens or a
/// listener is slow. A subscriber that falls more than `capacity` events
/// behind gets `RecvError::Lagged` and resumes from the oldest kept event.
///
/// # Examples
///
/// ```
/// use kasa_poller::event::{DeviceId, DeviceEvent, EventBus};
///
/// let bus = EventBus::with_capacity(16);
/// let mut rx = bus.subscribe();
///
/// let device_id = DeviceId::new();
/// bus.publish(DeviceEvent::Unreachable { device_id, count: 1 });
///
/// assert_eq!(rx.try_recv().unwrap().device_id(), device_id);
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DeviceEvent>,
}

impl EventBus {
    /// Creates a bus buffering 256 events per subscriber.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a bus buffering `capacity` events per subscriber.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns a receiver for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of live receivers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Sends an event to every current subscriber.
    ///
    /// Without subscribers the event is dropped.
    pub fn publish(&self, event: DeviceEvent) {
        let device_id = event.device_id();
        match self.sender.send(event) {
            Ok(receivers) => tracing::trace!(%device_id, receivers, "Event published"),
            Err(_) => tracing::trace!(%device_id, "Event dropped, no subscribers"),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DeviceId;

    #[test]
    fn receivers_are_counted() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);

        let rx = bus.subscribe();
        let _other = bus.clone().subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(rx);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn every_subscriber_gets_a_copy() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        let device_id = DeviceId::new();

        bus.publish(DeviceEvent::RediscoveryStarted { device_id });

        assert_eq!(first.recv().await.unwrap().device_id(), device_id);
        assert_eq!(second.recv().await.unwrap().device_id(), device_id);
    }

    #[test]
    fn events_before_subscribing_are_not_replayed() {
        let bus = EventBus::new();
        bus.publish(DeviceEvent::device_removed(DeviceId::new()));

        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let bus = EventBus::with_capacity(2);
        let mut rx = bus.subscribe();
        let device_id = DeviceId::new();

        for count in 1..=4 {
            bus.publish(DeviceEvent::Unreachable { device_id, count });
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(
            rx.recv().await.unwrap(),
            DeviceEvent::Unreachable { device_id, count: 3 }
        );
    }

    #[test]
    fn zero_capacity_still_delivers() {
        let bus = EventBus::with_capacity(0);
        let mut rx = bus.subscribe();
        let device_id = DeviceId::new();

        bus.publish(DeviceEvent::device_added(device_id));

        assert_eq!(rx.try_recv().unwrap().device_id(), device_id);
    }
}
