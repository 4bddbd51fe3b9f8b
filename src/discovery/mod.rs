// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rediscovery of devices whose address changed.
//!
//! When a device on a dynamic address stops answering, the poller runs a
//! broadcast discovery for a bounded window and looks for an announcement
//! carrying the device's vendor identity.
//!
//! # Discovery Mechanism
//!
//! 1. The first run joining a [`DiscoveryHub`] calls
//!    [`DeviceClient::start_discovery`]; later runs listen on the same
//!    broadcast
//! 2. `DeviceFound` and `DeviceOnline` announcements are matched against each
//!    run's [`DeviceIdentity`]; `DeviceOffline` is ignored
//! 3. A run ends on its first match or at the end of its window. The last
//!    run to end calls [`DeviceClient::stop_discovery`]
//!
//! A run that joins an open session only sees announcements made after it
//! joined.
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use kasa_poller::client::{DeviceClient, DiscoveryOptions};
//! use kasa_poller::discovery::{DeviceIdentity, DiscoveryHub, rediscover};
//!
//! # async fn example(client: &impl DeviceClient) -> kasa_poller::Result<()> {
//! let hub = DiscoveryHub::new();
//! let identity = DeviceIdentity::new(Some("8006A1B2".to_string()), None);
//! let window = Duration::from_secs(5);
//! let found = rediscover(client, &hub, &identity, &DiscoveryOptions::new(), window).await?;
//!
//! if let Some(device) = found {
//!     println!("device moved to {}", device.host);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::client::{DeviceClient, DiscoveredDevice, DiscoveryEvent, DiscoveryOptions};
use crate::error::ClientError;

/// What a discovery announcement is matched against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Vendor `deviceId` of the device (or of the strip owning the socket).
    pub device_id: Option<String>,
    /// Socket id, for a power strip socket.
    pub child_id: Option<String>,
}

impl DeviceIdentity {
    /// Creates an identity.
    #[must_use]
    pub fn new(device_id: Option<String>, child_id: Option<String>) -> Self {
        Self {
            device_id: device_id.filter(|id| !id.is_empty()),
            child_id: child_id.filter(|id| !id.is_empty()),
        }
    }

    /// Returns `true` if there is nothing to match on.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.device_id.is_none() && self.child_id.is_none()
    }

    /// Returns `true` if the announced device is this one.
    ///
    /// Matches on the vendor identity, or on the socket id appearing in the
    /// announced strip's children. A two character socket id matches by
    /// suffix.
    #[must_use]
    pub fn matches(&self, device: &DiscoveredDevice) -> bool {
        if self
            .device_id
            .as_deref()
            .is_some_and(|id| id == device.device_id)
        {
            return true;
        }

        self.child_id.as_deref().is_some_and(|child| {
            device
                .child_ids
                .iter()
                .any(|id| id == child || (child.len() <= 2 && id.ends_with(child)))
        })
    }
}

/// One broadcast discovery session shared by concurrent rediscovery runs.
///
/// The client has a single discovery broadcast, so runs must not start and
/// stop it on their own: a run that found its device would end every other
/// run's window.
#[derive(Debug, Default)]
pub struct DiscoveryHub {
    session: Mutex<Option<Session>>,
}

#[derive(Debug)]
struct Session {
    /// Unread receiver kept only to subscribe later runs.
    events: broadcast::Receiver<DiscoveryEvent>,
    runs: usize,
}

impl DiscoveryHub {
    /// Creates a hub with no open session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of runs listening on the open session.
    #[must_use]
    pub fn active_runs(&self) -> usize {
        self.session.lock().as_ref().map_or(0, |session| session.runs)
    }

    fn join<'a, C: DeviceClient>(
        &'a self,
        client: &'a C,
        options: &DiscoveryOptions,
    ) -> Result<Lease<'a, C>, ClientError> {
        let mut session = self.session.lock();
        let events = match session.as_mut() {
            Some(open) => {
                open.runs += 1;
                tracing::debug!(runs = open.runs, "Joined running discovery");
                open.events.resubscribe()
            }
            None => {
                let events = client.start_discovery(options)?;
                *session = Some(Session {
                    events: events.resubscribe(),
                    runs: 1,
                });
                events
            }
        };
        Ok(Lease {
            hub: self,
            client,
            events,
        })
    }
}

/// A run's membership in the shared session; leaving happens on drop.
struct Lease<'a, C: DeviceClient> {
    hub: &'a DiscoveryHub,
    client: &'a C,
    events: broadcast::Receiver<DiscoveryEvent>,
}

impl<C: DeviceClient> Drop for Lease<'_, C> {
    fn drop(&mut self) {
        let mut session = self.hub.session.lock();
        let last = session.as_mut().is_some_and(|open| {
            open.runs = open.runs.saturating_sub(1);
            open.runs == 0
        });
        // Stopped under the lock so a run joining now starts a fresh session.
        if last {
            *session = None;
            self.client.stop_discovery();
            tracing::debug!("Discovery stopped");
        }
    }
}

/// Runs one discovery window looking for `identity`.
///
/// The broadcast is shared through `hub` with every other run in flight.
/// Returns the matching announcement, or `None` if the window elapsed, the
/// event stream closed, or the identity is empty.
///
/// # Errors
///
/// Returns a `ClientError` if discovery could not be started.
pub async fn rediscover<C: DeviceClient>(
    client: &C,
    hub: &DiscoveryHub,
    identity: &DeviceIdentity,
    options: &DiscoveryOptions,
    window: Duration,
) -> Result<Option<DiscoveredDevice>, ClientError> {
    if identity.is_empty() {
        tracing::debug!("No stored identity, skipping rediscovery");
        return Ok(None);
    }

    tracing::info!(
        device_id = ?identity.device_id,
        child_id = ?identity.child_id,
        window_secs = window.as_secs(),
        "Starting rediscovery"
    );

    let mut lease = hub.join(client, options)?;
    let found = tokio::time::timeout(window, wait_for_match(&mut lease.events, identity))
        .await
        .unwrap_or(None);
    drop(lease);

    match &found {
        Some(device) => tracing::info!(host = %device.host, "Rediscovered device"),
        None => tracing::info!("Rediscovery window elapsed without a match"),
    }

    Ok(found)
}

async fn wait_for_match(
    events: &mut broadcast::Receiver<DiscoveryEvent>,
    identity: &DeviceIdentity,
) -> Option<DiscoveredDevice> {
    loop {
        match events.recv().await {
            Ok(event) => {
                let device = event.device();
                tracing::debug!(
                    host = %device.host,
                    device_id = %device.device_id,
                    "Discovery announcement"
                );
                if event.is_announcement() && identity.matches(device) {
                    return Some(device.clone());
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Discovery events lagged");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::client::LightCommand;
    use crate::status::{RealtimeMetering, SysInfo};
    use crate::types::{Brightness, PowerState};

    /// Client that only answers discovery, replaying scripted events.
    #[derive(Default)]
    struct ScriptedDiscovery {
        events: Vec<DiscoveryEvent>,
        keep_open: bool,
        sender: Mutex<Option<broadcast::Sender<DiscoveryEvent>>>,
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    impl ScriptedDiscovery {
        fn open() -> Self {
            Self {
                keep_open: true,
                ..Self::default()
            }
        }

        /// Broadcasts on the open session, if any.
        fn announce(&self, device: DiscoveredDevice) {
            if let Some(sender) = self.sender.lock().as_ref() {
                let _ = sender.send(DiscoveryEvent::DeviceFound(device));
            }
        }
    }

    impl DeviceClient for ScriptedDiscovery {
        async fn get_sys_info(&self, _: &str) -> Result<SysInfo, ClientError> {
            Err(ClientError::unreachable("offline"))
        }

        async fn get_realtime(
            &self,
            _: &str,
            _: Option<&str>,
        ) -> Result<RealtimeMetering, ClientError> {
            Err(ClientError::unreachable("offline"))
        }

        async fn set_power_state(&self, _: &str, _: PowerState) -> Result<(), ClientError> {
            Ok(())
        }

        async fn set_led_state(&self, _: &str, _: PowerState) -> Result<(), ClientError> {
            Ok(())
        }

        async fn set_brightness(&self, _: &str, _: Brightness) -> Result<(), ClientError> {
            Ok(())
        }

        async fn set_light_state(&self, _: &str, _: &LightCommand) -> Result<(), ClientError> {
            Ok(())
        }

        async fn send_command(
            &self,
            _: &str,
            _: &str,
            _: Option<&str>,
        ) -> Result<String, ClientError> {
            Ok(String::new())
        }

        fn start_discovery(
            &self,
            _: &DiscoveryOptions,
        ) -> Result<broadcast::Receiver<DiscoveryEvent>, ClientError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = broadcast::channel(16);
            for event in &self.events {
                let _ = tx.send(event.clone());
            }
            if self.keep_open {
                *self.sender.lock() = Some(tx);
            }
            Ok(rx)
        }

        fn stop_discovery(&self) {
            self.sender.lock().take();
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    const WINDOW: Duration = Duration::from_secs(5);

    fn announced(host: &str, device_id: &str, children: &[&str]) -> DiscoveredDevice {
        DiscoveredDevice {
            host: host.to_string(),
            device_id: device_id.to_string(),
            model: "HS300(US)".to_string(),
            alias: None,
            child_ids: children.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn identity_matching() {
        let strip = announced("10.0.0.9", "STRIP", &["STRIP00", "STRIP01"]);

        assert!(DeviceIdentity::new(Some("STRIP".into()), None).matches(&strip));
        assert!(DeviceIdentity::new(None, Some("STRIP01".into())).matches(&strip));
        assert!(DeviceIdentity::new(None, Some("01".into())).matches(&strip));
        let other = DeviceIdentity::new(Some("OTHER".into()), Some("STRIP05".into()));
        assert!(!other.matches(&strip));
    }

    #[test]
    fn empty_strings_are_no_identity() {
        assert!(DeviceIdentity::new(Some(String::new()), None).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn finds_matching_announcement() {
        let client = ScriptedDiscovery {
            events: vec![
                DiscoveryEvent::DeviceFound(announced("10.0.0.3", "OTHER", &[])),
                DiscoveryEvent::DeviceOffline(announced("10.0.0.4", "PLUG", &[])),
                DiscoveryEvent::DeviceOnline(announced("10.0.0.7", "PLUG", &[])),
            ],
            keep_open: true,
            ..ScriptedDiscovery::default()
        };
        let identity = DeviceIdentity::new(Some("PLUG".into()), None);

        let hub = DiscoveryHub::new();
        let found = rediscover(&client, &hub, &identity, &DiscoveryOptions::new(), WINDOW)
            .await
            .unwrap();

        assert_eq!(found.unwrap().host, "10.0.0.7");
        assert_eq!(client.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn window_elapses_without_match() {
        let client = ScriptedDiscovery {
            events: vec![DiscoveryEvent::DeviceFound(announced("10.0.0.3", "OTHER", &[]))],
            keep_open: true,
            ..ScriptedDiscovery::default()
        };
        let identity = DeviceIdentity::new(Some("PLUG".into()), None);

        let hub = DiscoveryHub::new();
        let found = rediscover(&client, &hub, &identity, &DiscoveryOptions::new(), WINDOW)
            .await
            .unwrap();

        assert!(found.is_none());
        assert_eq!(client.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn closed_stream_ends_the_run() {
        let client = ScriptedDiscovery::default();
        let identity = DeviceIdentity::new(Some("PLUG".into()), None);

        let hub = DiscoveryHub::new();
        let found = rediscover(&client, &hub, &identity, &DiscoveryOptions::new(), WINDOW)
            .await
            .unwrap();

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn empty_identity_does_not_broadcast() {
        let client = ScriptedDiscovery::default();

        let found = rediscover(
            &client,
            &DiscoveryHub::new(),
            &DeviceIdentity::default(),
            &DiscoveryOptions::new(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(found.is_none());
        assert_eq!(client.starts.load(Ordering::SeqCst), 0);
        assert_eq!(client.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_runs_share_one_session() {
        let client = ScriptedDiscovery::open();
        let hub = DiscoveryHub::new();
        let options = DiscoveryOptions::new();
        let kettle = DeviceIdentity::new(Some("KETTLE".into()), None);
        let heater = DeviceIdentity::new(Some("HEATER".into()), None);
        let window = Duration::from_secs(2);

        let runs = async {
            tokio::join!(
                rediscover(&client, &hub, &kettle, &options, window),
                rediscover(&client, &hub, &heater, &options, window),
            )
        };
        let announcements = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(hub.active_runs(), 2);
            client.announce(announced("10.0.0.50", "KETTLE", &[]));

            tokio::time::sleep(Duration::from_millis(100)).await;
            // The kettle's match must not have closed the heater's window.
            assert_eq!(hub.active_runs(), 1);
            assert_eq!(client.stops.load(Ordering::SeqCst), 0);
            client.announce(announced("10.0.0.51", "HEATER", &[]));
        };
        let ((kettle, heater), ()) = tokio::join!(runs, announcements);

        assert_eq!(kettle.unwrap().unwrap().host, "10.0.0.50");
        assert_eq!(heater.unwrap().unwrap().host, "10.0.0.51");
        assert_eq!(client.starts.load(Ordering::SeqCst), 1);
        assert_eq!(client.stops.load(Ordering::SeqCst), 1);
        assert_eq!(hub.active_runs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn session_reopens_after_last_run() {
        let client = ScriptedDiscovery::open();
        let hub = DiscoveryHub::new();
        let identity = DeviceIdentity::new(Some("PLUG".into()), None);

        for _ in 0..2 {
            let found = rediscover(&client, &hub, &identity, &DiscoveryOptions::new(), WINDOW)
                .await
                .unwrap();
            assert!(found.is_none());
        }

        assert_eq!(client.starts.load(Ordering::SeqCst), 2);
        assert_eq!(client.stops.load(Ordering::SeqCst), 2);
    }
}
