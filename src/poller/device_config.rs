// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device handles and poller configuration.

use std::time::Duration;

use crate::Capabilities;
use crate::types::ModelFamily;

/// Default upper bound of the per-device start jitter.
const DEFAULT_MAX_JITTER: Duration = Duration::from_secs(5);

/// Hard cap on the jitter, whatever the configuration says.
const JITTER_CAP_MS: u64 = 86_400_000;

/// Default number of consecutive unreachable ticks between rediscovery runs.
const DEFAULT_REDISCOVERY_THRESHOLD: u64 = 360;

/// Default rediscovery window.
const DEFAULT_REDISCOVERY_WINDOW: Duration = Duration::from_secs(5);

/// Default event channel capacity.
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// One polled endpoint: a device, or one socket of a power strip.
///
/// # Examples
///
/// ```
/// use kasa_poller::poller::DeviceHandle;
/// use kasa_poller::types::ModelFamily;
///
/// // A plug
/// let plug = DeviceHandle::new("192.168.1.20", ModelFamily::EnergyPlug);
///
/// // The second socket of a strip
/// let socket = DeviceHandle::socket("192.168.1.21", "8006A1B201")
///     .with_name("Desk lamp");
///
/// assert!(socket.is_child());
/// assert_eq!(socket.family, ModelFamily::PowerStrip);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    /// Current network address.
    pub address: String,
    /// Socket id, for power strip sockets.
    pub child_id: Option<String>,
    /// Model family, deciding which metrics are polled.
    pub family: ModelFamily,
    /// Optional friendly name, used in logs.
    pub name: Option<String>,
}

impl DeviceHandle {
    /// Creates a handle for a whole device.
    #[must_use]
    pub fn new(address: impl Into<String>, family: ModelFamily) -> Self {
        Self {
            address: address.into(),
            child_id: None,
            family,
            name: None,
        }
    }

    /// Creates a handle for one socket of a power strip.
    #[must_use]
    pub fn socket(address: impl Into<String>, child_id: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            child_id: Some(child_id.into()),
            family: ModelFamily::PowerStrip,
            name: None,
        }
    }

    /// Creates a handle from a vendor model string.
    #[must_use]
    pub fn for_model(address: impl Into<String>, model: &str) -> Self {
        Self::new(address, ModelFamily::from_model(model))
    }

    /// Sets a friendly name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns `true` for a power strip socket.
    #[must_use]
    pub fn is_child(&self) -> bool {
        self.child_id.is_some()
    }

    /// Returns the capabilities this endpoint exposes.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_family(self.family, self.is_child())
    }

    /// Returns the friendly name if set, otherwise the address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}

/// When and how long to look for a device that stopped answering.
///
/// Rediscovery only ever runs for devices with dynamic addressing enabled.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use kasa_poller::poller::RediscoveryPolicy;
///
/// let policy = RediscoveryPolicy::new()
///     .with_threshold(3)
///     .with_window(Duration::from_secs(10));
///
/// assert!(policy.should_trigger(3, true));
/// assert!(!policy.should_trigger(3, false));
/// assert!(!policy.should_trigger(4, true));
/// assert!(policy.should_trigger(6, true));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RediscoveryPolicy {
    /// Whether rediscovery runs at all.
    pub enabled: bool,
    /// Consecutive unreachable ticks between runs.
    pub threshold: u64,
    /// How long each run listens for announcements.
    pub window: Duration,
}

impl RediscoveryPolicy {
    /// Creates a policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy that never rediscovers.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Sets the threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the window.
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Returns `true` if the `count`th consecutive unreachable tick should
    /// start a rediscovery run.
    #[must_use]
    pub fn should_trigger(&self, count: u64, dynamic_ip: bool) -> bool {
        self.enabled
            && dynamic_ip
            && self.threshold > 0
            && count > 0
            && count.is_multiple_of(self.threshold)
    }
}

impl Default for RediscoveryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: DEFAULT_REDISCOVERY_THRESHOLD,
            window: DEFAULT_REDISCOVERY_WINDOW,
        }
    }
}

/// Configuration of a [`DevicePoller`](super::DevicePoller).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use kasa_poller::poller::{PollerConfig, RediscoveryPolicy};
///
/// let config = PollerConfig::new()
///     .with_max_jitter(Duration::from_secs(2))
///     .with_rediscovery(RediscoveryPolicy::disabled());
///
/// assert_eq!(config.event_capacity, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Upper bound of the random delay added to each device's period.
    pub max_jitter: Duration,
    /// Rediscovery policy shared by all devices.
    pub rediscovery: RediscoveryPolicy,
    /// Capacity of the event channel.
    pub event_capacity: usize,
}

impl PollerConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum jitter. Zero disables jitter.
    #[must_use]
    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Sets the rediscovery policy.
    #[must_use]
    pub fn with_rediscovery(mut self, policy: RediscoveryPolicy) -> Self {
        self.rediscovery = policy;
        self
    }

    /// Sets the event channel capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Draws a jitter in `0..=max_jitter`, at millisecond resolution.
    ///
    /// The jitter never exceeds one day.
    #[must_use]
    pub fn draw_jitter(&self) -> Duration {
        let max_ms = u64::try_from(self.max_jitter.as_millis())
            .unwrap_or(u64::MAX)
            .min(JITTER_CAP_MS);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::random_range(0..=max_ms))
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_jitter: DEFAULT_MAX_JITTER,
            rediscovery: RediscoveryPolicy::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Capability;

    #[test]
    fn socket_handle_has_no_led() {
        let socket = DeviceHandle::socket("10.0.0.4", "AB01");
        assert!(!socket.capabilities().supports(Capability::LedOnOff));
        assert!(socket.capabilities().supports(Capability::MeterPower));
    }

    #[test]
    fn handle_from_model() {
        let handle = DeviceHandle::for_model("10.0.0.4", "KL130(EU)");
        assert_eq!(handle.family, ModelFamily::ColorBulb);
        assert_eq!(handle.display_name(), "10.0.0.4");
    }

    #[test]
    fn default_policy_triggers_every_360() {
        let policy = RediscoveryPolicy::default();
        assert!(!policy.should_trigger(0, true));
        assert!(!policy.should_trigger(359, true));
        assert!(policy.should_trigger(360, true));
        assert!(!policy.should_trigger(361, true));
        assert!(policy.should_trigger(720, true));
    }

    #[test]
    fn disabled_policy_never_triggers() {
        let policy = RediscoveryPolicy::disabled();
        assert!(!policy.should_trigger(360, true));
    }

    #[test]
    fn zero_threshold_never_triggers() {
        let policy = RediscoveryPolicy::new().with_threshold(0);
        assert!(!policy.should_trigger(360, true));
    }

    #[test]
    fn jitter_stays_in_range() {
        let config = PollerConfig::new().with_max_jitter(Duration::from_millis(50));
        for _ in 0..100 {
            assert!(config.draw_jitter() <= Duration::from_millis(50));
        }
        assert_eq!(
            PollerConfig::new()
                .with_max_jitter(Duration::ZERO)
                .draw_jitter(),
            Duration::ZERO
        );
    }

    #[test]
    fn jitter_is_capped_at_one_day() {
        let config = PollerConfig::new().with_max_jitter(Duration::MAX);
        for _ in 0..100 {
            assert!(config.draw_jitter() <= Duration::from_secs(86_400));
        }
    }
}
