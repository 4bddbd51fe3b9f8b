// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polling and reconciliation loop.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{RwLock, broadcast};
use tokio::time::{Instant, MissedTickBehavior};

use crate::Capabilities;
use crate::capabilities::{Capability, CapabilityValue};
use crate::client::{DeviceClient, DiscoveryOptions, LightCommand, relay_payload};
use crate::discovery::{self, DeviceIdentity, DiscoveryHub};
use crate::error::{ClientError, Error, FailureKind, ValueError};
use crate::event::{DeviceEvent, DeviceId, EventBus};
use crate::host::{DeviceSettings, HostPlatform, MAX_POLLING_INTERVAL, SettingsPatch};
use crate::state::{ObservedState, StateChange};
use crate::status::{DeviceStatus, SysInfo};
use crate::types::{Brightness, ColorMode, ColorTemp, Hue, LightMode, PowerState, Saturation};

use super::device_config::{DeviceHandle, PollerConfig};
use super::session::{PollSession, SessionStatus};

/// Reason passed to the host when a device is marked unavailable.
const OFFLINE_REASON: &str = "Device offline";

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The fetch succeeded; `pushed` capabilities changed and were written.
    Updated {
        /// Number of capability values written to the host.
        pushed: usize,
    },
    /// A fetch for this device was already in flight.
    Skipped,
    /// The device did not answer.
    Unreachable {
        /// Consecutive unreachable ticks so far.
        count: u64,
        /// Whether this tick started a rediscovery run.
        rediscovery: bool,
    },
    /// The fetch failed for another reason; nothing changed.
    Failed(FailureKind),
}

/// Internal per-device record.
#[derive(Debug)]
struct ManagedDevice {
    handle: DeviceHandle,
    capabilities: Capabilities,
    settings: DeviceSettings,
    state: ObservedState,
    session: PollSession,
    unavailable: bool,
}

impl ManagedDevice {
    fn new(handle: DeviceHandle, settings: DeviceSettings) -> Self {
        Self {
            capabilities: handle.capabilities(),
            handle,
            settings,
            state: ObservedState::new(),
            session: PollSession::default(),
            unavailable: false,
        }
    }

    fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(self.settings.device_id.clone(), self.handle.child_id.clone())
    }
}

struct Inner<C, H> {
    client: Arc<C>,
    host: Arc<H>,
    devices: RwLock<HashMap<DeviceId, ManagedDevice>>,
    event_bus: EventBus,
    /// Broadcast discovery shared by every device rediscovering at once.
    discovery: DiscoveryHub,
    config: PollerConfig,
}

impl<C, H> Drop for Inner<C, H> {
    fn drop(&mut self) {
        for device in self.devices.get_mut().values_mut() {
            device.session.stop();
        }
    }
}

/// Keeps devices mirrored into a host platform by polling them.
///
/// Each registered device gets its own timer. Every tick fetches the
/// device's status, pushes only the capabilities whose value changed, and
/// counts consecutive unreachable ticks. Devices on a dynamic address are
/// rediscovered when the count reaches the configured threshold.
///
/// The poller is cheap to clone; clones share the same devices. Dropping the
/// last clone stops every timer.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use kasa_poller::client::DeviceClient;
/// use kasa_poller::event::DeviceId;
/// use kasa_poller::host::{DeviceSettings, MemoryHost};
/// use kasa_poller::poller::{DeviceHandle, DevicePoller};
/// use kasa_poller::types::ModelFamily;
///
/// # async fn example(client: Arc<impl DeviceClient>) -> kasa_poller::Result<()> {
/// let host = Arc::new(MemoryHost::new());
/// let poller = DevicePoller::new(client, Arc::clone(&host));
///
/// let id = DeviceId::new();
/// host.add_device(id, DeviceSettings::new("192.168.1.20"));
/// poller
///     .register_device(id, DeviceHandle::new("192.168.1.20", ModelFamily::EnergyPlug))
///     .await?;
///
/// let mut events = poller.subscribe();
/// while let Ok(event) = events.recv().await {
///     println!("{event:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct DevicePoller<C, H> {
    inner: Arc<Inner<C, H>>,
}

impl<C, H> Clone for DevicePoller<C, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, H> std::fmt::Debug for DevicePoller<C, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevicePoller")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<C: DeviceClient, H: HostPlatform> DevicePoller<C, H> {
    /// Creates a poller with default configuration.
    #[must_use]
    pub fn new(client: Arc<C>, host: Arc<H>) -> Self {
        Self::with_config(client, host, PollerConfig::default())
    }

    /// Creates a poller with custom configuration.
    #[must_use]
    pub fn with_config(client: Arc<C>, host: Arc<H>, config: PollerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                host,
                devices: RwLock::new(HashMap::new()),
                event_bus: EventBus::with_capacity(config.event_capacity),
                discovery: DiscoveryHub::new(),
                config,
            }),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PollerConfig {
        &self.inner.config
    }

    /// Returns the shared device client.
    #[must_use]
    pub fn client(&self) -> &Arc<C> {
        &self.inner.client
    }

    /// Returns the host platform.
    #[must_use]
    pub fn host(&self) -> &Arc<H> {
        &self.inner.host
    }

    // =========================================================================
    // Subscription
    // =========================================================================

    /// Subscribes to poller events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.inner.event_bus.subscribe()
    }

    // =========================================================================
    // Device Management
    // =========================================================================

    /// Registers a device the host already knows and starts polling it.
    ///
    /// Settings are loaded from the host; a missing `dynamic_ip` or
    /// `polling_interval` is filled with its default and written back. A
    /// stored address takes precedence over the handle's, since it may have
    /// been updated by an earlier rediscovery.
    ///
    /// Registering an already registered id replaces it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Host` if the settings cannot be loaded or saved, and
    /// `ValueError::IntervalTooLarge` if the stored polling interval is longer
    /// than a day. A rejected device is not registered.
    pub async fn register_device(
        &self,
        device_id: DeviceId,
        mut handle: DeviceHandle,
    ) -> Result<(), Error> {
        let host = &self.inner.host;
        let mut settings = host.get_settings(device_id).await?;

        let mut patch = settings.missing_defaults().unwrap_or_default();
        if settings.address.is_empty() {
            patch = patch.with_address(handle.address.clone());
        }
        if !patch.is_empty() {
            host.set_settings(device_id, &patch).await?;
            settings.apply(&patch);
        }
        handle.address.clone_from(&settings.address);

        let interval = settings.polling_interval();
        checked_interval(interval)?;
        tracing::info!(
            %device_id,
            name = handle.display_name(),
            family = %handle.family,
            address = %handle.address,
            interval,
            "Registering device"
        );

        let previous = self
            .inner
            .devices
            .write()
            .await
            .insert(device_id, ManagedDevice::new(handle, settings));
        if let Some(mut previous) = previous {
            previous.session.stop();
        }

        self.inner.event_bus.publish(DeviceEvent::device_added(device_id));
        self.start_polling(device_id, interval).await?;
        Ok(())
    }

    /// Stops polling and forgets a device.
    ///
    /// Returns `true` if the device was registered.
    pub async fn remove_device(&self, device_id: DeviceId) -> bool {
        let removed = self.inner.devices.write().await.remove(&device_id);
        let Some(mut device) = removed else {
            return false;
        };

        if device.session.stop() {
            self.inner
                .event_bus
                .publish(DeviceEvent::PollingStopped { device_id });
        }
        tracing::info!(%device_id, "Removed device");
        self.inner
            .event_bus
            .publish(DeviceEvent::device_removed(device_id));
        true
    }

    /// Returns every registered device id.
    pub async fn device_ids(&self) -> Vec<DeviceId> {
        self.inner.devices.read().await.keys().copied().collect()
    }

    /// Returns the number of registered devices.
    pub async fn device_count(&self) -> usize {
        self.inner.devices.read().await.len()
    }

    /// Returns a device's handle.
    pub async fn handle(&self, device_id: DeviceId) -> Option<DeviceHandle> {
        self.inner
            .devices
            .read()
            .await
            .get(&device_id)
            .map(|d| d.handle.clone())
    }

    /// Returns a device's capabilities.
    pub async fn capabilities(&self, device_id: DeviceId) -> Option<Capabilities> {
        self.inner
            .devices
            .read()
            .await
            .get(&device_id)
            .map(|d| d.capabilities)
    }

    /// Returns the poller's copy of a device's settings.
    pub async fn settings(&self, device_id: DeviceId) -> Option<DeviceSettings> {
        self.inner
            .devices
            .read()
            .await
            .get(&device_id)
            .map(|d| d.settings.clone())
    }

    /// Returns the values last pushed for a device.
    pub async fn observed_state(&self, device_id: DeviceId) -> Option<ObservedState> {
        self.inner
            .devices
            .read()
            .await
            .get(&device_id)
            .map(|d| d.state.clone())
    }

    // =========================================================================
    // Polling
    // =========================================================================

    /// Starts polling a device every `interval_seconds` plus a random jitter.
    ///
    /// A running timer for the device is cancelled first, so there is never
    /// more than one. The unreachable counter is kept. Returns the effective
    /// period.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::ZeroInterval` for a zero interval,
    /// `ValueError::IntervalTooLarge` for one longer than a day and
    /// `Error::DeviceNotFound` for an unknown device.
    pub async fn start_polling(
        &self,
        device_id: DeviceId,
        interval_seconds: u64,
    ) -> Result<Duration, Error> {
        let interval = checked_interval(interval_seconds)?;
        let period = interval + self.inner.config.draw_jitter();

        {
            let mut devices = self.inner.devices.write().await;
            let device = devices.get_mut(&device_id).ok_or(Error::DeviceNotFound)?;
            let timer = spawn_timer(Arc::downgrade(&self.inner), device_id, period);
            device.session.replace_timer(timer, interval, period);
        }

        tracing::info!(
            %device_id,
            interval_secs = interval_seconds,
            period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
            "Polling started"
        );
        self.inner
            .event_bus
            .publish(DeviceEvent::PollingStarted { device_id, period });
        Ok(period)
    }

    /// Stops polling a device.
    ///
    /// Returns `true` if a timer was running. Stopping twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown device.
    pub async fn stop_polling(&self, device_id: DeviceId) -> Result<bool, Error> {
        let stopped = {
            let mut devices = self.inner.devices.write().await;
            let device = devices.get_mut(&device_id).ok_or(Error::DeviceNotFound)?;
            device.session.stop()
        };

        if stopped {
            tracing::info!(%device_id, "Polling stopped");
            self.inner
                .event_bus
                .publish(DeviceEvent::PollingStopped { device_id });
        }
        Ok(stopped)
    }

    /// Runs one fetch-and-reconcile cycle now.
    ///
    /// This is what the timer calls. Fetch failures are reported in the
    /// outcome, not as errors.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown device.
    pub async fn tick(&self, device_id: DeviceId) -> Result<TickOutcome, Error> {
        self.inner.tick(device_id).await
    }

    /// Returns `true` if the device has a running timer.
    pub async fn is_polling(&self, device_id: DeviceId) -> bool {
        self.inner
            .devices
            .read()
            .await
            .get(&device_id)
            .is_some_and(|d| d.session.is_polling())
    }

    /// Returns a snapshot of a device's polling session.
    pub async fn session_status(&self, device_id: DeviceId) -> Option<SessionStatus> {
        self.inner
            .devices
            .read()
            .await
            .get(&device_id)
            .map(|d| d.session.status())
    }

    /// Returns a device's consecutive unreachable tick count.
    pub async fn unreachable_count(&self, device_id: DeviceId) -> Option<u64> {
        self.inner
            .devices
            .read()
            .await
            .get(&device_id)
            .map(|d| d.session.unreachable_count)
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Persists a settings change and reacts to it.
    ///
    /// A new polling interval restarts a running timer. A new address is
    /// used from the next request on.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::IntervalTooLarge` for a polling interval longer
    /// than a day, `Error::DeviceNotFound` for an unknown device and
    /// `Error::Host` if the host rejects the change.
    pub async fn update_settings(
        &self,
        device_id: DeviceId,
        patch: SettingsPatch,
    ) -> Result<(), Error> {
        if let Some(seconds) = patch.polling_interval
            && seconds > MAX_POLLING_INTERVAL
        {
            return Err(ValueError::IntervalTooLarge(seconds).into());
        }
        let old = self.settings(device_id).await.ok_or(Error::DeviceNotFound)?;
        self.inner.host.set_settings(device_id, &patch).await?;

        let (new, polling) = {
            let mut devices = self.inner.devices.write().await;
            let device = devices.get_mut(&device_id).ok_or(Error::DeviceNotFound)?;
            device.settings.apply(&patch);
            if patch.address.is_some() {
                device.handle.address.clone_from(&device.settings.address);
            }
            (device.settings.clone(), device.session.is_polling())
        };

        if new.address != old.address {
            tracing::info!(%device_id, address = %new.address, "Address changed");
        }
        if new.is_dynamic_ip() != old.is_dynamic_ip() {
            tracing::info!(
                %device_id,
                dynamic_ip = new.is_dynamic_ip(),
                "Dynamic IP setting changed"
            );
        }
        if new.total_offset.to_bits() != old.total_offset.to_bits() {
            tracing::debug!(%device_id, total_offset = new.total_offset, "Energy offset changed");
        }
        if new.polling_interval() != old.polling_interval() && polling {
            tracing::info!(
                %device_id,
                interval = new.polling_interval(),
                "Polling interval changed"
            );
            self.start_polling(device_id, new.polling_interval()).await?;
        }
        Ok(())
    }

    /// Sets the energy offset subtracted from the cumulative total.
    ///
    /// Takes effect on the next tick.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidEnergyOffset` for a negative or
    /// non-finite offset, and the errors of
    /// [`update_settings`](Self::update_settings).
    pub async fn set_energy_offset(&self, device_id: DeviceId, offset: f64) -> Result<(), Error> {
        if !offset.is_finite() || offset < 0.0 {
            return Err(ValueError::InvalidEnergyOffset(offset).into());
        }
        self.update_settings(device_id, SettingsPatch::new().with_total_offset(offset))
            .await
    }

    /// Clears the energy offset, so the device total is reported as is.
    ///
    /// # Errors
    ///
    /// See [`update_settings`](Self::update_settings).
    pub async fn reset_energy_offset(&self, device_id: DeviceId) -> Result<(), Error> {
        self.set_energy_offset(device_id, 0.0).await
    }

    /// Makes the reported energy total start again from zero.
    ///
    /// The offset is set to the last raw total seen by the poller, or read
    /// from the device if no total was seen yet. Returns the new offset.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapabilityNotSupported` for devices without a meter
    /// and `Error::Client` if the total had to be read and could not be.
    pub async fn meter_reset(&self, device_id: DeviceId) -> Result<f64, Error> {
        let (handle, capabilities, raw) = {
            let devices = self.inner.devices.read().await;
            let device = devices.get(&device_id).ok_or(Error::DeviceNotFound)?;
            (
                device.handle.clone(),
                device.capabilities,
                device.state.raw_energy_total(),
            )
        };
        if !capabilities.energy {
            return Err(Error::CapabilityNotSupported);
        }

        let raw = match raw {
            Some(total) => total,
            None => {
                self.inner
                    .client
                    .get_realtime(&handle.address, handle.child_id.as_deref())
                    .await?
                    .total
            }
        };

        tracing::info!(%device_id, offset = raw, "Meter reset");
        self.set_energy_offset(device_id, raw.max(0.0)).await?;
        Ok(raw.max(0.0))
    }

    // =========================================================================
    // Control
    // =========================================================================

    /// Switches a device, socket or bulb on or off.
    ///
    /// Sockets are switched through a raw relay command scoped to the
    /// socket.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` or `Error::Client`.
    pub async fn set_power(&self, device_id: DeviceId, state: PowerState) -> Result<(), Error> {
        let (handle, _) = self.inner.control_target(device_id).await?;
        let client = &self.inner.client;

        if let Some(child_id) = handle.child_id.as_deref() {
            client
                .send_command(&handle.address, &relay_payload(state), Some(child_id))
                .await?;
        } else if handle.family.is_bulb() {
            client
                .set_light_state(&handle.address, &LightCommand::new().with_power(state))
                .await?;
        } else {
            client.set_power_state(&handle.address, state).await?;
        }

        tracing::debug!(%device_id, %state, "Power set");
        self.inner
            .record(device_id, vec![StateChange::Power(state)])
            .await;
        Ok(())
    }

    /// Switches the status LED.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapabilityNotSupported` for devices without an LED.
    pub async fn set_led(&self, device_id: DeviceId, state: PowerState) -> Result<(), Error> {
        let (handle, capabilities) = self.inner.control_target(device_id).await?;
        require(capabilities, Capability::LedOnOff)?;

        self.inner
            .client
            .set_led_state(&handle.address, state)
            .await?;
        self.inner
            .record(device_id, vec![StateChange::Led(state)])
            .await;
        Ok(())
    }

    /// Sets the brightness of a dimmer or bulb.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapabilityNotSupported` for devices that cannot dim.
    pub async fn set_brightness(
        &self,
        device_id: DeviceId,
        brightness: Brightness,
    ) -> Result<(), Error> {
        let (handle, capabilities) = self.inner.control_target(device_id).await?;
        require(capabilities, Capability::Dim)?;

        if handle.family.is_bulb() {
            let command = LightCommand::new().with_brightness(brightness);
            self.inner
                .client
                .set_light_state(&handle.address, &command)
                .await?;
        } else {
            self.inner
                .client
                .set_brightness(&handle.address, brightness)
                .await?;
        }
        self.inner
            .record(device_id, vec![StateChange::Brightness(brightness)])
            .await;
        Ok(())
    }

    /// Sets the hue of a color bulb and switches it to color mode.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapabilityNotSupported` for bulbs without color.
    pub async fn set_hue(&self, device_id: DeviceId, hue: Hue) -> Result<(), Error> {
        let (handle, capabilities) = self.inner.control_target(device_id).await?;
        require(capabilities, Capability::LightHue)?;

        let command = LightCommand::new()
            .with_hue(hue)
            .with_color_temp(ColorTemp::COLOR_MODE);
        self.inner
            .client
            .set_light_state(&handle.address, &command)
            .await?;
        self.inner
            .record(
                device_id,
                vec![
                    StateChange::Hue(hue),
                    StateChange::ColorTemp(ColorTemp::COLOR_MODE),
                    StateChange::ColorMode(ColorMode::Color),
                ],
            )
            .await;
        Ok(())
    }

    /// Sets the saturation of a color bulb.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapabilityNotSupported` for bulbs without color.
    pub async fn set_saturation(
        &self,
        device_id: DeviceId,
        saturation: Saturation,
    ) -> Result<(), Error> {
        let (handle, capabilities) = self.inner.control_target(device_id).await?;
        require(capabilities, Capability::LightSaturation)?;

        let command = LightCommand::new().with_saturation(saturation);
        self.inner
            .client
            .set_light_state(&handle.address, &command)
            .await?;
        self.inner
            .record(device_id, vec![StateChange::Saturation(saturation)])
            .await;
        Ok(())
    }

    /// Sets the color temperature of a tunable or color bulb.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapabilityNotSupported` for bulbs without color
    /// temperature.
    pub async fn set_color_temperature(
        &self,
        device_id: DeviceId,
        color_temp: ColorTemp,
    ) -> Result<(), Error> {
        let (handle, capabilities) = self.inner.control_target(device_id).await?;
        require(capabilities, Capability::LightTemperature)?;

        let command = LightCommand::new().with_color_temp(color_temp);
        self.inner
            .client
            .set_light_state(&handle.address, &command)
            .await?;

        let mode = if color_temp.is_color_mode() {
            ColorMode::Color
        } else {
            ColorMode::Temperature
        };
        self.inner
            .record(
                device_id,
                vec![StateChange::ColorTemp(color_temp), StateChange::ColorMode(mode)],
            )
            .await;
        Ok(())
    }

    /// Turns circadian mode on or off.
    ///
    /// Leaving circadian mode returns the bulb to normal mode at full
    /// brightness.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapabilityNotSupported` for non-bulbs.
    pub async fn set_circadian_mode(
        &self,
        device_id: DeviceId,
        enabled: bool,
    ) -> Result<(), Error> {
        let (handle, _) = self.inner.control_target(device_id).await?;
        if !handle.family.is_bulb() {
            return Err(Error::CapabilityNotSupported);
        }

        let command = if enabled {
            LightCommand::new().with_mode(LightMode::Circadian)
        } else {
            LightCommand::new()
                .with_mode(LightMode::Normal)
                .with_brightness(Brightness::MAX)
        };
        self.inner
            .client
            .set_light_state(&handle.address, &command)
            .await?;

        tracing::debug!(%device_id, enabled, "Circadian mode set");
        if !enabled {
            self.inner
                .record(device_id, vec![StateChange::Brightness(Brightness::MAX)])
                .await;
        }
        Ok(())
    }
}

fn require(capabilities: Capabilities, capability: Capability) -> Result<(), Error> {
    if capabilities.supports(capability) {
        Ok(())
    } else {
        Err(Error::CapabilityNotSupported)
    }
}

/// Spawns the repeating timer of one device.
///
/// The task only holds a weak reference, so dropping the poller ends it.
/// Validates a polling interval in seconds.
fn checked_interval(seconds: u64) -> Result<Duration, ValueError> {
    match seconds {
        0 => Err(ValueError::ZeroInterval),
        s if s > MAX_POLLING_INTERVAL => Err(ValueError::IntervalTooLarge(s)),
        s => Ok(Duration::from_secs(s)),
    }
}

fn spawn_timer<C: DeviceClient, H: HostPlatform>(
    inner: Weak<Inner<C, H>>,
    device_id: DeviceId,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            match inner.tick(device_id).await {
                Ok(outcome) => tracing::trace!(%device_id, ?outcome, "Tick finished"),
                Err(Error::DeviceNotFound) => break,
                Err(e) => tracing::warn!(%device_id, error = %e, "Tick failed"),
            }
        }

        tracing::debug!(%device_id, "Polling timer ended");
    })
}

impl<C: DeviceClient, H: HostPlatform> Inner<C, H> {
    async fn tick(self: &Arc<Self>, device_id: DeviceId) -> Result<TickOutcome, Error> {
        let (handle, capabilities, offset, guard) = {
            let devices = self.devices.read().await;
            let device = devices.get(&device_id).ok_or(Error::DeviceNotFound)?;
            let Some(guard) = device.session.fetch.try_begin() else {
                tracing::debug!(%device_id, "Fetch still in flight, skipping tick");
                return Ok(TickOutcome::Skipped);
            };
            (
                device.handle.clone(),
                device.capabilities,
                device.settings.total_offset,
                guard,
            )
        };

        let fetched = self.fetch(&handle, capabilities, offset).await;
        let outcome = match fetched {
            Ok((sys_info, changes)) => self.reconcile(device_id, &sys_info, changes).await?,
            Err(err) => self.handle_failure(device_id, &err).await?,
        };

        drop(guard);
        Ok(outcome)
    }

    /// Fetches the status and converts it into changes.
    async fn fetch(
        &self,
        handle: &DeviceHandle,
        capabilities: Capabilities,
        offset: f64,
    ) -> Result<(SysInfo, Vec<StateChange>), ClientError> {
        let sys_info = self.client.get_sys_info(&handle.address).await?;
        let mut status = DeviceStatus::new(sys_info);
        if capabilities.energy {
            let realtime = self
                .client
                .get_realtime(&handle.address, handle.child_id.as_deref())
                .await?;
            status = status.with_realtime(realtime);
        }

        let changes = status.state_changes(handle.family, handle.child_id.as_deref(), offset)?;
        Ok((status.sys_info, changes))
    }

    async fn reconcile(
        &self,
        device_id: DeviceId,
        sys_info: &SysInfo,
        changes: Vec<StateChange>,
    ) -> Result<TickOutcome, Error> {
        let (learned, restored) = {
            let mut devices = self.devices.write().await;
            let device = devices.get_mut(&device_id).ok_or(Error::DeviceNotFound)?;

            device.session.unreachable_count = 0;
            device.session.last_success = Some(chrono::Utc::now());

            let learned = if device.settings.device_id.is_none() && !sys_info.device_id.is_empty() {
                device.settings.device_id = Some(sys_info.device_id.clone());
                Some(SettingsPatch::new().with_device_id(sys_info.device_id.clone()))
            } else {
                None
            };

            (learned, std::mem::take(&mut device.unavailable))
        };

        if let Some(patch) = learned {
            tracing::info!(%device_id, vendor_id = %sys_info.device_id, "Learned device id");
            if let Err(e) = self.host.set_settings(device_id, &patch).await {
                tracing::warn!(%device_id, error = %e, "Failed to persist device id");
            }
        }

        let pushed = self.record(device_id, changes).await;

        if restored {
            self.mark_available(device_id).await;
        }

        tracing::debug!(%device_id, pushed, "Reconciled");
        Ok(TickOutcome::Updated { pushed })
    }

    async fn handle_failure(
        self: &Arc<Self>,
        device_id: DeviceId,
        err: &ClientError,
    ) -> Result<TickOutcome, Error> {
        match err.kind() {
            FailureKind::HostUnreachable => {}
            FailureKind::ConnectionReset => {
                tracing::debug!(%device_id, error = %err, "Connection reset, retrying next tick");
                return Ok(TickOutcome::Failed(err.kind()));
            }
            kind => {
                tracing::warn!(%device_id, error = %err, "Status fetch failed");
                return Ok(TickOutcome::Failed(kind));
            }
        }

        let (count, rediscovery) = {
            let mut devices = self.devices.write().await;
            let device = devices.get_mut(&device_id).ok_or(Error::DeviceNotFound)?;

            device.session.unreachable_count += 1;
            let count = device.session.unreachable_count;
            let trigger = !device.session.rediscovering
                && self
                    .config
                    .rediscovery
                    .should_trigger(count, device.settings.is_dynamic_ip());

            let rediscovery = trigger.then(|| {
                device.session.rediscovering = true;
                device.unavailable = true;
                device.identity()
            });
            (count, rediscovery)
        };

        tracing::debug!(%device_id, count, error = %err, "Device unreachable");
        self.event_bus
            .publish(DeviceEvent::Unreachable { device_id, count });

        let triggered = rediscovery.is_some();
        if let Some(identity) = rediscovery {
            tracing::warn!(%device_id, count, "Device unreachable, starting rediscovery");
            if let Err(e) = self.host.set_unavailable(device_id, OFFLINE_REASON).await {
                tracing::warn!(%device_id, error = %e, "Failed to mark device unavailable");
            }
            self.event_bus
                .publish(DeviceEvent::unavailable(device_id, OFFLINE_REASON));

            let inner = Arc::clone(self);
            tokio::spawn(async move {
                inner.run_rediscovery(device_id, identity).await;
            });
        }

        Ok(TickOutcome::Unreachable {
            count,
            rediscovery: triggered,
        })
    }

    async fn run_rediscovery(&self, device_id: DeviceId, identity: DeviceIdentity) {
        self.event_bus
            .publish(DeviceEvent::RediscoveryStarted { device_id });

        // Unfiltered: plugs and bulbs may be looking at the same time.
        let options = DiscoveryOptions::new();
        let window = self.config.rediscovery.window;
        let found = match discovery::rediscover(
            &*self.client,
            &self.discovery,
            &identity,
            &options,
            window,
        )
        .await
        {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(%device_id, error = %e, "Rediscovery could not start");
                None
            }
        };

        let address = {
            let mut devices = self.devices.write().await;
            let Some(device) = devices.get_mut(&device_id) else {
                return;
            };
            device.session.rediscovering = false;

            found.map(|found| {
                device.handle.address.clone_from(&found.host);
                device.settings.address.clone_from(&found.host);
                device.session.unreachable_count = 0;
                device.unavailable = false;
                found.host
            })
        };

        let Some(address) = address else {
            self.event_bus
                .publish(DeviceEvent::RediscoveryFailed { device_id });
            return;
        };

        tracing::info!(%device_id, %address, "Device rediscovered");
        let patch = SettingsPatch::new().with_address(address.clone());
        if let Err(e) = self.host.set_settings(device_id, &patch).await {
            tracing::warn!(%device_id, error = %e, "Failed to persist new address");
        }
        self.event_bus
            .publish(DeviceEvent::Rediscovered { device_id, address });
        self.mark_available(device_id).await;
    }

    async fn mark_available(&self, device_id: DeviceId) {
        if let Err(e) = self.host.set_available(device_id).await {
            tracing::warn!(%device_id, error = %e, "Failed to mark device available");
        }
        self.event_bus.publish(DeviceEvent::available(device_id));
    }

    /// Applies changes to the observed state and pushes the ones that
    /// differ. A failed push is forgotten so the next tick retries it.
    ///
    /// Returns the number of successful pushes.
    async fn record(&self, device_id: DeviceId, changes: Vec<StateChange>) -> usize {
        let pending: Vec<(Capability, CapabilityValue)> = {
            let mut devices = self.devices.write().await;
            let Some(device) = devices.get_mut(&device_id) else {
                return 0;
            };
            let range = device.handle.family.kelvin_range();

            changes
                .into_iter()
                .filter(|change| device.state.apply(change))
                .map(|change| (change.capability(), change.host_value(range)))
                .collect()
        };

        let mut pushed = 0;
        for (capability, value) in pending {
            match self
                .host
                .set_capability_value(device_id, capability, value)
                .await
            {
                Ok(()) => {
                    pushed += 1;
                    tracing::debug!(%device_id, %capability, %value, "Pushed capability");
                    self.event_bus.publish(DeviceEvent::CapabilityChanged {
                        device_id,
                        capability,
                        value,
                    });
                }
                Err(e) => {
                    tracing::warn!(%device_id, %capability, error = %e, "Capability push failed");
                    if let Some(device) = self.devices.write().await.get_mut(&device_id) {
                        device.state.forget(capability);
                    }
                }
            }
        }
        pushed
    }

    async fn control_target(
        &self,
        device_id: DeviceId,
    ) -> Result<(DeviceHandle, Capabilities), Error> {
        let devices = self.devices.read().await;
        let device = devices.get(&device_id).ok_or(Error::DeviceNotFound)?;
        Ok((device.handle.clone(), device.capabilities))
    }
}
