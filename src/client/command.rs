// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command payloads sent to devices.

use serde::Serialize;

use crate::types::{Brightness, ColorTemp, Hue, LightMode, PowerState, Saturation};

/// A `transition_light_state` request for bulbs.
///
/// Fields left as `None` are omitted from the payload, so the bulb keeps
/// its current value for them.
///
/// # Examples
///
/// ```
/// use kasa_poller::client::LightCommand;
/// use kasa_poller::types::Brightness;
///
/// let cmd = LightCommand::new().with_brightness(Brightness::clamped(70));
/// assert_eq!(
///     serde_json::to_string(&cmd).unwrap(),
///     r#"{"brightness":70}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LightCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    on_off: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    brightness: Option<Brightness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hue: Option<Hue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saturation: Option<Saturation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color_temp: Option<ColorTemp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<LightMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transition_period: Option<u32>,
}

impl LightCommand {
    /// Creates an empty command.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns the bulb on or off.
    #[must_use]
    pub fn with_power(mut self, state: PowerState) -> Self {
        self.on_off = Some(state.as_relay());
        self
    }

    /// Sets the brightness.
    #[must_use]
    pub fn with_brightness(mut self, brightness: Brightness) -> Self {
        self.brightness = Some(brightness);
        self
    }

    /// Sets the hue.
    #[must_use]
    pub fn with_hue(mut self, hue: Hue) -> Self {
        self.hue = Some(hue);
        self
    }

    /// Sets the saturation.
    #[must_use]
    pub fn with_saturation(mut self, saturation: Saturation) -> Self {
        self.saturation = Some(saturation);
        self
    }

    /// Sets the color temperature. [`ColorTemp::COLOR_MODE`] switches the
    /// bulb to hue/saturation.
    #[must_use]
    pub fn with_color_temp(mut self, color_temp: ColorTemp) -> Self {
        self.color_temp = Some(color_temp);
        self
    }

    /// Sets the light mode.
    #[must_use]
    pub fn with_mode(mut self, mode: LightMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Sets the transition time in milliseconds.
    #[must_use]
    pub fn with_transition_period(mut self, millis: u32) -> Self {
        self.transition_period = Some(millis);
        self
    }

    /// Returns the requested power state.
    #[must_use]
    pub fn power(&self) -> Option<PowerState> {
        self.on_off.map(PowerState::from_relay)
    }

    /// Returns the requested brightness.
    #[must_use]
    pub fn brightness(&self) -> Option<Brightness> {
        self.brightness
    }

    /// Returns the requested hue.
    #[must_use]
    pub fn hue(&self) -> Option<Hue> {
        self.hue
    }

    /// Returns the requested saturation.
    #[must_use]
    pub fn saturation(&self) -> Option<Saturation> {
        self.saturation
    }

    /// Returns the requested color temperature.
    #[must_use]
    pub fn color_temp(&self) -> Option<ColorTemp> {
        self.color_temp
    }

    /// Returns the requested mode.
    #[must_use]
    pub fn mode(&self) -> Option<LightMode> {
        self.mode
    }

    /// Returns `true` if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Builds the raw relay payload used to switch a single socket through
/// [`DeviceClient::send_command`](super::DeviceClient::send_command).
///
/// ```
/// use kasa_poller::client::relay_payload;
/// use kasa_poller::types::PowerState;
///
/// assert_eq!(
///     relay_payload(PowerState::On),
///     r#"{"system":{"set_relay_state":{"state":1}}}"#
/// );
/// ```
#[must_use]
pub fn relay_payload(state: PowerState) -> String {
    serde_json::json!({
        "system": { "set_relay_state": { "state": state.as_relay() } }
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_serializes_to_empty_object() {
        let cmd = LightCommand::new();
        assert!(cmd.is_empty());
        assert_eq!(serde_json::to_string(&cmd).unwrap(), "{}");
    }

    #[test]
    fn hue_command_switches_to_color_mode() {
        let cmd = LightCommand::new()
            .with_hue(Hue::new(180).unwrap())
            .with_color_temp(ColorTemp::COLOR_MODE);
        let json: serde_json::Value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["hue"], 180);
        assert_eq!(json["color_temp"], 0);
        assert!(json.get("brightness").is_none());
    }

    #[test]
    fn circadian_off_payload() {
        let cmd = LightCommand::new()
            .with_mode(LightMode::Normal)
            .with_brightness(Brightness::MAX);
        let json: serde_json::Value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["mode"], "normal");
        assert_eq!(json["brightness"], 100);
    }

    #[test]
    fn power_round_trips_through_accessor() {
        let cmd = LightCommand::new()
            .with_power(PowerState::Off)
            .with_transition_period(300);
        assert_eq!(cmd.power(), Some(PowerState::Off));
        assert!(!cmd.is_empty());
    }

    #[test]
    fn relay_off_payload() {
        assert_eq!(
            relay_payload(PowerState::Off),
            r#"{"system":{"set_relay_state":{"state":0}}}"#
        );
    }
}
