// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for the `system.get_sysinfo` payload.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::types::{Brightness, ColorTemp, Hue, LightMode, PowerState, Saturation};

/// System information reported by a device.
///
/// Only the fields the poller uses are kept; unknown fields are ignored.
///
/// # Examples
///
/// ```
/// use kasa_poller::status::SysInfo;
///
/// let json = r#"{"deviceId":"8006AB","model":"HS110(EU)","relay_state":1,"led_off":0}"#;
/// let info: SysInfo = serde_json::from_str(json).unwrap();
///
/// assert_eq!(info.device_id, "8006AB");
/// assert_eq!(info.relay_state, Some(1));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SysInfo {
    /// Stable vendor identity of the device.
    #[serde(rename = "deviceId", alias = "device_id", default)]
    pub device_id: String,

    /// Model string, for example `HS300(US)`.
    #[serde(default)]
    pub model: String,

    /// User-assigned name.
    #[serde(default)]
    pub alias: Option<String>,

    /// MAC address (`mac` on plugs, `mic_mac` on bulbs).
    #[serde(alias = "mic_mac", default)]
    pub mac: Option<String>,

    /// Relay state of single-relay plugs and switches.
    #[serde(default)]
    pub relay_state: Option<u8>,

    /// Inverted LED flag (`0` means the LED is on).
    #[serde(default)]
    pub led_off: Option<u8>,

    /// Brightness of dimmer switches.
    #[serde(default)]
    pub brightness: Option<u8>,

    /// Sockets of a power strip.
    #[serde(default)]
    pub children: Vec<ChildSocket>,

    /// Light state of bulbs.
    #[serde(default)]
    pub light_state: Option<LightState>,

    /// Vendor error code, `0` on success.
    #[serde(default)]
    pub err_code: i64,
}

impl SysInfo {
    /// Parses a full `{"system":{"get_sysinfo":{...}}}` response.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` for invalid JSON,
    /// `ParseError::MissingField` if the envelope is incomplete, and
    /// `ParseError::DeviceError` if the device reported a non-zero error
    /// code.
    pub fn from_response(body: &str) -> Result<Self, ParseError> {
        let mut value: serde_json::Value = serde_json::from_str(body)?;
        let info = value
            .get_mut("system")
            .and_then(|system| system.get_mut("get_sysinfo"))
            .map(serde_json::Value::take)
            .ok_or_else(|| ParseError::MissingField("system.get_sysinfo".to_string()))?;

        let info: Self = serde_json::from_value(info)?;
        if info.err_code != 0 {
            return Err(ParseError::DeviceError {
                code: info.err_code,
                message: "get_sysinfo failed".to_string(),
            });
        }
        Ok(info)
    }

    /// Finds a child socket by id.
    ///
    /// Power strips report full ids (device id followed by a two digit
    /// index); a two character id matches by suffix.
    #[must_use]
    pub fn child(&self, id: &str) -> Option<&ChildSocket> {
        self.children
            .iter()
            .find(|c| c.id == id)
            .or_else(|| {
                if id.len() <= 2 {
                    self.children.iter().find(|c| c.id.ends_with(id))
                } else {
                    None
                }
            })
    }

    /// Returns the relay state of a single-relay device.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MissingField` if `relay_state` is absent.
    pub fn power_state(&self) -> Result<PowerState, ParseError> {
        self.relay_state
            .map(PowerState::from_relay)
            .ok_or_else(|| ParseError::MissingField("relay_state".to_string()))
    }

    /// Returns the status LED state, if reported.
    #[must_use]
    pub fn led_state(&self) -> Option<PowerState> {
        self.led_off.map(PowerState::from_led_off)
    }

    /// Returns the dimmer brightness, if reported.
    #[must_use]
    pub fn dimmer_brightness(&self) -> Option<Brightness> {
        self.brightness.map(Brightness::clamped)
    }
}

/// One socket of a power strip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSocket {
    /// Socket id.
    pub id: String,

    /// Relay state of the socket.
    #[serde(default)]
    pub state: u8,

    /// User-assigned name.
    #[serde(default)]
    pub alias: Option<String>,
}

impl ChildSocket {
    /// Returns the socket's power state.
    #[must_use]
    pub fn power_state(&self) -> PowerState {
        PowerState::from_relay(self.state)
    }
}

/// Light state of a bulb.
///
/// While the bulb is off, the device moves its color settings into
/// `dft_on_state` and only reports `on_off` at the top level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightState {
    /// `1` if the bulb is on.
    #[serde(default)]
    pub on_off: u8,

    /// Brightness in percent.
    #[serde(default)]
    pub brightness: Option<u8>,

    /// Hue in degrees.
    #[serde(default)]
    pub hue: Option<u16>,

    /// Saturation in percent.
    #[serde(default)]
    pub saturation: Option<u8>,

    /// Color temperature in Kelvin, `0` in color mode.
    #[serde(default)]
    pub color_temp: Option<u16>,

    /// Normal or circadian.
    #[serde(default)]
    pub mode: Option<LightMode>,

    /// Settings restored when the bulb turns on again.
    #[serde(default)]
    pub dft_on_state: Option<Box<LightState>>,
}

impl LightState {
    /// Returns the bulb power state.
    #[must_use]
    pub fn power_state(&self) -> PowerState {
        PowerState::from_relay(self.on_off)
    }

    /// Returns the brightness, clamped to 0-100.
    #[must_use]
    pub fn brightness(&self) -> Option<Brightness> {
        self.brightness.map(Brightness::clamped)
    }

    /// Returns the hue, if in range.
    #[must_use]
    pub fn hue(&self) -> Option<Hue> {
        self.hue.and_then(|h| Hue::new(h).ok())
    }

    /// Returns the saturation, if in range.
    #[must_use]
    pub fn saturation(&self) -> Option<Saturation> {
        self.saturation.and_then(|s| Saturation::new(s).ok())
    }

    /// Returns the color temperature.
    #[must_use]
    pub fn color_temp(&self) -> Option<ColorTemp> {
        self.color_temp.map(ColorTemp::from_kelvin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRIP: &str = r#"{
        "system": {"get_sysinfo": {
            "deviceId": "8006A1B2",
            "model": "HS300(US)",
            "alias": "Desk strip",
            "mac": "50:C7:BF:00:00:01",
            "led_off": 0,
            "children": [
                {"id": "8006A1B200", "state": 1, "alias": "Monitor"},
                {"id": "8006A1B201", "state": 0, "alias": "Lamp"}
            ],
            "err_code": 0
        }}
    }"#;

    #[test]
    fn parses_envelope() {
        let info = SysInfo::from_response(STRIP).unwrap();
        assert_eq!(info.device_id, "8006A1B2");
        assert_eq!(info.children.len(), 2);
        assert_eq!(info.led_state(), Some(PowerState::On));
    }

    #[test]
    fn child_lookup_by_full_id_and_suffix() {
        let info = SysInfo::from_response(STRIP).unwrap();
        assert_eq!(info.child("8006A1B200").unwrap().alias.as_deref(), Some("Monitor"));
        assert_eq!(info.child("01").unwrap().power_state(), PowerState::Off);
        assert!(info.child("8006A1B209").is_none());
    }

    #[test]
    fn missing_envelope_is_reported() {
        let err = SysInfo::from_response(r#"{"emeter":{}}"#).unwrap_err();
        assert!(matches!(err, ParseError::MissingField(_)));
    }

    #[test]
    fn error_code_is_reported() {
        let body = r#"{"system":{"get_sysinfo":{"err_code":-1}}}"#;
        assert!(matches!(
            SysInfo::from_response(body),
            Err(ParseError::DeviceError { code: -1, .. })
        ));
    }

    #[test]
    fn relay_state_is_required_for_power() {
        let info = SysInfo::default();
        assert!(matches!(info.power_state(), Err(ParseError::MissingField(_))));
    }

    #[test]
    fn bulb_light_state() {
        let json = r#"{
            "deviceId": "BULB1", "model": "KL130(EU)", "mic_mac": "AA",
            "light_state": {"on_off": 1, "mode": "normal", "hue": 120,
                            "saturation": 80, "color_temp": 0, "brightness": 64}
        }"#;
        let info: SysInfo = serde_json::from_str(json).unwrap();
        let light = info.light_state.unwrap();
        assert_eq!(info.mac.as_deref(), Some("AA"));
        assert_eq!(light.power_state(), PowerState::On);
        assert_eq!(light.hue().unwrap().value(), 120);
        assert!(light.color_temp().unwrap().is_color_mode());
        assert_eq!(light.mode, Some(LightMode::Normal));
    }
}
