// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device status payloads.
//!
//! A [`DeviceClient`](crate::client::DeviceClient) returns these types. The
//! poller bundles the results of one tick into a [`DeviceStatus`] and turns it
//! into [`StateChange`]s according to the device's model family.
//!
//! # Examples
//!
//! ```
//! use kasa_poller::status::{DeviceStatus, RealtimeMetering, SysInfo};
//! use kasa_poller::state::StateChange;
//! use kasa_poller::types::{ModelFamily, PowerState};
//!
//! let sys_info: SysInfo =
//!     serde_json::from_str(r#"{"deviceId":"A1","model":"KP115(EU)","relay_state":1,"led_off":1}"#)
//!         .unwrap();
//! let status = DeviceStatus::new(sys_info)
//!     .with_realtime(RealtimeMetering::new(42.3, 230.0, 0.18, 12.5));
//!
//! let changes = status.state_changes(ModelFamily::EnergyPlug, None, 2.5).unwrap();
//! assert_eq!(changes[0], StateChange::Power(PowerState::On));
//! assert!(changes.contains(&StateChange::energy_total(12.5, 2.5)));
//! ```

mod metering;
mod sys_info;

pub use metering::RealtimeMetering;
pub use sys_info::{ChildSocket, LightState, SysInfo};

use crate::error::ParseError;
use crate::state::StateChange;
use crate::types::{ColorMode, ModelFamily, PowerState};

/// Everything fetched from a device during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceStatus {
    /// The `get_sysinfo` result.
    pub sys_info: SysInfo,
    /// The `get_realtime` result, for metering devices.
    pub realtime: Option<RealtimeMetering>,
}

impl DeviceStatus {
    /// Creates a status without a meter reading.
    #[must_use]
    pub fn new(sys_info: SysInfo) -> Self {
        Self {
            sys_info,
            realtime: None,
        }
    }

    /// Attaches a meter reading.
    #[must_use]
    pub fn with_realtime(mut self, realtime: RealtimeMetering) -> Self {
        self.realtime = Some(realtime);
        self
    }

    /// Converts the status into one change per tracked metric.
    ///
    /// `child_id` selects a power strip socket. `energy_offset` is
    /// subtracted from the cumulative energy total.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MissingField` if a field the family requires is
    /// absent: `relay_state` for plugs and dimmers, the child entry for a
    /// socket, `light_state` for bulbs.
    pub fn state_changes(
        &self,
        family: ModelFamily,
        child_id: Option<&str>,
        energy_offset: f64,
    ) -> Result<Vec<StateChange>, ParseError> {
        let info = &self.sys_info;
        let mut changes = Vec::new();

        match (family, child_id) {
            (ModelFamily::PowerStrip, Some(id)) => {
                let socket = info
                    .child(id)
                    .ok_or_else(|| ParseError::MissingField(format!("children[{id}]")))?;
                changes.push(StateChange::Power(socket.power_state()));
            }
            (ModelFamily::PowerStrip, None) => {
                // The strip itself has no relay of its own on most firmware.
                if let Some(state) = info.relay_state {
                    changes.push(StateChange::Power(PowerState::from_relay(state)));
                }
                changes.extend(info.led_state().map(StateChange::Led));
            }
            (ModelFamily::Plug | ModelFamily::EnergyPlug | ModelFamily::Dimmer, _) => {
                changes.push(StateChange::Power(info.power_state()?));
                changes.extend(info.led_state().map(StateChange::Led));
                if family == ModelFamily::Dimmer {
                    changes.extend(info.dimmer_brightness().map(StateChange::Brightness));
                }
            }
            (ModelFamily::Bulb | ModelFamily::TunableBulb | ModelFamily::ColorBulb, _) => {
                let light = info
                    .light_state
                    .as_ref()
                    .ok_or_else(|| ParseError::MissingField("light_state".to_string()))?;
                Self::light_changes(family, light, &mut changes);
            }
        }

        if matches!(family, ModelFamily::EnergyPlug | ModelFamily::PowerStrip)
            && let Some(reading) = self.realtime
        {
            changes.push(StateChange::ActivePower(reading.power));
            changes.push(StateChange::Voltage(reading.voltage));
            changes.push(StateChange::Current(reading.current));
            changes.push(StateChange::energy_total(reading.total, energy_offset));
        }

        Ok(changes)
    }

    fn light_changes(family: ModelFamily, light: &LightState, changes: &mut Vec<StateChange>) {
        let power = light.power_state();
        changes.push(StateChange::Power(power));
        if !power.is_on() {
            return;
        }

        changes.extend(light.brightness().map(StateChange::Brightness));

        if matches!(family, ModelFamily::TunableBulb | ModelFamily::ColorBulb)
            && let Some(ct) = light.color_temp()
        {
            let mode = if ct.is_color_mode() {
                ColorMode::Color
            } else {
                ColorMode::Temperature
            };
            changes.push(StateChange::ColorTemp(ct));
            changes.push(StateChange::ColorMode(mode));
        }

        if family == ModelFamily::ColorBulb {
            changes.extend(light.hue().map(StateChange::Hue));
            changes.extend(light.saturation().map(StateChange::Saturation));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Brightness, ColorTemp};

    fn sys_info(json: &str) -> SysInfo {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn plain_plug_pushes_relay_and_led() {
        let status = DeviceStatus::new(sys_info(r#"{"relay_state":0,"led_off":0}"#));
        let changes = status.state_changes(ModelFamily::Plug, None, 0.0).unwrap();
        assert_eq!(
            changes,
            vec![
                StateChange::Power(PowerState::Off),
                StateChange::Led(PowerState::On)
            ]
        );
    }

    #[test]
    fn plug_without_relay_state_is_an_error() {
        let status = DeviceStatus::new(sys_info(r#"{"led_off":0}"#));
        assert!(matches!(
            status.state_changes(ModelFamily::Plug, None, 0.0),
            Err(ParseError::MissingField(_))
        ));
    }

    #[test]
    fn energy_plug_without_reading_skips_metering() {
        let status = DeviceStatus::new(sys_info(r#"{"relay_state":1}"#));
        let changes = status
            .state_changes(ModelFamily::EnergyPlug, None, 0.0)
            .unwrap();
        assert_eq!(changes, vec![StateChange::Power(PowerState::On)]);
    }

    #[test]
    fn dimmer_reports_brightness() {
        let info = sys_info(r#"{"relay_state":1,"led_off":1,"brightness":30}"#);
        let status = DeviceStatus::new(info);
        let changes = status.state_changes(ModelFamily::Dimmer, None, 0.0).unwrap();
        assert!(changes.contains(&StateChange::Brightness(Brightness::clamped(30))));
    }

    #[test]
    fn strip_socket_uses_child_entry_and_has_no_led() {
        let info = sys_info(
            r#"{"led_off":0,"children":[{"id":"AB00","state":0},{"id":"AB01","state":1}]}"#,
        );
        let status =
            DeviceStatus::new(info).with_realtime(RealtimeMetering::new(5.0, 230.0, 0.02, 1.0));
        let changes = status
            .state_changes(ModelFamily::PowerStrip, Some("AB01"), 0.0)
            .unwrap();

        assert_eq!(changes[0], StateChange::Power(PowerState::On));
        assert!(!changes.iter().any(|c| matches!(c, StateChange::Led(_))));
        assert_eq!(changes.len(), 5);
    }

    #[test]
    fn unknown_socket_is_an_error() {
        let status = DeviceStatus::new(sys_info(r#"{"children":[{"id":"AB00","state":0}]}"#));
        assert!(
            status
                .state_changes(ModelFamily::PowerStrip, Some("AB07"), 0.0)
                .is_err()
        );
    }

    #[test]
    fn bulb_that_is_off_pushes_only_power() {
        let status = DeviceStatus::new(sys_info(
            r#"{"light_state":{"on_off":0,"dft_on_state":{"brightness":50,"hue":10}}}"#,
        ));
        let changes = status
            .state_changes(ModelFamily::ColorBulb, None, 0.0)
            .unwrap();
        assert_eq!(changes, vec![StateChange::Power(PowerState::Off)]);
    }

    #[test]
    fn tunable_bulb_in_temperature_mode() {
        let status = DeviceStatus::new(sys_info(
            r#"{"light_state":
                {"on_off":1,"brightness":80,"color_temp":4000,"hue":0,"saturation":0}}"#,
        ));
        let changes = status
            .state_changes(ModelFamily::TunableBulb, None, 0.0)
            .unwrap();
        assert!(changes.contains(&StateChange::ColorTemp(ColorTemp::from_kelvin(4000))));
        assert!(changes.contains(&StateChange::ColorMode(ColorMode::Temperature)));
        assert!(!changes.iter().any(|c| matches!(c, StateChange::Hue(_))));
    }

    #[test]
    fn color_bulb_in_color_mode() {
        let status = DeviceStatus::new(sys_info(
            r#"{"light_state":
                {"on_off":1,"brightness":40,"color_temp":0,"hue":200,"saturation":75}}"#,
        ));
        let changes = status
            .state_changes(ModelFamily::ColorBulb, None, 0.0)
            .unwrap();
        assert!(changes.contains(&StateChange::ColorMode(ColorMode::Color)));
        assert_eq!(changes.len(), 6);
    }

    #[test]
    fn dimmable_bulb_has_no_color() {
        let status = DeviceStatus::new(sys_info(
            r#"{"light_state":{"on_off":1,"brightness":40,"color_temp":2700}}"#,
        ));
        let changes = status.state_changes(ModelFamily::Bulb, None, 0.0).unwrap();
        assert_eq!(
            changes,
            vec![
                StateChange::Power(PowerState::On),
                StateChange::Brightness(Brightness::clamped(40))
            ]
        );
    }
}
