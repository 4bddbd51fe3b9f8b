// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for `emeter.get_realtime` readings.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Realtime energy meter reading in base units.
///
/// Older firmware reports `power`/`voltage`/`current`/`total` in W, V, A and
/// kWh; newer firmware reports `power_mw`/`voltage_mv`/`current_ma`/
/// `total_wh`. Both layouts deserialize into this type.
///
/// # Examples
///
/// ```
/// use kasa_poller::status::RealtimeMetering;
///
/// let v1: RealtimeMetering = serde_json::from_str(
///     r#"{"power":42.3,"voltage":230.1,"current":0.19,"total":1.5}"#,
/// )
/// .unwrap();
/// let v2: RealtimeMetering = serde_json::from_str(
///     r#"{"power_mw":42300,"voltage_mv":230100,"current_ma":190,"total_wh":1500}"#,
/// )
/// .unwrap();
///
/// assert!((v1.power - v2.power).abs() < 1e-9);
/// assert!((v1.total - v2.total).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRealtime")]
pub struct RealtimeMetering {
    /// Instantaneous power in Watts.
    pub power: f64,
    /// Voltage in Volts.
    pub voltage: f64,
    /// Current in Amperes.
    pub current: f64,
    /// Cumulative energy in kWh.
    pub total: f64,
}

impl RealtimeMetering {
    /// Creates a reading from base units.
    #[must_use]
    pub const fn new(power: f64, voltage: f64, current: f64, total: f64) -> Self {
        Self {
            power,
            voltage,
            current,
            total,
        }
    }

    /// Parses a full `{"emeter":{"get_realtime":{...}}}` response.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the JSON is invalid, the envelope is
    /// incomplete or the device reported an error code.
    pub fn from_response(body: &str) -> Result<Self, ParseError> {
        let mut value: serde_json::Value = serde_json::from_str(body)?;
        let realtime = value
            .get_mut("emeter")
            .and_then(|emeter| emeter.get_mut("get_realtime"))
            .map(serde_json::Value::take)
            .ok_or_else(|| ParseError::MissingField("emeter.get_realtime".to_string()))?;

        let code = realtime
            .get("err_code")
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(0);
        if code != 0 {
            return Err(ParseError::DeviceError {
                code,
                message: "get_realtime failed".to_string(),
            });
        }

        Ok(serde_json::from_value(realtime)?)
    }
}

/// Wire layout with both unit conventions.
#[derive(Debug, Default, Deserialize)]
struct RawRealtime {
    power: Option<f64>,
    power_mw: Option<f64>,
    voltage: Option<f64>,
    voltage_mv: Option<f64>,
    current: Option<f64>,
    current_ma: Option<f64>,
    total: Option<f64>,
    total_wh: Option<f64>,
}

fn pick(base: Option<f64>, milli: Option<f64>, field: &str) -> Result<f64, String> {
    base.or_else(|| milli.map(|v| v / 1000.0))
        .ok_or_else(|| format!("missing field in realtime reading: {field}"))
}

impl TryFrom<RawRealtime> for RealtimeMetering {
    type Error = String;

    fn try_from(raw: RawRealtime) -> Result<Self, Self::Error> {
        Ok(Self {
            power: pick(raw.power, raw.power_mw, "power")?,
            voltage: pick(raw.voltage, raw.voltage_mv, "voltage")?,
            current: pick(raw.current, raw.current_ma, "current")?,
            total: pick(raw.total, raw.total_wh, "total")?,
        })
    }
}
