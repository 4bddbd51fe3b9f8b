// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for Kasa device state.
//!
//! Each type keeps the device's native unit and knows how to convert to the
//! fraction the host platform displays.
//!
//! # Types
//!
//! - [`PowerState`] - Relay, socket or LED on/off
//! - [`Brightness`] - Brightness level (0-100%)
//! - [`Hue`], [`Saturation`] - Bulb color
//! - [`ColorTemp`], [`KelvinRange`] - Bulb color temperature in Kelvin
//! - [`LightMode`], [`ColorMode`] - Bulb modes
//! - [`ModelFamily`] - Group of models sharing a status layout

mod color;
mod dimmer;
mod mode;
mod model;
mod power;

pub(crate) use color::round2;
pub use color::{ColorTemp, Hue, KelvinRange, Saturation};
pub use dimmer::Brightness;
pub use mode::{ColorMode, LightMode};
pub use model::ModelFamily;
pub use power::PowerState;
