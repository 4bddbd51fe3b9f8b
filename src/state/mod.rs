// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Observed state tracking for polled devices.
//!
//! - [`ObservedState`] holds what was last pushed to the host
//! - [`StateChange`] is one fresh reading, applied to the observed state to
//!   decide whether it must be pushed

mod device_state;
mod state_change;

pub use device_state::ObservedState;
pub use state_change::StateChange;
