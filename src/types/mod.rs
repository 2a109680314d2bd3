// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for device control.
//!
//! Each type checks its value at construction time, so a command built from
//! these types always produces a well-formed request path or body.
//!
//! # Types
//!
//! - [`DeviceAddress`] - Host or `host:port` of a device
//! - [`RelayAction`] - Action segment of `/relay/{action}` (`on`, `off`, ...)
//! - [`RelayId`] - Key of a shared relay state (`relay1`, `pump`, ...)
//! - [`SwitchState`] - ON/OFF status of a relay on a relay board
//! - [`PinId`] - GPIO pin number as used by `/pin/{id}/{on|off}`
//! - [`Direction`] - Motor direction (`forward`, `backward`, `left`, `right`, `stop`)
//! - [`MotorSpeed`] - Motor PWM speed (0-255)

mod address;
mod motor;
mod pin;
mod relay;

pub use address::DeviceAddress;
pub use motor::{Direction, MotorSpeed};
pub use pin::PinId;
pub use relay::{RelayAction, RelayId, SwitchState};

/// Returns `true` if `segment` can be placed in a URL path segment as is.
pub(crate) fn is_path_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
}
