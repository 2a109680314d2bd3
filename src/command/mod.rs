// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device command definitions.
//!
//! Each command knows the HTTP method, path and optional JSON body of one
//! endpoint of the device firmware.
//!
//! # Available Commands
//!
//! | Command Type | Request | Purpose |
//! |-------------|---------|---------|
//! | [`RelayCommand`] | `GET /relay/{action}` | Switch the relay of a single-relay device |
//! | [`BoardRelayCommand`] | `GET /{relay}/{on\|off}` | Switch one relay of a relay board |
//! | [`PinCommand`] | `GET /pin/{id}/{on\|off}` | Drive a GPIO pin |
//! | [`StatusQuery`] | `GET /status` | Read all pin and sensor values |
//! | [`AddressQuery`] | `GET /ip` | Ask a bootstrap device for another device's address |
//! | [`MoveCommand`] | `POST /move` | Drive the motors in a direction |
//! | [`SpeedCommand`] | `POST /speed` | Set the motor speed |
//!
//! # Examples
//!
//! ```
//! use espdeck::command::{Command, Method, PinCommand, RelayCommand};
//! use espdeck::types::{PinId, RelayAction};
//!
//! let relay = RelayCommand::new(RelayAction::On);
//! assert_eq!(relay.method(), Method::Get);
//! assert_eq!(relay.path(), "/relay/on");
//!
//! let pin = PinCommand::new(PinId::new(13), false);
//! assert_eq!(pin.path(), "/pin/13/off");
//! ```

mod motor;
mod query;
mod relay;

pub use motor::{MoveCommand, SpeedCommand};
pub use query::{AddressQuery, StatusQuery};
pub use relay::{BoardRelayCommand, PinCommand, RelayCommand};

use std::fmt;

/// HTTP method used by a device endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST` with a JSON body.
    Post,
}

impl Method {
    /// Returns the method name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request that can be sent to a device.
pub trait Command {
    /// Returns the HTTP method of the endpoint.
    fn method(&self) -> Method {
        Method::Get
    }

    /// Returns the request path, starting with `/`.
    fn path(&self) -> String;

    /// Returns the JSON body, if the endpoint takes one.
    fn body(&self) -> Option<serde_json::Value> {
        None
    }
}

/// Returns `"on"` or `"off"`.
pub(crate) const fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}
