// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relay and pin switching commands.

use crate::command::{Command, on_off};
use crate::types::{PinId, RelayAction, RelayId};

/// Switches the relay of a single-relay device, `GET /relay/{action}`.
///
/// # Examples
///
/// ```
/// use espdeck::command::{Command, RelayCommand};
/// use espdeck::types::RelayAction;
///
/// assert_eq!(RelayCommand::on().path(), "/relay/on");
/// assert_eq!(RelayCommand::new(RelayAction::Other("toggle".into())).path(), "/relay/toggle");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayCommand {
    action: RelayAction,
}

impl RelayCommand {
    /// Creates a relay command for the given action.
    #[must_use]
    pub const fn new(action: RelayAction) -> Self {
        Self { action }
    }

    /// Creates a command to switch the relay on.
    #[must_use]
    pub const fn on() -> Self {
        Self::new(RelayAction::On)
    }

    /// Creates a command to switch the relay off.
    #[must_use]
    pub const fn off() -> Self {
        Self::new(RelayAction::Off)
    }

    /// Returns the action.
    #[must_use]
    pub fn action(&self) -> &RelayAction {
        &self.action
    }
}

impl Command for RelayCommand {
    fn path(&self) -> String {
        format!("/relay/{}", self.action)
    }
}

/// Switches one named relay of a relay board, `GET /{relay}/{on|off}`.
///
/// # Examples
///
/// ```
/// use espdeck::command::{BoardRelayCommand, Command};
/// use espdeck::types::RelayId;
///
/// let cmd = BoardRelayCommand::new(RelayId::new("relay3").unwrap(), true);
/// assert_eq!(cmd.path(), "/relay3/on");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRelayCommand {
    relay: RelayId,
    on: bool,
}

impl BoardRelayCommand {
    /// Creates a board relay command.
    #[must_use]
    pub const fn new(relay: RelayId, on: bool) -> Self {
        Self { relay, on }
    }

    /// Returns the relay name.
    #[must_use]
    pub fn relay(&self) -> &RelayId {
        &self.relay
    }

    /// Returns `true` if the command switches the relay on.
    #[must_use]
    pub const fn is_on(&self) -> bool {
        self.on
    }
}

impl Command for BoardRelayCommand {
    fn path(&self) -> String {
        format!("/{}/{}", self.relay, on_off(self.on))
    }
}

/// Drives a GPIO pin, `GET /pin/{id}/{on|off}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinCommand {
    pin: PinId,
    on: bool,
}

impl PinCommand {
    /// Creates a pin command.
    #[must_use]
    pub const fn new(pin: PinId, on: bool) -> Self {
        Self { pin, on }
    }

    /// Returns the pin.
    #[must_use]
    pub const fn pin(&self) -> PinId {
        self.pin
    }
}

impl Command for PinCommand {
    fn path(&self) -> String {
        format!("/pin/{}/{}", self.pin, on_off(self.on))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_paths() {
        assert_eq!(RelayCommand::on().path(), "/relay/on");
        assert_eq!(RelayCommand::off().path(), "/relay/off");
    }

    #[test]
    fn board_relay_path_off() {
        let cmd = BoardRelayCommand::new(RelayId::new("relay1").unwrap(), false);
        assert_eq!(cmd.path(), "/relay1/off");
        assert!(!cmd.is_on());
    }

    #[test]
    fn pin_path_on() {
        assert_eq!(PinCommand::new(PinId::new(4), true).path(), "/pin/4/on");
    }
}
