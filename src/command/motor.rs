// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Motor control commands.

use crate::command::{Command, Method};
use crate::types::{Direction, MotorSpeed};

/// Drives the motors, `POST /move` with `{"direction": "..."}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveCommand {
    direction: Direction,
}

impl MoveCommand {
    /// Creates a move command.
    #[must_use]
    pub const fn new(direction: Direction) -> Self {
        Self { direction }
    }

    /// Creates a command that stops both motors.
    #[must_use]
    pub const fn stop() -> Self {
        Self::new(Direction::Stop)
    }

    /// Returns the direction.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }
}

impl Command for MoveCommand {
    fn method(&self) -> Method {
        Method::Post
    }

    fn path(&self) -> String {
        "/move".to_string()
    }

    fn body(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({ "direction": self.direction }))
    }
}

/// Sets the motor speed, `POST /speed` with `{"speed": 0..255}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedCommand {
    speed: MotorSpeed,
}

impl SpeedCommand {
    /// Creates a speed command.
    #[must_use]
    pub const fn new(speed: MotorSpeed) -> Self {
        Self { speed }
    }

    /// Returns the speed.
    #[must_use]
    pub const fn speed(&self) -> MotorSpeed {
        self.speed
    }
}

impl Command for SpeedCommand {
    fn method(&self) -> Method {
        Method::Post
    }

    fn path(&self) -> String {
        "/speed".to_string()
    }

    fn body(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({ "speed": self.speed }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_command() {
        let cmd = MoveCommand::stop();
        assert_eq!(cmd.path(), "/move");
        assert_eq!(cmd.body(), Some(serde_json::json!({ "direction": "stop" })));
    }

    #[test]
    fn speed_body_uses_number() {
        let cmd = SpeedCommand::new(MotorSpeed::MAX);
        assert_eq!(cmd.path(), "/speed");
        assert_eq!(cmd.body(), Some(serde_json::json!({ "speed": 255 })));
    }
}
