// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Motor drive device.

use parking_lot::RwLock;

use crate::device::Device;
use crate::error::Result;
use crate::protocol::Transport;
use crate::types::{Direction, MotorSpeed};

/// Last acknowledged motor settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MotorState {
    /// Last direction the device accepted; `None` before the first move.
    pub direction: Option<Direction>,
    /// Last speed the device accepted, full speed until changed.
    pub speed: MotorSpeed,
}

/// Drives a two-motor robot through `POST /move` and `POST /speed`.
#[derive(Debug)]
pub struct MotorController<T> {
    device: Device<T>,
    state: RwLock<MotorState>,
}

impl<T: Transport> MotorController<T> {
    /// Creates a controller for `device`.
    #[must_use]
    pub fn new(device: Device<T>) -> Self {
        Self {
            device,
            state: RwLock::new(MotorState::default()),
        }
    }

    /// Returns the motor device.
    #[must_use]
    pub fn device(&self) -> &Device<T> {
        &self.device
    }

    /// Returns the last acknowledged settings.
    #[must_use]
    pub fn state(&self) -> MotorState {
        *self.state.read()
    }

    /// Starts moving in `direction` (or stops for [`Direction::Stop`]).
    ///
    /// # Errors
    ///
    /// Returns the device error; the recorded state is unchanged then.
    pub async fn drive(&self, direction: Direction) -> Result<MotorState> {
        if let Err(e) = self.device.move_motors(direction).await {
            tracing::error!(device = %self.device.name(), %direction, error = %e, "Failed to send motor command");
            return Err(e);
        }
        let mut state = self.state.write();
        state.direction = Some(direction);
        Ok(*state)
    }

    /// Stops both motors.
    ///
    /// # Errors
    ///
    /// Same as [`drive`](Self::drive).
    pub async fn stop(&self) -> Result<MotorState> {
        self.drive(Direction::Stop).await
    }

    /// Sets the motor speed.
    ///
    /// # Errors
    ///
    /// Returns the device error; the recorded state is unchanged then.
    pub async fn set_speed(&self, speed: MotorSpeed) -> Result<MotorState> {
        if let Err(e) = self.device.set_speed(speed).await {
            tracing::error!(device = %self.device.name(), %speed, error = %e, "Failed to set motor speed");
            return Err(e);
        }
        let mut state = self.state.write();
        state.speed = speed;
        Ok(*state)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::{Error, TransportError};
    use crate::protocol::testing::ScriptedTransport;
    use crate::types::DeviceAddress;

    fn controller(transport: &Arc<ScriptedTransport>) -> MotorController<Arc<ScriptedTransport>> {
        MotorController::new(Device::new(
            "Motor",
            DeviceAddress::new("192.168.1.77").unwrap(),
            Arc::clone(transport),
        ))
    }

    #[test]
    fn default_state_is_full_speed_and_idle() {
        let state = MotorState::default();
        assert_eq!(state.speed, MotorSpeed::MAX);
        assert_eq!(state.direction, None);
    }

    #[tokio::test]
    async fn acknowledged_commands_update_state() {
        let transport = Arc::new(ScriptedTransport::new().reply("").reply("").reply(""));
        let motors = controller(&transport);

        motors.drive(Direction::Forward).await.unwrap();
        motors.set_speed(MotorSpeed::new(90)).await.unwrap();
        let state = motors.stop().await.unwrap();

        assert_eq!(state.direction, Some(Direction::Stop));
        assert_eq!(state.speed, MotorSpeed::new(90));
        assert_eq!(
            transport.urls(),
            vec![
                "http://192.168.1.77/move",
                "http://192.168.1.77/speed",
                "http://192.168.1.77/move",
            ]
        );
    }

    #[tokio::test]
    async fn failed_command_keeps_state() {
        let transport = Arc::new(
            ScriptedTransport::new().fail(TransportError::RequestFailed { status: 500 }),
        );
        let motors = controller(&transport);

        let err = motors.set_speed(MotorSpeed::new(10)).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(motors.state(), MotorState::default());
    }
}
