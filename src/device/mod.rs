// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Named device handles.
//!
//! A [`Device`] couples a display name, an address that may not be known
//! yet, and a [`Transport`]. Every operation on an unresolved device fails
//! with [`Error::DeviceNotResolved`] before any request is made, which is
//! how callers keep actions disabled until discovery completes.
//!
//! # Examples
//!
//! ```no_run
//! use espdeck::Device;
//! use espdeck::types::RelayAction;
//!
//! # async fn example() -> espdeck::Result<()> {
//! let device = Device::http("Device 2").with_address("192.168.1.23").build()?;
//! let body = device.relay(RelayAction::On).await?;
//! println!("{body}");
//! # Ok(())
//! # }
//! ```

mod builder;

pub use builder::DeviceBuilder;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::command::{BoardRelayCommand, Command, MoveCommand, PinCommand, RelayCommand, SpeedCommand, StatusQuery};
use crate::error::{Error, Result};
use crate::protocol::{HttpTransport, Transport};
use crate::telemetry::PollResult;
use crate::types::{DeviceAddress, Direction, MotorSpeed, PinId, RelayAction, RelayId};

/// A named device reachable through a transport.
///
/// Clones share the address slot, so resolving the address through one
/// clone makes it visible to all of them.
#[derive(Debug)]
pub struct Device<T> {
    name: String,
    address: Arc<RwLock<Option<DeviceAddress>>>,
    transport: T,
}

impl<T: Transport> Device<T> {
    /// Creates a device with a known address.
    #[must_use]
    pub fn new(name: impl Into<String>, address: DeviceAddress, transport: T) -> Self {
        Self::with_slot(name, Some(address), transport)
    }

    /// Creates a device whose address is not known yet.
    #[must_use]
    pub fn unresolved(name: impl Into<String>, transport: T) -> Self {
        Self::with_slot(name, None, transport)
    }

    fn with_slot(name: impl Into<String>, address: Option<DeviceAddress>, transport: T) -> Self {
        Self {
            name: name.into(),
            address: Arc::new(RwLock::new(address)),
            transport,
        }
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the address, if resolved.
    #[must_use]
    pub fn address(&self) -> Option<DeviceAddress> {
        self.address.read().clone()
    }

    /// Returns `true` once the address is known.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.address.read().is_some()
    }

    /// Sets the address.
    pub fn set_address(&self, address: DeviceAddress) {
        tracing::info!(device = %self.name, %address, "Device address set");
        *self.address.write() = Some(address);
    }

    /// Forgets the address, making the device unresolved.
    pub fn clear_address(&self) {
        *self.address.write() = None;
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a serializable description of the device.
    #[must_use]
    pub fn info(&self) -> DeviceInfo {
        let address = self.address();
        DeviceInfo {
            name: self.name.clone(),
            resolved: address.is_some(),
            address,
        }
    }

    /// Sends a command and returns the raw body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotResolved`] without sending anything if the
    /// address is unknown, or [`Error::Transport`] if the request fails.
    pub async fn send_command<C: Command + Sync + ?Sized>(&self, command: &C) -> Result<String> {
        let address = self.require_address()?;
        tracing::debug!(device = %self.name, path = %command.path(), "Sending device command");
        let response = self.transport.send_command(&address, command).await?;
        Ok(response.into_body())
    }

    /// Switches the device relay, `GET /relay/{action}`.
    ///
    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub async fn relay(&self, action: RelayAction) -> Result<String> {
        self.send_command(&RelayCommand::new(action)).await
    }

    /// Switches one relay of a relay board, `GET /{relay}/{on|off}`.
    ///
    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub async fn switch_board_relay(&self, relay: RelayId, on: bool) -> Result<String> {
        self.send_command(&BoardRelayCommand::new(relay, on)).await
    }

    /// Drives a GPIO pin, `GET /pin/{pin}/{on|off}`.
    ///
    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub async fn set_pin(&self, pin: PinId, on: bool) -> Result<()> {
        self.send_command(&PinCommand::new(pin, on)).await?;
        Ok(())
    }

    /// Reads every pin and sensor, `GET /status`.
    ///
    /// # Errors
    ///
    /// Same as [`send_command`](Self::send_command), plus [`Error::Parse`]
    /// if the body is not a flat JSON object of numbers.
    pub async fn status(&self) -> Result<PollResult> {
        let body = self.send_command(&StatusQuery).await?;
        Ok(PollResult::parse(&body)?)
    }

    /// Drives the motors, `POST /move`.
    ///
    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub async fn move_motors(&self, direction: Direction) -> Result<()> {
        self.send_command(&MoveCommand::new(direction)).await?;
        Ok(())
    }

    /// Sets the motor speed, `POST /speed`.
    ///
    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub async fn set_speed(&self, speed: MotorSpeed) -> Result<()> {
        self.send_command(&SpeedCommand::new(speed)).await?;
        Ok(())
    }

    fn require_address(&self) -> Result<DeviceAddress> {
        self.address()
            .ok_or_else(|| Error::DeviceNotResolved(self.name.clone()))
    }
}

impl Device<HttpTransport> {
    /// Starts building a device that talks plain HTTP.
    #[must_use]
    pub fn http(name: impl Into<String>) -> DeviceBuilder {
        DeviceBuilder::new(name)
    }
}

impl<T: Clone> Clone for Device<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            address: Arc::clone(&self.address),
            transport: self.transport.clone(),
        }
    }
}

/// Serializable description of a device.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeviceInfo {
    /// Display name.
    pub name: String,
    /// Address, if resolved.
    pub address: Option<DeviceAddress>,
    /// Whether commands can be sent.
    pub resolved: bool,
}
