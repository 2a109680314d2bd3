// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Multi-device panels.
//!
//! - [`DeviceRegistry`] - A fixed set of named relay devices, one of which may
//!   get its address from a bootstrap device
//! - [`RelayBoard`] - One device driving several named relays, with per-relay
//!   status tracked from device acknowledgements
//! - [`MotorController`] - Direction and speed of a motor drive device
//!
//! # Examples
//!
//! ```no_run
//! use espdeck::Device;
//! use espdeck::manager::DeviceRegistry;
//! use espdeck::protocol::HttpTransport;
//! use espdeck::types::{DeviceAddress, RelayAction};
//!
//! # async fn example() -> espdeck::Result<()> {
//! let transport = HttpTransport::new()?;
//! let registry = DeviceRegistry::new(transport.clone())
//!     .with_discovered("Device 1", DeviceAddress::new("192.168.1.184")?)
//!     .with_device("Device 2", DeviceAddress::new("192.168.1.23")?);
//!
//! registry.resolve_pending().await?;
//! registry.relay("Device 1", RelayAction::On).await?;
//! println!("{:?}", registry.message());
//! # Ok(())
//! # }
//! ```

mod board;
mod motor;
mod registry;

pub use board::{BoardError, RelayBoard, RelayStatus, TOGGLE_FAILED_MESSAGE};
pub use motor::{MotorController, MotorState};
pub use registry::DeviceRegistry;
