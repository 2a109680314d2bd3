// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `espdeck` - Device communication for an ESP32 dashboard.
//!
//! This library talks to small network-attached controllers over plain HTTP
//! and keeps shared relay state consistent between several dashboard clients.
//!
//! # Supported Features
//!
//! - **Relay control**: Forward `on`/`off` actions to `http://{device}/relay/{action}`
//! - **Discovery**: Resolve a device address through a bootstrap device's `/ip`
//! - **Sensor polling**: Poll `/status` at a fixed interval into a bounded history
//! - **Relay boards and motors**: Acknowledged relay status, motor direction and speed
//! - **Shared state**: A relay state store with push subscriptions, in memory or over MQTT
//! - **Service**: An HTTP and WebSocket boundary for browser clients (feature `server`)
//!
//! # Quick Start
//!
//! ## Forward a relay action
//!
//! ```no_run
//! use espdeck::protocol::HttpTransport;
//! use espdeck::proxy::RelayProxy;
//!
//! #[tokio::main]
//! async fn main() -> espdeck::Result<()> {
//!     let proxy = RelayProxy::new(HttpTransport::new()?);
//!     match proxy.forward(Some("192.168.1.50"), Some("on")).await {
//!         Ok(reply) => println!("{}", reply.message),
//!         Err(e) => eprintln!("{e}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Discover a device, then switch it
//!
//! ```no_run
//! use espdeck::Device;
//! use espdeck::discovery::DeviceDiscovery;
//! use espdeck::protocol::HttpTransport;
//! use espdeck::types::{DeviceAddress, RelayAction};
//!
//! #[tokio::main]
//! async fn main() -> espdeck::Result<()> {
//!     let transport = HttpTransport::new()?;
//!     let device = Device::unresolved("Device 1", transport.clone());
//!
//!     DeviceDiscovery::new(transport)
//!         .resolve_into(&DeviceAddress::new("192.168.1.184")?, &device)
//!         .await?;
//!
//!     device.relay(RelayAction::On).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Share relay state
//!
//! ```
//! use espdeck::store::RelayStateStore;
//! use espdeck::types::RelayId;
//!
//! # async fn example() -> espdeck::Result<()> {
//! let store = RelayStateStore::in_memory();
//! let relay = RelayId::new("relay1")?;
//!
//! let _subscription = store
//!     .subscribe(&relay, |value| println!("relay1 is now {value:?}"))
//!     .await?;
//! store.set(&relay, true).await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod device;
pub mod discovery;
pub mod error;
pub mod event;
pub mod manager;
pub mod protocol;
pub mod proxy;
#[cfg(feature = "server")]
pub mod server;
pub mod store;
pub mod subscription;
pub mod telemetry;
pub mod types;

pub use command::Command;
pub use config::AppConfig;
pub use device::{Device, DeviceBuilder, DeviceInfo};
pub use error::{
    DiscoveryError, Error, ParseError, PollError, Result, StoreError, TransportError, ValueError,
};
pub use protocol::{HttpConfig, HttpTransport, Transport};
pub use proxy::{ProxyError, ProxyReply, RelayProxy};
pub use store::{MemoryBackend, RelayStateStore, StoreBackend};
pub use subscription::{CallbackRegistry, Subscription, SubscriptionId};
pub use telemetry::{PinHistory, PollResult, SensorPoller};
pub use types::{DeviceAddress, Direction, MotorSpeed, PinId, RelayAction, RelayId, SwitchState};
