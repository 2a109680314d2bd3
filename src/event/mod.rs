// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast events for pollers and device discovery.
//!
//! The [`EventBus`] uses tokio's broadcast channel so that any number of
//! observers (log sinks, websocket pushes, tests) can follow what background
//! tasks are doing without holding a reference to them.
//!
//! # Examples
//!
//! ```
//! use espdeck::event::{EventBus, PollEvent};
//! use espdeck::telemetry::PollResult;
//!
//! let bus: EventBus<PollEvent> = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(PollEvent::updated(PollResult::default()));
//! assert!(rx.try_recv().unwrap().is_update());
//! ```

mod event_bus;
mod kinds;

pub use event_bus::EventBus;
pub use kinds::{DeviceEvent, PollEvent};
