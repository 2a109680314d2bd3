// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-relay change subscriptions.
//!
//! - [`SubscriptionId`] - Unique identifier of one registered callback
//! - [`CallbackRegistry`] - Callbacks keyed by relay, dispatched on every change
//! - [`Subscription`] - Guard that unregisters its callback when dropped
//!
//! Callbacks receive `Some(value)` when a relay is set and `None` when it is
//! removed from the store.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use espdeck::subscription::CallbackRegistry;
//! use espdeck::types::RelayId;
//!
//! let registry = Arc::new(CallbackRegistry::new());
//! let relay = RelayId::new("relay1").unwrap();
//!
//! let subscription = registry.subscribe(&relay, |value| println!("relay1 = {value:?}"));
//! registry.dispatch(&relay, Some(true));
//!
//! drop(subscription);
//! assert_eq!(registry.subscriber_count(&relay), 0);
//! ```

mod callback;

pub use callback::{CallbackRegistry, RelayCallback, Subscription, SubscriptionId};
