// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared relay state.
//!
//! The [`RelayStateStore`] keeps one boolean per relay under the logical path
//! `relays/{relayId}` and pushes every change to subscribers. The store is
//! the single source of truth: writers call [`RelayStateStore::set`], and
//! every view of the state, including the writer's own, learns about the new
//! value through its subscription. There is no compare-and-swap; concurrent
//! writers race and the last write wins.
//!
//! Backends:
//!
//! - [`MemoryBackend`] - In-process map, shared by everything holding the store
//! - [`MqttBackend`] - Retained messages on an MQTT broker, shared across processes
//!
//! # Examples
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use espdeck::store::RelayStateStore;
//! use espdeck::types::RelayId;
//!
//! # async fn example() -> Result<(), espdeck::error::StoreError> {
//! let store = RelayStateStore::in_memory();
//! let relay = RelayId::new("relay1").unwrap();
//! store.set(&relay, true).await?;
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let _subscription = store
//!     .subscribe(&relay, move |value| sink.lock().unwrap().push(value))
//!     .await?;
//!
//! store.set(&relay, false).await?;
//! assert_eq!(*seen.lock().unwrap(), vec![Some(true), Some(false)]);
//! # Ok(())
//! # }
//! ```

mod memory;
mod mirror;
#[cfg(feature = "mqtt")]
mod mqtt;

pub use memory::MemoryBackend;
pub use mirror::RelayMirror;
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttBackend, MqttStoreConfig};

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::StoreError;
use crate::subscription::{CallbackRegistry, Subscription};
use crate::types::RelayId;

/// Storage behind a [`RelayStateStore`].
///
/// A backend must call [`CallbackRegistry::dispatch`] on its registry once
/// for every change it observes: `Some(value)` for every write (even one
/// that keeps the same value) and `None` when an existing relay is removed.
pub trait StoreBackend: Send + Sync {
    /// Returns the stored value, `None` if the relay has never been set.
    fn get(&self, relay: &RelayId) -> impl Future<Output = Result<Option<bool>, StoreError>> + Send;

    /// Writes a value.
    fn set(&self, relay: &RelayId, value: bool) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes a value.
    fn remove(&self, relay: &RelayId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Returns the registry the backend dispatches changes to.
    fn registry(&self) -> &Arc<CallbackRegistry>;
}

/// Push-based store of relay states.
///
/// Cloning is cheap; clones share the backend.
#[derive(Debug)]
pub struct RelayStateStore<B> {
    backend: Arc<B>,
}

impl RelayStateStore<MemoryBackend> {
    /// Creates a store backed by process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl<B: StoreBackend> RelayStateStore<B> {
    /// Creates a store on top of `backend`.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the current value of a relay.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    pub async fn get(&self, relay: &RelayId) -> Result<Option<bool>, StoreError> {
        self.backend.get(relay).await
    }

    /// Writes a relay value; subscribers are notified by the backend.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails. Nothing is notified then.
    pub async fn set(&self, relay: &RelayId, value: bool) -> Result<(), StoreError> {
        match self.backend.set(relay, value).await {
            Ok(()) => {
                tracing::debug!(path = %relay.store_path(), value, "Relay state written");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(path = %relay.store_path(), value, error = %e, "Relay state write failed");
                Err(e)
            }
        }
    }

    /// Deletes a relay value; subscribers receive `None`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the delete fails.
    pub async fn remove(&self, relay: &RelayId) -> Result<(), StoreError> {
        self.backend.remove(relay).await?;
        tracing::debug!(path = %relay.store_path(), "Relay state removed");
        Ok(())
    }

    /// Follows a relay.
    ///
    /// `on_change` runs once right away with the current value (`None` if
    /// unset), then once for every later change, until the returned guard is
    /// dropped. The callback is registered before the current value is read,
    /// and changes that arrive during the read are held back and delivered
    /// after it, so the last value seen always matches the store. A value
    /// may be delivered twice.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the current value cannot be read; the
    /// callback is not registered then.
    pub async fn subscribe<F>(&self, relay: &RelayId, on_change: F) -> Result<Subscription, StoreError>
    where
        F: Fn(Option<bool>) + Send + Sync + 'static,
    {
        let on_change = Arc::new(on_change);
        let gate = Arc::new(Mutex::new(Some(Vec::new())));

        let callback = Arc::clone(&on_change);
        let held = Arc::clone(&gate);
        let subscription = self.backend.registry().subscribe(relay, move |value| {
            let mut held = held.lock();
            if let Some(pending) = held.as_mut() {
                pending.push(value);
                return;
            }
            drop(held);
            callback(value);
        });

        // Dropping the guard on error unregisters the callback.
        let current = self.backend.get(relay).await?;

        let mut held = gate.lock();
        on_change(current);
        for value in held.take().unwrap_or_default() {
            on_change(value);
        }
        drop(held);

        tracing::debug!(path = %relay.store_path(), id = %subscription.id(), "Relay subscription added");
        Ok(subscription)
    }

    /// Returns the number of live subscriptions for a relay.
    #[must_use]
    pub fn subscriber_count(&self, relay: &RelayId) -> usize {
        self.backend.registry().subscriber_count(relay)
    }
}

impl<B> Clone for RelayStateStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

/// Decodes a stored payload. Empty means removed.
pub(crate) fn decode_value(relay: &RelayId, payload: &[u8]) -> Result<Option<bool>, StoreError> {
    let invalid = || StoreError::InvalidPayload {
        relay_id: relay.to_string(),
        payload: String::from_utf8_lossy(payload).into_owned(),
    };
    let text = std::str::from_utf8(payload).map_err(|_| invalid())?;
    match text.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" | "1" | "on" => Ok(Some(true)),
        "false" | "0" | "off" => Ok(Some(false)),
        _ => Err(invalid()),
    }
}

/// Encodes a value for storage.
pub(crate) const fn encode_value(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
