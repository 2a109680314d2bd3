// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback registry for relay state subscriptions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::types::RelayId;

/// Unique identifier for a subscription.
///
/// IDs are unique within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Callback invoked with the new value of a relay, or `None` on removal.
pub type RelayCallback = Arc<dyn Fn(Option<bool>) + Send + Sync>;

/// Registry of relay callbacks.
///
/// Thread-safe; callbacks are cloned out of the lock before they run, so a
/// callback may subscribe or unsubscribe without deadlocking.
pub struct CallbackRegistry {
    next_id: AtomicU64,
    callbacks: RwLock<HashMap<RelayId, HashMap<SubscriptionId, RelayCallback>>>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            callbacks: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a callback for changes of `relay`.
    ///
    /// The callback stays registered until [`unsubscribe`](Self::unsubscribe)
    /// is called with the returned ID.
    pub fn on_change<F>(&self, relay: &RelayId, callback: F) -> SubscriptionId
    where
        F: Fn(Option<bool>) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.callbacks
            .write()
            .entry(relay.clone())
            .or_default()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback and returns a guard that unregisters it on drop.
    pub fn subscribe<F>(self: &Arc<Self>, relay: &RelayId, callback: F) -> Subscription
    where
        F: Fn(Option<bool>) + Send + Sync + 'static,
    {
        let id = self.on_change(relay, callback);
        Subscription {
            registry: Arc::downgrade(self),
            relay: relay.clone(),
            id,
        }
    }

    /// Removes a callback.
    ///
    /// Returns `true` if the callback was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.callbacks.write();
        let mut removed = false;
        callbacks.retain(|_, subscribers| {
            removed |= subscribers.remove(&id).is_some();
            !subscribers.is_empty()
        });
        removed
    }

    /// Invokes every callback registered for `relay` with `value`.
    ///
    /// Returns the number of callbacks invoked.
    pub fn dispatch(&self, relay: &RelayId, value: Option<bool>) -> usize {
        let subscribers: Vec<RelayCallback> = self
            .callbacks
            .read()
            .get(relay)
            .map(|subscribers| subscribers.values().cloned().collect())
            .unwrap_or_default();

        for callback in &subscribers {
            callback(value);
        }
        subscribers.len()
    }

    /// Returns the number of callbacks registered for `relay`.
    #[must_use]
    pub fn subscriber_count(&self, relay: &RelayId) -> usize {
        self.callbacks.read().get(relay).map_or(0, HashMap::len)
    }

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.callbacks.read().values().map(HashMap::len).sum()
    }

    /// Removes every callback.
    pub fn clear(&self) {
        self.callbacks.write().clear();
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("relays", &self.callbacks.read().len())
            .field("callbacks", &self.callback_count())
            .finish()
    }
}

/// Keeps a callback registered for as long as it is alive.
///
/// Dropping the guard unregisters the callback. A guard that outlives its
/// registry does nothing on drop.
#[derive(Debug)]
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Weak<CallbackRegistry>,
    relay: RelayId,
    id: SubscriptionId,
}

impl Subscription {
    /// Returns the subscription ID.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the relay this subscription follows.
    pub fn relay(&self) -> &RelayId {
        &self.relay
    }

    /// Unregisters the callback now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(self.id);
        }
    }
}
