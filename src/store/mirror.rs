// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Local cache of relay states fed by store notifications.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{RelayStateStore, StoreBackend};
use crate::error::StoreError;
use crate::subscription::Subscription;
use crate::types::RelayId;

/// A client-side view of a set of relays.
///
/// Values change only when the store notifies a change. [`request`] writes
/// to the store and leaves the cached value alone, so a failed write never
/// shows up as a state the store does not hold.
///
/// [`request`]: RelayMirror::request
#[derive(Debug)]
pub struct RelayMirror<B> {
    store: RelayStateStore<B>,
    values: Arc<RwLock<BTreeMap<RelayId, Option<bool>>>>,
    subscriptions: Vec<Subscription>,
}

impl<B: StoreBackend> RelayMirror<B> {
    /// Follows `relays` in `store`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if a current value cannot be read. Subscriptions
    /// made so far are released.
    pub async fn follow(
        store: RelayStateStore<B>,
        relays: impl IntoIterator<Item = RelayId>,
    ) -> Result<Self, StoreError> {
        let values = Arc::new(RwLock::new(BTreeMap::new()));
        let mut subscriptions = Vec::new();

        for relay in relays {
            let slot = Arc::clone(&values);
            let key = relay.clone();
            let subscription = store
                .subscribe(&relay, move |value| {
                    slot.write().insert(key.clone(), value);
                })
                .await?;
            subscriptions.push(subscription);
        }

        Ok(Self {
            store,
            values,
            subscriptions,
        })
    }

    /// Returns the last value notified for `relay`.
    #[must_use]
    pub fn value(&self, relay: &RelayId) -> Option<bool> {
        self.values.read().get(relay).copied().flatten()
    }

    /// Returns every followed relay and its last notified value.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<RelayId, Option<bool>> {
        self.values.read().clone()
    }

    /// Returns the number of followed relays.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns `true` if no relay is followed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Asks the store to set `relay` to `value`.
    ///
    /// # Errors
    ///
    /// Returns the store error; the cached value is unchanged.
    pub async fn request(&self, relay: &RelayId, value: bool) -> Result<(), StoreError> {
        self.store.set(relay, value).await
    }

    /// Asks the store to flip `relay`, treating an unset relay as off.
    ///
    /// # Errors
    ///
    /// Returns the store error; the cached value is unchanged.
    pub async fn toggle(&self, relay: &RelayId) -> Result<bool, StoreError> {
        let next = !self.value(relay).unwrap_or(false);
        self.request(relay, next).await?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::subscription::CallbackRegistry;

    fn relay(id: &str) -> RelayId {
        RelayId::new(id).unwrap()
    }

    /// Backend whose writes can be made to fail.
    #[derive(Default)]
    struct FlakyBackend {
        inner: crate::store::MemoryBackend,
        failing: AtomicBool,
    }

    impl StoreBackend for FlakyBackend {
        async fn get(&self, relay: &RelayId) -> Result<Option<bool>, StoreError> {
            self.inner.get(relay).await
        }

        async fn set(&self, relay: &RelayId, value: bool) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::ConnectionFailed("offline".to_string()));
            }
            self.inner.set(relay, value).await
        }

        async fn remove(&self, relay: &RelayId) -> Result<(), StoreError> {
            self.inner.remove(relay).await
        }

        fn registry(&self) -> &Arc<CallbackRegistry> {
            self.inner.registry()
        }
    }

    #[tokio::test]
    async fn mirror_follows_store() {
        let store = RelayStateStore::in_memory();
        store.set(&relay("relay1"), true).await.unwrap();

        let mirror = RelayMirror::follow(store.clone(), [relay("relay1"), relay("relay2")])
            .await
            .unwrap();
        assert_eq!(mirror.len(), 2);
        assert_eq!(mirror.value(&relay("relay1")), Some(true));
        assert_eq!(mirror.value(&relay("relay2")), None);

        store.set(&relay("relay2"), true).await.unwrap();
        assert_eq!(mirror.value(&relay("relay2")), Some(true));

        assert!(!mirror.toggle(&relay("relay1")).await.unwrap());
        assert_eq!(mirror.value(&relay("relay1")), Some(false));
    }

    #[tokio::test]
    async fn failed_write_leaves_cache_unchanged() {
        let store = RelayStateStore::new(FlakyBackend::default());
        let mirror = RelayMirror::follow(store.clone(), [relay("relay1")]).await.unwrap();

        store.backend().failing.store(true, Ordering::SeqCst);
        assert!(mirror.request(&relay("relay1"), true).await.is_err());
        assert_eq!(mirror.value(&relay("relay1")), None);

        store.backend().failing.store(false, Ordering::SeqCst);
        mirror.request(&relay("relay1"), true).await.unwrap();
        assert_eq!(mirror.value(&relay("relay1")), Some(true));
    }

    #[tokio::test]
    async fn dropping_mirror_releases_subscriptions() {
        let store = RelayStateStore::in_memory();
        let mirror = RelayMirror::follow(store.clone(), [relay("relay1")]).await.unwrap();
        assert_eq!(store.subscriber_count(&relay("relay1")), 1);

        drop(mirror);
        assert_eq!(store.subscriber_count(&relay("relay1")), 0);
    }

    #[tokio::test]
    async fn removal_is_mirrored() {
        let store = RelayStateStore::in_memory();
        store.set(&relay("relay1"), true).await.unwrap();
        let mirror = RelayMirror::follow(store.clone(), [relay("relay1")]).await.unwrap();

        store.remove(&relay("relay1")).await.unwrap();
        assert_eq!(mirror.value(&relay("relay1")), None);
        assert_eq!(mirror.snapshot().get(&relay("relay1")), Some(&None));
    }
}
