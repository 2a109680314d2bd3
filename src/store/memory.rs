// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process store backend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::StoreBackend;
use crate::error::StoreError;
use crate::subscription::CallbackRegistry;
use crate::types::RelayId;

/// Keeps relay states in a map and notifies subscribers synchronously.
///
/// Notifications are dispatched after the map lock is released, so
/// callbacks may read the store. Writes are serialized through their
/// dispatch, so subscribers see changes in the order they were applied.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: RwLock<HashMap<RelayId, bool>>,
    writes: Mutex<()>,
    registry: Arc<CallbackRegistry>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding `values`.
    #[must_use]
    pub fn with_values(values: impl IntoIterator<Item = (RelayId, bool)>) -> Self {
        Self {
            values: RwLock::new(values.into_iter().collect()),
            writes: Mutex::default(),
            registry: Arc::default(),
        }
    }

    /// Returns every stored relay and its value.
    #[must_use]
    pub fn entries(&self) -> Vec<(RelayId, bool)> {
        let mut entries: Vec<_> = self
            .values
            .read()
            .iter()
            .map(|(relay, value)| (relay.clone(), *value))
            .collect();
        entries.sort();
        entries
    }
}

impl StoreBackend for MemoryBackend {
    async fn get(&self, relay: &RelayId) -> Result<Option<bool>, StoreError> {
        Ok(self.values.read().get(relay).copied())
    }

    async fn set(&self, relay: &RelayId, value: bool) -> Result<(), StoreError> {
        let _order = self.writes.lock();
        self.values.write().insert(relay.clone(), value);
        self.registry.dispatch(relay, Some(value));
        Ok(())
    }

    async fn remove(&self, relay: &RelayId) -> Result<(), StoreError> {
        let _order = self.writes.lock();
        let existed = self.values.write().remove(relay).is_some();
        if existed {
            self.registry.dispatch(relay, None);
        }
        Ok(())
    }

    fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }
}
