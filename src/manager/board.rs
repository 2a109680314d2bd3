// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relay board with acknowledged per-relay status.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::device::Device;
use crate::error::Error;
use crate::protocol::Transport;
use crate::types::{RelayId, SwitchState};

/// Error recorded on a relay whose last switch failed.
pub const TOGGLE_FAILED_MESSAGE: &str = "Failed to toggle relay";

/// What the board knows about one relay.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RelayStatus {
    /// Last state acknowledged by the device.
    pub status: SwitchState,
    /// A switch request is in flight.
    pub loading: bool,
    /// Error of the last switch request, cleared by the next one.
    pub error: Option<String>,
}

/// Rejected or failed board switch.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// The board has no relay with this name.
    #[error("unknown relay: {0}")]
    UnknownRelay(String),

    /// The relay is already in the requested state.
    #[error("{relay} is already {status}")]
    NoChange {
        /// The relay.
        relay: RelayId,
        /// Its current state.
        status: SwitchState,
    },

    /// A previous request for this relay has not finished.
    #[error("{0} is busy")]
    Busy(RelayId),

    /// The device did not acknowledge the switch.
    #[error("Failed to toggle relay")]
    Failed {
        /// The relay.
        relay: RelayId,
        /// What went wrong.
        #[source]
        source: Error,
    },
}

/// A device driving several named relays through `GET /{relay}/{on|off}`.
///
/// A relay's status changes only once the device has acknowledged the
/// request. While a request is in flight, further requests for the same
/// relay are rejected, as are requests that would not change its state.
#[derive(Debug)]
pub struct RelayBoard<T> {
    device: Device<T>,
    relays: RwLock<BTreeMap<RelayId, RelayStatus>>,
}

impl<T: Transport> RelayBoard<T> {
    /// Creates a board whose relays all start `OFF`.
    #[must_use]
    pub fn new(device: Device<T>, relays: impl IntoIterator<Item = RelayId>) -> Self {
        Self {
            device,
            relays: RwLock::new(
                relays
                    .into_iter()
                    .map(|relay| (relay, RelayStatus::default()))
                    .collect(),
            ),
        }
    }

    /// Returns the board device.
    #[must_use]
    pub fn device(&self) -> &Device<T> {
        &self.device
    }

    /// Returns the status of one relay.
    #[must_use]
    pub fn status(&self, relay: &RelayId) -> Option<RelayStatus> {
        self.relays.read().get(relay).cloned()
    }

    /// Returns the status of every relay.
    #[must_use]
    pub fn statuses(&self) -> BTreeMap<RelayId, RelayStatus> {
        self.relays.read().clone()
    }

    /// Switches `relay` to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnknownRelay`], [`BoardError::Busy`] or
    /// [`BoardError::NoChange`] without any request, or
    /// [`BoardError::Failed`] if the device did not acknowledge. A failure
    /// is also recorded on the relay as [`TOGGLE_FAILED_MESSAGE`].
    pub async fn switch(&self, relay: &RelayId, target: SwitchState) -> Result<RelayStatus, BoardError> {
        {
            let mut relays = self.relays.write();
            let entry = relays
                .get_mut(relay)
                .ok_or_else(|| BoardError::UnknownRelay(relay.to_string()))?;
            if entry.loading {
                return Err(BoardError::Busy(relay.clone()));
            }
            if entry.status == target {
                return Err(BoardError::NoChange {
                    relay: relay.clone(),
                    status: target,
                });
            }
            entry.loading = true;
            entry.error = None;
        }

        let mut pending = Pending {
            relays: &self.relays,
            relay,
        };
        let outcome = self
            .device
            .switch_board_relay(relay.clone(), target.is_on())
            .await;

        match outcome {
            Ok(_) => {
                tracing::info!(%relay, status = %target, "Board relay switched");
                Ok(pending.finish(|entry| entry.status = target))
            }
            Err(e) => {
                tracing::error!(%relay, error = %e, "Failed to toggle board relay");
                pending.finish(|entry| entry.error = Some(TOGGLE_FAILED_MESSAGE.to_string()));
                Err(BoardError::Failed {
                    relay: relay.clone(),
                    source: e,
                })
            }
        }
    }
}

/// Clears the loading flag even if the switch future is dropped.
struct Pending<'a> {
    relays: &'a RwLock<BTreeMap<RelayId, RelayStatus>>,
    relay: &'a RelayId,
}

impl Pending<'_> {
    fn finish(&mut self, update: impl FnOnce(&mut RelayStatus)) -> RelayStatus {
        let mut relays = self.relays.write();
        let entry = relays.entry(self.relay.clone()).or_default();
        update(entry);
        entry.loading = false;
        entry.clone()
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if let Some(entry) = self.relays.write().get_mut(self.relay) {
            entry.loading = false;
        }
    }
}
