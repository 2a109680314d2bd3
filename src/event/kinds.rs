// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event payloads.

use chrono::{DateTime, Utc};

use crate::telemetry::PollResult;
use crate::types::DeviceAddress;

/// Outcome of one poll tick.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PollEvent {
    /// The tick succeeded and its values were recorded.
    Updated {
        /// When the values were recorded.
        at: DateTime<Utc>,
        /// The values read.
        result: PollResult,
    },

    /// The tick failed; nothing was recorded.
    Failed {
        /// When the tick failed.
        at: DateTime<Utc>,
        /// Error message.
        error: String,
    },
}

impl PollEvent {
    /// Creates an [`Updated`](Self::Updated) event stamped now.
    #[must_use]
    pub fn updated(result: PollResult) -> Self {
        Self::Updated {
            at: Utc::now(),
            result,
        }
    }

    /// Creates a [`Failed`](Self::Failed) event stamped now.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            at: Utc::now(),
            error: error.into(),
        }
    }

    /// Returns `true` for [`Updated`](Self::Updated).
    #[must_use]
    pub fn is_update(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }

    /// Returns the time of the event.
    #[must_use]
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Updated { at, .. } | Self::Failed { at, .. } => *at,
        }
    }
}

/// Address resolution events emitted by the device registry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// A device received an address.
    AddressResolved {
        /// Device name.
        device: String,
        /// The new address.
        address: DeviceAddress,
    },

    /// Resolving a device address failed.
    DiscoveryFailed {
        /// Device name.
        device: String,
        /// Error message shown to the user.
        message: String,
    },
}

impl DeviceEvent {
    /// Returns the name of the device the event is about.
    #[must_use]
    pub fn device(&self) -> &str {
        match self {
            Self::AddressResolved { device, .. } | Self::DiscoveryFailed { device, .. } => device,
        }
    }
}
