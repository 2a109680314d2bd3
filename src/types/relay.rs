// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relay-related types.
//!
//! This module provides the action segment sent to relay firmware, the key
//! under which a relay's state is shared between dashboards, and the ON/OFF
//! status shown for a relay.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;
use crate::types::is_path_segment;

/// Action sent to a relay endpoint, `/relay/{action}`.
///
/// Relay firmware understands `on` and `off`. Some firmware exposes extra
/// actions (`toggle`, `pulse`, ...); those are kept as [`RelayAction::Other`]
/// and forwarded untouched. Device routes are case-sensitive, so only the
/// exact segments `on` and `off` map to [`RelayAction::On`] and
/// [`RelayAction::Off`].
///
/// # Examples
///
/// ```
/// use espdeck::types::RelayAction;
///
/// assert_eq!("on".parse::<RelayAction>().unwrap(), RelayAction::On);
/// assert_eq!(RelayAction::Off.as_str(), "off");
/// assert_eq!("ON".parse::<RelayAction>().unwrap().as_str(), "ON");
///
/// let custom: RelayAction = "toggle".parse().unwrap();
/// assert_eq!(custom.as_str(), "toggle");
///
/// assert!("".parse::<RelayAction>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelayAction {
    /// Switch the relay on.
    On,
    /// Switch the relay off.
    Off,
    /// Any other action supported by the firmware.
    Other(String),
}

impl RelayAction {
    /// Returns the path segment for this action.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Other(action) => action,
        }
    }

    /// Returns the switch state this action leads to, if it is known.
    #[must_use]
    pub fn target_state(&self) -> Option<SwitchState> {
        match self {
            Self::On => Some(SwitchState::On),
            Self::Off => Some(SwitchState::Off),
            Self::Other(_) => None,
        }
    }
}

impl fmt::Display for RelayAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelayAction {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            _ if is_path_segment(s) => Ok(Self::Other(s.to_string())),
            _ => Err(ValueError::InvalidRelayAction(s.to_string())),
        }
    }
}

impl From<bool> for RelayAction {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

/// Key of a relay in the shared relay state store.
///
/// Stored under the logical path `relays/{relay_id}`, so the identifier must
/// be a single path segment.
///
/// # Examples
///
/// ```
/// use espdeck::types::RelayId;
///
/// let id = RelayId::new("relay1").unwrap();
/// assert_eq!(id.store_path(), "relays/relay1");
///
/// assert!(RelayId::new("relays/relay1").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelayId(String);

impl RelayId {
    /// Creates a relay identifier.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidRelayId` if the identifier is empty or
    /// contains characters that are not allowed in a path segment.
    pub fn new(id: impl Into<String>) -> Result<Self, ValueError> {
        let id = id.into();
        if is_path_segment(&id) {
            Ok(Self(id))
        } else {
            Err(ValueError::InvalidRelayId(id))
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the logical store path, `relays/{id}`.
    #[must_use]
    pub fn store_path(&self) -> String {
        format!("relays/{}", self.0)
    }
}

impl fmt::Display for RelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RelayId {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RelayId {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RelayId> for String {
    fn from(value: RelayId) -> Self {
        value.0
    }
}

/// ON/OFF status of a relay.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwitchState {
    /// Relay is off.
    #[default]
    Off,
    /// Relay is on.
    On,
}

impl SwitchState {
    /// Returns the display representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
        }
    }

    /// Returns `true` if the relay is on.
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<bool> for SwitchState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl From<SwitchState> for bool {
    fn from(value: SwitchState) -> Self {
        value.is_on()
    }
}
