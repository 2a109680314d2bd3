// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GPIO pin identifier.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// GPIO pin number used in `/pin/{id}/{on|off}`.
///
/// Parses either a bare number (`"13"`) or a status channel name
/// (`"Digital Pin 13"`), so a channel reported by `/status` can be toggled
/// directly.
///
/// # Examples
///
/// ```
/// use espdeck::types::PinId;
///
/// assert_eq!("13".parse::<PinId>().unwrap().value(), 13);
/// assert_eq!("Digital Pin 4".parse::<PinId>().unwrap().value(), 4);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct PinId(u8);

impl PinId {
    /// Creates a pin identifier.
    #[must_use]
    pub const fn new(pin: u8) -> Self {
        Self(pin)
    }

    /// Returns the pin number.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PinId {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed
            .strip_prefix("Digital Pin")
            .or_else(|| trimmed.strip_prefix("Analog Pin"))
            .unwrap_or(trimmed)
            .trim();
        number
            .parse::<u8>()
            .map(Self)
            .map_err(|_| ValueError::InvalidPin(s.to_string()))
    }
}

impl From<u8> for PinId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_number() {
        assert_eq!("0".parse::<PinId>().unwrap(), PinId::new(0));
        assert_eq!(" 39 ".parse::<PinId>().unwrap(), PinId::new(39));
    }

    #[test]
    fn parse_channel_names() {
        assert_eq!("Digital Pin 3".parse::<PinId>().unwrap(), PinId::new(3));
        assert_eq!("Analog Pin 14".parse::<PinId>().unwrap(), PinId::new(14));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<PinId>().is_err());
        assert!("Soil Moisture".parse::<PinId>().is_err());
        assert!("300".parse::<PinId>().is_err());
    }
}
