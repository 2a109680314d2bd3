// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor polling and reading history.
//!
//! A device reports all of its pins and sensors through `GET /status` as a
//! flat JSON object:
//!
//! ```json
//! {"Digital Pin 3": 1, "Digital Pin 4": 0, "Analog Pin 34": 2048, "Soil Moisture": 1730}
//! ```
//!
//! - [`PollResult`] - One parsed `/status` snapshot
//! - [`ChannelKind`] - Chart group of a channel name
//! - [`PinHistory`] - Bounded, tick-aligned series of readings per channel
//! - [`SensorPoller`] - Polls a device on a fixed interval and feeds a [`PinHistory`]
//!
//! # Examples
//!
//! ```
//! use espdeck::telemetry::{ChannelKind, PollResult};
//!
//! let result = PollResult::parse(r#"{"Digital Pin 3": 1, "Soil Moisture": 1730}"#).unwrap();
//! assert_eq!(result.get("Digital Pin 3"), Some(1.0));
//! assert_eq!(ChannelKind::of("Soil Moisture"), ChannelKind::SoilMoisture);
//! ```

mod history;
mod poller;

pub use history::{HistorySnapshot, PinHistory, PinReading, DEFAULT_HISTORY_CAPACITY};
pub use poller::{DEFAULT_POLL_INTERVAL, PollerHandle, PollerState, SensorPoller};

use std::collections::BTreeMap;

use crate::error::ParseError;

/// Prefix of digital pin channels.
pub const DIGITAL_PIN_PREFIX: &str = "Digital Pin";

/// Prefix of analog pin channels.
pub const ANALOG_PIN_PREFIX: &str = "Analog Pin";

/// Name of the soil moisture channel.
pub const SOIL_MOISTURE_CHANNEL: &str = "Soil Moisture";

/// Chart group a channel belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// `Digital Pin *` channels.
    Digital,
    /// `Analog Pin *` channels.
    Analog,
    /// The `Soil Moisture` channel.
    SoilMoisture,
    /// Anything else; recorded but not charted.
    Other,
}

impl ChannelKind {
    /// Classifies a channel name.
    #[must_use]
    pub fn of(channel: &str) -> Self {
        if channel.starts_with(DIGITAL_PIN_PREFIX) {
            Self::Digital
        } else if channel.starts_with(ANALOG_PIN_PREFIX) {
            Self::Analog
        } else if channel == SOIL_MOISTURE_CHANNEL {
            Self::SoilMoisture
        } else {
            Self::Other
        }
    }
}

/// One snapshot of channel values, as returned by a single poll tick.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct PollResult {
    values: BTreeMap<String, f64>,
}

impl PollResult {
    /// Parses a `/status` body.
    ///
    /// The body must be a JSON object. Values may be numbers, booleans
    /// (`true` = 1) or numeric strings; other values are skipped so one odd
    /// field never costs the whole tick.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the body is not JSON or is not an object.
    pub fn parse(body: &str) -> Result<Self, ParseError> {
        let value: serde_json::Value = serde_json::from_str(body)?;
        let serde_json::Value::Object(map) = value else {
            return Err(ParseError::UnexpectedFormat(format!(
                "expected a JSON object, got {body}"
            )));
        };

        let mut values = BTreeMap::new();
        for (channel, raw) in map {
            match number_of(&raw) {
                Some(reading) => {
                    values.insert(channel, reading);
                }
                None => tracing::debug!(%channel, value = %raw, "Skipping non-numeric status value"),
            }
        }
        Ok(Self { values })
    }

    /// Returns the value of a channel.
    #[must_use]
    pub fn get(&self, channel: &str) -> Option<f64> {
        self.values.get(channel).copied()
    }

    /// Iterates over channels and values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Iterates over the channels of one kind.
    pub fn channels_of(&self, kind: ChannelKind) -> impl Iterator<Item = (&str, f64)> {
        self.iter()
            .filter(move |(channel, _)| ChannelKind::of(channel) == kind)
    }

    /// Returns the number of channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the snapshot holds no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, f64)> for PollResult {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

fn number_of(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
