// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded per-channel reading history.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};

use super::{ChannelKind, PollResult};

/// Default number of ticks kept (one hour at one tick per second).
pub const DEFAULT_HISTORY_CAPACITY: usize = 3600;

/// A single reading of one channel.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PinReading {
    /// Channel name, e.g. `Digital Pin 3`.
    pub channel: String,
    /// Value read.
    pub value: f64,
    /// Time of the tick that produced the value.
    pub timestamp: DateTime<Utc>,
}

/// Tick-aligned history of every channel seen so far.
///
/// Each successful tick appends exactly one timestamp and exactly one entry
/// to every tracked channel. A channel missing from a tick gets `None`, and
/// a channel first seen late is back-filled with `None`, so every series has
/// the same length as the timestamp list. Once `capacity` ticks are held,
/// recording a new tick evicts the oldest one from all series at once.
///
/// Timestamps never go backwards: a tick recorded with an earlier clock
/// reading than the previous one reuses the previous timestamp.
#[derive(Debug, Clone)]
pub struct PinHistory {
    capacity: usize,
    timestamps: VecDeque<DateTime<Utc>>,
    series: BTreeMap<String, VecDeque<Option<f64>>>,
}

impl PinHistory {
    /// Creates an empty history holding at most `capacity` ticks.
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            timestamps: VecDeque::new(),
            series: BTreeMap::new(),
        }
    }

    /// Returns the maximum number of ticks held.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of ticks currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns `true` if no tick has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Records one successful tick taken at `at`.
    ///
    /// Returns the timestamp actually stored.
    pub fn record(&mut self, result: &PollResult, at: DateTime<Utc>) -> DateTime<Utc> {
        let at = self.timestamps.back().map_or(at, |last| at.max(*last));

        if self.timestamps.len() == self.capacity {
            self.timestamps.pop_front();
            for values in self.series.values_mut() {
                values.pop_front();
            }
        }

        let held = self.timestamps.len();
        for (channel, _) in result.iter() {
            if !self.series.contains_key(channel) {
                self.series
                    .insert(channel.to_string(), VecDeque::from(vec![None; held]));
            }
        }

        for (channel, values) in &mut self.series {
            values.push_back(result.get(channel));
        }
        self.timestamps.push_back(at);

        // Drop channels whose readings have all been evicted.
        self.series
            .retain(|_, values| values.iter().any(Option::is_some));

        at
    }

    /// Returns the tick timestamps, oldest first.
    #[must_use]
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.timestamps.iter().copied().collect()
    }

    /// Returns the aligned series of a channel, with `None` for gaps.
    #[must_use]
    pub fn series(&self, channel: &str) -> Option<Vec<Option<f64>>> {
        self.series
            .get(channel)
            .map(|values| values.iter().copied().collect())
    }

    /// Returns the values actually read for a channel, skipping gaps.
    #[must_use]
    pub fn values(&self, channel: &str) -> Vec<f64> {
        self.series
            .get(channel)
            .map(|values| values.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    /// Returns every reading of a channel with its timestamp.
    #[must_use]
    pub fn readings(&self, channel: &str) -> Vec<PinReading> {
        let Some(values) = self.series.get(channel) else {
            return Vec::new();
        };
        self.timestamps
            .iter()
            .zip(values)
            .filter_map(|(timestamp, value)| {
                value.map(|value| PinReading {
                    channel: channel.to_string(),
                    value,
                    timestamp: *timestamp,
                })
            })
            .collect()
    }

    /// Returns the most recent value of a channel.
    #[must_use]
    pub fn latest(&self, channel: &str) -> Option<f64> {
        self.series.get(channel)?.iter().rev().flatten().next().copied()
    }

    /// Returns the names of tracked channels of one kind.
    #[must_use]
    pub fn channels(&self, kind: ChannelKind) -> Vec<String> {
        self.series
            .keys()
            .filter(|channel| ChannelKind::of(channel) == kind)
            .cloned()
            .collect()
    }

    /// Returns the digital channels that have read `1` at least once.
    #[must_use]
    pub fn active_digital(&self) -> Vec<String> {
        self.series
            .iter()
            .filter(|(channel, values)| {
                ChannelKind::of(channel) == ChannelKind::Digital
                    && values.iter().flatten().any(|v| (*v - 1.0).abs() < f64::EPSILON)
            })
            .map(|(channel, _)| channel.clone())
            .collect()
    }

    /// Removes every tick.
    pub fn clear(&mut self) {
        self.timestamps.clear();
        self.series.clear();
    }

    /// Returns a serializable copy grouped by channel kind.
    #[must_use]
    pub fn snapshot(&self) -> HistorySnapshot {
        let group = |kind: ChannelKind| -> BTreeMap<String, Vec<Option<f64>>> {
            self.series
                .iter()
                .filter(|(channel, _)| ChannelKind::of(channel) == kind)
                .map(|(channel, values)| (channel.clone(), values.iter().copied().collect()))
                .collect()
        };

        HistorySnapshot {
            timestamps: self.timestamps(),
            digital: group(ChannelKind::Digital),
            analog: group(ChannelKind::Analog),
            soil_moisture: self
                .series(super::SOIL_MOISTURE_CHANNEL)
                .unwrap_or_default(),
            active_digital: self.active_digital(),
        }
    }
}

impl Default for PinHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// History grouped the way the dashboard charts it.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    /// Tick timestamps, oldest first.
    pub timestamps: Vec<DateTime<Utc>>,
    /// `Digital Pin *` series.
    pub digital: BTreeMap<String, Vec<Option<f64>>>,
    /// `Analog Pin *` series.
    pub analog: BTreeMap<String, Vec<Option<f64>>>,
    /// The `Soil Moisture` series.
    pub soil_moisture: Vec<Option<f64>>,
    /// Digital channels that have read `1` at least once.
    pub active_digital: Vec<String>,
}
