// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Motor control types.
//!
//! # Device Methods
//!
//! Use these types with the [`Device`](crate::Device) motor methods:
//! - [`move_motors()`](crate::Device::move_motors) - Drive in a [`Direction`]
//! - [`set_speed()`](crate::Device::set_speed) - Set the PWM [`MotorSpeed`]

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// Direction sent in the body of `POST /move`.
///
/// Serializes to the lowercase name the motor firmware expects.
///
/// # Examples
///
/// ```
/// use espdeck::types::Direction;
///
/// assert_eq!(Direction::Forward.as_str(), "forward");
/// assert_eq!("LEFT".parse::<Direction>().unwrap(), Direction::Left);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Both motors forward.
    Forward,
    /// Both motors backward.
    Backward,
    /// Turn left.
    Left,
    /// Turn right.
    Right,
    /// Stop both motors.
    Stop,
}

impl Direction {
    /// All directions, in display order.
    pub const ALL: [Self; 5] = [
        Self::Forward,
        Self::Backward,
        Self::Left,
        Self::Right,
        Self::Stop,
    ];

    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Left => "left",
            Self::Right => "right",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forward" => Ok(Self::Forward),
            "backward" => Ok(Self::Backward),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "stop" => Ok(Self::Stop),
            _ => Err(ValueError::InvalidDirection(s.to_string())),
        }
    }
}

/// Motor PWM speed (0-255).
///
/// # Examples
///
/// ```
/// use espdeck::types::MotorSpeed;
///
/// let speed = MotorSpeed::try_from(128_i64).unwrap();
/// assert_eq!(speed.value(), 128);
/// assert_eq!(MotorSpeed::default(), MotorSpeed::MAX);
/// assert!(MotorSpeed::try_from(256_i64).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct MotorSpeed(u8);

impl MotorSpeed {
    /// Motors stopped.
    pub const MIN: Self = Self(0);

    /// Full speed.
    pub const MAX: Self = Self(u8::MAX);

    /// Creates a motor speed. Every `u8` is a valid speed.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Returns the speed value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl Default for MotorSpeed {
    fn default() -> Self {
        Self::MAX
    }
}

impl fmt::Display for MotorSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for MotorSpeed {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for MotorSpeed {
    type Error = ValueError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map(Self)
            .map_err(|_| ValueError::OutOfRange {
                min: 0,
                max: i64::from(u8::MAX),
                actual: value,
            })
    }
}
