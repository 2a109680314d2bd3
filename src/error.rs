// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `espdeck` library.
//!
//! Failures are grouped by where they happen: value validation, talking to a
//! device over HTTP, interpreting what a device sent back, resolving a device
//! address, polling sensors, and reading or writing the shared relay store.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred while talking to a device.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Error occurred while parsing a device response.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error occurred while resolving a device address.
    #[error("discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Error occurred while polling a device.
    #[error("poll error: {0}")]
    Poll(#[from] PollError),

    /// Error occurred in the relay state store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// No device with this name is registered.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The device address has not been resolved yet.
    #[error("device {0} has no address yet")]
    DeviceNotResolved(String),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
        /// The actual value that was provided.
        actual: i64,
    },

    /// An address string was empty or malformed.
    #[error("invalid device address: {0:?}")]
    InvalidAddress(String),

    /// A relay action string was empty or malformed.
    #[error("invalid relay action: {0:?}")]
    InvalidRelayAction(String),

    /// A relay identifier was empty or malformed.
    #[error("invalid relay id: {0:?}")]
    InvalidRelayId(String),

    /// A pin identifier was empty or malformed.
    #[error("invalid pin: {0:?}")]
    InvalidPin(String),

    /// An unknown motor direction was given.
    #[error("invalid direction: {0:?}")]
    InvalidDirection(String),
}

/// Errors raised by a [`Transport`](crate::protocol::Transport).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No response arrived before the deadline; the request was aborted.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The device answered with a non-2xx status.
    #[error("Request failed with status {status}")]
    RequestFailed {
        /// HTTP status code returned by the device.
        status: u16,
    },

    /// No response at all (DNS failure, connection refused, abrupt close).
    #[error("{0}")]
    ConnectionError(String),

    /// The target URL could not be built from the address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The underlying HTTP client could not be created.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl TransportError {
    /// Returns `true` if the request was aborted by the timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Errors related to parsing device responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unexpected response format.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),
}

/// Errors raised while resolving a device address through a bootstrap device.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The bootstrap request failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The bootstrap device answered with an empty body.
    #[error("bootstrap device returned an empty address")]
    EmptyAddress,

    /// The bootstrap device answered with something that is not an address.
    #[error(transparent)]
    InvalidAddress(#[from] ValueError),
}

/// Errors raised by a single poll tick.
#[derive(Debug, Error)]
pub enum PollError {
    /// The status request failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The status body was not a flat JSON object of numbers.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Errors raised by the relay state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// MQTT client rejected the request.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the store failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A stored value could not be decoded as a relay state.
    #[error("invalid stored value for {relay_id}: {payload:?}")]
    InvalidPayload {
        /// The relay whose value was malformed.
        relay_id: String,
        /// The raw payload.
        payload: String,
    },

    /// The store has been shut down.
    #[error("store is closed")]
    Closed,
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::OutOfRange {
            min: 0,
            max: 255,
            actual: 300,
        };
        assert_eq!(err.to_string(), "value 300 is out of range [0, 255]");
    }

    #[test]
    fn request_failed_display_matches_device_message() {
        let err = TransportError::RequestFailed { status: 503 };
        assert_eq!(err.to_string(), "Request failed with status 503");
    }

    #[test]
    fn connection_error_display_is_bare_message() {
        let err = TransportError::ConnectionError("connection refused".to_string());
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn error_from_transport_error() {
        let err: Error = TransportError::Timeout(10_000).into();
        assert!(matches!(err, Error::Transport(TransportError::Timeout(10_000))));
    }

    #[test]
    fn poll_error_wraps_parse_error() {
        let err: PollError = ParseError::UnexpectedFormat("array".to_string()).into();
        assert_eq!(err.to_string(), "unexpected response format: array");
    }

    #[test]
    fn discovery_error_is_transparent_over_transport() {
        let err: DiscoveryError = TransportError::RequestFailed { status: 404 }.into();
        assert_eq!(err.to_string(), "Request failed with status 404");
    }
}
