// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Network address of a device.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// Host or `host:port` of a device on the local network.
///
/// Requests are always sent as `http://{address}{path}`. A leading `http://`
/// and trailing slashes are accepted and stripped, so addresses copied from a
/// browser bar or an environment variable work unchanged.
///
/// # Examples
///
/// ```
/// use espdeck::types::DeviceAddress;
///
/// let addr = DeviceAddress::new("192.168.1.50").unwrap();
/// assert_eq!(addr.url("/relay/on"), "http://192.168.1.50/relay/on");
///
/// let addr = DeviceAddress::new("http://192.168.1.50:8080/").unwrap();
/// assert_eq!(addr.as_str(), "192.168.1.50:8080");
///
/// assert!(DeviceAddress::new("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceAddress(String);

impl DeviceAddress {
    /// Creates a device address.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidAddress` if the address is empty, uses a
    /// scheme other than `http`, or contains a path, whitespace or query.
    pub fn new(address: impl AsRef<str>) -> Result<Self, ValueError> {
        let raw = address.as_ref();
        let trimmed = raw.trim();
        let host = trimmed
            .strip_prefix("http://")
            .unwrap_or(trimmed)
            .trim_end_matches('/');

        let malformed = host.is_empty()
            || host.contains("://")
            || host
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@'));
        if malformed {
            return Err(ValueError::InvalidAddress(raw.to_string()));
        }

        Ok(Self(host.to_string()))
    }

    /// Returns the address as `host` or `host:port`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the base URL, `http://{address}`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.0)
    }

    /// Builds the full URL for a request path.
    ///
    /// `path` is appended verbatim and should start with `/`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.0)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceAddress {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceAddress {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeviceAddress> for String {
    fn from(value: DeviceAddress) -> Self {
        value.0
    }
}
