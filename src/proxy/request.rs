// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Validated proxy input.

use std::borrow::Cow;

use super::ProxyError;
use crate::types::{DeviceAddress, RelayAction};

/// A validated `(deviceIp, action)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    device_ip: DeviceAddress,
    action: RelayAction,
}

impl ProxyRequest {
    /// Validates raw parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidInput`] if either parameter is missing,
    /// empty or malformed.
    pub fn new(device_ip: Option<&str>, action: Option<&str>) -> Result<Self, ProxyError> {
        let (Some(device_ip), Some(action)) = (device_ip, action) else {
            return Err(ProxyError::InvalidInput);
        };
        if device_ip.is_empty() || action.is_empty() {
            return Err(ProxyError::InvalidInput);
        }

        Ok(Self {
            device_ip: DeviceAddress::new(device_ip).map_err(|_| ProxyError::InvalidInput)?,
            action: action.parse().map_err(|_| ProxyError::InvalidInput)?,
        })
    }

    /// Parses a raw query string such as `deviceIp=192.168.1.50&action=on`.
    ///
    /// A parameter given more than once is rejected like a missing one.
    /// Unknown parameters are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidInput`] if the query does not hold
    /// exactly one valid `deviceIp` and one valid `action`.
    ///
    /// # Examples
    ///
    /// ```
    /// use espdeck::proxy::ProxyRequest;
    ///
    /// let request = ProxyRequest::from_query("deviceIp=192.168.1.50&action=on").unwrap();
    /// assert_eq!(request.device_ip().as_str(), "192.168.1.50");
    ///
    /// assert!(ProxyRequest::from_query("deviceIp=a&deviceIp=b&action=on").is_err());
    /// ```
    pub fn from_query(query: &str) -> Result<Self, ProxyError> {
        let mut device_ip: Option<String> = None;
        let mut action: Option<String> = None;

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let slot = match &*decode(key)? {
                "deviceIp" => &mut device_ip,
                "action" => &mut action,
                _ => continue,
            };
            if slot.is_some() {
                return Err(ProxyError::InvalidInput);
            }
            *slot = Some(decode(value)?.into_owned());
        }

        Self::new(device_ip.as_deref(), action.as_deref())
    }

    /// Returns the target device.
    #[must_use]
    pub fn device_ip(&self) -> &DeviceAddress {
        &self.device_ip
    }

    /// Returns the relay action.
    #[must_use]
    pub fn action(&self) -> &RelayAction {
        &self.action
    }
}

fn decode(raw: &str) -> Result<Cow<'_, str>, ProxyError> {
    if raw.contains('+') {
        let spaced = raw.replace('+', " ");
        urlencoding::decode(&spaced)
            .map(|decoded| Cow::Owned(decoded.into_owned()))
            .map_err(|_| ProxyError::InvalidInput)
    } else {
        urlencoding::decode(raw).map_err(|_| ProxyError::InvalidInput)
    }
}
