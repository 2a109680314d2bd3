// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP device builder.

use crate::device::Device;
use crate::error::Error;
use crate::protocol::{HttpConfig, HttpTransport};
use crate::types::DeviceAddress;

/// Builder for devices that talk plain HTTP.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use espdeck::Device;
/// use espdeck::protocol::HttpConfig;
///
/// # fn example() -> espdeck::Result<()> {
/// // Address known up front
/// let device = Device::http("Device 3").with_address("192.168.1.61").build()?;
///
/// // Address filled in later by discovery, shorter timeout
/// let pending = Device::http("Device 1")
///     .with_config(HttpConfig::new().with_timeout(Duration::from_secs(3)))
///     .build()?;
/// assert!(!pending.is_resolved());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DeviceBuilder {
    name: String,
    address: Option<String>,
    config: HttpConfig,
    transport: Option<HttpTransport>,
}

impl DeviceBuilder {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
            config: HttpConfig::default(),
            transport: None,
        }
    }

    /// Sets the device address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the HTTP configuration used to create a new transport.
    #[must_use]
    pub fn with_config(mut self, config: HttpConfig) -> Self {
        self.config = config;
        self
    }

    /// Reuses an existing transport (and its connection pool).
    ///
    /// Takes precedence over [`with_config`](Self::with_config).
    #[must_use]
    pub fn with_transport(mut self, transport: HttpTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the device.
    ///
    /// No request is made.
    ///
    /// # Errors
    ///
    /// Returns error if the address is malformed or the HTTP client cannot
    /// be created.
    pub fn build(self) -> Result<Device<HttpTransport>, Error> {
        let address = self
            .address
            .filter(|a| !a.trim().is_empty())
            .map(DeviceAddress::new)
            .transpose()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => self.config.into_transport()?,
        };

        Ok(match address {
            Some(address) => Device::new(self.name, address, transport),
            None => Device::unresolved(self.name, transport),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::ValueError;

    #[test]
    fn build_with_address() {
        let device = DeviceBuilder::new("Device 2")
            .with_address("192.168.1.23")
            .build()
            .unwrap();
        assert_eq!(device.name(), "Device 2");
        assert_eq!(device.address().unwrap().as_str(), "192.168.1.23");
    }

    #[test]
    fn empty_address_builds_unresolved() {
        let device = DeviceBuilder::new("Device 1").with_address("  ").build().unwrap();
        assert!(!device.is_resolved());
    }

    #[test]
    fn malformed_address_is_rejected() {
        let result = DeviceBuilder::new("Device 1").with_address("not an address").build();
        assert!(matches!(result, Err(Error::Value(ValueError::InvalidAddress(_)))));
    }

    #[test]
    fn config_timeout_reaches_transport() {
        let device = DeviceBuilder::new("Device 4")
            .with_config(HttpConfig::new().with_timeout(Duration::from_millis(1500)))
            .build()
            .unwrap();
        assert_eq!(device.transport().timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn shared_transport_is_used() {
        let transport = HttpConfig::new()
            .with_timeout(Duration::from_secs(2))
            .into_transport()
            .unwrap();
        let device = DeviceBuilder::new("Device 4")
            .with_config(HttpConfig::new().with_timeout(Duration::from_secs(9)))
            .with_transport(transport)
            .build()
            .unwrap();
        assert_eq!(device.transport().timeout(), Duration::from_secs(2));
    }
}
