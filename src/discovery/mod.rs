// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Address discovery through a bootstrap device.
//!
//! Some devices get their address dynamically. A second device at a fixed,
//! well-known address knows it and answers `GET /ip` with the address as
//! plain text. [`DeviceDiscovery::resolve`] performs that single lookup.
//! There is no retry; a caller that wants to try again calls `resolve` again.
//!
//! # Examples
//!
//! ```no_run
//! use espdeck::discovery::DeviceDiscovery;
//! use espdeck::protocol::HttpTransport;
//! use espdeck::types::DeviceAddress;
//!
//! # async fn example() -> espdeck::Result<()> {
//! let discovery = DeviceDiscovery::new(HttpTransport::new()?);
//! let address = discovery.resolve(&DeviceAddress::new("192.168.1.184")?).await?;
//! println!("device is at {address}");
//! # Ok(())
//! # }
//! ```

use crate::command::AddressQuery;
use crate::device::Device;
use crate::error::DiscoveryError;
use crate::protocol::Transport;
use crate::types::DeviceAddress;

/// Resolves device addresses by asking a bootstrap device.
#[derive(Debug, Clone)]
pub struct DeviceDiscovery<T> {
    transport: T,
}

impl<T: Transport> DeviceDiscovery<T> {
    /// Creates a discovery client sending through `transport`.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Asks `bootstrap` for the address of the target device.
    ///
    /// The whole response body, trimmed, is the address.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::Transport` if the lookup fails,
    /// `DiscoveryError::EmptyAddress` if the body is blank, and
    /// `DiscoveryError::InvalidAddress` if it is not a usable address.
    pub async fn resolve(&self, bootstrap: &DeviceAddress) -> Result<DeviceAddress, DiscoveryError> {
        tracing::debug!(%bootstrap, "Fetching device address");
        let response = self.transport.send_command(bootstrap, &AddressQuery).await?;

        let body = response.body().trim();
        if body.is_empty() {
            return Err(DiscoveryError::EmptyAddress);
        }
        let address = DeviceAddress::new(body)?;
        tracing::info!(%bootstrap, %address, "Device address fetched");
        Ok(address)
    }

    /// Resolves the address and stores it in `device`.
    ///
    /// On failure the device keeps its previous address, so an unresolved
    /// device stays unresolved.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve).
    pub async fn resolve_into<D: Transport>(
        &self,
        bootstrap: &DeviceAddress,
        device: &Device<D>,
    ) -> Result<DeviceAddress, DiscoveryError> {
        match self.resolve(bootstrap).await {
            Ok(address) => {
                device.set_address(address.clone());
                Ok(address)
            }
            Err(e) => {
                tracing::error!(device = %device.name(), %bootstrap, error = %e, "Error fetching device address");
                Err(e)
            }
        }
    }
}
