// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Named relay devices with optional address discovery.

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::device::{Device, DeviceInfo};
use crate::discovery::DeviceDiscovery;
use crate::error::{Error, Result};
use crate::event::{DeviceEvent, EventBus};
use crate::protocol::Transport;
use crate::types::{DeviceAddress, RelayAction};

/// A fixed, ordered set of named devices.
///
/// At most one device is filled in by discovery: it starts unresolved and
/// [`resolve_pending`](Self::resolve_pending) asks the bootstrap device for
/// its address. Until then relay actions on it fail without any request.
///
/// The registry keeps a one-line status message describing the outcome of
/// the last action, the way a control panel shows it.
#[derive(Debug)]
pub struct DeviceRegistry<T> {
    transport: T,
    devices: Vec<Device<T>>,
    pending: Option<(String, DeviceAddress)>,
    message: RwLock<Option<String>>,
    events: EventBus<DeviceEvent>,
}

impl<T: Transport + Clone> DeviceRegistry<T> {
    /// Creates an empty registry whose devices share `transport`.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            devices: Vec::new(),
            pending: None,
            message: RwLock::new(None),
            events: EventBus::new(),
        }
    }

    /// Adds a device with a known address.
    #[must_use]
    pub fn with_device(mut self, name: impl Into<String>, address: DeviceAddress) -> Self {
        self.devices
            .push(Device::new(name, address, self.transport.clone()));
        self
    }

    /// Adds a device whose address is served by `bootstrap` at `/ip`.
    ///
    /// Replaces any previously configured discovered device.
    #[must_use]
    pub fn with_discovered(mut self, name: impl Into<String>, bootstrap: DeviceAddress) -> Self {
        let name = name.into();
        self.devices
            .push(Device::unresolved(name.clone(), self.transport.clone()));
        self.pending = Some((name, bootstrap));
        self
    }

    /// Returns the device called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Device<T>> {
        self.devices.iter().find(|device| device.name() == name)
    }

    /// Returns every device, in insertion order.
    #[must_use]
    pub fn devices(&self) -> &[Device<T>] {
        &self.devices
    }

    /// Returns a description of every device, in insertion order.
    #[must_use]
    pub fn infos(&self) -> Vec<DeviceInfo> {
        self.devices.iter().map(Device::info).collect()
    }

    /// Returns the status message of the last action.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.message.read().clone()
    }

    /// Subscribes to address resolution events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// Resolves the discovered device, if any.
    ///
    /// Returns `Ok(None)` when no device uses discovery. On failure the
    /// device stays unresolved and the message becomes
    /// `Error fetching device IP: {reason}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] if the bootstrap lookup fails.
    pub async fn resolve_pending(&self) -> Result<Option<DeviceAddress>> {
        let Some((name, bootstrap)) = &self.pending else {
            return Ok(None);
        };
        let device = self
            .get(name)
            .ok_or_else(|| Error::DeviceNotFound(name.clone()))?;

        let discovery = DeviceDiscovery::new(self.transport.clone());
        match discovery.resolve_into(bootstrap, device).await {
            Ok(address) => {
                self.events.publish(DeviceEvent::AddressResolved {
                    device: name.clone(),
                    address: address.clone(),
                });
                Ok(Some(address))
            }
            Err(e) => {
                let message = format!("Error fetching device IP: {e}");
                self.set_message(message.clone());
                self.events.publish(DeviceEvent::DiscoveryFailed {
                    device: name.clone(),
                    message,
                });
                Err(e.into())
            }
        }
    }

    /// Sends a relay action to the device called `name`.
    ///
    /// The message becomes `Success: {body}` or
    /// `Error turning {on|off} relay on {address}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] for an unknown name,
    /// [`Error::DeviceNotResolved`] if the address is not known yet (no
    /// request is made and the message is left alone), or the transport
    /// error.
    pub async fn relay(&self, name: &str, action: RelayAction) -> Result<String> {
        let device = self
            .get(name)
            .ok_or_else(|| Error::DeviceNotFound(name.to_string()))?;
        let Some(address) = device.address() else {
            return Err(Error::DeviceNotResolved(name.to_string()));
        };

        tracing::info!(device = %name, %address, %action, "Sending relay action");
        match device.relay(action.clone()).await {
            Ok(body) => {
                self.set_message(format!("Success: {body}"));
                Ok(body)
            }
            Err(e) => {
                tracing::error!(device = %name, %address, %action, error = %e, "Relay action failed");
                self.set_message(format!("Error turning {action} relay on {address}"));
                Err(e)
            }
        }
    }

    fn set_message(&self, message: String) {
        *self.message.write() = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::TransportError;
    use crate::protocol::testing::ScriptedTransport;

    fn addr(s: &str) -> DeviceAddress {
        DeviceAddress::new(s).unwrap()
    }

    fn registry(transport: &Arc<ScriptedTransport>) -> DeviceRegistry<Arc<ScriptedTransport>> {
        DeviceRegistry::new(Arc::clone(transport))
            .with_discovered("Device 1", addr("192.168.1.184"))
            .with_device("Device 2", addr("192.168.1.23"))
    }

    #[tokio::test]
    async fn discovered_device_is_disabled_until_resolved() {
        let transport = Arc::new(ScriptedTransport::new().reply("192.168.1.50").reply("ON"));
        let registry = registry(&transport);

        let err = registry.relay("Device 1", RelayAction::On).await.unwrap_err();
        assert!(matches!(err, Error::DeviceNotResolved(_)));
        assert_eq!(transport.call_count(), 0);

        let mut events = registry.subscribe();
        let address = registry.resolve_pending().await.unwrap();
        assert_eq!(address, Some(addr("192.168.1.50")));
        assert!(matches!(
            events.recv().await.unwrap(),
            DeviceEvent::AddressResolved { .. }
        ));

        registry.relay("Device 1", RelayAction::On).await.unwrap();
        assert_eq!(
            transport.urls(),
            vec!["http://192.168.1.184/ip", "http://192.168.1.50/relay/on"]
        );
        assert_eq!(registry.message().as_deref(), Some("Success: ON"));
    }

    #[tokio::test]
    async fn discovery_failure_sets_message() {
        let transport = Arc::new(
            ScriptedTransport::new().fail(TransportError::RequestFailed { status: 404 }),
        );
        let registry = registry(&transport);

        assert!(matches!(
            registry.resolve_pending().await,
            Err(Error::Discovery(_))
        ));
        assert_eq!(
            registry.message().as_deref(),
            Some("Error fetching device IP: Request failed with status 404")
        );
        assert!(!registry.get("Device 1").unwrap().is_resolved());
    }

    #[tokio::test]
    async fn relay_failure_sets_message() {
        let transport = Arc::new(
            ScriptedTransport::new().fail(TransportError::ConnectionError("refused".into())),
        );
        let registry = registry(&transport);

        assert!(registry.relay("Device 2", RelayAction::Off).await.is_err());
        assert_eq!(
            registry.message().as_deref(),
            Some("Error turning off relay on 192.168.1.23")
        );
    }

    #[tokio::test]
    async fn unknown_device_is_not_found() {
        let transport = Arc::new(ScriptedTransport::new());
        let registry = registry(&transport);
        assert!(matches!(
            registry.relay("Device 9", RelayAction::On).await,
            Err(Error::DeviceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn without_discovery_resolve_is_noop() {
        let transport = Arc::new(ScriptedTransport::new());
        let registry = DeviceRegistry::new(Arc::clone(&transport))
            .with_device("Device 3", addr("192.168.1.61"));
        assert_eq!(registry.resolve_pending().await.unwrap(), None);
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn infos_keep_order() {
        let transport = Arc::new(ScriptedTransport::new());
        let names: Vec<_> = registry(&transport)
            .infos()
            .into_iter()
            .map(|info| (info.name, info.resolved))
            .collect();
        assert_eq!(
            names,
            vec![("Device 1".to_string(), false), ("Device 2".to_string(), true)]
        );
    }
}
