// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT store backend.
//!
//! Each relay is a retained message on `relays/{relayId}` with payload
//! `true` or `false`; an empty retained message deletes it. One connection
//! per backend subscribes to `relays/+`, keeps the latest value of every
//! relay in a local cache and dispatches every message it receives.
//!
//! A write becomes visible, locally too, when the broker echoes it back.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::{StoreBackend, decode_value, encode_value};
use crate::error::StoreError;
use crate::subscription::CallbackRegistry;
use crate::types::RelayId;

/// Global counter for generating unique client IDs.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Topic prefix of relay states.
pub const TOPIC_PREFIX: &str = "relays";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const SUBSCRIBE_SETTLE: Duration = Duration::from_millis(500);

/// Connection settings for [`MqttBackend`].
///
/// # Examples
///
/// ```no_run
/// use espdeck::store::{MqttStoreConfig, RelayStateStore};
///
/// # async fn example() -> Result<(), espdeck::error::StoreError> {
/// let backend = MqttStoreConfig::new("mqtt://192.168.1.10:1883")
///     .with_credentials("dashboard", "secret")
///     .connect()
///     .await?;
/// let store = RelayStateStore::new(backend);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MqttStoreConfig {
    broker: String,
    username: Option<String>,
    password: Option<String>,
    client_id: Option<String>,
    keep_alive: Duration,
    connect_timeout: Duration,
}

impl MqttStoreConfig {
    /// Creates settings for the broker at `broker`
    /// (`mqtt://host:port`, `tcp://host:port` or `host[:port]`).
    #[must_use]
    pub fn new(broker: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            username: None,
            password: None,
            client_id: None,
            keep_alive: Duration::from_secs(30),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets authentication credentials for the broker.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets a custom client ID.
    #[must_use]
    pub fn with_client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Sets the keep-alive interval.
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Sets how long [`connect`](Self::connect) waits for the broker.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns the broker URL.
    #[must_use]
    pub fn broker(&self) -> &str {
        &self.broker
    }

    /// Connects and starts following `relays/+`.
    ///
    /// Resolves once the broker has accepted the connection and retained
    /// states have had a short time to arrive.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ConnectionFailed` if the URL is invalid or the
    /// broker does not accept the connection within the connect timeout.
    pub async fn connect(self) -> Result<MqttBackend, StoreError> {
        MqttBackend::connect(self).await
    }
}

/// Relay store kept as retained messages on an MQTT broker.
pub struct MqttBackend {
    client: AsyncClient,
    cache: Arc<RwLock<HashMap<RelayId, bool>>>,
    registry: Arc<CallbackRegistry>,
    task: JoinHandle<()>,
}

impl MqttBackend {
    async fn connect(config: MqttStoreConfig) -> Result<Self, StoreError> {
        let (host, port) = parse_mqtt_url(&config.broker)?;

        let client_id = config.client_id.clone().unwrap_or_else(|| {
            let counter = CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
            format!("espdeck_{}_{}", std::process::id(), counter)
        });

        let mut mqtt_options = MqttOptions::new(&client_id, host, port);
        mqtt_options.set_keep_alive(config.keep_alive);
        mqtt_options.set_clean_session(true);
        if let (Some(username), Some(password)) = (config.username, config.password) {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);
        let cache = Arc::new(RwLock::new(HashMap::new()));
        let registry = Arc::new(CallbackRegistry::new());

        let (ready_tx, ready_rx) = oneshot::channel();
        let task = tokio::spawn(handle_mqtt_events(
            event_loop,
            client.clone(),
            Arc::clone(&cache),
            Arc::clone(&registry),
            ready_tx,
        ));

        match tokio::time::timeout(config.connect_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(message))) => {
                task.abort();
                return Err(StoreError::ConnectionFailed(message));
            }
            Ok(Err(_)) | Err(_) => {
                task.abort();
                return Err(StoreError::ConnectionFailed(format!(
                    "no answer from {} within {} ms",
                    config.broker,
                    config.connect_timeout.as_millis()
                )));
            }
        }

        // Give the broker time to acknowledge the subscription and replay
        // retained states before the cache is read.
        tokio::time::sleep(SUBSCRIBE_SETTLE).await;

        tracing::info!(broker = %config.broker, %client_id, "MQTT relay store connected");
        Ok(Self {
            client,
            cache,
            registry,
            task,
        })
    }

    /// Returns every relay currently known and its value.
    #[must_use]
    pub fn entries(&self) -> Vec<(RelayId, bool)> {
        let mut entries: Vec<_> = self
            .cache
            .read()
            .iter()
            .map(|(relay, value)| (relay.clone(), *value))
            .collect();
        entries.sort();
        entries
    }

    fn ensure_running(&self) -> Result<(), StoreError> {
        if self.task.is_finished() {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    async fn publish(&self, relay: &RelayId, payload: &'static str) -> Result<(), StoreError> {
        self.ensure_running()?;
        let topic = relay.store_path();
        tracing::debug!(topic = %topic, payload = %payload, "Publishing relay state");
        self.client
            .publish(topic, QoS::AtLeastOnce, true, payload)
            .await?;
        Ok(())
    }
}

impl StoreBackend for MqttBackend {
    async fn get(&self, relay: &RelayId) -> Result<Option<bool>, StoreError> {
        self.ensure_running()?;
        Ok(self.cache.read().get(relay).copied())
    }

    async fn set(&self, relay: &RelayId, value: bool) -> Result<(), StoreError> {
        self.publish(relay, encode_value(value)).await
    }

    async fn remove(&self, relay: &RelayId) -> Result<(), StoreError> {
        self.publish(relay, "").await
    }

    fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }
}

impl Drop for MqttBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for MqttBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttBackend")
            .field("relays", &self.cache.read().len())
            .field("running", &!self.task.is_finished())
            .finish_non_exhaustive()
    }
}

/// Parses an MQTT URL into host and port.
fn parse_mqtt_url(url: &str) -> Result<(String, u16), StoreError> {
    let url = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port) = if let Some((h, p)) = url.rsplit_once(':') {
        let port = p
            .parse()
            .map_err(|_| StoreError::ConnectionFailed(format!("Invalid port: {p}")))?;
        (h.to_string(), port)
    } else {
        (url.to_string(), 1883)
    };

    if host.is_empty() {
        return Err(StoreError::ConnectionFailed("missing broker host".to_string()));
    }
    Ok((host, port))
}

/// Extracts the relay from a `relays/{id}` topic.
fn relay_of(topic: &str) -> Option<RelayId> {
    let id = topic.strip_prefix(TOPIC_PREFIX)?.strip_prefix('/')?;
    RelayId::new(id).ok()
}

/// Applies one received state message to the cache.
///
/// Returns the value to dispatch, or `None` if nothing changed for
/// subscribers (a delete of an unknown relay or a malformed payload).
fn apply_message(
    cache: &RwLock<HashMap<RelayId, bool>>,
    relay: &RelayId,
    payload: &[u8],
) -> Option<Option<bool>> {
    match decode_value(relay, payload) {
        Ok(Some(value)) => {
            cache.write().insert(relay.clone(), value);
            Some(Some(value))
        }
        Ok(None) => cache.write().remove(relay).map(|_| None),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring relay state message");
            None
        }
    }
}

/// Handles MQTT events in the background.
async fn handle_mqtt_events(
    mut event_loop: EventLoop,
    client: AsyncClient,
    cache: Arc<RwLock<HashMap<RelayId, bool>>>,
    registry: Arc<CallbackRegistry>,
    ready_tx: oneshot::Sender<Result<(), String>>,
) {
    let filter = format!("{TOPIC_PREFIX}/+");
    let mut ready_tx = Some(ready_tx);

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT connected");
                // Clean sessions drop subscriptions, so subscribe on every connect.
                if let Err(e) = client.try_subscribe(filter.as_str(), QoS::AtLeastOnce) {
                    tracing::error!(error = %e, "MQTT subscribe failed");
                }
                if let Some(tx) = ready_tx.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let Some(relay) = relay_of(&publish.topic) else {
                    continue;
                };
                tracing::debug!(
                    topic = %publish.topic,
                    retained = publish.retain,
                    "Received relay state"
                );
                if let Some(value) = apply_message(&cache, &relay, &publish.payload) {
                    registry.dispatch(&relay, value);
                }
            }
            Ok(_) => {}
            Err(e) => {
                if let Some(tx) = ready_tx.take() {
                    let _ = tx.send(Err(e.to_string()));
                    return;
                }
                tracing::error!(error = %e, "MQTT event loop error");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay(id: &str) -> RelayId {
        RelayId::new(id).unwrap()
    }

    #[test]
    fn parse_mqtt_url_with_port() {
        let (host, port) = parse_mqtt_url("mqtt://192.168.1.50:1883").unwrap();
        assert_eq!(host, "192.168.1.50");
        assert_eq!(port, 1883);
    }

    #[test]
    fn parse_mqtt_url_default_port_and_tcp_scheme() {
        assert_eq!(parse_mqtt_url("broker.local").unwrap(), ("broker.local".to_string(), 1883));
        assert_eq!(
            parse_mqtt_url("tcp://broker.local:8883").unwrap(),
            ("broker.local".to_string(), 8883)
        );
    }

    #[test]
    fn parse_mqtt_url_rejects_bad_port() {
        assert!(matches!(
            parse_mqtt_url("mqtt://broker:abc"),
            Err(StoreError::ConnectionFailed(_))
        ));
        assert!(parse_mqtt_url("mqtt://:1883").is_err());
    }

    #[test]
    fn relay_topics() {
        assert_eq!(relay_of("relays/relay1"), Some(relay("relay1")));
        assert_eq!(relay_of("relays/"), None);
        assert_eq!(relay_of("relaysx/relay1"), None);
        assert_eq!(relay_of("other/relay1"), None);
    }

    #[test]
    fn apply_messages_to_cache() {
        let cache = RwLock::new(HashMap::new());
        let id = relay("relay1");

        assert_eq!(apply_message(&cache, &id, b"true"), Some(Some(true)));
        assert_eq!(apply_message(&cache, &id, b"true"), Some(Some(true)));
        assert_eq!(cache.read().get(&id), Some(&true));

        assert_eq!(apply_message(&cache, &id, b"garbage"), None);
        assert_eq!(cache.read().get(&id), Some(&true));

        assert_eq!(apply_message(&cache, &id, b""), Some(None));
        assert_eq!(apply_message(&cache, &id, b""), None);
        assert!(cache.read().is_empty());
    }

    #[test]
    fn config_builder() {
        let config = MqttStoreConfig::new("mqtt://broker:1883")
            .with_credentials("user", "pass")
            .with_client_id("dash")
            .with_keep_alive(Duration::from_secs(10))
            .with_connect_timeout(Duration::from_secs(1));
        assert_eq!(config.broker(), "mqtt://broker:1883");
        assert_eq!(config.client_id.as_deref(), Some("dash"));
        assert_eq!(config.keep_alive, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = MqttStoreConfig::new(format!("mqtt://127.0.0.1:{port}"))
            .with_connect_timeout(Duration::from_secs(2))
            .connect()
            .await;
        assert!(matches!(result, Err(StoreError::ConnectionFailed(_))));
    }
}
