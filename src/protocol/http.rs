// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP transport for ESP32 devices.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use crate::command::Method;
use crate::error::TransportError;
use crate::protocol::{DEFAULT_TIMEOUT, DeviceRequest, DeviceResponse, Transport};
use crate::types::DeviceAddress;

// ============================================================================
// HttpConfig
// ============================================================================

/// Configuration for an [`HttpTransport`].
///
/// # Examples
///
/// ```
/// use espdeck::protocol::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig::new()
///     .with_timeout(Duration::from_secs(5))
///     .with_user_agent("garden-panel/1.0");
/// assert_eq!(config.timeout(), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    timeout: Duration,
    user_agent: Option<String>,
}

impl HttpConfig {
    /// Creates a configuration with the default 10 second timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Sets the default request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the `User-Agent` header sent with every request.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Returns the default request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the user agent, if set.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Creates an `HttpTransport` from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn into_transport(self) -> Result<HttpTransport, TransportError> {
        let mut builder = Client::builder();
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(HttpTransport {
            client,
            timeout: self.timeout,
        })
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// HttpTransport
// ============================================================================

/// HTTP transport for talking to devices on the local network.
///
/// Each request is bounded by a timeout. The deadline is a `tokio` timer that
/// races the request: whichever finishes first drops the other, so an expired
/// request is aborted and a completed request leaves no pending timer behind.
///
/// Cloning is cheap; clones share the connection pool.
///
/// # Examples
///
/// ```no_run
/// use espdeck::protocol::{HttpTransport, Transport};
/// use espdeck::command::RelayCommand;
/// use espdeck::types::DeviceAddress;
///
/// # async fn example() -> espdeck::Result<()> {
/// let transport = HttpTransport::new()?;
/// let address = DeviceAddress::new("192.168.1.50")?;
/// let response = transport.send_command(&address, &RelayCommand::on()).await?;
/// println!("{}", response.body());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, TransportError> {
        HttpConfig::new().into_transport()
    }

    /// Returns the default request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn exchange(
        &self,
        url: &str,
        request: &DeviceRequest,
    ) -> Result<DeviceResponse, TransportError> {
        let builder = match request.method() {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        let builder = builder.header(CONTENT_TYPE, "application/json");
        let builder = match request.body() {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder.send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::RequestFailed {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(classify)?;

        tracing::debug!(url = %url, status = status.as_u16(), body = %body, "Received device response");

        Ok(DeviceResponse::new(status.as_u16(), body))
    }
}

impl Transport for HttpTransport {
    async fn send(
        &self,
        address: &DeviceAddress,
        request: &DeviceRequest,
    ) -> Result<DeviceResponse, TransportError> {
        let url = address.url(request.path());
        let timeout = request.timeout().unwrap_or(self.timeout);

        tracing::debug!(method = %request.method(), url = %url, "Sending device request");

        match tokio::time::timeout(timeout, self.exchange(&url, request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(url = %url, ?timeout, "Device request timed out");
                Err(TransportError::Timeout(duration_ms(timeout)))
            }
        }
    }
}

/// Maps a `reqwest` failure onto the transport error taxonomy.
fn classify(error: reqwest::Error) -> TransportError {
    if let Some(status) = error.status() {
        return TransportError::RequestFailed {
            status: status.as_u16(),
        };
    }
    TransportError::ConnectionError(error.to_string())
}

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_config_default_values() {
        let config = HttpConfig::new();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(config.user_agent().is_none());
    }

    #[test]
    fn http_config_with_timeout() {
        let config = HttpConfig::default().with_timeout(Duration::from_secs(30));
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn http_config_into_transport_keeps_timeout() {
        let transport = HttpConfig::new()
            .with_timeout(Duration::from_millis(1500))
            .with_user_agent("test-agent")
            .into_transport()
            .unwrap();
        assert_eq!(transport.timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn duration_ms_saturates() {
        assert_eq!(duration_ms(Duration::from_millis(10_000)), 10_000);
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn connection_refused_is_connection_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = HttpTransport::new().unwrap();
        let address = DeviceAddress::new(format!("127.0.0.1:{port}")).unwrap();
        let err = transport
            .send(&address, &DeviceRequest::get("/status"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ConnectionError(_)), "{err:?}");
    }
}
