// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relay forwarding for clients that cannot reach devices directly.
//!
//! [`RelayProxy::forward`] turns a `(deviceIp, action)` pair into
//! `GET http://{deviceIp}/relay/{action}` and normalizes the outcome into a
//! [`ProxyReply`] carrying the device's body, or a [`ProxyError`] carrying a
//! message fit for display. Inputs are validated before any request is made.
//!
//! Identical requests are never coalesced or cached: forwarding the same
//! pair twice reaches the device twice.

mod request;

pub use request::ProxyRequest;

use crate::command::RelayCommand;
use crate::error::TransportError;
use crate::protocol::Transport;

/// Message returned for malformed input.
pub const INVALID_INPUT_MESSAGE: &str = "Invalid query parameters.";

/// Message returned when the device did not answer in time.
pub const TIMEOUT_MESSAGE: &str = "Request timed out.";

/// Message returned when no more specific message is available.
pub const FALLBACK_MESSAGE: &str = "Failed to communicate with the device.";

/// Successful forward: the device's body, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProxyReply {
    /// Raw body returned by the device.
    pub message: String,
}

/// Failed forward.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    /// `deviceIp` or `action` is missing, repeated or malformed. No request
    /// was made.
    #[error("Invalid query parameters.")]
    InvalidInput,

    /// The device did not answer before the timeout.
    #[error("Request timed out.")]
    Timeout,

    /// The device answered with an error status or could not be reached.
    #[error("{0}")]
    Device(String),
}

impl ProxyError {
    /// Returns the HTTP status that reports this error: `400` for invalid
    /// input, `500` otherwise.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::Timeout | Self::Device(_) => 500,
        }
    }

    /// Collapses every downstream failure into [`FALLBACK_MESSAGE`].
    ///
    /// Invalid input is kept as is.
    #[must_use]
    pub fn into_generic(self) -> Self {
        match self {
            Self::InvalidInput => Self::InvalidInput,
            Self::Timeout | Self::Device(_) => Self::Device(FALLBACK_MESSAGE.to_string()),
        }
    }
}

impl From<TransportError> for ProxyError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(_) => Self::Timeout,
            other => {
                let message = other.to_string();
                if message.trim().is_empty() {
                    Self::Device(FALLBACK_MESSAGE.to_string())
                } else {
                    Self::Device(message)
                }
            }
        }
    }
}

/// Forwards relay actions to devices.
#[derive(Debug, Clone)]
pub struct RelayProxy<T> {
    transport: T,
}

impl<T: Transport> RelayProxy<T> {
    /// Creates a proxy sending through `transport`.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Validates the raw parameters and forwards them.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidInput`] without any request if a
    /// parameter is missing or malformed, otherwise the mapped transport
    /// failure.
    pub async fn forward(
        &self,
        device_ip: Option<&str>,
        action: Option<&str>,
    ) -> Result<ProxyReply, ProxyError> {
        let request = ProxyRequest::new(device_ip, action)?;
        self.forward_request(&request).await
    }

    /// Forwards an already validated request.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Timeout`] or [`ProxyError::Device`] on failure.
    pub async fn forward_request(&self, request: &ProxyRequest) -> Result<ProxyReply, ProxyError> {
        let command = RelayCommand::new(request.action().clone());
        match self
            .transport
            .send_command(request.device_ip(), &command)
            .await
        {
            Ok(response) => {
                tracing::debug!(
                    device_ip = %request.device_ip(),
                    action = %request.action(),
                    "Relay action forwarded"
                );
                Ok(ProxyReply {
                    message: response.into_body(),
                })
            }
            Err(e) => {
                tracing::warn!(
                    device_ip = %request.device_ip(),
                    action = %request.action(),
                    error = %e,
                    "Error forwarding relay action"
                );
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::protocol::testing::ScriptedTransport;

    fn proxy(transport: &Arc<ScriptedTransport>) -> RelayProxy<Arc<ScriptedTransport>> {
        RelayProxy::new(Arc::clone(transport))
    }

    #[tokio::test]
    async fn forward_returns_device_body() {
        let transport = Arc::new(ScriptedTransport::new().reply("Relay is ON"));
        let reply = proxy(&transport)
            .forward(Some("192.168.1.50"), Some("on"))
            .await
            .unwrap();

        assert_eq!(reply.message, "Relay is ON");
        assert_eq!(transport.urls(), vec!["http://192.168.1.50/relay/on"]);
    }

    #[tokio::test]
    async fn invalid_input_makes_no_request() {
        let transport = Arc::new(ScriptedTransport::new().reply("unused"));
        let proxy = proxy(&transport);

        for (ip, action) in [
            (None, Some("on")),
            (Some("192.168.1.50"), None),
            (None, None),
            (Some(""), Some("on")),
            (Some("192.168.1.50"), Some("")),
            (Some("192.168.1.50/evil"), Some("on")),
            (Some("192.168.1.50"), Some("on/../x")),
        ] {
            assert_eq!(
                proxy.forward(ip, action).await,
                Err(ProxyError::InvalidInput),
                "{ip:?} {action:?}"
            );
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn repeated_forward_is_not_deduplicated() {
        let transport = Arc::new(ScriptedTransport::new().reply("ON").reply("ON"));
        let proxy = proxy(&transport);

        let first = proxy.forward(Some("192.168.1.50"), Some("on")).await;
        let second = proxy.forward(Some("192.168.1.50"), Some("on")).await;

        assert_eq!(first, second);
        assert!(first.is_ok());
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn failures_map_to_messages() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .fail(TransportError::Timeout(10_000))
                .fail(TransportError::RequestFailed { status: 503 })
                .fail(TransportError::ConnectionError("connection refused".to_string()))
                .fail(TransportError::ConnectionError(String::new())),
        );
        let proxy = proxy(&transport);
        let mut messages = Vec::new();
        for _ in 0..4 {
            let err = proxy.forward(Some("10.0.0.9"), Some("off")).await.unwrap_err();
            assert_eq!(err.status_code(), 500);
            messages.push(err.to_string());
        }

        assert_eq!(
            messages,
            vec![
                TIMEOUT_MESSAGE,
                "Request failed with status 503",
                "connection refused",
                FALLBACK_MESSAGE,
            ]
        );
    }

    #[test]
    fn generic_errors_hide_details() {
        assert_eq!(
            ProxyError::Timeout.into_generic().to_string(),
            FALLBACK_MESSAGE
        );
        assert_eq!(
            ProxyError::Device("Request failed with status 404".into())
                .into_generic()
                .to_string(),
            FALLBACK_MESSAGE
        );
        assert_eq!(ProxyError::InvalidInput.into_generic(), ProxyError::InvalidInput);
        assert_eq!(ProxyError::InvalidInput.status_code(), 400);
    }
}
