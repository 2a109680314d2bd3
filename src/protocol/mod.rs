// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport layer for talking to devices.
//!
//! A [`Transport`] sends one [`DeviceRequest`] to a device address and returns
//! the raw body. It applies a hard timeout and classifies every failure as a
//! [`TransportError`]; it never retries and never interprets the body.
//!
//! - [`HttpTransport`]: plain HTTP via `reqwest`, the transport used in production
//! - [`HttpConfig`]: builder-style configuration for [`HttpTransport`]

mod http;

pub use http::{HttpConfig, HttpTransport};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::command::{Command, Method};
use crate::error::{ParseError, TransportError};
use crate::types::DeviceAddress;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A single request to a device endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    timeout: Option<Duration>,
}

impl DeviceRequest {
    /// Creates a `GET` request for `path`.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
            timeout: None,
        }
    }

    /// Creates a `POST` request for `path` with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
            timeout: None,
        }
    }

    /// Creates the request described by a command.
    #[must_use]
    pub fn from_command<C: Command + ?Sized>(command: &C) -> Self {
        Self {
            method: command.method(),
            path: command.path(),
            body: command.body(),
            timeout: None,
        }
    }

    /// Overrides the transport's default timeout for this request.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the JSON body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    /// Returns the per-request timeout override, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Successful response from a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceResponse {
    status: u16,
    body: String,
}

impl DeviceResponse {
    /// Creates a response with the given status and body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns the HTTP status code (always 2xx).
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns the raw response body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Consumes the response and returns the raw body.
    #[must_use]
    pub fn into_body(self) -> String {
        self.body
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns error if the body cannot be parsed into the target type.
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> Result<T, ParseError> {
        serde_json::from_str(&self.body).map_err(Into::into)
    }
}

/// Sends requests to devices.
///
/// Implementations must enforce the request timeout (the request's own
/// override, or their default) and report a [`TransportError`] for timeouts,
/// non-2xx answers and connection failures.
pub trait Transport: Send + Sync {
    /// Sends `request` to `http://{address}{path}`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request times out, the device answers
    /// with a non-2xx status, or no response is received.
    fn send(
        &self,
        address: &DeviceAddress,
        request: &DeviceRequest,
    ) -> impl Future<Output = Result<DeviceResponse, TransportError>> + Send;

    /// Sends the request described by `command`.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    fn send_command<C: Command + ?Sized>(
        &self,
        address: &DeviceAddress,
        command: &C,
    ) -> impl Future<Output = Result<DeviceResponse, TransportError>> + Send {
        let request = DeviceRequest::from_command(command);
        async move { self.send(address, &request).await }
    }
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        address: &DeviceAddress,
        request: &DeviceRequest,
    ) -> impl Future<Output = Result<DeviceResponse, TransportError>> + Send {
        T::send(self, address, request)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for unit tests.

    use std::collections::VecDeque;

    use parking_lot::Mutex;

    use super::*;

    /// A request recorded by [`ScriptedTransport`].
    #[derive(Debug, Clone, PartialEq)]
    pub struct Recorded {
        pub url: String,
        pub method: Method,
        pub body: Option<serde_json::Value>,
    }

    /// Transport that answers from a queue and records every request.
    #[derive(Debug, Default)]
    pub struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<DeviceResponse, TransportError>>>,
        fallback: Mutex<Option<Result<DeviceResponse, TransportError>>>,
        requests: Mutex<Vec<Recorded>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues a successful reply with `body`.
        pub fn reply(self, body: &str) -> Self {
            self.replies
                .lock()
                .push_back(Ok(DeviceResponse::new(200, body)));
            self
        }

        /// Queues a failed reply.
        pub fn fail(self, error: TransportError) -> Self {
            self.replies.lock().push_back(Err(error));
            self
        }

        /// Reply used once the queue is empty.
        pub fn otherwise(self, reply: Result<DeviceResponse, TransportError>) -> Self {
            *self.fallback.lock() = Some(reply);
            self
        }

        pub fn requests(&self) -> Vec<Recorded> {
            self.requests.lock().clone()
        }

        pub fn urls(&self) -> Vec<String> {
            self.requests.lock().iter().map(|r| r.url.clone()).collect()
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().len()
        }
    }

    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            address: &DeviceAddress,
            request: &DeviceRequest,
        ) -> Result<DeviceResponse, TransportError> {
            self.requests.lock().push(Recorded {
                url: address.url(request.path()),
                method: request.method(),
                body: request.body().cloned(),
            });
            let next = self.replies.lock().pop_front();
            next.or_else(|| self.fallback.lock().clone())
                .unwrap_or_else(|| {
                    Err(TransportError::ConnectionError(
                        "no scripted reply".to_string(),
                    ))
                })
        }
    }
}
