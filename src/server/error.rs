// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mapping of library errors to HTTP responses.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::{Error, PollError, StoreError, ValueError};
use crate::manager::BoardError;
use crate::proxy::ProxyError;

/// Error returned by a handler, rendered as `{"error": message}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed path, query or body.
    #[error("{0}")]
    BadRequest(String),

    /// No such device or relay.
    #[error("{0}")]
    NotFound(String),

    /// The request conflicts with the current state.
    #[error("{0}")]
    Conflict(String),

    /// A device failed or answered with something unusable.
    #[error("{0}")]
    BadGateway(String),

    /// A component is not ready, e.g. an unresolved device.
    #[error("{0}")]
    Unavailable(String),

    /// Any other failure.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "Request failed");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ProxyError> for AppError {
    fn from(err: ProxyError) -> Self {
        // The proxy contract only knows 400 and 500.
        if err.status_code() == 400 {
            Self::BadRequest(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<ValueError> for AppError {
    fn from(err: ValueError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Closed => Self::Unavailable(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<PollError> for AppError {
    fn from(err: PollError) -> Self {
        Self::BadGateway(err.to_string())
    }
}

impl From<BoardError> for AppError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::UnknownRelay(_) => Self::NotFound(err.to_string()),
            BoardError::NoChange { .. } | BoardError::Busy(_) => Self::Conflict(err.to_string()),
            BoardError::Failed { .. } => Self::BadGateway(err.to_string()),
        }
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::Value(e) => e.into(),
            Error::Store(e) => e.into(),
            Error::DeviceNotFound(_) => Self::NotFound(err.to_string()),
            Error::DeviceNotResolved(_) => Self::Unavailable(err.to_string()),
            Error::Transport(_) | Error::Parse(_) | Error::Discovery(_) | Error::Poll(_) => {
                Self::BadGateway(err.to_string())
            }
        }
    }
}
