// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP boundary of the dashboard.
//!
//! | Route | Behaviour |
//! |---|---|
//! | `GET /health` | `ok` |
//! | `GET /relay-proxy?deviceIp=..&action=..` | forward a relay action, `{message}` or `{error}` |
//! | `GET /{deviceIp}/relay/{action}` | same, with a single generic failure message |
//! | `GET /devices` | registered devices and the last panel message |
//! | `POST /devices/resolve` | resolve the discovered device |
//! | `POST /devices/{name}/relay/{action}` | relay action on a registered device |
//! | `GET /board`, `POST /board/{relay}/{on\|off}` | relay board status and switching |
//! | `GET /motor`, `POST /motor/move`, `POST /motor/speed` | motor drive |
//! | `GET /sensors`, `POST /sensors/pins/{pin}/{on\|off}` | sensor history and pin switching |
//! | `GET/PUT/DELETE /relays/{id}` | shared relay state |
//! | `GET /relays/{id}/ws` | push updates of one relay over a WebSocket |
//!
//! Errors are rendered as `{"error": message}` by [`AppError`].

mod error;
mod handlers;
mod ws;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::AppError;
pub use handlers::{DevicesView, MoveBody, RelayValue, SetRelayBody, SpeedBody};

use crate::manager::{DeviceRegistry, MotorController, RelayBoard};
use crate::protocol::Transport;
use crate::proxy::RelayProxy;
use crate::store::{RelayStateStore, StoreBackend};
use crate::telemetry::SensorPoller;

/// Components shared by all handlers.
pub struct AppState<T, B> {
    /// Forwards raw relay actions.
    pub proxy: Arc<RelayProxy<T>>,
    /// Relay panel devices.
    pub registry: Arc<DeviceRegistry<T>>,
    /// Sensor device poller.
    pub poller: SensorPoller<T>,
    /// Relay board.
    pub board: Arc<RelayBoard<T>>,
    /// Motor drive.
    pub motor: Arc<MotorController<T>>,
    /// Shared relay state.
    pub store: RelayStateStore<B>,
}

impl<T, B> Clone for AppState<T, B> {
    fn clone(&self) -> Self {
        Self {
            proxy: Arc::clone(&self.proxy),
            registry: Arc::clone(&self.registry),
            poller: self.poller.clone(),
            board: Arc::clone(&self.board),
            motor: Arc::clone(&self.motor),
            store: self.store.clone(),
        }
    }
}

/// Builds the router with tracing and permissive CORS.
pub fn router<T, B>(state: AppState<T, B>) -> Router
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    Router::new()
        .route("/health", get(handlers::health))
        .route("/relay-proxy", get(handlers::relay_proxy::<T, B>))
        .route("/:device_ip/relay/:action", get(handlers::device_relay::<T, B>))
        .route("/devices", get(handlers::list_devices::<T, B>))
        .route("/devices/resolve", post(handlers::resolve_devices::<T, B>))
        .route(
            "/devices/:name/relay/:action",
            post(handlers::registry_relay::<T, B>),
        )
        .route("/board", get(handlers::board_status::<T, B>))
        .route("/board/:relay/:action", post(handlers::switch_board::<T, B>))
        .route("/motor", get(handlers::motor_state::<T, B>))
        .route("/motor/move", post(handlers::move_motor::<T, B>))
        .route("/motor/speed", post(handlers::set_motor_speed::<T, B>))
        .route("/sensors", get(handlers::sensor_history::<T, B>))
        .route(
            "/sensors/pins/:pin/:state",
            post(handlers::switch_pin::<T, B>),
        )
        .route(
            "/relays/:id",
            get(handlers::get_relay::<T, B>)
                .put(handlers::set_relay::<T, B>)
                .delete(handlers::remove_relay::<T, B>),
        )
        .route("/relays/:id/ws", get(ws::relay_socket::<T, B>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serves `router` on `listener` until `shutdown` completes.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
