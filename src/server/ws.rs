// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Push updates of one relay to a WebSocket client.
//!
//! The server sends a [`RelayValue`] text frame with the current value right
//! after the upgrade and one per change afterwards. The client may send
//! `{"value": true|false}` frames to write the relay.

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::handlers::{RelayValue, SetRelayBody};
use super::{AppError, AppState};
use crate::protocol::Transport;
use crate::store::{RelayStateStore, StoreBackend};
use crate::types::RelayId;

pub(super) async fn relay_socket<T, B>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<T, B>>,
    Path(id): Path<String>,
) -> Result<Response, AppError>
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    let relay = RelayId::new(id)?;
    let store = state.store.clone();
    Ok(ws.on_upgrade(move |socket| relay_session(socket, store, relay)))
}

async fn relay_session<B: StoreBackend + 'static>(
    socket: WebSocket,
    store: RelayStateStore<B>,
    relay: RelayId,
) {
    let client = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let subscription = match store
        .subscribe(&relay, move |value| {
            let _ = tx.send(value);
        })
        .await
    {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::warn!(%client, %relay, error = %e, "Relay subscription failed");
            return;
        }
    };
    tracing::info!(%client, %relay, "WebSocket client connected");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            Some(value) = rx.recv() => {
                let frame = RelayValue { relay_id: relay.clone(), value };
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(%client, error = %e, "Failed to encode relay value");
                        break;
                    }
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    apply_client_write(&store, &relay, client, &text).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(%client, error = %e, "WebSocket receive failed");
                    break;
                }
            },
        }
    }

    drop(subscription);
    tracing::info!(%client, %relay, "WebSocket client disconnected");
}

async fn apply_client_write<B: StoreBackend>(
    store: &RelayStateStore<B>,
    relay: &RelayId,
    client: Uuid,
    text: &str,
) {
    match serde_json::from_str::<SetRelayBody>(text) {
        Ok(body) => {
            if let Err(e) = store.set(relay, body.value).await {
                tracing::warn!(%client, %relay, error = %e, "Relay write from client failed");
            }
        }
        Err(e) => tracing::debug!(%client, error = %e, "Ignoring malformed client frame"),
    }
}
