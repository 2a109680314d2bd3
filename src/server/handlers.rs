// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, RawQuery, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use super::{AppError, AppState};
use crate::device::DeviceInfo;
use crate::error::ValueError;
use crate::manager::{MotorState, RelayStatus};
use crate::protocol::Transport;
use crate::proxy::{ProxyError, ProxyReply, ProxyRequest};
use crate::store::StoreBackend;
use crate::telemetry::HistorySnapshot;
use crate::types::{Direction, MotorSpeed, PinId, RelayAction, RelayId, SwitchState};

/// Devices of the relay panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicesView {
    /// Registered devices, in panel order.
    pub devices: Vec<DeviceInfo>,
    /// Outcome of the last panel action.
    pub message: Option<String>,
}

/// Stored value of one relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayValue {
    /// The relay.
    pub relay_id: RelayId,
    /// Its value, `None` if unset.
    pub value: Option<bool>,
}

/// Body of `PUT /relays/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRelayBody {
    /// New value.
    pub value: bool,
}

/// Body of `POST /motor/move`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveBody {
    /// Drive direction.
    pub direction: Direction,
}

/// Body of `POST /motor/speed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedBody {
    /// PWM speed, `0..=255`.
    pub speed: i64,
}

pub(super) async fn health() -> &'static str {
    "ok"
}

pub(super) async fn relay_proxy<T, B>(
    State(state): State<AppState<T, B>>,
    RawQuery(query): RawQuery,
) -> Result<Json<ProxyReply>, AppError>
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    let request = ProxyRequest::from_query(query.as_deref().unwrap_or_default())?;
    Ok(Json(state.proxy.forward_request(&request).await?))
}

pub(super) async fn device_relay<T, B>(
    State(state): State<AppState<T, B>>,
    Path((device_ip, action)): Path<(String, String)>,
) -> Result<Json<ProxyReply>, AppError>
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    let reply = state
        .proxy
        .forward(Some(&device_ip), Some(&action))
        .await
        .map_err(ProxyError::into_generic)?;
    Ok(Json(reply))
}

pub(super) async fn list_devices<T, B>(State(state): State<AppState<T, B>>) -> Json<DevicesView>
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    Json(DevicesView {
        devices: state.registry.infos(),
        message: state.registry.message(),
    })
}

pub(super) async fn resolve_devices<T, B>(
    State(state): State<AppState<T, B>>,
) -> Result<Json<DevicesView>, AppError>
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    state.registry.resolve_pending().await?;
    Ok(list_devices(State(state)).await)
}

pub(super) async fn registry_relay<T, B>(
    State(state): State<AppState<T, B>>,
    Path((name, action)): Path<(String, String)>,
) -> Result<Json<ProxyReply>, AppError>
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    let action: RelayAction = action.parse()?;
    let message = state.registry.relay(&name, action).await?;
    Ok(Json(ProxyReply { message }))
}

pub(super) async fn board_status<T, B>(
    State(state): State<AppState<T, B>>,
) -> Json<BTreeMap<RelayId, RelayStatus>>
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    Json(state.board.statuses())
}

pub(super) async fn switch_board<T, B>(
    State(state): State<AppState<T, B>>,
    Path((relay, action)): Path<(String, String)>,
) -> Result<Json<RelayStatus>, AppError>
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    let relay = RelayId::new(relay)?;
    let target = switch_target(&action)?;
    Ok(Json(state.board.switch(&relay, target).await?))
}

pub(super) async fn motor_state<T, B>(State(state): State<AppState<T, B>>) -> Json<MotorState>
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    Json(state.motor.state())
}

pub(super) async fn move_motor<T, B>(
    State(state): State<AppState<T, B>>,
    body: Result<Json<MoveBody>, JsonRejection>,
) -> Result<Json<MotorState>, AppError>
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    let Json(body) = body?;
    Ok(Json(state.motor.drive(body.direction).await?))
}

pub(super) async fn set_motor_speed<T, B>(
    State(state): State<AppState<T, B>>,
    body: Result<Json<SpeedBody>, JsonRejection>,
) -> Result<Json<MotorState>, AppError>
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    let Json(body) = body?;
    let speed = MotorSpeed::try_from(body.speed)?;
    Ok(Json(state.motor.set_speed(speed).await?))
}

pub(super) async fn sensor_history<T, B>(
    State(state): State<AppState<T, B>>,
) -> Json<HistorySnapshot>
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    Json(state.poller.snapshot())
}

pub(super) async fn switch_pin<T, B>(
    State(state): State<AppState<T, B>>,
    Path((pin, switch)): Path<(String, String)>,
) -> Result<Json<HistorySnapshot>, AppError>
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    let pin: PinId = pin.parse()?;
    let on = switch_target(&switch)?.is_on();
    state.poller.toggle_pin(pin, on).await?;
    Ok(Json(state.poller.snapshot()))
}

pub(super) async fn get_relay<T, B>(
    State(state): State<AppState<T, B>>,
    Path(id): Path<String>,
) -> Result<Json<RelayValue>, AppError>
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    let relay_id = RelayId::new(id)?;
    let value = state.store.get(&relay_id).await?;
    Ok(Json(RelayValue { relay_id, value }))
}

pub(super) async fn set_relay<T, B>(
    State(state): State<AppState<T, B>>,
    Path(id): Path<String>,
    body: Result<Json<SetRelayBody>, JsonRejection>,
) -> Result<Json<RelayValue>, AppError>
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    let Json(body) = body?;
    let relay_id = RelayId::new(id)?;
    state.store.set(&relay_id, body.value).await?;
    Ok(Json(RelayValue {
        relay_id,
        value: Some(body.value),
    }))
}

pub(super) async fn remove_relay<T, B>(
    State(state): State<AppState<T, B>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError>
where
    T: Transport + Clone + 'static,
    B: StoreBackend + 'static,
{
    let relay_id = RelayId::new(id)?;
    state.store.remove(&relay_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `on` or `off`, case-insensitive.
fn switch_target(action: &str) -> Result<SwitchState, ValueError> {
    if action.eq_ignore_ascii_case("on") {
        Ok(SwitchState::On)
    } else if action.eq_ignore_ascii_case("off") {
        Ok(SwitchState::Off)
    } else {
        Err(ValueError::InvalidRelayAction(action.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_target_accepts_on_and_off() {
        assert_eq!(switch_target("on").unwrap(), SwitchState::On);
        assert_eq!(switch_target("OFF").unwrap(), SwitchState::Off);
        assert!(switch_target("blink").is_err());
        assert!(switch_target("").is_err());
    }

    #[test]
    fn relay_value_is_camel_case() {
        let value = RelayValue {
            relay_id: RelayId::new("relay1").unwrap(),
            value: None,
        };
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            serde_json::json!({ "relayId": "relay1", "value": null })
        );
    }
}
