// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `espdeck` service binary.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use espdeck::config::{AppConfig, StoreConfig};
use espdeck::manager::{DeviceRegistry, MotorController, RelayBoard};
use espdeck::protocol::{HttpConfig, HttpTransport};
use espdeck::proxy::RelayProxy;
use espdeck::server::{self, AppState};
use espdeck::store::{RelayStateStore, StoreBackend};
use espdeck::telemetry::{PinHistory, SensorPoller};
use espdeck::Device;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "espdeck=info,tower_http=debug".into()),
        )
        .init();

    tracing::info!("Starting espdeck...");

    let config = AppConfig::load()?;
    let transport = HttpConfig::new()
        .with_timeout(config.transport.timeout())
        .into_transport()
        .context("failed to create HTTP client")?;

    match &config.store {
        StoreConfig::Memory => {
            tracing::info!("Using in-memory relay store");
            run(&config, transport, RelayStateStore::in_memory()).await
        }
        #[cfg(feature = "mqtt")]
        StoreConfig::Mqtt {
            broker,
            username,
            password,
        } => {
            let mut mqtt = espdeck::store::MqttStoreConfig::new(broker.clone());
            if let (Some(username), Some(password)) = (username, password) {
                mqtt = mqtt.with_credentials(username.clone(), password.clone());
            }
            let backend = mqtt
                .connect()
                .await
                .with_context(|| format!("failed to connect to MQTT broker {broker}"))?;
            tracing::info!(%broker, "Using MQTT relay store");
            run(&config, transport, RelayStateStore::new(backend)).await
        }
        #[cfg(not(feature = "mqtt"))]
        StoreConfig::Mqtt { .. } => {
            anyhow::bail!("MQTT store configured but espdeck was built without the `mqtt` feature")
        }
    }
}

async fn run<B: StoreBackend + 'static>(
    config: &AppConfig,
    transport: HttpTransport,
    store: RelayStateStore<B>,
) -> anyhow::Result<()> {
    let mut registry = DeviceRegistry::new(transport.clone()).with_discovered(
        config.discovery.device.clone(),
        config
            .discovery
            .bootstrap_address()
            .context("invalid discovery bootstrap address")?,
    );
    for entry in &config.devices {
        let address = entry
            .device_address()
            .with_context(|| format!("invalid address for {}", entry.name))?;
        registry = registry.with_device(entry.name.clone(), address);
    }
    let registry = Arc::new(registry);

    // Discovery runs in the background; the discovered device rejects
    // commands until it resolves.
    let pending = Arc::clone(&registry);
    tokio::spawn(async move {
        if let Err(e) = pending.resolve_pending().await {
            tracing::warn!(error = %e, "Device discovery failed");
        }
    });

    let poller = SensorPoller::with_history(
        transport.clone(),
        config
            .poller
            .device_address()
            .context("invalid sensor device address")?,
        PinHistory::new(config.poller.history_capacity),
    );
    let polling = poller.start(config.poller.interval());

    let board = RelayBoard::new(
        Device::new(
            "Relay board",
            config
                .board
                .device_address()
                .context("invalid relay board address")?,
            transport.clone(),
        ),
        config.board.relay_ids().context("invalid relay board relay")?,
    );

    let motor_device = match config
        .motor
        .device_address()
        .context("invalid motor address")?
    {
        Some(address) => Device::new("Motor", address, transport.clone()),
        None => {
            tracing::warn!("No motor address configured; motor commands will be rejected");
            Device::unresolved("Motor", transport.clone())
        }
    };

    let state = AppState {
        proxy: Arc::new(RelayProxy::new(transport)),
        registry,
        poller,
        board: Arc::new(board),
        motor: Arc::new(MotorController::new(motor_device)),
        store,
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    server::serve(listener, server::router(state), shutdown_signal()).await?;

    polling.stop().await;
    tracing::info!("espdeck stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
