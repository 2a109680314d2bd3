// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the HTTP device layer using wiremock.

use std::time::Duration;

use espdeck::command::RelayCommand;
use espdeck::discovery::DeviceDiscovery;
use espdeck::manager::{DeviceRegistry, MotorController, RelayBoard};
use espdeck::protocol::{HttpConfig, HttpTransport, Transport};
use espdeck::proxy::{ProxyError, RelayProxy};
use espdeck::telemetry::SensorPoller;
use espdeck::types::{DeviceAddress, Direction, MotorSpeed, PinId, RelayAction, RelayId, SwitchState};
use espdeck::{Device, DiscoveryError, Error, TransportError};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn address_of(server: &MockServer) -> DeviceAddress {
    DeviceAddress::new(server.uri()).unwrap()
}

fn transport() -> HttpTransport {
    HttpTransport::new().unwrap()
}

// ============================================================================
// HttpTransport Tests
// ============================================================================

mod http_transport {
    use super::*;

    #[tokio::test]
    async fn returns_body_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/relay/on"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Relay is ON"))
            .expect(1)
            .mount(&server)
            .await;

        let response = transport()
            .send_command(&address_of(&server), &RelayCommand::on())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), "Relay is ON");
    }

    #[tokio::test]
    async fn non_success_status_is_request_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/relay/on"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = transport()
            .send_command(&address_of(&server), &RelayCommand::on())
            .await
            .unwrap_err();

        assert_eq!(err, TransportError::RequestFailed { status: 503 });
        assert_eq!(err.to_string(), "Request failed with status 503");
    }

    #[tokio::test]
    async fn slow_device_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let transport = HttpConfig::new()
            .with_timeout(Duration::from_millis(100))
            .into_transport()
            .unwrap();
        let err = transport
            .send_command(&address_of(&server), &RelayCommand::on())
            .await
            .unwrap_err();

        assert_eq!(err, TransportError::Timeout(100));
    }

    #[tokio::test]
    async fn unreachable_device_is_connection_error() {
        // Bind then drop a listener to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let address = DeviceAddress::new(format!("127.0.0.1:{port}")).unwrap();
        let err = transport()
            .send_command(&address, &RelayCommand::on())
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::ConnectionError(_)), "{err:?}");
    }
}

// ============================================================================
// RelayProxy Tests
// ============================================================================

mod relay_proxy {
    use super::*;

    #[tokio::test]
    async fn repeated_requests_are_not_deduplicated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/relay/on"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ON"))
            .expect(2)
            .mount(&server)
            .await;

        let proxy = RelayProxy::new(transport());
        let ip = server.uri();
        for _ in 0..2 {
            let reply = proxy.forward(Some(&ip), Some("on")).await.unwrap();
            assert_eq!(reply.message, "ON");
        }
    }

    #[tokio::test]
    async fn action_is_forwarded_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/relay/ON"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Relay is ON"))
            .expect(1)
            .mount(&server)
            .await;

        let reply = RelayProxy::new(transport())
            .forward(Some(&server.uri()), Some("ON"))
            .await
            .unwrap();

        assert_eq!(reply.message, "Relay is ON");
    }

    #[tokio::test]
    async fn failures_keep_their_class() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/relay/off"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let proxy = RelayProxy::new(transport());
        let err = proxy
            .forward(Some(&server.uri()), Some("off"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ProxyError::Device("Request failed with status 404".to_string())
        );
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn timeout_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let transport = HttpConfig::new()
            .with_timeout(Duration::from_millis(100))
            .into_transport()
            .unwrap();
        let err = RelayProxy::new(transport)
            .forward(Some(&server.uri()), Some("on"))
            .await
            .unwrap_err();

        assert_eq!(err, ProxyError::Timeout);
        assert_eq!(err.to_string(), "Request timed out.");
    }
}

// ============================================================================
// Discovery Tests
// ============================================================================

mod discovery {
    use super::*;

    #[tokio::test]
    async fn discovered_address_is_used_for_relay_commands() {
        let bootstrap = MockServer::start().await;
        let target = MockServer::start().await;
        let target_address = address_of(&target);

        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(format!("{target_address}\n")),
            )
            .expect(1)
            .mount(&bootstrap)
            .await;
        Mock::given(method("GET"))
            .and(path("/relay/on"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Relay ON"))
            .expect(2)
            .mount(&target)
            .await;

        let transport = transport();
        let device = Device::unresolved("Device 1", transport.clone());
        let resolved = DeviceDiscovery::new(transport.clone())
            .resolve_into(&address_of(&bootstrap), &device)
            .await
            .unwrap();
        assert_eq!(resolved, target_address);

        let reply = RelayProxy::new(transport)
            .forward(Some(resolved.as_str()), Some("on"))
            .await
            .unwrap();
        assert_eq!(reply.message, "Relay ON");

        assert_eq!(device.relay(RelayAction::On).await.unwrap(), "Relay ON");
    }

    #[tokio::test]
    async fn blank_body_leaves_device_unresolved() {
        let bootstrap = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(200).set_body_string("  \n"))
            .mount(&bootstrap)
            .await;

        let transport = transport();
        let device = Device::unresolved("Device 1", transport.clone());
        let err = DeviceDiscovery::new(transport)
            .resolve_into(&address_of(&bootstrap), &device)
            .await
            .unwrap_err();

        assert!(matches!(err, DiscoveryError::EmptyAddress));
        assert!(!device.is_resolved());
    }

    #[tokio::test]
    async fn registry_reports_discovery_failure() {
        let bootstrap = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&bootstrap)
            .await;

        let registry =
            DeviceRegistry::new(transport()).with_discovered("Device 1", address_of(&bootstrap));

        assert!(registry.resolve_pending().await.is_err());
        assert_eq!(
            registry.message().as_deref(),
            Some("Error fetching device IP: Request failed with status 500")
        );

        let err = registry.relay("Device 1", RelayAction::On).await.unwrap_err();
        assert!(matches!(err, Error::DeviceNotResolved(_)));
    }
}

// ============================================================================
// Sensor Poller Tests
// ============================================================================

mod sensor_poller {
    use super::*;

    #[tokio::test]
    async fn poll_records_status_channels() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Digital Pin 4": 1,
                "Analog Pin 34": 2048,
                "Soil Moisture": 41.5
            })))
            .mount(&server)
            .await;

        let poller = SensorPoller::new(transport(), address_of(&server));
        let result = poller.poll().await.unwrap();
        assert_eq!(result.get("Digital Pin 4"), Some(1.0));

        let snapshot = poller.snapshot();
        assert_eq!(snapshot.timestamps.len(), 1);
        assert_eq!(snapshot.active_digital, vec!["Digital Pin 4".to_string()]);
        assert_eq!(snapshot.soil_moisture, vec![Some(41.5)]);
        assert_eq!(snapshot.analog.get("Analog Pin 34"), Some(&vec![Some(2048.0)]));
    }

    #[tokio::test]
    async fn toggle_pin_then_refreshes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pin/4/on"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "Digital Pin 4": 1 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let poller = SensorPoller::new(transport(), address_of(&server));
        poller.toggle_pin(PinId::new(4), true).await.unwrap();

        assert_eq!(poller.with_history_ref(|h| h.timestamps().len()), 1);
    }

    #[tokio::test]
    async fn malformed_status_records_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[1, 2]"))
            .mount(&server)
            .await;

        let poller = SensorPoller::new(transport(), address_of(&server));
        assert!(poller.poll().await.is_err());
        assert!(poller.snapshot().timestamps.is_empty());
    }
}

// ============================================================================
// Relay Board and Motor Tests
// ============================================================================

mod panels {
    use super::*;

    #[tokio::test]
    async fn board_switch_hits_named_relay() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/relay2/on"))
            .respond_with(ResponseTemplate::new(200).set_body_string("relay2 ON"))
            .expect(1)
            .mount(&server)
            .await;

        let relay = RelayId::new("relay2").unwrap();
        let board = RelayBoard::new(
            Device::new("Garden", address_of(&server), transport()),
            [RelayId::new("relay1").unwrap(), relay.clone()],
        );

        let status = board.switch(&relay, SwitchState::On).await.unwrap();
        assert_eq!(status.status, SwitchState::On);
        assert!(!status.loading);
        assert_eq!(status.error, None);
    }

    #[tokio::test]
    async fn motor_posts_json_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/move"))
            .and(body_json(serde_json::json!({ "direction": "forward" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/speed"))
            .and(body_json(serde_json::json!({ "speed": 128 })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let motor = MotorController::new(Device::new("Motor", address_of(&server), transport()));
        let state = motor.drive(Direction::Forward).await.unwrap();
        assert_eq!(state.direction, Some(Direction::Forward));

        let state = motor.set_speed(MotorSpeed::new(128)).await.unwrap();
        assert_eq!(state.speed, MotorSpeed::new(128));
    }
}
