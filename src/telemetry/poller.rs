// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed-interval sensor poller.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{HistorySnapshot, PinHistory, PollResult};
use crate::command::{PinCommand, StatusQuery};
use crate::error::PollError;
use crate::event::{EventBus, PollEvent};
use crate::protocol::Transport;
use crate::types::{DeviceAddress, PinId};

/// Default interval between poll ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Whether a poller currently has a running loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerState {
    /// No loop is running; [`SensorPoller::poll`] still works on demand.
    Idle,
    /// At least one loop started with [`SensorPoller::start`] is running.
    Polling,
}

/// Polls a device's `/status` endpoint and accumulates a [`PinHistory`].
///
/// Cloning is cheap; clones share the history, the event bus and the
/// transport.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use espdeck::protocol::HttpTransport;
/// use espdeck::telemetry::SensorPoller;
/// use espdeck::types::DeviceAddress;
///
/// # async fn example() -> espdeck::Result<()> {
/// let poller = SensorPoller::new(
///     HttpTransport::new()?,
///     DeviceAddress::new("192.168.1.217")?,
/// );
/// let handle = poller.start(Duration::from_secs(1));
/// // ... later
/// handle.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct SensorPoller<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    transport: T,
    address: DeviceAddress,
    history: RwLock<PinHistory>,
    events: EventBus<PollEvent>,
    loops: Arc<AtomicUsize>,
}

impl<T: Transport> SensorPoller<T> {
    /// Creates a poller with the default history capacity.
    #[must_use]
    pub fn new(transport: T, address: DeviceAddress) -> Self {
        Self::with_history(transport, address, PinHistory::default())
    }

    /// Creates a poller that records into `history`.
    #[must_use]
    pub fn with_history(transport: T, address: DeviceAddress, history: PinHistory) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                address,
                history: RwLock::new(history),
                events: EventBus::new(),
                loops: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    /// Returns the polled device address.
    #[must_use]
    pub fn address(&self) -> &DeviceAddress {
        &self.inner.address
    }

    /// Returns [`PollerState::Polling`] while a started loop is running.
    #[must_use]
    pub fn state(&self) -> PollerState {
        if self.inner.loops.load(Ordering::SeqCst) > 0 {
            PollerState::Polling
        } else {
            PollerState::Idle
        }
    }

    /// Subscribes to the outcome of every tick.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PollEvent> {
        self.inner.events.subscribe()
    }

    /// Runs one tick now.
    ///
    /// A successful tick appends one entry per tracked channel to the
    /// history. A failed tick records nothing.
    ///
    /// # Errors
    ///
    /// Returns `PollError` if the request fails or the body is not a flat
    /// JSON object of numbers.
    pub async fn poll(&self) -> Result<PollResult, PollError> {
        match self.fetch().await {
            Ok(result) => {
                let at = self.inner.history.write().record(&result, Utc::now());
                tracing::debug!(
                    address = %self.inner.address,
                    channels = result.len(),
                    "Recorded poll tick"
                );
                self.inner.events.publish(PollEvent::Updated {
                    at,
                    result: result.clone(),
                });
                Ok(result)
            }
            Err(e) => {
                self.inner.events.publish(PollEvent::failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> Result<PollResult, PollError> {
        let response = self
            .inner
            .transport
            .send_command(&self.inner.address, &StatusQuery)
            .await?;
        Ok(PollResult::parse(response.body())?)
    }

    /// Drives a pin, then refreshes the history with an immediate tick.
    ///
    /// A failure of the refresh tick is logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns `PollError::Transport` if the pin request fails.
    pub async fn toggle_pin(&self, pin: PinId, on: bool) -> Result<(), PollError> {
        self.inner
            .transport
            .send_command(&self.inner.address, &PinCommand::new(pin, on))
            .await?;
        tracing::info!(address = %self.inner.address, %pin, on, "Pin switched");

        if let Err(e) = self.poll().await {
            tracing::warn!(address = %self.inner.address, error = %e, "Refresh after pin switch failed");
        }
        Ok(())
    }

    /// Runs `f` with read access to the history.
    pub fn with_history_ref<R>(&self, f: impl FnOnce(&PinHistory) -> R) -> R {
        f(&self.inner.history.read())
    }

    /// Returns the history grouped by channel kind.
    #[must_use]
    pub fn snapshot(&self) -> HistorySnapshot {
        self.inner.history.read().snapshot()
    }
}

impl<T: Transport + 'static> SensorPoller<T> {
    /// Starts polling every `every`, with the first tick immediately.
    ///
    /// Failed ticks are logged and the loop keeps going. The loop runs until
    /// the returned handle is stopped or dropped.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use = "dropping the handle stops the poller"]
    pub fn start(&self, every: Duration) -> PollerHandle {
        let every = every.max(Duration::from_millis(1));
        let poller = self.clone();
        let guard = LoopGuard::enter(Arc::clone(&self.inner.loops));

        tracing::info!(
            address = %self.inner.address,
            interval_ms = u64::try_from(every.as_millis()).unwrap_or(u64::MAX),
            "Sensor poller started"
        );

        let task = tokio::spawn(async move {
            let _guard = guard;
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Err(e) = poller.poll().await {
                    tracing::warn!(address = %poller.inner.address, error = %e, "Poll tick failed");
                }
            }
        });

        PollerHandle { task: Some(task) }
    }
}

impl<T> Clone for SensorPoller<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for SensorPoller<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorPoller")
            .field("address", &self.inner.address)
            .field("ticks", &self.inner.history.read().len())
            .field("loops", &self.inner.loops.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Counts a running loop for as long as it lives.
struct LoopGuard(Arc<AtomicUsize>);

impl LoopGuard {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle to a running poll loop.
///
/// Dropping the handle cancels the loop.
#[derive(Debug)]
pub struct PollerHandle {
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Cancels the loop and waits until it has fully stopped.
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // Cancellation is the expected outcome.
            let _ = task.await;
            tracing::info!("Sensor poller stopped");
        }
    }

    /// Returns `true` if the loop is no longer running.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::protocol::testing::ScriptedTransport;
    use crate::protocol::DeviceResponse;

    fn address() -> DeviceAddress {
        DeviceAddress::new("192.168.1.217").unwrap()
    }

    #[tokio::test]
    async fn failed_tick_contributes_nothing() {
        let transport = ScriptedTransport::new()
            .reply(r#"{"A": 1}"#)
            .reply(r#"{"A": 0, "B": 1}"#)
            .fail(TransportError::ConnectionError("unreachable".to_string()))
            .reply(r#"{"A": 1, "B": 1}"#);
        let poller = SensorPoller::new(transport, address());

        assert!(poller.poll().await.is_ok());
        assert!(poller.poll().await.is_ok());
        assert!(matches!(poller.poll().await, Err(PollError::Transport(_))));
        assert!(poller.poll().await.is_ok());

        poller.with_history_ref(|history| {
            assert_eq!(history.values("A"), vec![1.0, 0.0, 1.0]);
            assert_eq!(history.timestamps().len(), 3);
            assert_eq!(history.series("B").unwrap(), vec![None, Some(1.0), Some(1.0)]);
        });
    }

    #[tokio::test]
    async fn poll_requests_status_endpoint() {
        let transport = Arc::new(ScriptedTransport::new().reply(r#"{"Soil Moisture": 1730}"#));
        let poller = SensorPoller::new(Arc::clone(&transport), address());

        let result = poller.poll().await.unwrap();
        assert_eq!(result.get("Soil Moisture"), Some(1730.0));
        assert_eq!(transport.urls(), vec!["http://192.168.1.217/status"]);
    }

    #[tokio::test]
    async fn unparseable_body_is_parse_error() {
        let transport = ScriptedTransport::new().reply("<html>oops</html>");
        let poller = SensorPoller::new(transport, address());

        assert!(matches!(poller.poll().await, Err(PollError::Parse(_))));
        assert!(poller.with_history_ref(PinHistory::is_empty));
    }

    #[tokio::test]
    async fn poll_publishes_events() {
        let transport = ScriptedTransport::new()
            .reply(r#"{"A": 1}"#)
            .fail(TransportError::RequestFailed { status: 500 });
        let poller = SensorPoller::new(transport, address());
        let mut events = poller.subscribe();

        let _ = poller.poll().await;
        let _ = poller.poll().await;

        assert!(events.recv().await.unwrap().is_update());
        match events.recv().await.unwrap() {
            PollEvent::Failed { error, .. } => {
                assert_eq!(error, "Request failed with status 500");
            }
            PollEvent::Updated { .. } => panic!("expected a failure event"),
        }
    }

    #[tokio::test]
    async fn toggle_pin_refreshes_immediately() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply("OK")
                .reply(r#"{"Digital Pin 13": 1}"#),
        );
        let poller = SensorPoller::new(Arc::clone(&transport), address());

        poller.toggle_pin(PinId::new(13), true).await.unwrap();

        assert_eq!(
            transport.urls(),
            vec![
                "http://192.168.1.217/pin/13/on",
                "http://192.168.1.217/status",
            ]
        );
        assert_eq!(poller.with_history_ref(|h| h.latest("Digital Pin 13")), Some(1.0));
    }

    #[tokio::test]
    async fn toggle_pin_failure_skips_refresh() {
        let transport = Arc::new(
            ScriptedTransport::new().fail(TransportError::RequestFailed { status: 404 }),
        );
        let poller = SensorPoller::new(Arc::clone(&transport), address());

        let err = poller.toggle_pin(PinId::new(4), false).await.unwrap_err();
        assert!(matches!(
            err,
            PollError::Transport(TransportError::RequestFailed { status: 404 })
        ));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn toggle_pin_ignores_refresh_failure() {
        let transport = ScriptedTransport::new().reply("OK").reply("not json");
        let poller = SensorPoller::new(transport, address());

        assert!(poller.toggle_pin(PinId::new(4), false).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn loop_keeps_ticking_after_failure_until_stopped() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .fail(TransportError::Timeout(10_000))
                .otherwise(Ok(DeviceResponse::new(200, r#"{"A": 1}"#))),
        );
        let poller = SensorPoller::new(Arc::clone(&transport), address());
        assert_eq!(poller.state(), PollerState::Idle);

        let handle = poller.start(Duration::from_secs(1));
        assert_eq!(poller.state(), PollerState::Polling);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(transport.call_count(), 3);
        assert_eq!(poller.with_history_ref(PinHistory::len), 2);

        handle.stop().await;
        assert_eq!(poller.state(), PollerState::Idle);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_loop() {
        let transport = Arc::new(
            ScriptedTransport::new().otherwise(Ok(DeviceResponse::new(200, "{}"))),
        );
        let poller = SensorPoller::new(Arc::clone(&transport), address());

        let handle = poller.start(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(500)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(transport.call_count(), 1);
        assert_eq!(poller.state(), PollerState::Idle);
    }
}
