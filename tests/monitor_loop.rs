// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end monitor loop tests against a mock Neviweb server.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use neviwatch::action::{
    ActionDispatcher, ActionRegistry, ServiceManager, SideEffects, VolumeControl,
};
use neviwatch::client::NeviwebClient;
use neviwatch::config::{ActionsConfig, AuthConfig};
use neviwatch::error::ActionError;
use neviwatch::event::{PowerEvent, PowerEventSource};
use neviwatch::monitor::Monitor;
use neviwatch::state::{HeatingState, RetryPolicy, StateMonitor};

const DEVICE_ID: u64 = 5678;

// ============================================================================
// Test doubles
// ============================================================================

struct RecordingVolume {
    level: Mutex<u8>,
    sets: Mutex<Vec<u8>>,
}

impl RecordingVolume {
    fn new(level: u8) -> Arc<Self> {
        Arc::new(Self {
            level: Mutex::new(level),
            sets: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl VolumeControl for RecordingVolume {
    async fn current(&self) -> Result<u8, ActionError> {
        Ok(*self.level.lock())
    }

    async fn set(&self, level: u8) -> Result<(), ActionError> {
        *self.level.lock() = level;
        self.sets.lock().push(level);
        Ok(())
    }
}

struct RecordingServices {
    restarts: Mutex<Vec<String>>,
}

impl RecordingServices {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            restarts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl ServiceManager for RecordingServices {
    async fn restart(&self, service: &str) -> Result<(), ActionError> {
        self.restarts.lock().push(service.to_string());
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn logged_in_client(server: &MockServer) -> NeviwebClient {
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "session": "tok" })),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(server)
        .await;

    let auth = AuthConfig {
        username: "user@example.com".to_string(),
        password: "hunter2".to_string(),
        location: 1234,
        device_id: DEVICE_ID,
    };
    let client = NeviwebClient::new(&auth, Duration::from_secs(5))
        .unwrap()
        .with_base_url(server.uri());
    client.login().await.unwrap();
    client
}

async fn mount_percent_once(server: &MockServer, percent: u8) {
    Mock::given(method("GET"))
        .and(path(format!("/api/device/{DEVICE_ID}/attribute")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "outputPercentDisplay": { "percent": percent }
        })))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

async fn mount_percent(server: &MockServer, percent: u8) {
    Mock::given(method("GET"))
        .and(path(format!("/api/device/{DEVICE_ID}/attribute")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "outputPercentDisplay": { "percent": percent }
        })))
        .mount(server)
        .await;
}

fn registry_from(json: &str) -> ActionRegistry {
    let actions: ActionsConfig = serde_json::from_str(json).unwrap();
    ActionRegistry::resolve(&actions).unwrap()
}

fn state_monitor(poll_interval: Duration) -> StateMonitor {
    StateMonitor::new(
        poll_interval,
        3,
        RetryPolicy::new(Duration::from_secs(5), Duration::from_secs(300)),
    )
}

// ============================================================================
// Heating cycle
// ============================================================================

#[tokio::test]
async fn heating_cycle_ducks_and_restores_volume() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;
    mount_percent_once(&server, 0).await;
    mount_percent_once(&server, 100).await;
    mount_percent(&server, 0).await;

    let volume = RecordingVolume::new(50);
    let services = RecordingServices::new();
    let registry = registry_from(
        r#"{
            "heatingStarted": [{ "type": "volumeAdjust", "params": { "level": 20 } }],
            "heatingStopped": [{ "type": "volumeAdjust", "params": { "level": 20 } }]
        }"#,
    );
    let fx = SideEffects::new(volume.clone(), services);
    let mut monitor = Monitor::new(
        client,
        DEVICE_ID,
        state_monitor(Duration::from_secs(30)),
        ActionDispatcher::new(registry, fx),
    );

    // Baseline observation never fires a transition.
    assert_eq!(monitor.tick().await, None);
    assert_eq!(monitor.state().heating_state(), HeatingState::Off);
    assert!(volume.sets.lock().is_empty());

    // Off -> On ducks the volume and remembers the old level.
    assert_eq!(
        monitor.tick().await,
        Some(neviwatch::action::TriggerKind::HeatingStarted)
    );
    assert_eq!(*volume.sets.lock(), vec![20]);
    assert_eq!(monitor.dispatcher().saved_volume(), Some(50));

    // On -> Off restores it.
    assert_eq!(
        monitor.tick().await,
        Some(neviwatch::action::TriggerKind::HeatingStopped)
    );
    assert_eq!(*volume.sets.lock(), vec![20, 50]);
    assert_eq!(monitor.dispatcher().saved_volume(), None);
}

// ============================================================================
// Poll failures
// ============================================================================

#[tokio::test]
async fn poll_failures_back_off_and_recover() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    // Two garbage responses, then a healthy one.
    Mock::given(method("GET"))
        .and(path(format!("/api/device/{DEVICE_ID}/attribute")))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_percent(&server, 0).await;

    let fx = SideEffects::new(RecordingVolume::new(50), RecordingServices::new());
    let mut monitor = Monitor::new(
        client,
        DEVICE_ID,
        state_monitor(Duration::from_secs(30)),
        ActionDispatcher::new(ActionRegistry::empty(), fx),
    );

    assert_eq!(monitor.tick().await, None);
    assert_eq!(monitor.state().failure_streak(), 1);
    assert_eq!(monitor.state().next_delay(), Duration::from_secs(5));
    assert_eq!(monitor.state().heating_state(), HeatingState::Unknown);

    assert_eq!(monitor.tick().await, None);
    assert_eq!(monitor.state().failure_streak(), 2);
    assert_eq!(monitor.state().next_delay(), Duration::from_secs(10));

    // Recovery clears the streak and returns to the base cadence.
    assert_eq!(monitor.tick().await, None);
    assert_eq!(monitor.state().failure_streak(), 0);
    assert_eq!(monitor.state().next_delay(), Duration::from_secs(30));
    assert_eq!(monitor.state().heating_state(), HeatingState::Off);
}

// ============================================================================
// Event loop serialization
// ============================================================================

#[tokio::test]
async fn power_event_waits_for_in_flight_dispatch() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;
    mount_percent_once(&server, 0).await;
    mount_percent(&server, 100).await;

    let services = RecordingServices::new();
    let registry = registry_from(
        r#"{
            "heatingStarted": [
                { "type": "delay", "params": { "seconds": 0.4 } },
                { "type": "serviceRestart", "params": { "service": "post-delay" } }
            ],
            "wake": [{ "type": "serviceRestart", "params": { "service": "on-wake" } }]
        }"#,
    );
    let fx = SideEffects::new(RecordingVolume::new(50), services.clone());
    let monitor = Monitor::new(
        client,
        DEVICE_ID,
        state_monitor(Duration::from_millis(300)),
        ActionDispatcher::new(registry, fx),
    );

    let (power, source) = PowerEventSource::channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(monitor.run(source, shutdown_rx));

    // The transition fires at the second poll (~300ms in) and its delay
    // action holds the dispatch busy until ~700ms. A wake arriving in the
    // middle must not interleave.
    tokio::time::sleep(Duration::from_millis(450)).await;
    power.notify(PowerEvent::wake());
    tokio::time::sleep(Duration::from_millis(550)).await;

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("monitor did not shut down")
        .unwrap();

    assert_eq!(*services.restarts.lock(), vec!["post-delay", "on-wake"]);
}

#[tokio::test]
async fn shutdown_restores_saved_volume_and_logs_out() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;
    mount_percent_once(&server, 0).await;
    mount_percent(&server, 100).await;

    let volume = RecordingVolume::new(60);
    let registry = registry_from(
        r#"{ "heatingStarted": [{ "type": "volumeAdjust", "params": { "level": 15 } }] }"#,
    );
    let fx = SideEffects::new(volume.clone(), RecordingServices::new());
    let monitor = Monitor::new(
        client,
        DEVICE_ID,
        state_monitor(Duration::from_millis(200)),
        ActionDispatcher::new(registry, fx),
    );

    let (_power, source) = PowerEventSource::channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(monitor.run(source, shutdown_rx));

    // Let the Off -> On transition duck the volume, then stop the daemon
    // while heating is still on.
    tokio::time::sleep(Duration::from_millis(500)).await;
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("monitor did not shut down")
        .unwrap();

    assert_eq!(*volume.sets.lock(), vec![15, 60]);

    let requests = server.received_requests().await.unwrap();
    assert!(
        requests
            .iter()
            .any(|req| req.url.path() == "/api/logout"),
        "shutdown must close the API session"
    );
}
