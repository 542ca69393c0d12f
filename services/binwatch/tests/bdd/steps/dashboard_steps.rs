//! BDD step definitions for dashboard feature

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use binwatch::config::{Config, NotifierConfig, StoreConfig};
use binwatch::dashboard::{build_router, DashboardState};
use binwatch::engine;
use binwatch::notifier::Notifier;
use binwatch::record::BinRecord;
use binwatch::reducer::TransitionMemory;
use binwatch::state::new_state_handle;
use binwatch::store::{BinStore, MemoryStore};
use cucumber::{given, then, when};
use tower::ServiceExt;

use crate::world::{BinwatchWorld, RecordingNotifier};

fn dashboard(world: &BinwatchWorld) -> DashboardState {
    DashboardState {
        state: Arc::clone(world.state.as_ref().expect("dashboard not set up")),
        store: Arc::clone(world.store.as_ref().expect("dashboard not set up")) as Arc<dyn BinStore>,
        client_config: Arc::from(world.client_config.clone().unwrap_or_default()),
        refresh_interval_ms: 2000,
    }
}

#[given("a dashboard backed by an empty store")]
fn empty_dashboard(world: &mut BinwatchWorld) {
    world.store = Some(Arc::new(MemoryStore::new()));
    world.state = Some(new_state_handle(100));
}

#[given(expr = "the store holds bin {string} at a distance of {float} cm")]
async fn store_holds_bin(world: &mut BinwatchWorld, bin_id: String, distance: f64) {
    let store = world.store.as_ref().expect("dashboard not set up");
    store
        .set(
            &bin_id,
            &BinRecord {
                distance_cm: Some(distance),
                fill_percentage: Some(50.0),
                status: Some("Not Full".to_string()),
                alert: Some(false),
                timestamp: Some(1_700_000_000_000),
            },
        )
        .await
        .expect("memory store write failed");
}

#[given("the dashboard is configured with firebase and emailjs credentials")]
fn configured_credentials(world: &mut BinwatchWorld) {
    let config = Config {
        store: StoreConfig::Firebase {
            database_url: "https://smart-bins.firebaseio.com".to_string(),
            collection_path: "waste_bin_data".to_string(),
            auth_key: Some("public-api-key".to_string()),
            reconnect_interval_ms: 1000,
        },
        notifiers: vec![NotifierConfig::EmailJs {
            service_id: "service_bins".to_string(),
            template_id: "template_full".to_string(),
            public_key: "public-key".to_string(),
            private_key: Some("very-private-key".to_string()),
            to_email: "ops@example.com".to_string(),
            from_email: String::new(),
        }],
        ..Default::default()
    };
    world.client_config = Some(config.client_config_script());
}

#[given("a recording notifier")]
fn recording_notifier(world: &mut BinwatchWorld) {
    world.recorder = Some(Arc::new(RecordingNotifier::default()));
}

#[when("the engine processes the store contents")]
async fn engine_processes(world: &mut BinwatchWorld) {
    let store = Arc::clone(world.store.as_ref().expect("dashboard not set up"));
    let state = Arc::clone(world.state.as_ref().expect("dashboard not set up"));
    let notifiers: Vec<Arc<dyn Notifier>> = world
        .recorder
        .iter()
        .map(|r| Arc::clone(r) as Arc<dyn Notifier>)
        .collect();

    let snapshot = store.fetch().await.expect("memory store read failed");
    let memory = std::mem::take(&mut world.memory);
    let (memory, pending) =
        engine::process_snapshot(&snapshot, memory, &notifiers, &state, 1_000).await;
    for handle in pending {
        handle.await.expect("delivery task panicked");
    }
    world.memory = memory;
}

#[when(expr = "I send a {word} request to {string}")]
async fn send_request(world: &mut BinwatchWorld, method: String, uri: String) {
    let app = build_router(dashboard(world), None);
    let response = app
        .oneshot(
            Request::builder()
                .method(method.as_str())
                .uri(uri.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    world.response_status = Some(response.status().as_u16());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    world.response_body = Some(String::from_utf8(bytes.to_vec()).unwrap());
}

#[then(expr = "the response status is {int}")]
fn response_status(world: &mut BinwatchWorld, status: u16) {
    assert_eq!(world.response_status, Some(status));
}

#[then(expr = "the response contains {string}")]
fn response_contains(world: &mut BinwatchWorld, text: String) {
    let body = world.response_body.as_deref().unwrap_or_default();
    assert!(body.contains(&text), "{:?} not found in {}", text, body);
}

#[then(expr = "the response does not contain {string}")]
fn response_does_not_contain(world: &mut BinwatchWorld, text: String) {
    let body = world.response_body.as_deref().unwrap_or_default();
    assert!(!body.contains(&text), "{:?} found in {}", text, body);
}

#[then(expr = "the store holds {int} bin(s)")]
async fn store_count(world: &mut BinwatchWorld, count: usize) {
    let store = world.store.as_ref().expect("dashboard not set up");
    assert_eq!(store.fetch().await.unwrap().len(), count);
}

#[then("the dashboard shows the empty state")]
async fn dashboard_empty(world: &mut BinwatchWorld) {
    let state = world.state.as_ref().expect("dashboard not set up").read().await;
    assert!(state.view.empty);
    assert_eq!(state.view.stats.total_bins, 0);
}

#[then(expr = "{int} notification(s) were delivered")]
async fn notifications_delivered(world: &mut BinwatchWorld, count: usize) {
    let recorder = world.recorder.as_ref().expect("no recording notifier");
    assert_eq!(recorder.records.read().await.len(), count);
}

#[then(expr = "the notification history has {int} entries")]
async fn history_entries(world: &mut BinwatchWorld, count: usize) {
    let state = world.state.as_ref().expect("dashboard not set up").read().await;
    assert_eq!(state.history.len(), count);
}

#[then("the transition memory is still remembered")]
fn memory_kept(world: &mut BinwatchWorld) {
    assert_ne!(world.memory, TransitionMemory::new());
}
