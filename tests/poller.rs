//! Poller cancellation and staleness semantics, exercised over real
//! sockets against an in-process stub backend.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use omniwatch::poller::Poller;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct ValueBody {
    id: u64,
}

#[derive(Clone, Default)]
struct Backend {
    requests: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

async fn value_handler(State(backend): State<Backend>, Path(id): Path<u64>) -> impl IntoResponse {
    backend.requests.fetch_add(1, Ordering::SeqCst);
    Json(serde_json::json!({ "id": id }))
}

/// Answers after a delay long enough for a test to supersede or drop the
/// request mid-flight.
async fn slow_handler(State(backend): State<Backend>, Path(id): Path<u64>) -> impl IntoResponse {
    backend.requests.fetch_add(1, Ordering::SeqCst);
    sleep(Duration::from_millis(150)).await;
    Json(serde_json::json!({ "id": id }))
}

async fn flaky_handler(State(backend): State<Backend>) -> impl IntoResponse {
    backend.requests.fetch_add(1, Ordering::SeqCst);
    if backend.failing.load(Ordering::SeqCst) {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    } else {
        Json(serde_json::json!({ "id": 1 })).into_response()
    }
}

async fn spawn_backend() -> (String, Backend) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/value/:id", get(value_handler))
        .route("/slow/:id", get(slow_handler))
        .route("/flaky", get(flaky_handler))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), backend)
}

#[tokio::test]
async fn superseded_requests_never_commit() {
    let (base, _backend) = spawn_backend().await;

    let poller: Poller<ValueBody> = Poller::spawn(
        reqwest::Client::new(),
        Some(format!("{base}/slow/1")),
        Duration::from_secs(30),
    );
    let mut rx = poller.subscribe();

    // Re-parameterize four times while the previous request is still in
    // flight; every change must cancel its predecessor.
    for id in 2..=5u64 {
        sleep(Duration::from_millis(20)).await;
        poller.set_url(Some(format!("{base}/slow/{id}")));
    }

    // Collect every committed data value until the final commit lands.
    let mut observed = Vec::new();
    let waited = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            rx.changed().await.unwrap();
            let state = rx.borrow_and_update().clone();
            if let Some(data) = state.data {
                observed.push(data.clone());
                if !state.is_loading {
                    break;
                }
            }
        }
    })
    .await;
    assert!(waited.is_ok(), "poller never committed a response");
    assert_eq!(
        observed,
        vec![ValueBody { id: 5 }],
        "only the last parameter set may reach state"
    );

    // Give the superseded responses time to have arrived, had they not
    // been cancelled.
    sleep(Duration::from_millis(300)).await;
    let state = poller.state();
    assert_eq!(state.data, Some(ValueBody { id: 5 }));
    assert!(!state.is_error);
}

#[tokio::test]
async fn failed_refresh_keeps_stale_data() {
    let (base, backend) = spawn_backend().await;

    let poller: Poller<ValueBody> = Poller::spawn(
        reqwest::Client::new(),
        Some(format!("{base}/flaky")),
        Duration::from_millis(100),
    );
    let mut rx = poller.subscribe();

    // First fetch succeeds.
    let waited = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            rx.changed().await.unwrap();
            let state = rx.borrow_and_update().clone();
            if state.data.is_some() && !state.is_loading {
                break;
            }
        }
    })
    .await;
    assert!(waited.is_ok(), "initial fetch never completed");

    // Every refresh from now on returns HTTP 500.
    backend.failing.store(true, Ordering::SeqCst);

    let waited = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            rx.changed().await.unwrap();
            if rx.borrow_and_update().is_error {
                break;
            }
        }
    })
    .await;
    assert!(waited.is_ok(), "error flag never raised");

    let state = poller.state();
    assert_eq!(
        state.data,
        Some(ValueBody { id: 1 }),
        "a failed refresh must not clear good data"
    );
    assert!(state.is_error);
}

#[tokio::test]
async fn drop_cancels_in_flight_request_and_interval() {
    let (base, backend) = spawn_backend().await;

    let poller: Poller<ValueBody> = Poller::spawn(
        reqwest::Client::new(),
        Some(format!("{base}/slow/7")),
        Duration::from_millis(50),
    );
    let rx = poller.subscribe();

    // Let the first request get in flight (the handler holds it for
    // 150ms), then deactivate.
    sleep(Duration::from_millis(40)).await;
    assert_eq!(backend.requests.load(Ordering::SeqCst), 1);
    drop(poller);

    // Eight would-be intervals later: no further requests, no state
    // mutation after deactivation.
    sleep(Duration::from_millis(400)).await;
    assert_eq!(
        backend.requests.load(Ordering::SeqCst),
        1,
        "interval must be cleared on drop"
    );
    let state = rx.borrow().clone();
    assert!(state.data.is_none(), "cancelled response must not commit");
    assert!(!state.is_error);
}

#[tokio::test]
async fn closed_gate_opens_on_demand() {
    let (base, backend) = spawn_backend().await;

    let poller: Poller<ValueBody> =
        Poller::spawn(reqwest::Client::new(), None, Duration::from_millis(50));

    // Gate closed: no network activity at all.
    sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.requests.load(Ordering::SeqCst), 0);

    // Opening the gate fetches immediately.
    poller.set_url(Some(format!("{base}/value/3")));
    let mut rx = poller.subscribe();
    let waited = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            let state = rx.borrow_and_update().clone();
            if state.data.is_some() {
                break;
            }
            rx.changed().await.unwrap();
        }
    })
    .await;
    assert!(waited.is_ok(), "gated poller never fetched after opening");
    assert_eq!(poller.state().data, Some(ValueBody { id: 3 }));
}
