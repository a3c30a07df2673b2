//! End-to-end tests for the observer client against real sockets.
//!
//! The happy path runs against a real relay server; the failure paths
//! run against stub listeners that drop, hold, or cleanly close
//! connections so every branch of the reconnection state machine is
//! exercised over the wire.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::DateTime;
use futures::StreamExt;
use tokio::net::TcpListener;

use geotrace_client::{
    ClientConfig, ClientState, ConnectionStatus, ObserverClient, ObserverHandler,
};
use geotrace_relay::{RelayState, build_router};
use geotrace_types::{EntityId, GeoPoint, PositionEvent};

/// What a test handler observed, in arrival order.
#[derive(Debug, Clone, PartialEq)]
enum Observed {
    Snapshot(usize),
    Update(u64),
    KeepaliveAck,
    Trail(String, usize),
}

#[derive(Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<Observed>>>,
}

impl Recorder {
    fn snapshot(&self) -> Vec<Observed> {
        self.seen.lock().unwrap().clone()
    }

    fn contains(&self, wanted: &Observed) -> bool {
        self.seen.lock().unwrap().iter().any(|o| o == wanted)
    }
}

impl ObserverHandler for Recorder {
    fn on_snapshot(&mut self, entities: Vec<geotrace_types::EntityState>) {
        self.seen.lock().unwrap().push(Observed::Snapshot(entities.len()));
    }

    fn on_update(&mut self, event: PositionEvent) {
        self.seen.lock().unwrap().push(Observed::Update(event.sequence));
    }

    fn on_keepalive_ack(&mut self) {
        self.seen.lock().unwrap().push(Observed::KeepaliveAck);
    }

    fn on_trail_response(&mut self, entity_id: EntityId, trail: Vec<geotrace_types::TrackPoint>) {
        self.seen
            .lock()
            .unwrap()
            .push(Observed::Trail(entity_id.as_str().to_owned(), trail.len()));
    }
}

fn event(id: &str, n: u64) -> PositionEvent {
    #[allow(clippy::cast_precision_loss)]
    let coord = n as f64;
    PositionEvent {
        entity_id: EntityId::new(id),
        position: GeoPoint::new(coord, coord),
        speed: 7.5,
        heading: 0.0,
        timestamp: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        sequence: n,
    }
}

async fn spawn_relay(state: Arc<RelayState>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// A listener that drops every raw TCP connection on arrival, counting
/// accepts. Connection attempts against it fail abnormally.
async fn spawn_dropper() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepts);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });
    (addr, accepts)
}

/// A listener that drops the first `drop_count` connections, then
/// serves a silent `WebSocket` that stays open.
async fn spawn_flaky(drop_count: usize) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepts);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < drop_count {
                drop(stream);
                continue;
            }
            tokio::spawn(async move {
                if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
                    while let Some(Ok(_)) = ws.next().await {}
                }
            });
        }
    });
    (addr, accepts)
}

/// A listener that completes the handshake and then closes with the
/// clean close code.
async fn spawn_clean_closer() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepts);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
                    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "server going away".into(),
                    };
                    let _ = ws.close(Some(frame)).await;
                }
            });
        }
    });
    (addr, accepts)
}

/// Poll until the predicate holds or the deadline passes.
async fn wait_until(deadline: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let end = tokio::time::Instant::now() + deadline;
    while tokio::time::Instant::now() < end {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    predicate()
}

fn ws_url(addr: SocketAddr) -> String {
    format!("ws://{addr}/ws/positions")
}

#[tokio::test]
async fn connects_identifies_and_streams() {
    let state = RelayState::new(10, 64);
    let addr = spawn_relay(Arc::clone(&state)).await;

    // Two events exist before the client connects.
    state.apply(event("a", 1)).await;
    state.apply(event("a", 2)).await;

    let recorder = Recorder::default();
    let config = ClientConfig::new(ws_url(addr))
        .with_client_id("test-observer")
        .with_keepalive_interval(Duration::from_millis(100));
    let client = ObserverClient::spawn(config, recorder.clone());

    assert!(
        wait_until(Duration::from_secs(5), || {
            client.state().status == ConnectionStatus::Connected
        })
        .await
    );

    // Snapshot arrives first.
    assert!(
        wait_until(Duration::from_secs(5), || {
            recorder.contains(&Observed::Snapshot(1))
        })
        .await
    );
    assert!(matches!(
        recorder.snapshot().first(),
        Some(Observed::Snapshot(1))
    ));

    // Incremental updates follow.
    state.apply(event("a", 3)).await;
    assert!(
        wait_until(Duration::from_secs(5), || {
            recorder.contains(&Observed::Update(3))
        })
        .await
    );

    // Keepalive probes are acknowledged on the 100ms schedule.
    assert!(
        wait_until(Duration::from_secs(5), || {
            recorder.contains(&Observed::KeepaliveAck)
        })
        .await
    );

    // A trail query is answered out of band.
    client.query_trail(EntityId::new("a")).await.unwrap();
    assert!(
        wait_until(Duration::from_secs(5), || {
            recorder.contains(&Observed::Trail("a".to_owned(), 3))
        })
        .await
    );
}

#[tokio::test]
async fn abnormal_failures_back_off_then_exhaust() {
    let (addr, accepts) = spawn_dropper().await;

    let config = ClientConfig::new(ws_url(addr)).with_backoff(
        2,
        Duration::from_millis(30),
        Duration::from_millis(200),
    );
    let client = ObserverClient::spawn(config, Recorder::default());

    // Initial attempt + 2 retries, then a persistent error status.
    assert!(
        wait_until(Duration::from_secs(5), || client.state().exhausted).await
    );
    assert_eq!(accepts.load(Ordering::SeqCst), 3);
    assert_eq!(client.state().status, ConnectionStatus::Disconnected);

    // The terminal state holds: no further attempts on their own.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(accepts.load(Ordering::SeqCst), 3);

    // A manual reconnect resets the budget and tries again.
    client.reconnect().await.unwrap();
    assert!(
        wait_until(Duration::from_secs(5), || {
            accepts.load(Ordering::SeqCst) >= 4
        })
        .await
    );
}

#[tokio::test]
async fn manual_disconnect_cancels_pending_retry() {
    let (addr, accepts) = spawn_dropper().await;

    // Long enough backoff that the retry timer is pending when the
    // disconnect lands.
    let config = ClientConfig::new(ws_url(addr)).with_backoff(
        10,
        Duration::from_secs(2),
        Duration::from_secs(10),
    );
    let client = ObserverClient::spawn(config, Recorder::default());

    // Wait for the first (failing) attempt.
    assert!(
        wait_until(Duration::from_secs(5), || {
            accepts.load(Ordering::SeqCst) >= 1
        })
        .await
    );

    // Manual disconnect: returns only after the pending reconnect
    // timer is cancelled.
    client.disconnect().await.unwrap();
    let after_disconnect = accepts.load(Ordering::SeqCst);

    // An abnormal close just happened and a retry was scheduled; the
    // manual disconnect must have killed it.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(accepts.load(Ordering::SeqCst), after_disconnect);
    let ClientState { status, exhausted, .. } = client.state();
    assert_eq!(status, ConnectionStatus::Disconnected);
    assert!(!exhausted);
}

#[tokio::test]
async fn manual_disconnect_from_live_connection_does_not_reconnect() {
    let state = RelayState::new(10, 64);
    let addr = spawn_relay(Arc::clone(&state)).await;

    let client = ObserverClient::spawn(
        ClientConfig::new(ws_url(addr)),
        Recorder::default(),
    );
    assert!(
        wait_until(Duration::from_secs(5), || {
            client.state().status == ConnectionStatus::Connected
        })
        .await
    );

    client.disconnect().await.unwrap();
    assert_eq!(client.state().status, ConnectionStatus::Disconnected);

    // The relay sees the clean close and the client stays down.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client.state().status, ConnectionStatus::Disconnected);
    assert_eq!(state.connection_count().await, 0);
}

#[tokio::test]
async fn network_available_bypasses_backoff_once() {
    // First connection is dropped; afterwards the server holds the
    // WebSocket open.
    let (addr, accepts) = spawn_flaky(1).await;

    // A backoff far longer than the test: without the network signal
    // the second attempt would never happen here.
    let config = ClientConfig::new(ws_url(addr)).with_backoff(
        5,
        Duration::from_secs(60),
        Duration::from_secs(120),
    );
    let client = ObserverClient::spawn(config, Recorder::default());

    assert!(
        wait_until(Duration::from_secs(5), || {
            accepts.load(Ordering::SeqCst) >= 1
                && client.state().status == ConnectionStatus::Disconnected
        })
        .await
    );

    client.notify_network_available().await.unwrap();
    assert!(
        wait_until(Duration::from_secs(5), || {
            client.state().status == ConnectionStatus::Connected
        })
        .await
    );
    assert_eq!(accepts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn clean_server_close_is_not_retried() {
    let (addr, accepts) = spawn_clean_closer().await;

    let config = ClientConfig::new(ws_url(addr)).with_backoff(
        5,
        Duration::from_millis(30),
        Duration::from_millis(200),
    );
    let client = ObserverClient::spawn(config, Recorder::default());

    assert!(
        wait_until(Duration::from_secs(5), || {
            client.state().status == ConnectionStatus::Connected
        })
        .await
    );

    // The server closes with the clean code; the client must not
    // schedule a retry.
    assert!(
        wait_until(Duration::from_secs(5), || {
            client.state().status == ConnectionStatus::Disconnected
        })
        .await
    );
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(accepts.load(Ordering::SeqCst), 1);
    assert!(!client.state().exhausted);
}
