// ============================================================================
// Graceful Shutdown Tests
// ============================================================================
//
// Serves the router on a real socket and signals shutdown while an ingest
// request is waiting for its acknowledgment.
//
// ============================================================================

use msgproc::serve_http;
use msgproc_db::{MessageStatus, MessageStore};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use test_utils::{TestApp, post_over_tcp, spawn_app};

async fn start_server(
    app: &TestApp,
    shutdown: &CancellationToken,
    drain: Duration,
) -> (SocketAddr, JoinHandle<anyhow::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_http(
        listener,
        app.router.clone(),
        shutdown.clone(),
        app.request_cancel.clone(),
        drain,
    ));
    (addr, server)
}

/// Wait until the request has saved its row and is publishing
async fn wait_for_saved_row(app: &TestApp) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while app.store.total().await.unwrap() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_shutdown_lets_in_flight_ingest_finish() {
    let app = spawn_app();
    app.publisher.delay_acks(Duration::from_millis(200));
    let shutdown = CancellationToken::new();
    let (addr, server) = start_server(&app, &shutdown, Duration::from_secs(5)).await;

    let request = tokio::spawn(post_over_tcp(addr, r#"{"msg":"hello"}"#));
    wait_for_saved_row(&app).await;
    shutdown.cancel();

    let (status, body) = request.await.unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["msg_id"], 1);
    assert_eq!(app.publisher.sent().await.len(), 1);

    server.await.unwrap().unwrap();
    // fired only after the server drained
    assert!(app.request_cancel.is_cancelled());
}

#[tokio::test]
async fn test_drain_deadline_abandons_stuck_ingest() {
    let app = spawn_app();
    app.publisher.delay_acks(Duration::from_secs(30));
    let shutdown = CancellationToken::new();
    let (addr, server) = start_server(&app, &shutdown, Duration::from_millis(100)).await;

    let request = tokio::spawn(post_over_tcp(addr, r#"{"msg":"hello"}"#));
    wait_for_saved_row(&app).await;
    shutdown.cancel();

    let (status, body) = request.await.unwrap();
    assert_eq!(status, 503);
    assert_eq!(body["error_code"], "PUBLISH_ABANDONED");

    server.await.unwrap().unwrap();
    let row = app.store.find(1).await.unwrap().unwrap();
    assert_eq!(row.status, MessageStatus::Pending);
}
