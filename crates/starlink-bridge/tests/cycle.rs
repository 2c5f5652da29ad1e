// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Full cycle tests against in-process upstream, ClickHouse and metrics
//! servers.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use reqwest::Client;
use serde_json::{json, Value};
use starlink_bridge::sinks::clickhouse::ClickHouseConfig;
use starlink_bridge::sinks::{exposition, ClickHouseSink, ExpositionSink, SnapshotStore};
use starlink_bridge::{Bridge, RetryConfig, Shutdown, SinkDispatcher, StreamPoller, TokenManager};
use starlink_telemetry::StreamRequest;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{}", addr)
}

#[derive(Clone, Default)]
struct Upstream {
    token_calls: Arc<AtomicUsize>,
    stream_calls: Arc<AtomicUsize>,
}

async fn token(State(up): State<Upstream>) -> Json<Value> {
    let n = up.token_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "access_token": format!("tok-{}", n) }))
}

/// First call: rejects the initial token. Then one populated batch, then
/// empty batches.
async fn stream(State(up): State<Upstream>, headers: HeaderMap) -> Response {
    let n = up.stream_calls.fetch_add(1, Ordering::SeqCst);
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth == "Bearer tok-0" {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if n > 1 {
        return Json(json!({ "data": { "values": [] } })).into_response();
    }
    Json(json!({
        "data": {
            "values": [
                ["u", "ut01", 1_700_000_000_000_000_000u64, 41.5, "online", ["100", "999"]],
                ["i", "ip-abc123", 1_700_000_000_000_000_000u64, ["1.1.1.1", "2.2.2.2"], [], []],
                ["r", "rt01", 1_700_000_000_000_000_000u64]
            ],
            "columnNamesByDeviceType": {
                "u": ["DeviceId", "UtcTimestampNs", "PingLatencyMs", "State", "ActiveAlerts"],
                "i": ["DeviceId", "UtcTimestampNs", "Ipv4", "Ipv6Ue", "Ipv6Cpe"]
            }
        },
        "metadata": {
            "enums": {
                "DeviceType": {"u": "UserTerminal"},
                "AlertsByDeviceType": {"u": {"100": "Thermal"}}
            }
        }
    }))
    .into_response()
}

type Inserts = Arc<Mutex<Vec<(String, String)>>>;

async fn clickhouse(
    State(inserts): State<Inserts>,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> StatusCode {
    let query = params.get("query").cloned().unwrap_or_default();
    inserts.lock().expect("lock").push((query, body));
    StatusCode::OK
}

struct Harness {
    bridge: Bridge,
    upstream: Upstream,
    inserts: Inserts,
    store: SnapshotStore,
    shutdown: Shutdown,
}

async fn harness() -> Harness {
    let upstream = Upstream::default();
    let api = spawn(
        Router::new()
            .route("/token", post(token))
            .route("/stream", post(stream))
            .with_state(upstream.clone()),
    )
    .await;

    let inserts: Inserts = Arc::default();
    let ch_url = spawn(
        Router::new()
            .route("/", post(clickhouse))
            .with_state(inserts.clone()),
    )
    .await;

    let shutdown = Shutdown::new();
    let client = Client::new();
    let mut tokens = TokenManager::new(client.clone(), format!("{}/token", api), "id", "secret");
    tokens.acquire().await.expect("acquire");

    let fast = RetryConfig::new(Duration::from_millis(10), Duration::from_millis(50));
    let poller = StreamPoller::new(
        client,
        format!("{}/stream", api),
        StreamRequest {
            batch_size: 1000,
            max_linger_ms: 15_000,
            account_number: None,
        },
        tokens,
        shutdown.clone(),
    )
    .with_retry(fast);

    let clickhouse = ClickHouseSink::new(
        ClickHouseConfig {
            url: ch_url,
            user: "default".to_string(),
            password: String::new(),
            database: "fleet".to_string(),
        },
        Duration::from_secs(5),
    )
    .expect("clickhouse sink");
    let store = SnapshotStore::new();
    let dispatcher = SinkDispatcher::new(shutdown.clone())
        .with_retry(fast)
        .with_sink(Arc::new(clickhouse))
        .with_sink(Arc::new(ExpositionSink::new(store.clone(), "starlink")));

    Harness {
        bridge: Bridge::new(poller, dispatcher, Duration::from_secs(15), shutdown.clone()),
        upstream,
        inserts,
        store,
        shutdown,
    }
}

#[tokio::test]
async fn test_cycle_delivers_to_all_sinks() {
    let mut h = harness().await;

    let report = h.bridge.run_cycle().await.expect("cycle");
    assert_eq!(report.entries, 3);
    assert_eq!(report.stats.decode.router, 1);
    assert_eq!(report.telemetry_rows, 1);
    assert_eq!(report.alert_rows, 2);
    assert_eq!(report.ip_rows, 1);
    assert_eq!(report.delivered, 2);

    // Rejected initial token was refreshed once.
    assert_eq!(h.upstream.token_calls.load(Ordering::SeqCst), 2);

    let inserts = h.inserts.lock().expect("lock").clone();
    let queries: Vec<&str> = inserts.iter().map(|(q, _)| q.as_str()).collect();
    assert_eq!(
        queries,
        vec![
            "INSERT INTO fleet.telemetry FORMAT JSONEachRow",
            "INSERT INTO fleet.alerts FORMAT JSONEachRow",
            "INSERT INTO fleet.ip_allocations FORMAT JSONEachRow",
        ]
    );
    let alerts: Vec<Value> = inserts[1]
        .1
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect();
    assert_eq!(alerts[0]["alert_name"], "Thermal");
    assert_eq!(alerts[1]["alert_name"], "999");
    let ip: Value = serde_json::from_str(&inserts[2].1).expect("json");
    assert_eq!(ip["device_id"], "abc123");
    assert_eq!(ip["ipv4"], json!(["1.1.1.1", "2.2.2.2"]));

    let body = h.store.body().await;
    assert!(body.contains(
        "starlink_PingLatencyMs{device_type=\"UserTerminal\",device_id=\"ut01\"} 41.5\n"
    ));
    assert!(body.contains(
        "starlink_info{device_type=\"UserTerminal\",device_id=\"ut01\",State=\"online\"} 1\n"
    ));
}

#[tokio::test]
async fn test_metrics_endpoint_serves_snapshot() {
    let h = harness().await;
    let listener = exposition::bind("127.0.0.1:0".parse().expect("addr"))
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let server = tokio::spawn(exposition::serve(
        listener,
        h.store.clone(),
        h.shutdown.clone(),
    ));

    let client = Client::new();
    let placeholder = client
        .get(format!("http://{}/metrics", addr))
        .send()
        .await
        .expect("get");
    assert_eq!(placeholder.status(), 200);
    assert!(placeholder
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .starts_with("text/plain"));
    assert_eq!(
        placeholder.text().await.expect("body"),
        "# no telemetry collected yet\n"
    );

    h.store.replace(vec!["starlink_up 1".to_string()]).await;
    let body = client
        .get(format!("http://{}/metrics", addr))
        .send()
        .await
        .expect("get")
        .text()
        .await
        .expect("body");
    assert_eq!(body, "starlink_up 1\n");

    let missing = client
        .get(format!("http://{}/other", addr))
        .send()
        .await
        .expect("get");
    assert_eq!(missing.status(), 404);

    drop(client);
    h.shutdown.stop();
    server
        .await
        .expect("join")
        .expect("server exits cleanly");
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let mut h = harness().await;
    let stopper = h.shutdown.clone();
    let inserts = h.inserts.clone();

    tokio::spawn(async move {
        // Stop while the bridge sleeps out the cadence after the first batch.
        while inserts.lock().expect("lock").len() < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        stopper.stop();
    });

    tokio::time::timeout(Duration::from_secs(10), h.bridge.run())
        .await
        .expect("run returns after stop")
        .expect("run");
    assert_eq!(h.inserts.lock().expect("lock").len(), 3);
}
