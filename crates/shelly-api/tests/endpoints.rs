//! End-to-end tests of the exporter HTTP surface.
//!
//! The exporter router is exercised with `oneshot`; probed devices are
//! faked with a real axum listener serving canned `/shelly`, `/status`,
//! and `/settings` JSON on an ephemeral loopback port.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use shelly_api::{ScrapeConfig, build_router};
use shelly_metrics::MetricCollection;
use shelly_store::{FileMedium, ProbeStore, StorageMedium};
use tempfile::TempDir;
use tower::ServiceExt;

/// A target on which nothing is listening.
const UNREACHABLE: &str = "127.0.0.1:1";

async fn test_store(dir: &TempDir) -> ProbeStore {
    let medium = StorageMedium::File(FileMedium::new(dir.path().join("probes.bin")));
    ProbeStore::open(medium).await.unwrap()
}

fn test_config(static_targets: Vec<String>) -> ScrapeConfig {
    ScrapeConfig {
        static_targets,
        timeout: Duration::from_secs(2),
        ..ScrapeConfig::default()
    }
}

/// Serve a canned SHPLG-S on an ephemeral loopback port.
async fn spawn_fake_plug() -> String {
    let status = json!({
        "wifi_sta": {"connected": true},
        "cloud": {"enabled": true, "connected": true},
        "mqtt": {"connected": false},
        "serial": 77,
        "update": {"has_update": false},
        "ram_total": 50592,
        "ram_free": 38356,
        "fs_size": 233681,
        "fs_free": 162648,
        "uptime": 4242,
        "temperature": 24.8,
        "overtemperature": false,
        "relays": [
            {"ison": true, "has_timer": false, "overpower": false},
            {
                "ison": false,
                "has_timer": true,
                "timer_started": 1_600_000_000_u64,
                "timer_duration": 30,
                "timer_remaining": 12,
                "overpower": false
            }
        ],
        "meters": [
            {"power": 20.45, "is_valid": true, "total": 164},
            {"power": 0.0, "is_valid": true, "total": 0}
        ],
    });
    let settings = json!({
        "max_power": 2500.0,
        "led_status_disable": false,
        "led_power_disable": false,
    });

    let device = Router::new()
        .route("/shelly", get(|| async { Json(json!({"type": "SHPLG-S", "mac": "AA01"})) }))
        .route("/status", get(move || async move { Json(status) }))
        .route("/settings", get(move || async move { Json(settings) }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, device).await.unwrap();
    });
    addr.to_string()
}

async fn get_text(router: Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Marker snapshot standing in for an earlier saved probe.
fn saved_snapshot(name: &str) -> MetricCollection {
    let mut collection = MetricCollection::with_prefix(
        "shelly",
        [("name".to_string(), name.to_string())],
    );
    collection.gauge("humidity", 43.5, &[], "Air humidity, in %rH");
    collection
}

#[tokio::test]
async fn probe_without_target_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(test_store(&dir).await, test_config(vec![]));

    let (status, body) = get_text(router, "/probe").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("target"));
}

#[tokio::test]
async fn probe_with_empty_target_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(test_store(&dir).await, test_config(vec![]));

    let (status, body) = get_text(router, "/probe?target=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.is_empty());
}

#[tokio::test]
async fn probe_unreachable_device_is_bad_request_with_text() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(test_store(&dir).await, test_config(vec![]));

    let (status, body) = get_text(router, &format!("/probe?target={UNREACHABLE}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.is_empty());
}

#[tokio::test]
async fn probe_renders_device_exposition() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_fake_plug().await;
    let router = build_router(test_store(&dir).await, test_config(vec![]));

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/probe?target={addr}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(body.contains(&format!(
        "shelly_relay_ison{{name=\"{addr}\",relay=\"0\",type=\"SHPLG-S\"}} 1"
    )));
    assert!(body.contains(&format!(
        "shelly_relay_ison{{name=\"{addr}\",relay=\"1\",type=\"SHPLG-S\"}} 0"
    )));
    // Timer details only for the armed channel.
    assert!(body.contains(&format!(
        "shelly_relay_timer_remaining{{name=\"{addr}\",relay=\"1\",type=\"SHPLG-S\"}} 12"
    )));
    assert!(!body.contains(&format!(
        "shelly_relay_timer_remaining{{name=\"{addr}\",relay=\"0\",type=\"SHPLG-S\"}}"
    )));
    // A plain probe does not persist anything.
    assert!(!body.contains("shelly_probetime"));
}

#[tokio::test]
async fn probe_with_save_feeds_later_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_fake_plug().await;
    let store = test_store(&dir).await;
    let router = build_router(store, test_config(vec![]));

    let (status, body) = get_text(
        router.clone(),
        &format!("/probe?target={addr}&save=true"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("shelly_probetime"));

    // The saved target is not static, so /metrics serves its snapshot.
    let (status, body) = get_text(router, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(&format!("shelly_uptime{{name=\"{addr}\",type=\"SHPLG-S\"}} 4242")));
    assert!(body.contains("shelly_probetime"));
}

#[tokio::test]
async fn metrics_degrades_unreachable_static_target_to_down() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(
        test_store(&dir).await,
        test_config(vec![UNREACHABLE.to_string()]),
    );

    let (status, body) = get_text(router, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(&format!("shelly_down{{name=\"{UNREACHABLE}\"}} 1")));
    // Only the down indicator carries this target's name.
    assert!(!body.contains("shelly_uptime"));
}

#[tokio::test]
async fn static_target_shadows_saved_probe() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_fake_plug().await;
    let store = test_store(&dir).await;
    // A stale snapshot saved under the same identity as the static target.
    store.save(&addr, saved_snapshot(&addr)).await.unwrap();

    let router = build_router(store, test_config(vec![addr.clone()]));
    let (status, body) = get_text(router, "/metrics").await;
    assert_eq!(status, StatusCode::OK);

    // Live series present, stale snapshot gone.
    assert!(body.contains(&format!("shelly_uptime{{name=\"{addr}\",type=\"SHPLG-S\"}} 4242")));
    assert!(!body.contains("shelly_humidity"));
}

#[tokio::test]
async fn saved_probes_augment_static_targets() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store(&dir).await;
    store
        .save("pushed.lan", saved_snapshot("pushed.lan"))
        .await
        .unwrap();

    let router = build_router(store, test_config(vec![UNREACHABLE.to_string()]));
    let (status, body) = get_text(router, "/metrics").await;
    assert_eq!(status, StatusCode::OK);

    assert!(body.contains(&format!("shelly_down{{name=\"{UNREACHABLE}\"}} 1")));
    assert!(body.contains("shelly_humidity{name=\"pushed.lan\"} 43.5"));
}
