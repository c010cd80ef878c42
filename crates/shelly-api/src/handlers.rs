//! Route handlers for `/probe` and `/metrics`.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use shelly_device::{Device, DeviceError, DeviceResult};
use shelly_metrics::{CONTENT_TYPE, MetricCollection, render};
use tracing::{error, warn};

use crate::{ApiState, ScrapeConfig};

/// Query parameters accepted by `/probe`.
#[derive(Debug, Deserialize)]
pub struct ProbeParams {
    target: Option<String>,
    username: Option<String>,
    password: Option<String>,
    #[serde(default)]
    save: bool,
}

/// GET /probe — scrape one device on demand.
///
/// With `save=true` the snapshot (plus a `probetime` counter) is written
/// to the probe store before responding, so push-only devices can point
/// their wake-up update URL here and show up on `/metrics` later.
pub async fn probe(State(state): State<ApiState>, Query(params): Query<ProbeParams>) -> Response {
    let target = match params.target.as_deref() {
        Some(target) if !target.is_empty() => target,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                DeviceError::EmptyTarget.to_string(),
            )
                .into_response();
        }
    };

    let connected = Device::connect_with_overrides(
        target,
        params.username.as_deref(),
        params.password.as_deref(),
        state.config.timeout,
        state.config.targets.get(target),
    )
    .await;

    let collection = match connected {
        Ok(device) => device.collect().await,
        Err(e) => Err(e),
    };
    let mut collection = match collection {
        Ok(collection) => collection,
        Err(e) => {
            warn!(%target, error = %e, "probe failed");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    if params.save {
        collection.counter(
            "probetime",
            epoch_secs(),
            &[],
            "Unix time this target was probed and saved",
        );
        if let Err(e) = state.store.save(target, collection.clone()).await {
            error!(%target, error = %e, "saving probe snapshot failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    }

    exposition(&collection)
}

/// GET /metrics — aggregate the static target set plus saved probes.
///
/// Every static target is attempted live; a failure degrades to a single
/// `shelly_down` series so the rest of the batch still reports. Saved
/// snapshots are appended for identities not in the static set: a static
/// target always shadows a same-named saved probe.
pub async fn metrics(State(state): State<ApiState>) -> Response {
    let config = &state.config;
    let mut collections = Vec::new();

    for target in &config.static_targets {
        match probe_static(config, target).await {
            Ok(collection) => collections.push(collection),
            Err(e) => {
                warn!(%target, error = %e, "static target probe failed");
                collections.push(down_collection(target));
            }
        }
    }

    let saved = match state.store.load().await {
        Ok(saved) => saved,
        Err(e) => {
            error!(error = %e, "loading probe store failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };
    let mut saved: Vec<_> = saved.into_iter().collect();
    saved.sort_by(|a, b| a.0.cmp(&b.0));
    for (target, snapshot) in saved {
        if !config.static_targets.iter().any(|t| *t == target) {
            collections.push(snapshot);
        }
    }

    exposition(&MetricCollection::merge(collections))
}

async fn probe_static(config: &ScrapeConfig, target: &str) -> DeviceResult<MetricCollection> {
    let device = Device::connect_with_overrides(
        target,
        config.username.as_deref(),
        config.password.as_deref(),
        config.timeout,
        config.targets.get(target),
    )
    .await?;
    device.collect().await
}

/// Single-series indicator for a static target that could not be probed.
fn down_collection(target: &str) -> MetricCollection {
    let mut collection =
        MetricCollection::with_prefix("shelly", [("name".to_string(), target.to_string())]);
    collection.gauge("down", true, &[], "Shelly can't be reached");
    collection
}

fn exposition(collection: &MetricCollection) -> Response {
    (
        StatusCode::OK,
        [("content-type", CONTENT_TYPE)],
        render(collection),
    )
        .into_response()
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn down_collection_has_one_series_for_the_target() {
        let collection = down_collection("plug.lan");
        assert_eq!(collection.metrics().len(), 1);

        let metric = &collection.metrics()[0];
        assert_eq!(metric.name, "shelly_down");
        assert_eq!(metric.samples.len(), 1);
        assert_eq!(metric.samples[0].labels.get("name").unwrap(), "plug.lan");
        // No type label: the device never answered, so its model is unknown.
        assert!(!metric.samples[0].labels.contains_key("type"));
    }

    #[test]
    fn down_collection_renders_as_one() {
        let output = render(&down_collection("plug.lan"));
        assert!(output.contains("shelly_down{name=\"plug.lan\"} 1"));
    }
}
