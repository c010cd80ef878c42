//! shelly-api: HTTP surface of the exporter.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/probe` | Scrape one target now; `save=true` persists the snapshot |
//! | GET | `/metrics` | Aggregate static targets plus saved probes |
//!
//! Device failures never take the server down: `/probe` answers 400 with
//! the error text, `/metrics` degrades the failing target to a
//! `shelly_down` indicator.

pub mod handlers;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use shelly_device::TargetOverrides;
use shelly_store::ProbeStore;

/// Scrape-time settings shared by both endpoints.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Targets scraped on every `/metrics` request.
    pub static_targets: Vec<String>,
    /// Shared credentials for the static targets.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Device request timeout.
    pub timeout: Duration,
    /// Per-target overrides keyed by target host.
    pub targets: HashMap<String, TargetOverrides>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            static_targets: Vec::new(),
            username: None,
            password: None,
            timeout: Duration::from_secs(5),
            targets: HashMap::new(),
        }
    }
}

/// Shared state for the route handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: ProbeStore,
    pub config: Arc<ScrapeConfig>,
}

/// Build the exporter router.
pub fn build_router(store: ProbeStore, config: ScrapeConfig) -> Router {
    let state = ApiState {
        store,
        config: Arc::new(config),
    };
    Router::new()
        .route("/probe", get(handlers::probe))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}
