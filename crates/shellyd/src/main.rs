//! shellyd: the Shelly exporter daemon.
//!
//! Single binary that assembles the exporter:
//! - Probe store (local file or S3 object)
//! - Device probing and type dispatch
//! - The `/probe` and `/metrics` HTTP surface
//!
//! # Usage
//!
//! ```text
//! shellyd --listen-port 9686 --static-targets plug1.lan,plug2.lan
//! ```

mod config;

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use shelly_api::ScrapeConfig;
use shelly_store::{FileMedium, ObjectMedium, ProbeStore, StorageMedium};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,shellyd=debug,shelly=debug".parse().unwrap()),
        )
        .init();

    let cli = config::Cli::parse();
    let config = config::load(cli)?;

    // Probe store: an S3 bucket switches the backing medium; the probes
    // file path doubles as the object key.
    let medium = match &config.s3_bucket {
        Some(bucket) => StorageMedium::Object(ObjectMedium::with_endpoint(
            bucket.as_str(),
            config.probes_file.to_string_lossy(),
            config.s3_url.as_deref(),
            &config.s3_key_id,
            &config.s3_secret_key,
        )),
        None => StorageMedium::File(FileMedium::new(&config.probes_file)),
    };
    let store = ProbeStore::open(medium).await?;

    let scrape = ScrapeConfig {
        static_targets: config.static_targets.clone(),
        username: config.username.clone(),
        password: config.password.clone(),
        timeout: Duration::from_secs(config.timeout),
        targets: config.targets.clone(),
    };
    info!(
        static_targets = config.static_targets.len(),
        timeout_secs = config.timeout,
        "exporter configured"
    );

    let router = shelly_api::build_router(store, scrape);
    let addr = SocketAddr::new(config.listen_ip, config.listen_port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "exporter listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
        })
        .await?;

    info!("exporter stopped");
    Ok(())
}
