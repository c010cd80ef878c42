//! Daemon configuration.
//!
//! Every flag can also come from a `SHELLY_*` environment variable. A TOML
//! config file, when given, replaces all other flags entirely; it is also
//! the only place to spell per-target overrides.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use shelly_device::TargetOverrides;

#[derive(Parser)]
#[command(
    name = "shellyd",
    about = "Prometheus exporter for Shelly devices",
    version,
)]
pub struct Cli {
    /// TOML config file. When given, all other flags are ignored.
    #[arg(short = 'c', long, env = "SHELLY_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// IP address for the exporter to listen on.
    #[arg(short = 'l', long, env = "SHELLY_LISTEN_IP", default_value = "0.0.0.0")]
    pub listen_ip: IpAddr,

    /// Port for the exporter to listen on.
    #[arg(short = 'p', long, env = "SHELLY_LISTEN_PORT", default_value = "9686")]
    pub listen_port: u16,

    /// Comma-separated targets to scrape when querying /metrics.
    #[arg(short = 's', long, env = "SHELLY_STATIC_TARGETS", default_value = "")]
    pub static_targets: String,

    /// Username for the static targets (same for all).
    #[arg(short = 'U', long, env = "SHELLY_USERNAME")]
    pub username: Option<String>,

    /// Password for the static targets (same for all).
    #[arg(short = 'P', long, env = "SHELLY_PASSWORD")]
    pub password: Option<String>,

    /// Timeout (in seconds) for device requests.
    #[arg(short = 't', long, env = "SHELLY_TIMEOUT", default_value = "5")]
    pub timeout: u64,

    /// File path (or S3 object key) for saved probe snapshots.
    #[arg(short = 'f', long, env = "SHELLY_PROBES_FILE", default_value = "probes.bin")]
    pub probes_file: PathBuf,

    /// S3 bucket holding the probe document; the probes file becomes the
    /// object key. Useful in dynamic containerized setups.
    #[arg(long, env = "SHELLY_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Custom S3 endpoint URL (MinIO and friends), including the scheme.
    #[arg(long, env = "SHELLY_S3_URL")]
    pub s3_url: Option<String>,

    /// Access key ID for the S3 connection.
    #[arg(long, env = "SHELLY_S3_KEY_ID", default_value = "")]
    pub s3_key_id: String,

    /// Secret access key for the S3 connection.
    #[arg(long, env = "SHELLY_S3_SECRET_KEY", default_value = "")]
    pub s3_secret_key: String,
}

/// Fully resolved daemon configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_ip: IpAddr,
    pub listen_port: u16,
    pub static_targets: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Device request timeout in seconds.
    pub timeout: u64,
    pub probes_file: PathBuf,
    pub s3_bucket: Option<String>,
    pub s3_url: Option<String>,
    pub s3_key_id: String,
    pub s3_secret_key: String,
    /// Per-target overrides keyed by target host.
    pub targets: HashMap<String, TargetOverrides>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            listen_port: 9686,
            static_targets: Vec::new(),
            username: None,
            password: None,
            timeout: 5,
            probes_file: PathBuf::from("probes.bin"),
            s3_bucket: None,
            s3_url: None,
            s3_key_id: String::new(),
            s3_secret_key: String::new(),
            targets: HashMap::new(),
        }
    }
}

/// Resolve the configuration from the CLI, or from the config file when
/// one is given.
pub fn load(cli: Cli) -> anyhow::Result<Config> {
    match &cli.config_file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            let config = toml::from_str(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?;
            Ok(config)
        }
        None => Ok(cli.into_config()),
    }
}

impl Cli {
    fn into_config(self) -> Config {
        Config {
            listen_ip: self.listen_ip,
            listen_port: self.listen_port,
            static_targets: parse_static_targets(&self.static_targets),
            username: self.username,
            password: self.password,
            timeout: self.timeout,
            probes_file: self.probes_file,
            s3_bucket: self.s3_bucket,
            s3_url: self.s3_url,
            s3_key_id: self.s3_key_id,
            s3_secret_key: self.s3_secret_key,
            targets: HashMap::new(),
        }
    }
}

fn parse_static_targets(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|target| !target.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.listen_port, 9686);
        assert_eq!(config.timeout, 5);
        assert_eq!(config.probes_file, PathBuf::from("probes.bin"));
        assert!(config.static_targets.is_empty());
        assert!(config.s3_bucket.is_none());
    }

    #[test]
    fn static_targets_split_on_commas() {
        assert_eq!(
            parse_static_targets("plug1.lan, plug2.lan,ht.lan"),
            vec!["plug1.lan", "plug2.lan", "ht.lan"]
        );
        assert!(parse_static_targets("").is_empty());
        assert!(parse_static_targets(" , ").is_empty());
    }

    #[test]
    fn cli_flags_resolve_into_config() {
        let cli = Cli::try_parse_from([
            "shellyd",
            "--listen-port",
            "9700",
            "-s",
            "a.lan,b.lan",
            "-U",
            "admin",
            "-P",
            "secret",
        ])
        .unwrap();
        let config = cli.into_config();

        assert_eq!(config.listen_port, 9700);
        assert_eq!(config.static_targets, vec!["a.lan", "b.lan"]);
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        // Flags not given fall back to their defaults.
        assert_eq!(config.timeout, 5);
    }

    #[test]
    fn toml_file_carries_target_overrides() {
        let text = r#"
            listen_port = 9700
            static_targets = ["plug1.lan"]
            timeout = 10

            [targets."ht.lan"]
            username = "push"
            password = "pass"
            labels = { room = "bathroom" }
        "#;
        let config: Config = toml::from_str(text).unwrap();

        assert_eq!(config.listen_port, 9700);
        assert_eq!(config.timeout, 10);
        assert_eq!(config.static_targets, vec!["plug1.lan"]);

        let overrides = config.targets.get("ht.lan").unwrap();
        assert_eq!(overrides.username.as_deref(), Some("push"));
        assert_eq!(overrides.labels.get("room").unwrap(), "bathroom");
        // Unset fields stay None and inherit at connect time.
        assert!(overrides.timeout.is_none());
    }

    #[test]
    fn toml_defaults_fill_missing_fields() {
        let config: Config = toml::from_str("listen_port = 1234").unwrap();
        assert_eq!(config.listen_port, 1234);
        assert_eq!(config.listen_ip, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.timeout, 5);
    }
}
