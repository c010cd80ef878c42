//! Device identity, type dispatch, and per-target configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shelly_metrics::MetricCollection;
use tracing::debug;

use crate::client::DeviceClient;
use crate::error::{DeviceError, DeviceResult};
use crate::extract;

/// Extraction strategy for a device, derived from its reported model string.
///
/// New device families are supported by adding a variant here and an
/// extraction arm in `extract::dispatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// Metered relay/plug with per-channel relays and power meters (`SHPLG-S`).
    PlugS,
    /// Thermostatic radiator valve (`SHTRV-01`).
    Trv,
    /// Battery-powered humidity/temperature sensor (`SHHT-1`).
    HumidityTemp,
    /// Unrecognized model: generic base extraction only.
    Generic,
}

impl DeviceKind {
    /// Map a reported model string onto an extraction kind.
    pub fn from_type(device_type: &str) -> Self {
        match device_type {
            "SHPLG-S" => DeviceKind::PlugS,
            "SHTRV-01" => DeviceKind::Trv,
            "SHHT-1" => DeviceKind::HumidityTemp,
            _ => DeviceKind::Generic,
        }
    }

    /// Whether extraction for this kind also reads `/settings`.
    pub fn needs_settings(self) -> bool {
        matches!(self, DeviceKind::PlugS)
    }
}

/// Per-target overrides from the daemon configuration.
///
/// Any field set here takes precedence over request-level credentials and
/// the shared timeout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetOverrides {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Device request timeout in seconds.
    pub timeout: Option<u64>,
    /// Extra labels attached to every series of this target.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// A live connection to one device, with its identity resolved.
pub struct Device {
    client: DeviceClient,
    name: String,
    device_type: String,
    kind: DeviceKind,
    extra_labels: BTreeMap<String, String>,
}

impl Device {
    /// Connect to a device: query `/shelly` and derive its extraction kind
    /// from the reported type string.
    pub async fn connect(
        host: &str,
        auth: Option<(String, String)>,
        timeout: Duration,
        extra_labels: BTreeMap<String, String>,
    ) -> DeviceResult<Self> {
        let client = DeviceClient::new(host, auth, timeout)?;
        let identity = client.get("shelly").await?;
        let device_type = identity
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| DeviceError::Malformed {
                host: host.to_string(),
                reason: "missing field `type` in /shelly response".to_string(),
            })?
            .to_string();
        let kind = DeviceKind::from_type(&device_type);
        debug!(host, %device_type, ?kind, "device identified");

        Ok(Self {
            client,
            name: host.to_string(),
            device_type,
            kind,
            extra_labels,
        })
    }

    /// Connect applying per-target overrides over request-level credentials.
    ///
    /// Authentication is only sent when both a username and a password are
    /// available after resolution.
    pub async fn connect_with_overrides(
        host: &str,
        username: Option<&str>,
        password: Option<&str>,
        timeout: Duration,
        overrides: Option<&TargetOverrides>,
    ) -> DeviceResult<Self> {
        let username = overrides.and_then(|o| o.username.as_deref()).or(username);
        let password = overrides.and_then(|o| o.password.as_deref()).or(password);
        let timeout = overrides
            .and_then(|o| o.timeout)
            .map(Duration::from_secs)
            .unwrap_or(timeout);
        let extra_labels = overrides.map(|o| o.labels.clone()).unwrap_or_default();
        let auth = match (username, password) {
            (Some(user), Some(pass)) => Some((user.to_string(), pass.to_string())),
            _ => None,
        };
        Self::connect(host, auth, timeout, extra_labels).await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Probe the device and build its full metric collection.
    pub async fn collect(&self) -> DeviceResult<MetricCollection> {
        let status = self.client.get("status").await?;
        let settings = if self.kind.needs_settings() {
            Some(self.client.get("settings").await?)
        } else {
            None
        };
        extract::dispatch(
            self.kind,
            &self.name,
            &self.device_type,
            &self.extra_labels,
            &status,
            settings.as_ref(),
        )
    }
}
