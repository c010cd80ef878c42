//! HTTP client for the Shelly device status API.

use std::time::Duration;

use tracing::debug;

use crate::error::{DeviceError, DeviceResult};

/// Client for one device's JSON endpoints.
///
/// Requests are plain `http://<host>/<path>` GETs with optional basic
/// authentication. No retries: a failed request is reported immediately.
#[derive(Debug)]
pub struct DeviceClient {
    host: String,
    auth: Option<(String, String)>,
    http: reqwest::Client,
}

impl DeviceClient {
    /// Build a client for `host`. An empty host is rejected up front.
    pub fn new(host: &str, auth: Option<(String, String)>, timeout: Duration) -> DeviceResult<Self> {
        if host.is_empty() {
            return Err(DeviceError::EmptyTarget);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeviceError::Unreachable {
                host: host.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            host: host.to_string(),
            auth,
            http,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// GET `http://<host>/<path>` and decode the JSON body.
    pub async fn get(&self, path: &str) -> DeviceResult<serde_json::Value> {
        let url = format!("http://{}/{}", self.host, path.trim_start_matches('/'));
        debug!(%url, "querying device");

        let mut request = self.http.get(&url);
        if let Some((username, password)) = &self.auth {
            request = request.basic_auth(username, Some(password));
        }

        let response = request
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| self.unreachable(e))?;
        response.json().await.map_err(|e| self.unreachable(e))
    }

    fn unreachable(&self, error: reqwest::Error) -> DeviceError {
        DeviceError::Unreachable {
            host: self.host.clone(),
            reason: error.to_string(),
        }
    }
}
