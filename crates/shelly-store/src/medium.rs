//! Backing media for the persisted probe document.
//!
//! A medium stores one opaque byte blob. The closed variant set keeps
//! dispatch static; adding a medium means adding a variant here.

use std::path::{Path, PathBuf};

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Where the probe document lives.
#[derive(Clone)]
pub enum StorageMedium {
    File(FileMedium),
    Object(ObjectMedium),
}

impl StorageMedium {
    /// Read the whole document. `None` means the resource does not exist yet.
    pub async fn read_bytes(&self) -> StoreResult<Option<Vec<u8>>> {
        match self {
            StorageMedium::File(medium) => medium.read_bytes().await,
            StorageMedium::Object(medium) => medium.read_bytes().await,
        }
    }

    /// Replace the whole document.
    pub async fn write_bytes(&self, bytes: &[u8]) -> StoreResult<()> {
        match self {
            StorageMedium::File(medium) => medium.write_bytes(bytes).await,
            StorageMedium::Object(medium) => medium.write_bytes(bytes).await,
        }
    }

    /// Human-readable location, for logs.
    pub fn describe(&self) -> String {
        match self {
            StorageMedium::File(medium) => medium.path.display().to_string(),
            StorageMedium::Object(medium) => format!("s3://{}/{}", medium.bucket, medium.key),
        }
    }
}

/// Local durable file.
#[derive(Clone)]
pub struct FileMedium {
    path: PathBuf,
}

impl FileMedium {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_bytes(&self) -> StoreResult<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_bytes(&self, bytes: &[u8]) -> StoreResult<()> {
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

/// S3-style remote object.
///
/// Writes stage the document in a uniquely named local temporary file and
/// upload from there, so a failed upload never leaves a half-written blob
/// at the canonical key; the object-store PUT itself is atomic.
#[derive(Clone)]
pub struct ObjectMedium {
    client: aws_sdk_s3::Client,
    bucket: String,
    key: String,
}

impl ObjectMedium {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Build a medium for a MinIO-style endpoint with static credentials
    /// and path-style addressing.
    pub fn with_endpoint(
        bucket: impl Into<String>,
        key: impl Into<String>,
        endpoint_url: Option<&str>,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Self {
        let credentials =
            Credentials::new(access_key_id, secret_access_key, None, None, "shellyd");
        let mut config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .force_path_style(true);
        if let Some(url) = endpoint_url {
            config = config.endpoint_url(url);
        }
        Self::new(aws_sdk_s3::Client::from_conf(config.build()), bucket, key)
    }

    async fn read_bytes(&self) -> StoreResult<Option<Vec<u8>>> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let no_such_key = err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false);
                return if no_such_key {
                    Ok(None)
                } else {
                    Err(StoreError::Object(err.to_string()))
                };
            }
        };
        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Object(e.to_string()))?
            .into_bytes();
        debug!(key = %self.key, len = bytes.len(), "object downloaded");
        Ok(Some(bytes.to_vec()))
    }

    async fn write_bytes(&self, bytes: &[u8]) -> StoreResult<()> {
        let staging = temp_path().await?;
        tokio::fs::write(&staging, bytes).await?;

        let body = ByteStream::from_path(&staging)
            .await
            .map_err(|e| StoreError::Object(e.to_string()));
        let upload = match body {
            Ok(body) => self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(&self.key)
                .body(body)
                .send()
                .await
                .map_err(|e| StoreError::Object(e.to_string()))
                .map(|_| ()),
            Err(e) => Err(e),
        };

        // The staging file is removed whether or not the upload went through.
        tokio::fs::remove_file(&staging).await?;
        upload?;
        debug!(key = %self.key, len = bytes.len(), "object uploaded");
        Ok(())
    }
}

/// Pick a staging path no concurrent process is using.
async fn temp_path() -> StoreResult<PathBuf> {
    loop {
        let candidate =
            std::env::temp_dir().join(format!(".shelly-probes-{}", Uuid::new_v4()));
        if !path_exists(&candidate).await? {
            return Ok(candidate);
        }
    }
}

async fn path_exists(path: &Path) -> StoreResult<bool> {
    Ok(tokio::fs::try_exists(path).await?)
}
