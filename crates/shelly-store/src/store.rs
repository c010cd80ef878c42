//! Whole-document probe store over a backing medium.

use std::collections::HashMap;

use shelly_metrics::MetricCollection;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::medium::StorageMedium;

/// The persisted document: device identity to last-saved snapshot.
pub type SnapshotMap = HashMap<String, MetricCollection>;

/// Durable map of saved probe snapshots.
///
/// Entries are never expired; a stale snapshot is served until a newer
/// save overwrites it. That trades freshness for availability of
/// last-known-good data from push-only devices.
#[derive(Clone)]
pub struct ProbeStore {
    medium: StorageMedium,
}

impl ProbeStore {
    /// Open the store, bootstrapping an empty document if the backing
    /// resource does not exist yet.
    pub async fn open(medium: StorageMedium) -> StoreResult<Self> {
        let store = Self { medium };
        if store.medium.read_bytes().await?.is_none() {
            store.write_document(&SnapshotMap::new()).await?;
            info!(store = %store.medium.describe(), "initialized empty probe document");
        } else {
            info!(store = %store.medium.describe(), "re-using existing probe document");
        }
        Ok(store)
    }

    /// Read the whole persisted document.
    ///
    /// An absent resource counts as first use: an empty document is
    /// written back before returning, so the resource exists from here
    /// on. Concurrent initializers can both write the empty document;
    /// the race is benign because the payload is identical.
    pub async fn load(&self) -> StoreResult<SnapshotMap> {
        match self.medium.read_bytes().await? {
            Some(bytes) => {
                bincode::deserialize(&bytes).map_err(|e| StoreError::Codec(e.to_string()))
            }
            None => {
                let empty = SnapshotMap::new();
                self.write_document(&empty).await?;
                Ok(empty)
            }
        }
    }

    /// Replace (or insert) one device's snapshot.
    ///
    /// Read-modify-write over the whole document: two concurrent saves to
    /// different keys race, and the later writer's full document wins.
    /// The backing medium's write atomicity is the only guarantee.
    pub async fn save(&self, target: &str, snapshot: MetricCollection) -> StoreResult<()> {
        let mut document = self.load().await?;
        document.insert(target.to_string(), snapshot);
        self.write_document(&document).await?;
        debug!(%target, "probe snapshot saved");
        Ok(())
    }

    async fn write_document(&self, document: &SnapshotMap) -> StoreResult<()> {
        let bytes =
            bincode::serialize(document).map_err(|e| StoreError::Codec(e.to_string()))?;
        self.medium.write_bytes(&bytes).await
    }
}
