//! shelly-store: durable map from device identity to its last-saved
//! metric snapshot.
//!
//! The whole document is one binary blob on a pluggable backing medium
//! (local file or S3-style object store). Saves are read-modify-write over
//! the entire document; the only atomicity is the medium's own write, so
//! concurrent savers can race and the later full document wins. That
//! weak-consistency model is intentional for this low-write-rate workload;
//! swapping in per-key updates later only has to preserve the
//! `load`/`save` surface.

pub mod error;
pub mod medium;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use medium::{FileMedium, ObjectMedium, StorageMedium};
pub use store::{ProbeStore, SnapshotMap};
