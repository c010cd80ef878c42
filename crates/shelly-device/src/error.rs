//! Error types for device probing.

use thiserror::Error;

/// Result type alias for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors raised while querying a device or decoding its responses.
///
/// Probes are all-or-nothing: any of these fails the whole probe, never a
/// partially populated collection.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Transport failure, timeout, non-2xx status, or a non-JSON body.
    #[error("device {host} unreachable: {reason}")]
    Unreachable { host: String, reason: String },

    /// The device responded but an expected field was absent or mistyped.
    #[error("malformed response from {host}: {reason}")]
    Malformed { host: String, reason: String },

    /// Probe requested without a target host.
    #[error("probe target must not be empty")]
    EmptyTarget,
}
