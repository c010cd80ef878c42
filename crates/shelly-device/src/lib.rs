//! shelly-device: probing Shelly devices over their HTTP status API.
//!
//! A `Device` wraps the JSON endpoints of one device (`/shelly`, `/status`,
//! `/settings`) and translates the reported state into a `MetricCollection`.
//! The device model string selects one of a closed set of extraction kinds;
//! unknown models degrade gracefully to the generic base extraction.
//!
//! # Architecture
//!
//! ```text
//! Device::connect() ← GET /shelly, derive DeviceKind from the type string
//!   └── collect() ← GET /status (+ /settings where needed)
//!         └── extract::dispatch() → MetricCollection (pure, testable)
//! ```

pub mod client;
pub mod device;
pub mod error;
pub mod extract;

pub use client::DeviceClient;
pub use device::{Device, DeviceKind, TargetOverrides};
pub use error::{DeviceError, DeviceResult};
pub use extract::dispatch;
