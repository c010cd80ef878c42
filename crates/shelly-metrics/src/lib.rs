//! shelly-metrics: the vendor-neutral metric model of the exporter.
//!
//! A `MetricCollection` accumulates named, typed, labeled samples for one
//! scrape; collections from several devices are combined with
//! `MetricCollection::merge` and serialized for scraping with `render`.
//!
//! # Architecture
//!
//! ```text
//! MetricCollection
//!   ├── gauge()/counter() ← called per extracted device field
//!   ├── merge() → one collection per exposition response
//!   └── render() → text/plain for the HTTP handlers
//! ```

pub mod model;
pub mod render;

pub use model::{Metric, MetricCollection, MetricKind, Sample, Value};
pub use render::{CONTENT_TYPE, render};
