//! Metric model: named, typed, labeled value samples.
//!
//! All types round-trip through serde so device snapshots can be persisted
//! and replayed losslessly. Label maps are `BTreeMap`s, which makes label
//! set equality independent of insertion order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Metric type tag as it appears in the exposition output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

/// A single sample value.
///
/// Booleans render as `1`/`0` in the exposition output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(true) => write!(f, "1"),
            Value::Bool(false) => write!(f, "0"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

/// One (label set, value) sample under a metric name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub labels: BTreeMap<String, String>,
    pub value: Value,
}

/// All samples recorded under one metric name.
///
/// Sample lists may contain duplicate label sets; merge never dedups, so
/// conflicting samples stay visible to the scraper instead of being
/// silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub samples: Vec<Sample>,
}

/// Ordered set of named metrics produced for one scrape.
///
/// Metric names keep insertion order, which makes the exposition output
/// deterministic. Lookup is a linear scan; collections hold a few dozen
/// names at most.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricCollection {
    prefix: Option<String>,
    base_labels: BTreeMap<String, String>,
    metrics: Vec<Metric>,
}

impl MetricCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection whose metric names carry the given prefix and whose
    /// samples all carry the given base labels.
    pub fn with_prefix<I>(prefix: &str, base_labels: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            prefix: Some(prefix.to_string()),
            base_labels: base_labels.into_iter().collect(),
            metrics: Vec::new(),
        }
    }

    /// Append one sample under `name`.
    ///
    /// Base labels are merged under the per-call labels; a per-call label
    /// wins on key collision. Help and kind are recorded the first time a
    /// name is seen and ignored afterwards.
    pub fn add(&mut self, name: &str, value: Value, labels: &[(&str, &str)], help: &str, kind: MetricKind) {
        let full_name = match &self.prefix {
            Some(prefix) => format!("{prefix}_{name}"),
            None => name.to_string(),
        };
        let mut merged = self.base_labels.clone();
        for (label_key, label_value) in labels {
            merged.insert((*label_key).to_string(), (*label_value).to_string());
        }
        let sample = Sample { labels: merged, value };
        match self.metrics.iter_mut().find(|m| m.name == full_name) {
            Some(metric) => metric.samples.push(sample),
            None => self.metrics.push(Metric {
                name: full_name,
                help: help.to_string(),
                kind,
                samples: vec![sample],
            }),
        }
    }

    pub fn gauge(&mut self, name: &str, value: impl Into<Value>, labels: &[(&str, &str)], help: &str) {
        self.add(name, value.into(), labels, help, MetricKind::Gauge);
    }

    pub fn counter(&mut self, name: &str, value: impl Into<Value>, labels: &[(&str, &str)], help: &str) {
        self.add(name, value.into(), labels, help, MetricKind::Counter);
    }

    /// Metrics in insertion order.
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Concatenate same-named metrics' sample lists across all inputs, in
    /// input order. Samples keep their already-merged labels; help and
    /// kind for each name come from the first collection defining it. No
    /// validation, no dedup.
    pub fn merge<I>(collections: I) -> MetricCollection
    where
        I: IntoIterator<Item = MetricCollection>,
    {
        let mut out = MetricCollection::new();
        for collection in collections {
            for metric in collection.metrics {
                match out.metrics.iter_mut().find(|m| m.name == metric.name) {
                    Some(existing) => existing.samples.extend(metric.samples),
                    None => out.metrics.push(metric),
                }
            }
        }
        out
    }
}
