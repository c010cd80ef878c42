//! Prometheus text exposition format.
//!
//! Renders a merged `MetricCollection` into the text exposition format
//! for scraping by a Prometheus server or compatible agent.

use crate::model::MetricCollection;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render a collection into Prometheus text format.
///
/// Emits `# HELP` and `# TYPE` per metric name, then one line per sample.
/// Samples without labels omit the `{}` block.
pub fn render(collection: &MetricCollection) -> String {
    let mut out = String::new();
    for metric in collection.metrics() {
        out.push_str(&format!("# HELP {} {}\n", metric.name, escape_help(&metric.help)));
        out.push_str(&format!("# TYPE {} {}\n", metric.name, metric.kind.as_str()));
        for sample in &metric.samples {
            if sample.labels.is_empty() {
                out.push_str(&format!("{} {}\n", metric.name, sample.value));
            } else {
                let labels = sample
                    .labels
                    .iter()
                    .map(|(key, value)| format!("{key}=\"{}\"", escape_label_value(value)))
                    .collect::<Vec<_>>()
                    .join(",");
                out.push_str(&format!("{}{{{labels}}} {}\n", metric.name, sample.value));
            }
        }
    }
    out
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}
