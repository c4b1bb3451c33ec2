//! Prometheus text exposition format.
//!
//! Output order follows the snapshot: families in registration order, series
//! in insertion order, histogram buckets ascending with `+Inf` last. The same
//! registry state always renders byte-identical text.

use std::fmt::Write;

use crate::accumulator::{HistogramSnapshot, Sample};
use crate::family::{FamilySnapshot, LabelSet};

/// Content type served with the rendered text.
pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Escape `\`, `"` and newline in label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Help text only escapes `\` and newline.
fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Integral values print without a fraction; infinities and NaN use the
/// Prometheus spelling.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        v.to_string()
    }
}

/// `a="x",b="y"` (no braces).
fn label_pairs(names: &[String], labels: &LabelSet) -> String {
    names
        .iter()
        .zip(labels.values())
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn braced(pairs: &str) -> String {
    if pairs.is_empty() {
        String::new()
    } else {
        format!("{{{pairs}}}")
    }
}

fn write_scalar(out: &mut String, name: &str, pairs: &str, value: f64, timestamp_ms: Option<i64>) {
    let _ = write!(out, "{}{} {}", name, braced(pairs), format_value(value));
    if let Some(ts) = timestamp_ms {
        let _ = write!(out, " {ts}");
    }
    out.push('\n');
}

fn write_histogram(out: &mut String, name: &str, pairs: &str, bounds: &[f64], h: &HistogramSnapshot) {
    let prefix = if pairs.is_empty() {
        String::new()
    } else {
        format!("{pairs},")
    };

    for (le, count) in bounds.iter().zip(&h.bucket_counts) {
        let _ = writeln!(
            out,
            "{}_bucket{{{}le=\"{}\"}} {}",
            name,
            prefix,
            format_value(*le),
            count
        );
    }
    let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, h.count);
    let _ = writeln!(out, "{}_sum{} {}", name, braced(pairs), format_value(h.sum));
    let _ = writeln!(out, "{}_count{} {}", name, braced(pairs), h.count);
}

/// Render one family: HELP, TYPE, then one block per series.
pub fn render_family(family: &FamilySnapshot, out: &mut String) {
    let desc = &family.descriptor;
    let _ = writeln!(out, "# HELP {} {}", desc.name, escape_help(&desc.help));
    let _ = writeln!(out, "# TYPE {} {}", desc.name, desc.kind);

    for (labels, sample) in &family.series {
        let pairs = label_pairs(&desc.label_names, labels);
        match sample {
            Sample::Counter { value, timestamp_ms } | Sample::Gauge { value, timestamp_ms } => {
                write_scalar(out, &desc.name, &pairs, *value, *timestamp_ms)
            }
            Sample::Histogram(h) => write_histogram(out, &desc.name, &pairs, &desc.buckets, h),
        }
    }
}

/// Render a full registry snapshot.
pub fn render(families: &[FamilySnapshot]) -> String {
    let mut out = String::new();
    for family in families {
        render_family(family, &mut out);
    }
    out
}
