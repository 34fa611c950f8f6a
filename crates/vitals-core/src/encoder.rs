// Copyright (C) 2026  Vitals Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Text exposition encoding (Prometheus text format 0.0.4).
//!
//! Encoding is a pure function of a snapshot: it takes no locks and has no
//! side effects, so it is safe to run concurrently with ongoing observations.

use std::fmt::Write;

use crate::snapshot::{HistogramSnapshot, MetricFamily, SampleValue};

/// Content type to send with the encoded payload.
pub const TEXT_FORMAT_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Encode metric families into the text exposition format.
pub fn encode_text(families: &[MetricFamily]) -> String {
    let mut out = String::new();
    for family in families {
        // Writing to a String cannot fail; ignore the fmt::Result plumbing.
        let _ = writeln!(out, "# HELP {} {}", family.name, escape_help(&family.help));
        let _ = writeln!(out, "# TYPE {} {}", family.name, family.kind.as_str());
        for sample in &family.samples {
            let labels = render_labels(sample.labels.iter(), None);
            match &sample.value {
                SampleValue::Counter(v) | SampleValue::Gauge(v) => {
                    let _ = writeln!(out, "{}{} {}", family.name, labels, format_value(*v));
                }
                SampleValue::Histogram(snap) => {
                    encode_histogram(&mut out, &family.name, sample, snap);
                }
            }
        }
    }
    out
}

fn encode_histogram(out: &mut String, name: &str, sample: &crate::Sample, snap: &HistogramSnapshot) {
    for (bound, cumulative) in &snap.buckets {
        let labels = render_labels(sample.labels.iter(), Some(("le", &format_value(*bound))));
        let _ = writeln!(out, "{}_bucket{} {}", name, labels, cumulative);
    }
    let inf_labels = render_labels(sample.labels.iter(), Some(("le", "+Inf")));
    let _ = writeln!(out, "{}_bucket{} {}", name, inf_labels, snap.count);
    let plain = render_labels(sample.labels.iter(), None);
    let _ = writeln!(out, "{}_sum{} {}", name, plain, format_value(snap.sum));
    let _ = writeln!(out, "{}_count{} {}", name, plain, snap.count);
}

/// Render `{name="value",...}`, or nothing for the empty label set.
fn render_labels<'a>(
    pairs: impl Iterator<Item = (&'a str, &'a str)>,
    extra: Option<(&str, &str)>,
) -> String {
    let mut rendered: Vec<String> = pairs
        .map(|(name, value)| format!("{}=\"{}\"", name, escape_label_value(value)))
        .collect();
    if let Some((name, value)) = extra {
        rendered.push(format!("{}=\"{}\"", name, escape_label_value(value)));
    }
    if rendered.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", rendered.join(","))
    }
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

/// Integral values print without a fractional part, matching the reference
/// text format ("1" rather than "1.0").
fn format_value(value: f64) -> String {
    if value == f64::INFINITY {
        "+Inf".to_owned()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_owned()
    } else if value.is_nan() {
        "NaN".to_owned()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}
