//! Point-in-time views of registered instruments.
//!
//! A snapshot is a plain value detached from the live registry: encoding or
//! pushing it never holds an instrument lock. Samples within one family are
//! consistent per series, but a snapshot taken concurrently with ongoing
//! observations may see one instrument updated and another not yet. That is
//! acceptable for monitoring and deliberately not papered over.

use crate::labels::LabelSet;

/// The kind of a registered instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    /// Exposition-format type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

/// All series of one instrument at one point in time.
#[derive(Debug, Clone)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    /// One entry per known label tuple, sorted by labels for deterministic
    /// exposition.
    pub samples: Vec<Sample>,
}

/// One series of one instrument.
#[derive(Debug, Clone)]
pub struct Sample {
    pub labels: LabelSet,
    pub value: SampleValue,
}

/// Current value of a series.
#[derive(Debug, Clone)]
pub enum SampleValue {
    Counter(f64),
    Gauge(f64),
    Histogram(HistogramSnapshot),
}

/// Cumulative histogram state for one series.
#[derive(Debug, Clone)]
pub struct HistogramSnapshot {
    /// `(upper_bound, cumulative_count)` per declared bucket. The implicit
    /// `+Inf` bucket is `count` and is not repeated here.
    pub buckets: Vec<(f64, u64)>,
    pub sum: f64,
    pub count: u64,
}
