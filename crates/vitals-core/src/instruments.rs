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
//! Typed, label-keyed metric instruments.
//!
//! Each instrument owns a map from label tuple to a per-series cell. The hot
//! path (add/set/observe) takes the map's read lock and mutates atomics inside
//! the cell; the write lock is only taken to create a series on first use.
//! No observation ever suspends or takes a registry-wide lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::atomic::AtomicF64;
use crate::error::{MetricError, Result};
use crate::labels::LabelSet;
use crate::snapshot::{HistogramSnapshot, MetricFamily, MetricKind, Sample, SampleValue};

/// Duration buckets (seconds) suitable for request and operation latency.
pub const DEFAULT_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Name, help text and declared label names for an instrument.
#[derive(Debug, Clone)]
pub struct Opts {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
}

impl Opts {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            label_names: Vec::new(),
        }
    }

    /// Declare the fixed label names every observation must carry.
    pub fn with_labels(mut self, names: &[&str]) -> Self {
        self.label_names = names.iter().map(|n| (*n).to_owned()).collect();
        self
    }
}

/// Shared per-instrument state: identity plus the series map.
struct SeriesMap<C> {
    name: String,
    help: String,
    label_names: Vec<String>,
    series: RwLock<HashMap<LabelSet, Arc<C>>>,
}

impl<C> SeriesMap<C> {
    fn new(opts: Opts) -> Self {
        Self {
            name: opts.name,
            help: opts.help,
            label_names: opts.label_names,
            series: RwLock::new(HashMap::new()),
        }
    }

    fn check_labels(&self, labels: &LabelSet) -> Result<()> {
        if labels.matches(&self.label_names) {
            Ok(())
        } else {
            Err(MetricError::LabelMismatch {
                metric: self.name.clone(),
                expected: self.label_names.join(", "),
                provided: labels.names().collect::<Vec<_>>().join(", "),
            })
        }
    }

    /// Fetch the cell for `labels`, creating it on first use.
    ///
    /// Lazy creation double-checks under the write lock so concurrent first
    /// observations of the same tuple agree on a single cell.
    fn cell(&self, labels: &LabelSet, init: impl FnOnce() -> C) -> Arc<C> {
        if let Some(cell) = self
            .series
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(labels)
        {
            return Arc::clone(cell);
        }
        let mut series = self
            .series
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(
            series
                .entry(labels.clone())
                .or_insert_with(|| Arc::new(init())),
        )
    }

    fn existing_cell(&self, labels: &LabelSet) -> Option<Arc<C>> {
        self.series
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(labels)
            .map(Arc::clone)
    }

    /// Clone out all series handles; sorting keeps exposition deterministic.
    fn collect_cells(&self) -> Vec<(LabelSet, Arc<C>)> {
        let mut cells: Vec<_> = self
            .series
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(labels, cell)| (labels.clone(), Arc::clone(cell)))
            .collect();
        cells.sort_by(|a, b| a.0.cmp(&b.0));
        cells
    }
}

fn finite(metric: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MetricError::NonFiniteValue {
            metric: metric.to_owned(),
            value,
        })
    }
}

// ---------------------------------------------------------------------------
// Counter
// ---------------------------------------------------------------------------

/// Monotonic non-negative accumulator per label tuple.
///
/// Cheap to clone; clones share the same underlying series.
#[derive(Clone)]
pub struct Counter {
    map: Arc<SeriesMap<AtomicF64>>,
}

impl Counter {
    pub(crate) fn new(opts: Opts) -> Self {
        Self {
            map: Arc::new(SeriesMap::new(opts)),
        }
    }

    pub fn name(&self) -> &str {
        &self.map.name
    }

    /// Increment by 1.
    pub fn inc(&self, labels: &LabelSet) -> Result<()> {
        self.add(labels, 1.0)
    }

    /// Increment by `delta`. Negative or non-finite deltas are rejected.
    pub fn add(&self, labels: &LabelSet, delta: f64) -> Result<()> {
        if delta < 0.0 || !delta.is_finite() {
            return Err(MetricError::InvalidDelta {
                metric: self.map.name.clone(),
                delta,
            });
        }
        self.map.check_labels(labels)?;
        self.map.cell(labels, AtomicF64::default).add(delta);
        Ok(())
    }

    /// Current value for a label tuple; 0 when the series does not exist yet.
    pub fn value(&self, labels: &LabelSet) -> f64 {
        self.map
            .existing_cell(labels)
            .map(|cell| cell.get())
            .unwrap_or(0.0)
    }

    pub(crate) fn family(&self) -> MetricFamily {
        MetricFamily {
            name: self.map.name.clone(),
            help: self.map.help.clone(),
            kind: MetricKind::Counter,
            samples: self
                .map
                .collect_cells()
                .into_iter()
                .map(|(labels, cell)| Sample {
                    labels,
                    value: SampleValue::Counter(cell.get()),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Gauge
// ---------------------------------------------------------------------------

/// Up/down accumulator per label tuple, reflecting current state.
#[derive(Clone)]
pub struct Gauge {
    map: Arc<SeriesMap<AtomicF64>>,
}

impl std::fmt::Debug for Gauge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gauge")
            .field("name", &self.map.name)
            .finish_non_exhaustive()
    }
}

impl Gauge {
    pub(crate) fn new(opts: Opts) -> Self {
        Self {
            map: Arc::new(SeriesMap::new(opts)),
        }
    }

    pub fn name(&self) -> &str {
        &self.map.name
    }

    pub fn inc(&self, labels: &LabelSet) -> Result<()> {
        self.add(labels, 1.0)
    }

    pub fn dec(&self, labels: &LabelSet) -> Result<()> {
        self.add(labels, -1.0)
    }

    /// Add `delta` (any sign).
    pub fn add(&self, labels: &LabelSet, delta: f64) -> Result<()> {
        let delta = finite(&self.map.name, delta)?;
        self.map.check_labels(labels)?;
        self.map.cell(labels, AtomicF64::default).add(delta);
        Ok(())
    }

    pub fn sub(&self, labels: &LabelSet, delta: f64) -> Result<()> {
        self.add(labels, -delta)
    }

    /// Overwrite the current value.
    pub fn set(&self, labels: &LabelSet, value: f64) -> Result<()> {
        let value = finite(&self.map.name, value)?;
        self.map.check_labels(labels)?;
        self.map.cell(labels, AtomicF64::default).set(value);
        Ok(())
    }

    /// Current value for a label tuple; 0 when the series does not exist yet.
    pub fn value(&self, labels: &LabelSet) -> f64 {
        self.map
            .existing_cell(labels)
            .map(|cell| cell.get())
            .unwrap_or(0.0)
    }

    pub(crate) fn family(&self) -> MetricFamily {
        MetricFamily {
            name: self.map.name.clone(),
            help: self.map.help.clone(),
            kind: MetricKind::Gauge,
            samples: self
                .map
                .collect_cells()
                .into_iter()
                .map(|(labels, cell)| Sample {
                    labels,
                    value: SampleValue::Gauge(cell.get()),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// Per-series histogram state. Bucket hits are stored non-cumulative; the
/// snapshot accumulates them into the exposition-format cumulative form.
struct HistogramCell {
    bucket_hits: Vec<AtomicU64>,
    sum: AtomicF64,
    count: AtomicU64,
}

impl HistogramCell {
    fn new(bucket_len: usize) -> Self {
        Self {
            bucket_hits: (0..bucket_len).map(|_| AtomicU64::new(0)).collect(),
            sum: AtomicF64::default(),
            count: AtomicU64::new(0),
        }
    }
}

/// Distribution recorder with fixed bucket upper bounds plus sum and count.
#[derive(Clone)]
pub struct Histogram {
    map: Arc<SeriesMap<HistogramCell>>,
    bounds: Arc<Vec<f64>>,
}

impl std::fmt::Debug for Histogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Histogram")
            .field("name", &self.map.name)
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

impl Histogram {
    pub(crate) fn new(opts: Opts, buckets: &[f64]) -> Result<Self> {
        let increasing = buckets.windows(2).all(|pair| pair[0] < pair[1]);
        if !increasing || buckets.iter().any(|bound| !bound.is_finite()) {
            return Err(MetricError::InvalidBuckets(opts.name));
        }
        Ok(Self {
            map: Arc::new(SeriesMap::new(opts)),
            bounds: Arc::new(buckets.to_vec()),
        })
    }

    pub fn name(&self) -> &str {
        &self.map.name
    }

    /// Bucket upper bounds, excluding the implicit `+Inf`.
    pub fn buckets(&self) -> &[f64] {
        &self.bounds
    }

    /// Record one observation: the matching bucket, the running sum and the
    /// count. Values above the last bound only land in `+Inf` (the count).
    pub fn observe(&self, labels: &LabelSet, value: f64) -> Result<()> {
        let value = finite(&self.map.name, value)?;
        self.map.check_labels(labels)?;
        let bucket_len = self.bounds.len();
        let cell = self.map.cell(labels, || HistogramCell::new(bucket_len));
        // Buckets are few (typically <= 12); a linear scan beats bookkeeping.
        if let Some(idx) = self.bounds.iter().position(|bound| value <= *bound) {
            cell.bucket_hits[idx].fetch_add(1, Ordering::Relaxed);
        }
        cell.sum.add(value);
        cell.count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Cumulative snapshot for a label tuple, if the series exists.
    pub fn snapshot(&self, labels: &LabelSet) -> Option<HistogramSnapshot> {
        self.map
            .existing_cell(labels)
            .map(|cell| self.cell_snapshot(&cell))
    }

    fn cell_snapshot(&self, cell: &HistogramCell) -> HistogramSnapshot {
        let mut cumulative = 0u64;
        let buckets = self
            .bounds
            .iter()
            .zip(&cell.bucket_hits)
            .map(|(bound, hits)| {
                cumulative += hits.load(Ordering::Relaxed);
                (*bound, cumulative)
            })
            .collect();
        HistogramSnapshot {
            buckets,
            sum: cell.sum.get(),
            count: cell.count.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn family(&self) -> MetricFamily {
        MetricFamily {
            name: self.map.name.clone(),
            help: self.map.help.clone(),
            kind: MetricKind::Histogram,
            samples: self
                .map
                .collect_cells()
                .into_iter()
                .map(|(labels, cell)| Sample {
                    labels,
                    value: SampleValue::Histogram(self.cell_snapshot(&cell)),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels;

    fn counter() -> Counter {
        Counter::new(Opts::new("requests_total", "Test counter").with_labels(&["method"]))
    }

    #[test]
    fn test_counter_sums_deltas() {
        let counter = counter();
        let labels = labels! { "method" => "GET" };
        counter.inc(&labels).unwrap();
        counter.add(&labels, 4.0).unwrap();
        assert_eq!(counter.value(&labels), 5.0);
    }

    #[test]
    fn test_counter_rejects_negative_delta() {
        let counter = counter();
        let labels = labels! { "method" => "GET" };
        let err = counter.add(&labels, -1.0).unwrap_err();
        assert!(matches!(err, MetricError::InvalidDelta { .. }));
        assert_eq!(counter.value(&labels), 0.0);
    }

    #[test]
    fn test_counter_rejects_wrong_labels() {
        let counter = counter();
        let err = counter.inc(&labels! { "verb" => "GET" }).unwrap_err();
        assert!(matches!(err, MetricError::LabelMismatch { .. }));
    }

    #[test]
    fn test_counter_series_are_independent() {
        let counter = counter();
        counter.inc(&labels! { "method" => "GET" }).unwrap();
        counter.inc(&labels! { "method" => "GET" }).unwrap();
        counter.inc(&labels! { "method" => "POST" }).unwrap();
        assert_eq!(counter.value(&labels! { "method" => "GET" }), 2.0);
        assert_eq!(counter.value(&labels! { "method" => "POST" }), 1.0);
    }

    #[test]
    fn test_gauge_net_sum() {
        let gauge = Gauge::new(Opts::new("in_flight", "Test gauge").with_labels(&["endpoint"]));
        let labels = labels! { "endpoint" => "all" };
        gauge.inc(&labels).unwrap();
        gauge.inc(&labels).unwrap();
        gauge.dec(&labels).unwrap();
        assert_eq!(gauge.value(&labels), 1.0);
        gauge.set(&labels, 40.0).unwrap();
        gauge.sub(&labels, 2.5).unwrap();
        assert_eq!(gauge.value(&labels), 37.5);
    }

    #[test]
    fn test_histogram_buckets_sum_count() {
        let histogram = Histogram::new(
            Opts::new("latency_seconds", "Test histogram").with_labels(&["endpoint"]),
            &[0.1, 0.5, 1.0],
        )
        .unwrap();
        let labels = labels! { "endpoint" => "/hello" };
        histogram.observe(&labels, 0.05).unwrap();
        histogram.observe(&labels, 0.3).unwrap();
        histogram.observe(&labels, 2.0).unwrap();

        let snap = histogram.snapshot(&labels).unwrap();
        // Cumulative: <=0.1 sees one, <=0.5 and <=1.0 see two, +Inf all three.
        assert_eq!(snap.buckets, vec![(0.1, 1), (0.5, 2), (1.0, 2)]);
        assert_eq!(snap.count, 3);
        assert!((snap.sum - 2.35).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_boundary_value_lands_in_bucket() {
        let histogram = Histogram::new(
            Opts::new("latency_seconds", "Test histogram"),
            &[0.1, 0.5],
        )
        .unwrap();
        histogram.observe(&LabelSet::empty(), 0.5).unwrap();
        let snap = histogram.snapshot(&LabelSet::empty()).unwrap();
        assert_eq!(snap.buckets, vec![(0.1, 0), (0.5, 1)]);
    }

    #[test]
    fn test_histogram_rejects_non_finite() {
        let histogram =
            Histogram::new(Opts::new("latency_seconds", "Test histogram"), &[1.0]).unwrap();
        let err = histogram
            .observe(&LabelSet::empty(), f64::INFINITY)
            .unwrap_err();
        assert!(matches!(err, MetricError::NonFiniteValue { .. }));
    }

    #[test]
    fn test_histogram_rejects_unsorted_buckets() {
        let err = Histogram::new(Opts::new("h", "Test"), &[1.0, 0.5]).unwrap_err();
        assert!(matches!(err, MetricError::InvalidBuckets(_)));
    }
}
