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
//! Registry owning the set of registered instruments.

use std::sync::{Arc, RwLock};

use crate::error::{MetricError, Result};
use crate::instruments::{Counter, Gauge, Histogram, Opts};
use crate::snapshot::MetricFamily;

/// A registered instrument of any kind.
#[derive(Clone)]
enum Instrument {
    Counter(Counter),
    Gauge(Gauge),
    Histogram(Histogram),
}

impl Instrument {
    fn name(&self) -> &str {
        match self {
            Instrument::Counter(c) => c.name(),
            Instrument::Gauge(g) => g.name(),
            Instrument::Histogram(h) => h.name(),
        }
    }

    fn family(&self) -> MetricFamily {
        match self {
            Instrument::Counter(c) => c.family(),
            Instrument::Gauge(g) => g.family(),
            Instrument::Histogram(h) => h.family(),
        }
    }
}

/// Central registry of metric instruments.
///
/// Thread-safe and cheap to clone; clones share the same instruments. There
/// is deliberately no process-global instance: the "shared" deployment mode
/// is a single `Registry` constructed at startup and cloned into every
/// component, and test isolation is a fresh `Registry` per test. Instruments
/// are append-only for the registry's lifetime.
///
/// The registry lock is only held for registration, lookup and snapshotting.
/// Observations go through cloned instrument handles and never touch it.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<Vec<Instrument>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new counter. Fails if the name is already taken.
    pub fn register_counter(&self, opts: Opts) -> Result<Counter> {
        let counter = Counter::new(opts);
        self.insert(Instrument::Counter(counter.clone()))?;
        Ok(counter)
    }

    /// Register a new gauge. Fails if the name is already taken.
    pub fn register_gauge(&self, opts: Opts) -> Result<Gauge> {
        let gauge = Gauge::new(opts);
        self.insert(Instrument::Gauge(gauge.clone()))?;
        Ok(gauge)
    }

    /// Register a new histogram with the given bucket upper bounds.
    pub fn register_histogram(&self, opts: Opts, buckets: &[f64]) -> Result<Histogram> {
        let histogram = Histogram::new(opts, buckets)?;
        self.insert(Instrument::Histogram(histogram.clone()))?;
        Ok(histogram)
    }

    fn insert(&self, instrument: Instrument) -> Result<()> {
        let mut instruments = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if instruments.iter().any(|i| i.name() == instrument.name()) {
            return Err(MetricError::DuplicateName(instrument.name().to_owned()));
        }
        instruments.push(instrument);
        Ok(())
    }

    /// Look up a registered counter by name.
    pub fn counter(&self, name: &str) -> Result<Counter> {
        match self.find(name) {
            Some(Instrument::Counter(c)) => Ok(c),
            _ => Err(MetricError::NotFound(name.to_owned())),
        }
    }

    /// Look up a registered gauge by name.
    pub fn gauge(&self, name: &str) -> Result<Gauge> {
        match self.find(name) {
            Some(Instrument::Gauge(g)) => Ok(g),
            _ => Err(MetricError::NotFound(name.to_owned())),
        }
    }

    /// Look up a registered histogram by name.
    pub fn histogram(&self, name: &str) -> Result<Histogram> {
        match self.find(name) {
            Some(Instrument::Histogram(h)) => Ok(h),
            _ => Err(MetricError::NotFound(name.to_owned())),
        }
    }

    fn find(&self, name: &str) -> Option<Instrument> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .find(|i| i.name() == name)
            .cloned()
    }

    /// Snapshot every instrument, in registration order.
    ///
    /// The registry lock is released before any per-instrument work; a
    /// gather running concurrently with observations sees each series'
    /// latest committed value but makes no cross-instrument guarantee.
    pub fn gather(&self) -> Vec<MetricFamily> {
        let instruments: Vec<Instrument> = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        instruments.iter().map(Instrument::family).collect()
    }
}
