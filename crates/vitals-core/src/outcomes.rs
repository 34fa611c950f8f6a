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
//! Per-invocation outcome tracking for instrumented business functions.
//!
//! An [`OutcomeTracker`] is an explicit context object owned by one logical
//! unit of work (one request, one task). It is created fresh for that unit
//! and dropped with it, so concurrent units can never see each other's
//! deduplication state. There is intentionally no ambient (thread-local or
//! task-local) current tracker.

use std::collections::HashSet;
use std::time::Duration;

use crate::boundary::best_effort;
use crate::error::Result;
use crate::instruments::{Counter, Histogram, Opts};
use crate::labels;
use crate::registry::Registry;

/// Buckets (seconds) for instrumented function latency.
const LATENCY_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.5, 5.0, 7.0, 10.0];

/// Outcome of one instrumented function call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    /// Status label value.
    pub fn as_label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failed",
        }
    }
}

/// The function-level instruments shared by all trackers.
///
/// Registered once at startup on the chosen registry; cheap to clone.
#[derive(Clone)]
pub struct FunctionMetrics {
    calls: Counter,
    latency: Histogram,
}

impl FunctionMetrics {
    /// Register `function_calls_total` and `function_latency_seconds`.
    pub fn register(registry: &Registry) -> Result<Self> {
        let calls = registry.register_counter(
            Opts::new(
                "function_calls_total",
                "Total instrumented function calls by function name and outcome",
            )
            .with_labels(&["function", "status"]),
        )?;
        let latency = registry.register_histogram(
            Opts::new(
                "function_latency_seconds",
                "Instrumented function execution latency in seconds",
            )
            .with_labels(&["function"]),
            LATENCY_BUCKETS,
        )?;
        Ok(Self { calls, latency })
    }

    /// Current call count for a `(function, outcome)` pair. Test helper.
    pub fn calls(&self, function: &str, outcome: Outcome) -> f64 {
        self.calls
            .value(&labels! { "function" => function, "status" => outcome.as_label() })
    }
}

/// Tracks which `(function, outcome)` pairs have been recorded within one
/// logical unit of work, enforcing at-most-once counting per unit.
///
/// Latency is exempt from deduplication: repeated calls are distinct
/// measurements. A success and a failure for the same function may both land
/// in one context; the key is the pair, not the function name.
///
/// All operations are best-effort: recording failures are logged and
/// swallowed, never surfaced to the business logic driving the tracker.
pub struct OutcomeTracker {
    metrics: FunctionMetrics,
    marked: HashSet<(String, Outcome)>,
}

impl OutcomeTracker {
    /// A fresh tracker for one unit of work.
    pub fn new(metrics: FunctionMetrics) -> Self {
        Self {
            metrics,
            marked: HashSet::new(),
        }
    }

    /// Clear the tracked set, starting a new logical unit in place.
    pub fn reset(&mut self) {
        self.marked.clear();
    }

    /// Record a successful execution of `function`, at most once per unit.
    pub fn mark_success(&mut self, function: &str) {
        self.mark(function, Outcome::Success);
    }

    /// Record a failed execution of `function`, at most once per unit.
    pub fn mark_failure(&mut self, function: &str) {
        self.mark(function, Outcome::Failure);
    }

    fn mark(&mut self, function: &str, outcome: Outcome) {
        let key = (function.to_owned(), outcome);
        if self.marked.contains(&key) {
            return;
        }
        best_effort(
            "function call counter",
            self.metrics
                .calls
                .inc(&labels! { "function" => function, "status" => outcome.as_label() }),
        );
        self.marked.insert(key);
    }

    /// Record execution latency. Never deduplicated.
    pub fn mark_latency(&self, function: &str, duration: Duration) {
        best_effort(
            "function latency histogram",
            self.metrics
                .latency
                .observe(&labels! { "function" => function }, duration.as_secs_f64()),
        );
    }
}
