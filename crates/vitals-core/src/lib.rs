//! Vitals Core
//!
//! Concurrent-safe metric aggregation: a registry of typed instruments,
//! label-keyed time series, per-invocation outcome tracking and the text
//! exposition format for pull-based scrapers.
//!
//! # Features
//!
//! - **Typed Instruments**: Counter, Gauge and Histogram with declared labels
//! - **Lock-free Hot Path**: per-series atomics; locks only on first use
//! - **Outcome Tracking**: at-most-once success/failure per unit of work
//! - **Text Exposition**: Prometheus text format 0.0.4 output
//!
//! # Example
//!
//! ```
//! use vitals_core::{labels, encode_text, Opts, Registry};
//!
//! let registry = Registry::new();
//! let requests = registry
//!     .register_counter(
//!         Opts::new("http_requests_total", "Total HTTP requests")
//!             .with_labels(&["method", "endpoint", "status_code"]),
//!     )
//!     .expect("fresh registry");
//!
//! requests
//!     .inc(&labels! { "method" => "GET", "endpoint" => "/hello", "status_code" => "200" })
//!     .expect("labels match");
//!
//! let text = encode_text(&registry.gather());
//! assert!(text.contains("http_requests_total"));
//! ```

mod atomic;
pub mod boundary;
pub mod encoder;
pub mod error;
pub mod instruments;
pub mod labels;
pub mod outcomes;
pub mod registry;
pub mod snapshot;

pub use boundary::best_effort;
pub use encoder::{encode_text, TEXT_FORMAT_CONTENT_TYPE};
pub use error::{MetricError, Result};
pub use instruments::{Counter, Gauge, Histogram, Opts, DEFAULT_BUCKETS};
pub use labels::LabelSet;
pub use outcomes::{FunctionMetrics, Outcome, OutcomeTracker};
pub use registry::Registry;
pub use snapshot::{HistogramSnapshot, MetricFamily, MetricKind, Sample, SampleValue};
