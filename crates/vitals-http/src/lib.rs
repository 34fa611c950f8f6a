//! Vitals HTTP Instrumentation
//!
//! Tower middleware recording request metrics and an Axum scrape endpoint.
//!
//! # Features
//!
//! - **Independent Layers**: gauge, histogram and counter interceptors
//!   compose in any subset around the inner handler
//! - **Guaranteed Recording**: RAII guards record on success, failure and
//!   cancellation alike
//! - **Bounded Cardinality**: endpoint labels are route templates resolved
//!   after routing, with a raw-path fallback for unmatched requests
//! - **Scrape Endpoint**: `GET /metrics` in the text exposition format
//!
//! # Example
//!
//! ```ignore
//! use vitals_core::Registry;
//! use vitals_http::{HttpMetrics, MetricsServer};
//!
//! let registry = Registry::new();
//! let metrics = HttpMetrics::register(&registry)?;
//!
//! let app = axum::Router::new()
//!     .route("/hello", axum::routing::get(|| async { "hi" }))
//!     .layer(metrics.request_counter_layer())
//!     .layer(metrics.request_duration_layer())
//!     // Outermost so "active" spans the full request.
//!     .layer(metrics.active_requests_layer());
//!
//! let server = MetricsServer::new(registry, 9090);
//! tokio::spawn(async move { server.serve().await });
//! ```

pub mod middleware;
pub mod resolver;
pub mod server;

pub use middleware::{
    ActiveRequestsLayer, HttpMetrics, RequestCounterLayer, RequestDurationLayer,
};
pub use resolver::{EndpointResolver, MatchedPathResolver};
pub use server::{MetricsConfig, MetricsServer};
