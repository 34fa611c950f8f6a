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
//! Request instrumentation middleware.
//!
//! Three independent tower layers, each adding exactly one concern around the
//! inner service:
//!
//! - [`ActiveRequestsLayer`] — in-flight gauge, decremented by an RAII guard
//! - [`RequestDurationLayer`] — wall-clock latency histogram
//! - [`RequestCounterLayer`] — total requests by method/endpoint/status
//!
//! Any subset composes; none reads another's state. Recording survives every
//! exit path: normal responses, inner-service errors (labelled with the
//! synthetic status 500, the error itself passes through untouched) and
//! cancellation, where dropping the in-flight future fires the guards.
//! Recording failures are logged and swallowed at the [`best_effort`]
//! boundary and never alter the response.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use http::{Request, Response};
use tower::{Layer, Service};
use vitals_core::{best_effort, labels, Counter, Gauge, Histogram, LabelSet, Opts, Registry};

use crate::resolver::{EndpointResolver, MatchedPathResolver};

/// Label value for the in-flight gauge. A single bounded series; the
/// per-endpoint breakdown belongs to the counter and histogram.
const ACTIVE_ALL: &str = "all";

/// Status label used when the inner service fails or the request is
/// cancelled before producing a response.
const SYNTHETIC_FAILURE_STATUS: u16 = 500;

type BoxedResultFuture<R, E> = Pin<Box<dyn Future<Output = Result<R, E>> + Send>>;

/// The three request-level instruments, registered together.
///
/// Cheap to clone; clones share series. Register once per registry at
/// startup, then hand clones to the layers.
#[derive(Clone)]
pub struct HttpMetrics {
    requests_total: Counter,
    request_duration: Histogram,
    requests_active: Gauge,
}

impl HttpMetrics {
    /// Register `http_requests_total`, `http_request_duration_seconds` and
    /// `http_requests_active` on `registry`.
    pub fn register(registry: &Registry) -> vitals_core::Result<Self> {
        let requests_total = registry.register_counter(
            Opts::new(
                "http_requests_total",
                "Total HTTP requests by method, endpoint, and status code",
            )
            .with_labels(&["method", "endpoint", "status_code"]),
        )?;
        let request_duration = registry.register_histogram(
            Opts::new(
                "http_request_duration_seconds",
                "HTTP request duration by method and endpoint (seconds)",
            )
            .with_labels(&["method", "endpoint"]),
            vitals_core::DEFAULT_BUCKETS,
        )?;
        let requests_active = registry.register_gauge(
            Opts::new("http_requests_active", "HTTP requests currently in flight")
                .with_labels(&["endpoint"]),
        )?;
        Ok(Self {
            requests_total,
            request_duration,
            requests_active,
        })
    }

    /// Layer maintaining the in-flight gauge.
    pub fn active_requests_layer(&self) -> ActiveRequestsLayer {
        ActiveRequestsLayer {
            gauge: self.requests_active.clone(),
        }
    }

    /// Layer recording request latency.
    pub fn request_duration_layer(&self) -> RequestDurationLayer {
        RequestDurationLayer {
            histogram: self.request_duration.clone(),
            resolver: Arc::new(MatchedPathResolver),
        }
    }

    /// Layer counting completed requests.
    pub fn request_counter_layer(&self) -> RequestCounterLayer {
        RequestCounterLayer {
            counter: self.requests_total.clone(),
            resolver: Arc::new(MatchedPathResolver),
        }
    }

    /// Current total for one `(method, endpoint, status_code)` series.
    pub fn requests(&self, method: &str, endpoint: &str, status_code: u16) -> f64 {
        self.requests_total.value(&labels! {
            "method" => method,
            "endpoint" => endpoint,
            "status_code" => status_code.to_string()
        })
    }

    /// Current in-flight gauge value.
    pub fn active(&self) -> f64 {
        self.requests_active
            .value(&labels! { "endpoint" => ACTIVE_ALL })
    }

    /// Number of latency observations for one `(method, endpoint)` series.
    pub fn duration_count(&self, method: &str, endpoint: &str) -> u64 {
        self.request_duration
            .snapshot(&labels! { "method" => method, "endpoint" => endpoint })
            .map(|snap| snap.count)
            .unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Gauge interceptor
// ---------------------------------------------------------------------------

/// Increments the in-flight gauge on entry and decrements it when the
/// request finishes, fails, or is cancelled.
#[derive(Clone)]
pub struct ActiveRequestsLayer {
    gauge: Gauge,
}

impl<S> Layer<S> for ActiveRequestsLayer {
    type Service = ActiveRequests<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ActiveRequests {
            inner,
            gauge: self.gauge.clone(),
        }
    }
}

/// Service produced by [`ActiveRequestsLayer`].
#[derive(Clone)]
pub struct ActiveRequests<S> {
    inner: S,
    gauge: Gauge,
}

/// Decrements on drop, so a cancelled request cannot leak an increment.
struct ActiveGuard {
    gauge: Gauge,
}

impl ActiveGuard {
    fn enter(gauge: Gauge) -> Self {
        best_effort(
            "active requests gauge increment",
            gauge.inc(&labels! { "endpoint" => ACTIVE_ALL }),
        );
        Self { gauge }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        best_effort(
            "active requests gauge decrement",
            self.gauge.dec(&labels! { "endpoint" => ACTIVE_ALL }),
        );
    }
}

impl<S, ReqB, ResB> Service<Request<ReqB>> for ActiveRequests<S>
where
    S: Service<Request<ReqB>, Response = Response<ResB>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqB: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxedResultFuture<S::Response, S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqB>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gauge = self.gauge.clone();
        Box::pin(async move {
            let _guard = ActiveGuard::enter(gauge);
            inner.call(req).await
        })
    }
}

// ---------------------------------------------------------------------------
// Histogram interceptor
// ---------------------------------------------------------------------------

/// Records wall-clock latency from entry to exit on every path.
#[derive(Clone)]
pub struct RequestDurationLayer {
    histogram: Histogram,
    resolver: Arc<dyn EndpointResolver>,
}

impl RequestDurationLayer {
    /// Replace the default [`MatchedPathResolver`].
    pub fn with_resolver(mut self, resolver: Arc<dyn EndpointResolver>) -> Self {
        self.resolver = resolver;
        self
    }
}

impl<S> Layer<S> for RequestDurationLayer {
    type Service = RequestDuration<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestDuration {
            inner,
            histogram: self.histogram.clone(),
            resolver: Arc::clone(&self.resolver),
        }
    }
}

/// Service produced by [`RequestDurationLayer`].
#[derive(Clone)]
pub struct RequestDuration<S> {
    inner: S,
    histogram: Histogram,
    resolver: Arc<dyn EndpointResolver>,
}

/// Observes elapsed time exactly once, on drop at the latest.
struct TimerGuard {
    histogram: Histogram,
    labels: LabelSet,
    start: Instant,
    recorded: bool,
}

impl TimerGuard {
    fn start(histogram: Histogram, method: &str, endpoint: &str) -> Self {
        Self {
            histogram,
            labels: labels! { "method" => method, "endpoint" => endpoint },
            start: Instant::now(),
            recorded: false,
        }
    }

    fn record(&mut self) {
        if self.recorded {
            return;
        }
        self.recorded = true;
        best_effort(
            "request duration histogram",
            self.histogram
                .observe(&self.labels, self.start.elapsed().as_secs_f64()),
        );
    }

    fn finish(mut self) {
        self.record();
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.record();
    }
}

impl<S, ReqB, ResB> Service<Request<ReqB>> for RequestDuration<S>
where
    S: Service<Request<ReqB>, Response = Response<ResB>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqB: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxedResultFuture<S::Response, S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqB>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let histogram = self.histogram.clone();
        let method = req.method().to_string();
        let endpoint = self.resolver.endpoint(req.extensions(), req.uri());
        Box::pin(async move {
            let guard = TimerGuard::start(histogram, &method, &endpoint);
            let result = inner.call(req).await;
            guard.finish();
            result
        })
    }
}

// ---------------------------------------------------------------------------
// Counter interceptor
// ---------------------------------------------------------------------------

/// Counts completed requests with their resolved status code.
#[derive(Clone)]
pub struct RequestCounterLayer {
    counter: Counter,
    resolver: Arc<dyn EndpointResolver>,
}

impl RequestCounterLayer {
    /// Replace the default [`MatchedPathResolver`].
    pub fn with_resolver(mut self, resolver: Arc<dyn EndpointResolver>) -> Self {
        self.resolver = resolver;
        self
    }
}

impl<S> Layer<S> for RequestCounterLayer {
    type Service = RequestCounter<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestCounter {
            inner,
            counter: self.counter.clone(),
            resolver: Arc::clone(&self.resolver),
        }
    }
}

/// Service produced by [`RequestCounterLayer`].
#[derive(Clone)]
pub struct RequestCounter<S> {
    inner: S,
    counter: Counter,
    resolver: Arc<dyn EndpointResolver>,
}

/// Counts exactly once; drop without a status records the synthetic 500.
struct CounterGuard {
    counter: Counter,
    method: String,
    endpoint: String,
    recorded: bool,
}

impl CounterGuard {
    fn new(counter: Counter, method: String, endpoint: String) -> Self {
        Self {
            counter,
            method,
            endpoint,
            recorded: false,
        }
    }

    fn record(&mut self, status: u16) {
        if self.recorded {
            return;
        }
        self.recorded = true;
        best_effort(
            "request counter",
            self.counter.inc(&labels! {
                "method" => self.method.as_str(),
                "endpoint" => self.endpoint.as_str(),
                "status_code" => status.to_string()
            }),
        );
    }

    fn finish(mut self, status: u16) {
        self.record(status);
    }
}

impl Drop for CounterGuard {
    fn drop(&mut self) {
        self.record(SYNTHETIC_FAILURE_STATUS);
    }
}

impl<S, ReqB, ResB> Service<Request<ReqB>> for RequestCounter<S>
where
    S: Service<Request<ReqB>, Response = Response<ResB>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqB: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxedResultFuture<S::Response, S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqB>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let counter = self.counter.clone();
        let method = req.method().to_string();
        let endpoint = self.resolver.endpoint(req.extensions(), req.uri());
        Box::pin(async move {
            let guard = CounterGuard::new(counter, method, endpoint);
            match inner.call(req).await {
                Ok(response) => {
                    guard.finish(response.status().as_u16());
                    Ok(response)
                }
                Err(err) => {
                    // Label with the synthetic 500; the application failure
                    // itself passes through unchanged.
                    guard.finish(SYNTHETIC_FAILURE_STATUS);
                    Err(err)
                }
            }
        })
    }
}
