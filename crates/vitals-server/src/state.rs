use vitals_core::{FunctionMetrics, OutcomeTracker, Registry, Result};
use vitals_http::HttpMetrics;

/// Shared application state
///
/// Holds the registry plus the instrument bundles registered on it. Handlers
/// never touch instruments directly; they drive a fresh [`OutcomeTracker`]
/// per request.
#[derive(Clone)]
pub struct AppState {
    /// The registry every component records into
    pub registry: Registry,

    /// Request-level instruments for the middleware layers
    pub http_metrics: HttpMetrics,

    /// Function-level instruments behind the outcome trackers
    pub function_metrics: FunctionMetrics,
}

impl AppState {
    /// Register all instruments on a fresh registry.
    pub fn new() -> Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Register all instruments on an existing registry.
    ///
    /// Registration is append-only, so calling this twice on one registry
    /// fails with a duplicate-name error; shared mode clones the state, not
    /// the registration.
    pub fn with_registry(registry: Registry) -> Result<Self> {
        let http_metrics = HttpMetrics::register(&registry)?;
        let function_metrics = FunctionMetrics::register(&registry)?;
        Ok(Self {
            registry,
            http_metrics,
            function_metrics,
        })
    }

    /// A fresh outcome tracker for one unit of work.
    pub fn tracker(&self) -> OutcomeTracker {
        OutcomeTracker::new(self.function_metrics.clone())
    }
}
