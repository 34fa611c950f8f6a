//! The single point where metric-recording failures meet application code.
//!
//! Everything that records metrics on behalf of business logic funnels its
//! result through [`best_effort`]: failures are logged and swallowed so that
//! instrumentation can never abort a request. Application failures are not
//! routed through here; they belong to the caller.

use tracing::warn;

use crate::error::Result;

/// Log and swallow a metric-recording failure.
///
/// `what` names the recording site (e.g. `"request counter"`) so the log line
/// identifies the broken instrumentation without a backtrace.
pub fn best_effort(what: &str, result: Result<()>) {
    if let Err(err) = result {
        warn!("Failed to record {}: {}", what, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricError;

    #[test]
    fn test_best_effort_swallows_errors() {
        // Must not panic or propagate.
        best_effort("test metric", Err(MetricError::NotFound("nope".into())));
        best_effort("test metric", Ok(()));
    }
}
