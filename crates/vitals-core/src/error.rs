use thiserror::Error;

/// Errors produced by the metrics core.
///
/// Registration-time errors (`DuplicateName`, `InvalidBuckets`) are meant to
/// fail fast at startup. Recording-time errors (`LabelMismatch`,
/// `InvalidDelta`, `NonFiniteValue`, `NotFound`) are surfaced to the caller;
/// the instrumentation boundaries convert them into logged no-ops so that
/// metrics can never abort application logic.
#[derive(Error, Debug)]
pub enum MetricError {
    #[error("metric '{0}' is already registered")]
    DuplicateName(String),

    #[error("metric '{0}' is not registered")]
    NotFound(String),

    #[error("metric '{metric}' expects labels [{expected}], got [{provided}]")]
    LabelMismatch {
        metric: String,
        expected: String,
        provided: String,
    },

    #[error("counter '{metric}' cannot be incremented by negative delta {delta}")]
    InvalidDelta { metric: String, delta: f64 },

    #[error("histogram '{metric}' cannot observe non-finite value {value}")]
    NonFiniteValue { metric: String, value: f64 },

    #[error("histogram '{0}' bucket bounds must be finite and strictly increasing")]
    InvalidBuckets(String),
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MetricError>;
