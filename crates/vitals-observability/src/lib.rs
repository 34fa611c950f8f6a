//! Vitals Observability
//!
//! Structured logging setup shared by Vitals binaries.
//!
//! # Features
//!
//! - **Multiple Output Formats**: Pretty, compact and JSON output
//! - **Environment-based Filtering**: `RUST_LOG` aware level control
//! - **Async Context Propagation**: span context in the tokio runtime
//!
//! # Example
//!
//! ```ignore
//! use vitals_observability::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::Pretty, Some("debug"))?;
//! tracing::info!("Application started");
//! ```

pub mod config;

pub use config::{LogConfig, LogError, LogFormat};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Initialize tracing with a format and an optional level override.
pub fn init_tracing(format: LogFormat, level: Option<&str>) -> Result<(), LogError> {
    let mut config = LogConfig::new().with_format(format);
    if let Some(level) = level {
        config = config.with_level(level);
    }
    init_tracing_with_config(config)
}

/// Initialize tracing from a full [`LogConfig`].
///
/// Fails when called twice in one process or when the filter directive does
/// not parse.
pub fn init_tracing_with_config(config: LogConfig) -> Result<(), LogError> {
    let env_filter = build_env_filter(&config)?;
    let registry = Registry::default().with(env_filter);

    let init_result = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(config.include_targets)
                    .with_ansi(config.use_color)
                    .pretty(),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(config.include_targets)
                    .with_ansi(false)
                    .compact(),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(config.include_targets)
                    .with_ansi(false)
                    .json(),
            )
            .try_init(),
    };

    init_result.map_err(|_| LogError::AlreadyInitialized)
}

fn build_env_filter(config: &LogConfig) -> Result<EnvFilter, LogError> {
    match &config.level {
        Some(level) => {
            EnvFilter::try_new(level).map_err(|e| LogError::InvalidFilter(e.to_string()))
        }
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info"))),
    }
}
