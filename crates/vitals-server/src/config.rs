use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use vitals_http::MetricsConfig;
use vitals_push::PushConfig;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Scrape endpoint settings
    #[serde(default = "default_metrics")]
    pub metrics: MetricsConfig,

    /// Pushgateway settings; disabled unless a gateway URL is configured
    #[serde(default)]
    pub push: PushConfig,
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_metrics() -> MetricsConfig {
    MetricsConfig::with_port(9090)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            metrics: default_metrics(),
            push: PushConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `vitals-server.toml` or use defaults.
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from("vitals-server.toml");

        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Listen address for the application router.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Enable pushing to `gateway_url` under `job`, grouped by `instance`.
    pub fn with_push_gateway(mut self, gateway_url: &str, job: &str, instance: &str) -> Self {
        let mut grouping_key = BTreeMap::new();
        grouping_key.insert("instance".to_string(), instance.to_string());
        self.push = PushConfig {
            gateway_url: gateway_url.to_string(),
            job: job.to_string(),
            grouping_key,
            enabled: true,
            ..self.push
        };
        self
    }
}
