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
//! HTTP server for the pull-scrape endpoint.
//!
//! Provides an Axum-based HTTP server that exposes a `/metrics` endpoint
//! in the text exposition format.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{debug, info};

use vitals_core::{encode_text, Registry, TEXT_FORMAT_CONTENT_TYPE};

/// Configuration for the scrape server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Port for the metrics HTTP server
    pub port: u16,

    /// Enable the scrape endpoint
    pub enabled: bool,

    /// Bind address (default: 127.0.0.1)
    pub bind_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: 9090,
            enabled: false,
            bind_address: "127.0.0.1".to_string(),
        }
    }
}

impl MetricsConfig {
    /// Enabled config on the given port.
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            enabled: true,
            ..Default::default()
        }
    }

    /// Bind address with port.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// HTTP server exposing a registry at `GET /metrics`.
///
/// A single scrape endpoint plus `/health`, meant to run on its own port
/// beside the application listener.
#[derive(Clone)]
pub struct MetricsServer {
    registry: Registry,
    config: MetricsConfig,
}

impl MetricsServer {
    /// Create a new metrics server on `port`.
    pub fn new(registry: Registry, port: u16) -> Self {
        Self {
            registry,
            config: MetricsConfig::with_port(port),
        }
    }

    /// Create a new metrics server with custom configuration.
    pub fn with_config(registry: Registry, config: MetricsConfig) -> Self {
        Self { registry, config }
    }

    /// The address the server will bind to.
    pub fn bind_address(&self) -> String {
        self.config.socket_addr()
    }

    /// Router serving `/metrics` and `/health`, for embedding or tests.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .with_state(self.registry.clone())
    }

    /// Run the server indefinitely. Typically spawned as a background task:
    ///
    /// ```ignore
    /// let server = MetricsServer::new(registry, 9090);
    /// tokio::spawn(async move { server.serve().await });
    /// ```
    pub async fn serve(self) -> anyhow::Result<()> {
        if !self.config.enabled {
            info!("Metrics server disabled");
            return Ok(());
        }

        let addr = self.config.socket_addr();
        let app = self.router();

        let listener = TcpListener::bind(&addr).await?;
        info!("Metrics server listening on http://{}/metrics", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| anyhow::anyhow!("Metrics server error: {}", e))
    }
}

/// Handler for the `/metrics` endpoint.
async fn metrics_handler(
    axum::extract::State(registry): axum::extract::State<Registry>,
) -> Response {
    let families = registry.gather();
    debug!("Serving {} metric families", families.len());
    let body = encode_text(&families);
    (
        StatusCode::OK,
        [("content-type", TEXT_FORMAT_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

/// Handler for the `/health` endpoint.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
