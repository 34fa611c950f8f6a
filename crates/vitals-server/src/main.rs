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
//! Demo server binary wiring the full instrumentation stack: middleware on
//! the app router, a scrape endpoint on its own port and an optional
//! pushgateway task.

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use vitals_http::MetricsServer;
use vitals_observability::{init_tracing, LogFormat};
use vitals_push::Pusher;
use vitals_server::{create_router, AppState, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "vitals-server", about = "Instrumented demo HTTP service")]
struct Cli {
    /// Port to listen on (overrides config file)
    #[arg(long)]
    port: Option<u16>,

    /// Metrics scrape port (overrides config file)
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Pushgateway base URL; enables the push task
    #[arg(long)]
    push_gateway: Option<String>,

    /// Job name for pushed metrics
    #[arg(long, default_value = "vitals-demo")]
    push_job: String,

    /// Log output format: pretty, compact or json
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format, None)?;

    // All configuration is resolved once here and never mutated afterward.
    let mut config = ServerConfig::load()?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(metrics_port) = cli.metrics_port {
        config.metrics.port = metrics_port;
        config.metrics.enabled = true;
    }
    if let Some(gateway) = &cli.push_gateway {
        let instance =
            std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown_host".to_string());
        config = config.with_push_gateway(gateway, &cli.push_job, &instance);
    }

    // One shared registry for the whole process.
    let state = AppState::new()?;

    let metrics_server =
        MetricsServer::with_config(state.registry.clone(), config.metrics.clone());
    tokio::spawn(async move {
        if let Err(e) = metrics_server.serve().await {
            tracing::error!("Metrics server exited: {}", e);
        }
    });

    if config.push.enabled {
        info!(
            "Pushing metrics to {} every {}s",
            config.push.gateway_url, config.push.interval_secs
        );
        let pusher = Pusher::new(state.registry.clone(), config.push.clone());
        tokio::spawn(pusher.run());
    }

    let app = create_router(state);
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")
}
