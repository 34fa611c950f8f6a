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
//! Vitals Push
//!
//! Periodic push of a registry's encoded snapshot to a Prometheus-style
//! pushgateway, tagged with a job name and a grouping key.
//!
//! The pusher is a background task independent of request handling. Each
//! tick snapshots and encodes the registry first, then performs network I/O,
//! so no metric lock is ever held across an await point. A failed push is
//! logged and retried on the next tick; there is no immediate retry and no
//! backoff.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use vitals_core::{encode_text, Registry, TEXT_FORMAT_CONTENT_TYPE};

/// Errors surfaced by a single push attempt.
#[derive(Error, Debug)]
pub enum PushError {
    #[error("push transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("pushgateway returned status {0}")]
    GatewayStatus(u16),
}

/// Push target configuration, fixed at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Base URL of the gateway, e.g. `http://pushgateway:9091`
    pub gateway_url: String,

    /// Job name the payload is grouped under
    pub job: String,

    /// Additional grouping labels, e.g. `{instance: hostname}`
    #[serde(default)]
    pub grouping_key: BTreeMap<String, String>,

    /// Seconds between pushes
    pub interval_secs: u64,

    /// Enable the push task
    pub enabled: bool,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://127.0.0.1:9091".to_string(),
            job: "vitals".to_string(),
            grouping_key: BTreeMap::new(),
            interval_secs: 5,
            enabled: false,
        }
    }
}

impl PushConfig {
    /// Enabled config for `gateway_url` under `job`.
    pub fn new(gateway_url: impl Into<String>, job: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into(),
            job: job.into(),
            enabled: true,
            ..Default::default()
        }
    }

    /// Add a grouping label.
    pub fn with_grouping(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.grouping_key.insert(name.into(), value.into());
        self
    }

    /// Set the push interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_secs = interval.as_secs().max(1);
        self
    }
}

/// Background pusher for one registry.
#[derive(Clone)]
pub struct Pusher {
    registry: Registry,
    config: PushConfig,
    client: reqwest::Client,
}

impl Pusher {
    pub fn new(registry: Registry, config: PushConfig) -> Self {
        Self {
            registry,
            config,
            client: reqwest::Client::new(),
        }
    }

    /// The gateway URL one push will target.
    pub fn push_url(&self) -> String {
        build_push_url(
            &self.config.gateway_url,
            &self.config.job,
            &self.config.grouping_key,
        )
    }

    /// Push the current snapshot once.
    ///
    /// The snapshot is taken and encoded before any I/O starts.
    pub async fn push_once(&self) -> Result<(), PushError> {
        let payload = encode_text(&self.registry.gather());
        let response = self
            .client
            .put(self.push_url())
            .header("content-type", TEXT_FORMAT_CONTENT_TYPE)
            .body(payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PushError::GatewayStatus(response.status().as_u16()));
        }
        Ok(())
    }

    /// Run the periodic push loop until the task is dropped.
    ///
    /// Typically spawned at startup:
    ///
    /// ```ignore
    /// let pusher = Pusher::new(registry, config);
    /// tokio::spawn(async move { pusher.run().await });
    /// ```
    pub async fn run(self) {
        if !self.config.enabled {
            debug!("Metrics pusher disabled");
            return;
        }

        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so pushes are spaced.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match self.push_once().await {
                Ok(()) => debug!("Metrics pushed to {}", self.config.gateway_url),
                Err(e) => warn!("Failed to push metrics to gateway: {}", e),
            }
        }
    }
}

/// `{base}/metrics/job/{job}` plus one path pair per grouping label.
///
/// Values containing `/` (or empty values) use the gateway's base64 label
/// syntax, since a slash cannot appear in a path segment.
fn build_push_url(base: &str, job: &str, grouping_key: &BTreeMap<String, String>) -> String {
    let mut url = format!("{}/metrics", base.trim_end_matches('/'));
    push_segment(&mut url, "job", job);
    for (name, value) in grouping_key {
        push_segment(&mut url, name, value);
    }
    url
}

fn push_segment(url: &mut String, name: &str, value: &str) {
    match encode_component(value) {
        component if component == value => {
            url.push_str(&format!("/{}/{}", name, component));
        }
        component => {
            url.push_str(&format!("/{}@base64/{}", name, component));
        }
    }
}

fn encode_component(value: &str) -> String {
    if value.is_empty() || value.contains('/') {
        URL_SAFE_NO_PAD.encode(value)
    } else {
        value.to_owned()
    }
}
