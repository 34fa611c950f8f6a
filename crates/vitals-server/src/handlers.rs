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
//! Demo endpoints driving the instrumented business functions.
//!
//! Each handler owns one [`OutcomeTracker`] for the duration of the request,
//! so success/failure marks deduplicate within the request and never leak
//! across concurrent ones. Failures simulated by the business functions are
//! deterministic on the user id, which keeps the endpoints scriptable:
//! ids divisible by 5 fail loudly (a 500), ids divisible by 2 record a
//! silent failure but still answer.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::time::sleep;

use vitals_core::OutcomeTracker;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user_id: u64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct Post {
    pub post_id: u64,
    pub title: String,
    pub user_id: u64,
}

/// Simulates fetching user data from a database.
async fn fetch_user_data(tracker: &mut OutcomeTracker, user_id: u64) -> anyhow::Result<UserData> {
    let start = Instant::now();
    let result = async {
        sleep(Duration::from_millis(15)).await;
        if user_id % 5 == 0 {
            anyhow::bail!("simulated failure: user {} is divisible by 5", user_id);
        }
        Ok(UserData {
            user_id,
            name: format!("User {}", user_id),
            email: format!("user{}@example.com", user_id),
        })
    }
    .await;

    tracker.mark_latency("fetch_user_data", start.elapsed());
    match &result {
        Ok(_) if user_id % 2 == 0 => {
            // Degraded path: answer anyway, but record the failure.
            tracker.mark_failure("fetch_user_data");
        }
        Ok(_) => tracker.mark_success("fetch_user_data"),
        Err(_) => tracker.mark_failure("fetch_user_data"),
    }
    result
}

/// Simulates fetching user posts.
async fn fetch_posts(tracker: &mut OutcomeTracker, user_id: u64) -> Vec<Post> {
    let start = Instant::now();
    sleep(Duration::from_millis(12)).await;
    let posts = vec![
        Post {
            post_id: 1,
            title: "First Post".to_string(),
            user_id,
        },
        Post {
            post_id: 2,
            title: "Second Post".to_string(),
            user_id,
        },
    ];
    tracker.mark_latency("fetch_posts", start.elapsed());
    tracker.mark_success("fetch_posts");
    posts
}

/// Simulates data validation.
async fn validate_data(tracker: &mut OutcomeTracker, user_id: u64) -> Value {
    let start = Instant::now();
    sleep(Duration::from_millis(5)).await;
    tracker.mark_latency("validate_data", start.elapsed());
    tracker.mark_success("validate_data");
    json!({ "valid": true, "user_id": user_id })
}

/// Simulates processing analytics data.
async fn process_analytics(tracker: &mut OutcomeTracker, records: usize) -> Value {
    let start = Instant::now();
    sleep(Duration::from_millis(8)).await;
    tracker.mark_latency("process_analytics", start.elapsed());
    tracker.mark_success("process_analytics");
    json!({ "processed": true, "records": records })
}

/// Simulates sending a notification.
async fn send_notification(tracker: &mut OutcomeTracker, message: &str) -> Value {
    let start = Instant::now();
    sleep(Duration::from_millis(3)).await;
    tracker.mark_latency("send_notification", start.elapsed());
    tracker.mark_success("send_notification");
    json!({ "sent": true, "message": message })
}

/// GET /hello - smallest possible instrumented endpoint
pub async fn hello() -> &'static str {
    "Hello, World!"
}

/// GET /user/{id} - single instrumented function with simulated failures
pub async fn get_user(
    Path(user_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<UserData>, StatusCode> {
    let mut tracker = state.tracker();
    let user = fetch_user_data(&mut tracker, user_id).await.map_err(|e| {
        tracing::warn!("fetch_user_data failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(user))
}

/// GET /user/{id}/posts - endpoint calling another instrumented function
pub async fn get_user_posts(
    Path(user_id): Path<u64>,
    State(state): State<AppState>,
) -> Json<Vec<Post>> {
    let mut tracker = state.tracker();
    Json(fetch_posts(&mut tracker, user_id).await)
}

/// GET /profile/{id} - orchestrates several instrumented functions under one
/// outcome context
pub async fn get_user_profile(
    Path(user_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<Value>, StatusCode> {
    let mut tracker = state.tracker();

    let user = fetch_user_data(&mut tracker, user_id).await.map_err(|e| {
        tracing::warn!("fetch_user_data failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let posts = fetch_posts(&mut tracker, user_id).await;
    let validation = validate_data(&mut tracker, user_id).await;
    let analytics = process_analytics(&mut tracker, posts.len()).await;
    // Two notifications, one logical outcome: the second success mark for
    // send_notification deduplicates within this request.
    let notification =
        send_notification(&mut tracker, &format!("Profile accessed for user {}", user_id)).await;
    send_notification(&mut tracker, "Audit trail updated").await;

    Ok(Json(json!({
        "user": user,
        "posts": posts,
        "validation": validation,
        "analytics": analytics,
        "notification": notification,
    })))
}

/// GET /health - health check endpoint
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
