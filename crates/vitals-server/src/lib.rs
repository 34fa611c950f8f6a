// Library exports for vitals-server
// This allows integration tests to use server components

pub mod config;
pub mod handlers;
pub mod state;

pub use config::ServerConfig;
pub use state::AppState;

use axum::{routing::get, Router};

/// Create the axum router with all demo endpoints and the full middleware
/// stack.
///
/// Layer order: counter and duration sit inside the active-requests gauge so
/// "active" spans the entire instrumented section. The other two layers are
/// order-independent.
pub fn create_router(state: AppState) -> Router {
    let metrics = state.http_metrics.clone();
    Router::new()
        .route("/hello", get(handlers::hello))
        .route("/user/{id}", get(handlers::get_user))
        .route("/user/{id}/posts", get(handlers::get_user_posts))
        .route("/profile/{id}", get(handlers::get_user_profile))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(metrics.request_counter_layer())
        .layer(metrics.request_duration_layer())
        .layer(metrics.active_requests_layer())
}
