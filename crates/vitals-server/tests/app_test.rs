//! The demo app end to end: request metrics, outcome dedup and the scrape
//! round trip, all against in-process routers.

use axum::body::Body;
use http::{Request, StatusCode};
use tower::ServiceExt;
use vitals_core::{encode_text, Outcome};
use vitals_http::MetricsServer;
use vitals_server::{create_router, AppState};

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

#[tokio::test]
async fn successful_user_fetch_records_success_once() {
    let state = AppState::new().unwrap();
    let app = create_router(state.clone());

    let response = app.oneshot(get_request("/user/3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        state.function_metrics.calls("fetch_user_data", Outcome::Success),
        1.0
    );
    assert_eq!(
        state.function_metrics.calls("fetch_user_data", Outcome::Failure),
        0.0
    );
    assert_eq!(state.http_metrics.requests("GET", "/user/{id}", 200), 1.0);
}

#[tokio::test]
async fn failing_user_fetch_returns_500_and_records_failure() {
    let state = AppState::new().unwrap();
    let app = create_router(state.clone());

    let response = app.oneshot(get_request("/user/5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(
        state.function_metrics.calls("fetch_user_data", Outcome::Failure),
        1.0
    );
    assert_eq!(state.http_metrics.requests("GET", "/user/{id}", 500), 1.0);
    // The request completed; the in-flight gauge is back to baseline.
    assert_eq!(state.http_metrics.active(), 0.0);
}

#[tokio::test]
async fn degraded_fetch_answers_but_records_failure() {
    let state = AppState::new().unwrap();
    let app = create_router(state.clone());

    // Divisible by 2: silent failure, successful response.
    let response = app.oneshot(get_request("/user/4")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        state.function_metrics.calls("fetch_user_data", Outcome::Failure),
        1.0
    );
}

#[tokio::test]
async fn profile_deduplicates_repeated_success_marks() {
    let state = AppState::new().unwrap();
    let app = create_router(state.clone());

    let response = app.oneshot(get_request("/profile/3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // send_notification runs twice in the handler, counts once per request.
    assert_eq!(
        state.function_metrics.calls("send_notification", Outcome::Success),
        1.0
    );
    // Each distinct function still counts.
    for function in ["fetch_user_data", "fetch_posts", "validate_data", "process_analytics"] {
        assert_eq!(state.function_metrics.calls(function, Outcome::Success), 1.0);
    }
}

#[tokio::test]
async fn separate_requests_count_separately() {
    let state = AppState::new().unwrap();
    let app = create_router(state.clone());

    for _ in 0..2 {
        app.clone().oneshot(get_request("/profile/3")).await.unwrap();
    }
    assert_eq!(
        state.function_metrics.calls("send_notification", Outcome::Success),
        2.0
    );
}

#[tokio::test]
async fn scrape_reflects_served_traffic() {
    let state = AppState::new().unwrap();
    let app = create_router(state.clone());

    app.oneshot(get_request("/hello")).await.unwrap();

    let scrape = MetricsServer::new(state.registry.clone(), 19290)
        .router()
        .oneshot(get_request("/metrics"))
        .await
        .unwrap();
    let body = axum::body::to_bytes(scrape.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains(
        "http_requests_total{endpoint=\"/hello\",method=\"GET\",status_code=\"200\"} 1"
    ));
    assert!(text.contains("# TYPE http_request_duration_seconds histogram"));
}

#[tokio::test]
async fn isolated_states_never_mix() {
    let state_a = AppState::new().unwrap();
    let state_b = AppState::new().unwrap();

    create_router(state_a.clone())
        .oneshot(get_request("/hello"))
        .await
        .unwrap();

    assert_eq!(state_a.http_metrics.requests("GET", "/hello", 200), 1.0);
    assert_eq!(state_b.http_metrics.requests("GET", "/hello", 200), 0.0);
    // And the encoded views differ accordingly.
    let text_b = encode_text(&state_b.registry.gather());
    assert!(!text_b.contains("endpoint=\"/hello\""));
}
