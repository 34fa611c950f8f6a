//! End-to-end middleware behavior over real axum routers and raw tower
//! services: label resolution, error paths, cancellation and composition.

use std::convert::Infallible;
use std::io;
use std::time::Duration;

use axum::{body::Body, routing::get, Router};
use http::{Request, Response, StatusCode};
use tower::{service_fn, ServiceBuilder, ServiceExt};
use vitals_core::{Registry, SampleValue};
use vitals_http::HttpMetrics;

fn instrumented_router(metrics: &HttpMetrics) -> Router {
    Router::new()
        .route("/hello", get(|| async { "hi" }))
        .route(
            "/user/{id}",
            get(|axum::extract::Path(id): axum::extract::Path<u32>| async move {
                format!("user {id}")
            }),
        )
        .route(
            "/teapot",
            get(|| async { StatusCode::IM_A_TEAPOT }),
        )
        .layer(metrics.request_counter_layer())
        .layer(metrics.request_duration_layer())
        .layer(metrics.active_requests_layer())
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

#[tokio::test]
async fn hello_records_exactly_one_series() {
    let registry = Registry::new();
    let metrics = HttpMetrics::register(&registry).unwrap();
    let app = instrumented_router(&metrics);

    let response = app.oneshot(get_request("/hello")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let families = registry.gather();
    let totals = families
        .iter()
        .find(|f| f.name == "http_requests_total")
        .unwrap();
    assert_eq!(totals.samples.len(), 1);
    let sample = &totals.samples[0];
    assert_eq!(sample.labels.get("method"), Some("GET"));
    assert_eq!(sample.labels.get("endpoint"), Some("/hello"));
    assert_eq!(sample.labels.get("status_code"), Some("200"));
    match sample.value {
        SampleValue::Counter(v) => assert_eq!(v, 1.0),
        ref other => panic!("unexpected sample {other:?}"),
    }
    assert_eq!(metrics.duration_count("GET", "/hello"), 1);
    assert_eq!(metrics.active(), 0.0);
}

#[tokio::test]
async fn endpoint_label_is_the_route_template() {
    let registry = Registry::new();
    let metrics = HttpMetrics::register(&registry).unwrap();
    let app = instrumented_router(&metrics);

    let response = app.oneshot(get_request("/user/42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The template, never the interpolated path.
    assert_eq!(metrics.requests("GET", "/user/{id}", 200), 1.0);
    assert_eq!(metrics.requests("GET", "/user/42", 200), 0.0);
}

#[tokio::test]
async fn unmatched_route_falls_back_to_raw_path() {
    let registry = Registry::new();
    let metrics = HttpMetrics::register(&registry).unwrap();
    let app = instrumented_router(&metrics);

    let response = app.oneshot(get_request("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(metrics.requests("GET", "/nope", 404), 1.0);
}

#[tokio::test]
async fn non_200_status_is_labelled_as_returned() {
    let registry = Registry::new();
    let metrics = HttpMetrics::register(&registry).unwrap();
    let app = instrumented_router(&metrics);

    app.oneshot(get_request("/teapot")).await.unwrap();
    assert_eq!(metrics.requests("GET", "/teapot", 418), 1.0);
}

#[tokio::test]
async fn gauge_is_incremented_while_the_handler_runs() {
    let registry = Registry::new();
    let metrics = HttpMetrics::register(&registry).unwrap();

    let observed = metrics.clone();
    let svc = ServiceBuilder::new()
        .layer(metrics.active_requests_layer())
        .service(service_fn(move |_req: Request<Body>| {
            let observed = observed.clone();
            async move {
                assert_eq!(observed.active(), 1.0);
                Ok::<_, Infallible>(Response::new(Body::empty()))
            }
        }));

    svc.oneshot(get_request("/hello")).await.unwrap();
    assert_eq!(metrics.active(), 0.0);
}

#[tokio::test]
async fn inner_error_records_500_and_propagates() {
    let registry = Registry::new();
    let metrics = HttpMetrics::register(&registry).unwrap();

    let svc = ServiceBuilder::new()
        .layer(metrics.active_requests_layer())
        .layer(metrics.request_duration_layer())
        .layer(metrics.request_counter_layer())
        .service(service_fn(|_req: Request<Body>| async {
            Err::<Response<Body>, io::Error>(io::Error::other("boom"))
        }));

    let err = svc.oneshot(get_request("/fail")).await.unwrap_err();
    assert_eq!(err.to_string(), "boom");

    // Recorded with the synthetic failure status; gauge restored.
    assert_eq!(metrics.requests("GET", "/fail", 500), 1.0);
    assert_eq!(metrics.duration_count("GET", "/fail"), 1);
    assert_eq!(metrics.active(), 0.0);
}

#[tokio::test]
async fn cancellation_still_records_everything() {
    let registry = Registry::new();
    let metrics = HttpMetrics::register(&registry).unwrap();

    let svc = ServiceBuilder::new()
        .layer(metrics.active_requests_layer())
        .layer(metrics.request_duration_layer())
        .layer(metrics.request_counter_layer())
        .service(service_fn(|_req: Request<Body>| async {
            std::future::pending::<()>().await;
            Ok::<_, Infallible>(Response::new(Body::empty()))
        }));

    let cancelled = tokio::time::timeout(
        Duration::from_millis(50),
        svc.oneshot(get_request("/slow")),
    )
    .await;
    assert!(cancelled.is_err(), "request should have been cancelled");

    // Dropping the in-flight future fires the guards.
    assert_eq!(metrics.active(), 0.0);
    assert_eq!(metrics.requests("GET", "/slow", 500), 1.0);
    assert_eq!(metrics.duration_count("GET", "/slow"), 1);
}

#[tokio::test]
async fn layers_compose_independently() {
    let registry = Registry::new();
    let metrics = HttpMetrics::register(&registry).unwrap();

    // Counter alone, without gauge or histogram.
    let svc = ServiceBuilder::new()
        .layer(metrics.request_counter_layer())
        .service(service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(Response::new(Body::empty()))
        }));

    svc.oneshot(get_request("/only-counter")).await.unwrap();
    assert_eq!(metrics.requests("GET", "/only-counter", 200), 1.0);
    assert_eq!(metrics.duration_count("GET", "/only-counter"), 0);
    assert_eq!(metrics.active(), 0.0);
}

#[tokio::test]
async fn repeated_requests_accumulate() {
    let registry = Registry::new();
    let metrics = HttpMetrics::register(&registry).unwrap();
    let app = instrumented_router(&metrics);

    for _ in 0..3 {
        app.clone()
            .oneshot(get_request("/hello"))
            .await
            .unwrap();
    }
    assert_eq!(metrics.requests("GET", "/hello", 200), 3.0);
    assert_eq!(metrics.duration_count("GET", "/hello"), 3);
}
