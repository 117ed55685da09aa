//! HTTP-level middleware (cross-cutting concerns).
//!
//! Transport concerns applied outside the CDR validator chain, to every route
//! including `/health`.
//!
//! Responsibility:
//! - Access logging / request tracing (TraceLayer), keyed by interaction id
//! - Body size limits
//! - Global timeouts

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::error_handling::HandleErrorLayer;
use axum::http::{Request, StatusCode};
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::cdr::X_FAPI_INTERACTION_ID;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn request_span(req: &Request<Body>) -> tracing::Span {
    let interaction_id = req
        .headers()
        .get(X_FAPI_INTERACTION_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "http",
        method = %req.method(),
        uri = %req.uri(),
        interaction_id = %interaction_id,
    )
}

/// Apply HTTP-level middleware to the given Router.
///
/// Timeout: 30 seconds, answered with 408.
pub fn apply(router: Router, body_limit_bytes: usize) -> Router {
    let layers = ServiceBuilder::new()
        // Access log / tracing for all requests.
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        // Make the service error `Infallible` by converting errors into responses.
        .layer(HandleErrorLayer::new(|err: BoxError| async move {
            if err.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }))
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    router.layer(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use tower::ServiceExt;

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let app = apply(
            Router::new().route("/echo", post(|body: String| async move { body })),
            16,
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .body(Body::from("x".repeat(64)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn small_requests_pass_through() {
        let app = apply(Router::new().route("/ping", get(|| async { "pong" })), 1024);
        let response = app
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
