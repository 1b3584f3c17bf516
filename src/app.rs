use std::time::Duration;

use axum::{
    Json, Router,
    http::{HeaderName, Request, Response, StatusCode, Uri},
    routing::get,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    response::{ApiResponse, Meta},
    routes::{create_api_router, doc::scalar_docs, health},
    state::AppState,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_BODY_BYTES: usize = 1024 * 1024;
const MAX_IN_FLIGHT: usize = 100;

fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
}

/// The full HTTP application: health, `/api`, docs and the JSON 404 fallback.
pub fn build_app(state: AppState) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id(request)
            )
        })
        .on_request(|request: &Request<_>, _span: &tracing::Span| {
            tracing::info!(
                request_id = %request_id(request),
                method = %request.method(),
                uri = %request.uri(),
                "request started"
            );
        })
        .on_response(|response: &Response<_>, latency: Duration, _span: &tracing::Span| {
            tracing::info!(
                status = %response.status(),
                ms = %latency.as_millis(),
                "request finished"
            );
        });

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .merge(scalar_docs())
        .fallback(not_found)
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(ConcurrencyLimitLayer::new(MAX_IN_FLIGHT))
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use sea_orm::DatabaseConnection;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;

    fn offline_state() -> AppState {
        AppState {
            orm: DatabaseConnection::Disconnected,
            config: Arc::new(AppConfig {
                database_url: String::new(),
                host: "127.0.0.1".into(),
                port: 0,
                jwt_secret: "test-secret".into(),
                jwt_ttl_hours: 1,
                db_max_connections: 1,
                order_max_items: 10,
                settlement_password: None,
                business_utc_offset_hours: 9,
            }),
        }
    }

    async fn status_of(uri: &str) -> (StatusCode, bool) {
        let response = build_app(offline_state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let has_request_id = response.headers().contains_key(REQUEST_ID_HEADER);
        (response.status(), has_request_id)
    }

    #[tokio::test]
    async fn health_is_public() {
        assert_eq!(status_of("/health").await, (StatusCode::OK, true));
    }

    #[tokio::test]
    async fn api_requires_a_token() {
        assert_eq!(status_of("/api/orders").await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(status_of("/api/auth/me").await.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_paths_fall_back_to_json_404() {
        assert_eq!(status_of("/nowhere").await.0, StatusCode::NOT_FOUND);
    }
}
