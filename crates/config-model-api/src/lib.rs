//! Config Model Registry API Layer
//!
//! This crate provides the transport adapters for the registry: a REST API
//! built on Axum and, with the `grpc` feature, a Tonic gRPC service. Both are
//! thin translations onto [`config_model_service::ModelService`].
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for all API endpoints
//! - **Routes**: Route definitions and router configuration
//! - **Middleware**: Tower middleware for logging, CORS, compression, etc.
//! - **Error Handling**: Conversion of service errors to HTTP responses
//! - **Responses**: Health reporting and status helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use config_model_api::build_api_server;
//! use config_model_service::ServiceRegistry;
//!
//! # async fn example(services: ServiceRegistry) -> std::io::Result<()> {
//! let app = build_api_server(services);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5151").await?;
//! axum::serve(listener, app.into_make_service()).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
#[cfg(feature = "grpc")]
pub mod grpc;
pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod routes;

// Re-export main types for convenience
pub use error::{ApiError, ApiResult, ErrorResponse};
#[cfg(feature = "grpc")]
pub use grpc::{
    build_grpc_server, serve_grpc, ConfigModelRegistryServiceImpl,
    ConfigModelRegistryServiceServer,
};
pub use handlers::{AppState, VersionInfo};
pub use middleware::{CorsConfig, MiddlewareConfig, UuidRequestIdGenerator};
pub use responses::{created, deleted, ComponentHealth, HealthResponse, HealthStatus};
pub use routes::build_router;

use axum::Router;
use config_model_service::ServiceRegistry;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

/// Build a complete API server with middleware
///
/// This is a convenience function that builds a router with all middleware
/// configured using default settings.
pub fn build_api_server(services: ServiceRegistry) -> Router {
    build_api_server_with_config(services, MiddlewareConfig::default())
}

/// Build API server with custom middleware configuration
///
/// # Example
///
/// ```rust,no_run
/// use config_model_api::{build_api_server_with_config, MiddlewareConfig};
/// use config_model_service::ServiceRegistry;
///
/// # fn example(services: ServiceRegistry) {
/// let middleware_config = MiddlewareConfig::new()
///     .with_compression(true)
///     .with_timeout(60);
///
/// let app = build_api_server_with_config(services, middleware_config);
/// # }
/// ```
pub fn build_api_server_with_config(
    services: ServiceRegistry,
    middleware_config: MiddlewareConfig,
) -> Router {
    let state = AppState::new(services);
    let mut router = build_router(state);

    if let Some(seconds) = middleware_config.request_timeout_seconds {
        router = router.layer(TimeoutLayer::new(Duration::from_secs(seconds)));
    }

    router = router.layer(middleware_config.cors.into_layer());

    if middleware_config.enable_compression {
        router = router.layer(CompressionLayer::new());
    }

    if middleware_config.enable_tracing {
        router = router.layer(middleware::trace_layer());
    }

    router
        .layer(SetRequestIdLayer::x_request_id(UuidRequestIdGenerator))
        .layer(PropagateRequestIdLayer::x_request_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use config_model_compiler::{ArtifactStore, BundleToolchain, DefaultPluginCompiler};
    use config_model_db::InMemoryModelRepository;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn app(dir: &std::path::Path) -> Router {
        let store = ArtifactStore::open(dir).await.unwrap();
        let compiler = Arc::new(DefaultPluginCompiler::new(store, Arc::new(BundleToolchain::new())));
        let services = ServiceRegistry::new(Arc::new(InMemoryModelRepository::new()), compiler);
        build_api_server_with_config(services, MiddlewareConfig::new().with_compression(false))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn push(body: Value) -> Request<Body> {
        Request::post("/v1/models")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn testdevice() -> Value {
        json!({
            "name": "testdevice",
            "version": "1.0.0",
            "modules": [{
                "name": "test1",
                "organization": "ONF",
                "version": "2018-02-20",
                "data": "bW9kdWxlIHRlc3QxIHt9"
            }]
        })
    }

    #[tokio::test]
    async fn test_push_get_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let (status, body) = send(&app, push(testdevice())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({}));
        assert!(dir.path().join("testdevice-1.0.0.so").exists());

        let (status, body) = send(
            &app,
            Request::get("/v1/models/testdevice/1.0.0").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model"]["name"], "testdevice");
        assert_eq!(body["model"]["modules"][0]["data"], "bW9kdWxlIHRlc3QxIHt9");

        let (status, body) =
            send(&app, Request::get("/v1/models").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["models"].as_array().unwrap().len(), 1);

        let (status, body) = send(
            &app,
            Request::delete("/v1/models/testdevice/1.0.0").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));
        assert!(!dir.path().join("testdevice-1.0.0.so").exists());
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let (status, body) = send(
            &app,
            Request::get("/v1/models/missing/1.0").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        send(&app, push(testdevice())).await;
        let (status, body) = send(&app, push(testdevice())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "ALREADY_EXISTS");

        let (status, _) = send(&app, push(json!({"name": "empty", "version": "1.0"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(&app, push(json!({"name": "../x", "version": "1.0"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = Request::post("/v1/models")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");

        let (status, _) = send(
            &app,
            Request::delete("/v1/models/missing/1.0").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_and_request_id() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"]["registry"]["metrics"]["models"], 0);
    }
}
