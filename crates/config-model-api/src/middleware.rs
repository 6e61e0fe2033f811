//! API middleware
//!
//! This module provides middleware layers for request processing including
//! logging, CORS, compression, timeouts and request ID generation.

use axum::http::{HeaderValue, Method, Request};
use std::time::Duration;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::{AllowHeaders, Any, CorsLayer},
    request_id::{MakeRequestId, RequestId},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::{warn, Level};
use uuid::Uuid;

/// Request ID generator using UUIDs
#[derive(Clone, Default)]
pub struct UuidRequestIdGenerator;

impl MakeRequestId for UuidRequestIdGenerator {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Build trace layer
pub fn trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(
            DefaultMakeSpan::new()
                .include_headers(true)
                .level(Level::INFO),
        )
        .on_response(
            DefaultOnResponse::new()
                .include_headers(true)
                .latency_unit(LatencyUnit::Millis)
                .level(Level::INFO),
        )
}

/// CORS configuration options
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins (empty means any)
    pub allowed_origins: Vec<String>,

    /// Whether to allow credentials
    pub allow_credentials: bool,

    /// Max age for preflight cache
    pub max_age_seconds: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            allow_credentials: false,
            max_age_seconds: Some(3600),
        }
    }
}

impl CorsConfig {
    /// Build CORS layer from config
    ///
    /// Credentials are only honored together with explicit origins; with an
    /// empty origin list they are dropped.
    pub fn into_layer(self) -> CorsLayer {
        let allow_credentials = self.allow_credentials && !self.allowed_origins.is_empty();
        if self.allow_credentials && !allow_credentials {
            warn!("CORS credentials ignored: no explicit allowed origins");
        }

        let mut layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .expose_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::HeaderName::from_static("x-request-id"),
            ])
            .allow_credentials(allow_credentials);

        // Wildcards cannot be combined with credentials.
        if allow_credentials {
            layer = layer.allow_headers(AllowHeaders::mirror_request());
        } else {
            layer = layer.allow_headers(Any);
        }

        if self.allowed_origins.is_empty() {
            layer = layer.allow_origin(Any);
        } else {
            let origins: Vec<HeaderValue> = self
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            layer = layer.allow_origin(origins);
        }

        if let Some(max_age) = self.max_age_seconds {
            layer = layer.max_age(Duration::from_secs(max_age));
        }

        layer
    }
}

/// Middleware configuration
#[derive(Debug, Clone)]
pub struct MiddlewareConfig {
    /// CORS configuration
    pub cors: CorsConfig,

    /// Enable compression
    pub enable_compression: bool,

    /// Enable request tracing
    pub enable_tracing: bool,

    /// Request timeout in seconds
    ///
    /// A push that outlives the timeout still finishes in the background;
    /// only the response is abandoned.
    pub request_timeout_seconds: Option<u64>,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            cors: CorsConfig::default(),
            enable_compression: true,
            enable_tracing: true,
            request_timeout_seconds: Some(120),
        }
    }
}

impl MiddlewareConfig {
    /// Create a new middleware config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set CORS config
    pub fn with_cors(mut self, cors: CorsConfig) -> Self {
        self.cors = cors;
        self
    }

    /// Enable/disable compression
    pub fn with_compression(mut self, enable: bool) -> Self {
        self.enable_compression = enable;
        self
    }

    /// Enable/disable tracing
    pub fn with_tracing(mut self, enable: bool) -> Self {
        self.enable_tracing = enable;
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.request_timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Disable the request timeout
    pub fn without_timeout(mut self) -> Self {
        self.request_timeout_seconds = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_request_id_generator() {
        let mut generator = UuidRequestIdGenerator;
        let request = Request::new(());

        let request_id = generator.make_request_id(&request).unwrap();
        let value = request_id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(value).is_ok());
    }

    #[test]
    fn test_cors_config_default() {
        let config = CorsConfig::default();
        assert!(config.allowed_origins.is_empty());
        assert!(!config.allow_credentials);
        assert_eq!(config.max_age_seconds, Some(3600));
    }

    #[tokio::test]
    async fn test_credentials_layer_builds() {
        use axum::{routing::get, Router};
        use tower::ServiceExt;

        let configs = [
            CorsConfig {
                allow_credentials: true,
                ..Default::default()
            },
            CorsConfig {
                allowed_origins: vec!["https://example.com".to_string()],
                allow_credentials: true,
                ..Default::default()
            },
        ];

        for config in configs {
            let app = Router::new()
                .route("/", get(|| async { "ok" }))
                .layer(config.into_layer());
            let response = app
                .oneshot(
                    Request::builder()
                        .uri("/")
                        .header("origin", "https://example.com")
                        .body(axum::body::Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), axum::http::StatusCode::OK);
        }
    }

    #[test]
    fn test_middleware_config_builder() {
        let config = MiddlewareConfig::new()
            .with_compression(false)
            .with_tracing(false)
            .with_timeout(60);

        assert!(!config.enable_compression);
        assert!(!config.enable_tracing);
        assert_eq!(config.request_timeout_seconds, Some(60));
        assert!(config.without_timeout().request_timeout_seconds.is_none());
    }
}
