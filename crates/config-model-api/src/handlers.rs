//! API request handlers
//!
//! This module implements HTTP request handlers for all API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use config_model_service::{
    DeleteModelResponse, GetModelResponse, ListModelsResponse, PushModelRequest,
    PushModelResponse, ServiceRegistry,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::{
    error::{ApiError, ApiResult},
    responses::{created, deleted, ComponentHealth, HealthResponse},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Service registry
    pub services: Arc<ServiceRegistry>,
}

impl AppState {
    /// Create new application state
    pub fn new(services: ServiceRegistry) -> Self {
        Self {
            services: Arc::new(services),
        }
    }
}

// ============================================================================
// Model Handlers
// ============================================================================

/// List every registered model
#[instrument(skip(state))]
pub async fn list_models(State(state): State<AppState>) -> ApiResult<Json<ListModelsResponse>> {
    let response = state
        .services
        .models()
        .list_models()
        .await
        .map_err(ApiError::from)?;

    debug!("Listing {} models", response.models.len());
    Ok(Json(response))
}

/// Get one model by name and version
#[instrument(skip(state))]
pub async fn get_model(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
) -> ApiResult<Json<GetModelResponse>> {
    let response = state
        .services
        .models()
        .get_model(&name, &version)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(response))
}

/// Compile and register a model
#[instrument(skip(state, body))]
pub async fn push_model(
    State(state): State<AppState>,
    body: Result<Json<PushModelRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PushModelResponse>)> {
    let Json(request) = body?;
    info!("Pushing model: {}@{}", request.name, request.version);

    let response = state
        .services
        .models()
        .push_model(request)
        .await
        .map_err(ApiError::from)?;

    Ok(created(response))
}

/// Unregister a model and remove its artifact
#[instrument(skip(state))]
pub async fn delete_model(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<DeleteModelResponse>)> {
    info!("Deleting model: {}@{}", name, version);

    let response = state
        .services
        .models()
        .delete_model(&name, &version)
        .await
        .map_err(ApiError::from)?;

    Ok(deleted(response))
}

// ============================================================================
// Health & Metrics Handlers
// ============================================================================

/// Health check endpoint
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> HealthResponse {
    debug!("Health check requested");

    let models = state.services.models();
    let registry_health = match models.health_check().await {
        Ok(()) => match models.count_models().await {
            Ok(count) => ComponentHealth::healthy()
                .with_metrics(HashMap::from([("models".to_string(), serde_json::json!(count))])),
            Err(e) => ComponentHealth::unhealthy(format!("Registry error: {}", e)),
        },
        Err(e) => ComponentHealth::unhealthy(format!("Registry error: {}", e)),
    };

    HealthResponse::healthy()
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_check("registry", registry_health)
        .compute_status()
}

/// Metrics endpoint (Prometheus text format)
///
/// Renders every collector registered in the default prometheus registry.
#[instrument]
pub async fn metrics() -> ApiResult<impl IntoResponse> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| ApiError::internal_server_error(format!("Failed to encode metrics: {}", e)))?;
    let body = String::from_utf8(buffer)
        .map_err(|e| ApiError::internal_server_error(format!("Metrics are not UTF-8: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], body))
}

// ============================================================================
// Version & Info Handlers
// ============================================================================

/// Get API version information
#[instrument]
pub async fn version_info() -> Json<VersionInfo> {
    Json(VersionInfo::current())
}

/// Version information
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Semantic version
    pub version: String,

    /// API version
    pub api_version: String,

    /// Build timestamp
    pub build_timestamp: String,
}

impl VersionInfo {
    /// Version of the running binary
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            api_version: "v1".to_string(),
            build_timestamp: option_env!("BUILD_TIMESTAMP")
                .unwrap_or("unknown")
                .to_string(),
        }
    }
}
