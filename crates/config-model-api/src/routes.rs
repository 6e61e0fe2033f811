//! API route definitions
//!
//! This module defines all API routes and builds the router.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{
    delete_model, get_model, health_check, list_models, metrics, push_model, version_info,
    AppState,
};

/// Build the API router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health and info endpoints
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/version", get(version_info))
        // API v1 routes
        .nest("/v1", build_v1_routes())
        .with_state(state)
}

/// Build v1 API routes
fn build_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/models", post(push_model).get(list_models))
        .route("/models/{name}/{version}", get(get_model).delete(delete_model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use config_model_compiler::{ArtifactStore, BundleToolchain, DefaultPluginCompiler};
    use config_model_db::InMemoryModelRepository;
    use config_model_service::ServiceRegistry;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn router(dir: &std::path::Path) -> Router {
        let store = ArtifactStore::open(dir).await.unwrap();
        let compiler = Arc::new(DefaultPluginCompiler::new(store, Arc::new(BundleToolchain::new())));
        let services = ServiceRegistry::new(Arc::new(InMemoryModelRepository::new()), compiler);
        build_router(AppState::new(services))
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(dir.path())
            .await
            .oneshot(Request::get("/v1/unknown").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(dir.path())
            .await
            .oneshot(Request::put("/v1/models").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
