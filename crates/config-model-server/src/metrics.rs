//! Prometheus metrics collection
//!
//! Collectors live in the default prometheus registry, which the API's
//! `/metrics` endpoint renders. Model operations and compiles are measured by
//! wrapping the service and the compiler; HTTP traffic by a router middleware.

use async_trait::async_trait;
use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use config_model_compiler::{CompileError, CompileResult, PluginCompiler, StagedArtifact};
use config_model_core::{ModelIdentity, ModelRecord};
use config_model_service::{
    DeleteModelResponse, GetModelResponse, ListModelsResponse, ModelService, PushModelRequest,
    PushModelResponse, ReconcileReport, ServiceResult,
};
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge,
    register_int_gauge_vec, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// HTTP request counter
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to create HTTP requests counter")
});

/// HTTP request duration histogram
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to create HTTP request duration histogram")
});

/// Model operations counter
pub static MODEL_OPERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "model_operations_total",
        "Total number of model operations",
        &["operation", "status"]
    )
    .expect("Failed to create model operations counter")
});

/// Model operation duration histogram
pub static MODEL_OPERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "model_operation_duration_seconds",
        "Model operation duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0]
    )
    .expect("Failed to create model operation duration histogram")
});

/// Plugin compile duration histogram
pub static COMPILE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "model_compile_duration_seconds",
        "Plugin compile duration in seconds",
        &["status"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0]
    )
    .expect("Failed to create compile duration histogram")
});

/// Registered models gauge
pub static MODELS_REGISTERED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("models_registered", "Number of models in the registry")
        .expect("Failed to create registered models gauge")
});

/// Registry information gauge (version)
pub static REGISTRY_INFO: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!("registry_info", "Registry information", &["version"])
        .expect("Failed to create registry info gauge")
});

/// Initialize metrics
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&HTTP_REQUEST_DURATION);
    Lazy::force(&MODEL_OPERATIONS_TOTAL);
    Lazy::force(&MODEL_OPERATION_DURATION);
    Lazy::force(&COMPILE_DURATION);
    Lazy::force(&MODELS_REGISTERED);
    Lazy::force(&REGISTRY_INFO);

    REGISTRY_INFO
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .set(1);

    tracing::info!("Metrics initialized successfully");
}

/// Record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// Router middleware recording request count and latency per route template
pub async fn track_http_requests(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    // Route templates keep label cardinality bounded
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

/// Record a model operation outcome
pub fn record_model_operation(operation: &str, status: &str, duration_secs: f64) {
    MODEL_OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();

    MODEL_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration_secs);
}

// ============================================================================
// Instrumented wrappers
// ============================================================================

/// Model service wrapper that records operation metrics
pub struct MeteredModelService {
    inner: Arc<dyn ModelService>,
}

impl MeteredModelService {
    pub fn new(inner: Arc<dyn ModelService>) -> Self {
        Self { inner }
    }

    async fn measure<T, F>(&self, operation: &str, call: F) -> ServiceResult<T>
    where
        F: Future<Output = ServiceResult<T>> + Send,
        T: Send,
    {
        let start = Instant::now();
        let result = call.await;
        let status = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        record_model_operation(operation, status, start.elapsed().as_secs_f64());
        result
    }

    /// Refresh the registered models gauge
    pub async fn refresh_model_count(&self) {
        match self.inner.count_models().await {
            Ok(count) => MODELS_REGISTERED.set(count as i64),
            Err(e) => warn!("Failed to count models: {}", e),
        }
    }
}

#[async_trait]
impl ModelService for MeteredModelService {
    async fn push_model(&self, request: PushModelRequest) -> ServiceResult<PushModelResponse> {
        let result = self.measure("push", self.inner.push_model(request)).await;
        if result.is_ok() {
            self.refresh_model_count().await;
        }
        result
    }

    async fn delete_model(&self, name: &str, version: &str) -> ServiceResult<DeleteModelResponse> {
        let result = self
            .measure("delete", self.inner.delete_model(name, version))
            .await;
        if result.is_ok() {
            self.refresh_model_count().await;
        }
        result
    }

    async fn get_model(&self, name: &str, version: &str) -> ServiceResult<GetModelResponse> {
        self.measure("get", self.inner.get_model(name, version)).await
    }

    async fn list_models(&self) -> ServiceResult<ListModelsResponse> {
        self.measure("list", self.inner.list_models()).await
    }

    async fn count_models(&self) -> ServiceResult<usize> {
        self.inner.count_models().await
    }

    async fn reconcile(&self) -> ServiceResult<ReconcileReport> {
        let result = self.measure("reconcile", self.inner.reconcile()).await;
        self.refresh_model_count().await;
        result
    }

    async fn health_check(&self) -> ServiceResult<()> {
        self.inner.health_check().await
    }
}

/// Compiler wrapper that records compile durations
pub struct InstrumentedCompiler {
    inner: Arc<dyn PluginCompiler>,
}

impl InstrumentedCompiler {
    pub fn new(inner: Arc<dyn PluginCompiler>) -> Self {
        Self { inner }
    }
}

fn compile_status<T>(result: &CompileResult<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(CompileError::Compile(_)) => "compile_error",
        Err(CompileError::Io { .. }) => "io_error",
        Err(CompileError::InvalidArtifact { .. }) => "invalid_artifact",
    }
}

#[async_trait]
impl PluginCompiler for InstrumentedCompiler {
    async fn stage_plugin(&self, record: &ModelRecord) -> CompileResult<StagedArtifact> {
        let start = Instant::now();
        let result = self.inner.stage_plugin(record).await;
        COMPILE_DURATION
            .with_label_values(&[compile_status(&result)])
            .observe(start.elapsed().as_secs_f64());
        result
    }

    async fn promote_plugin(&self, staged: StagedArtifact) -> CompileResult<PathBuf> {
        self.inner.promote_plugin(staged).await
    }

    async fn discard_plugin(&self, staged: StagedArtifact) {
        self.inner.discard_plugin(staged).await
    }

    async fn remove_artifact(&self, file: &str) -> CompileResult<bool> {
        self.inner.remove_artifact(file).await
    }

    async fn plugin_exists(&self, identity: &ModelIdentity) -> CompileResult<bool> {
        self.inner.plugin_exists(identity).await
    }

    fn artifact_path(&self, identity: &ModelIdentity) -> PathBuf {
        self.inner.artifact_path(identity)
    }

    async fn list_artifacts(&self) -> CompileResult<Vec<String>> {
        self.inner.list_artifacts().await
    }

    async fn remove_stale_temp_files(&self) -> CompileResult<usize> {
        self.inner.remove_stale_temp_files().await
    }
}
