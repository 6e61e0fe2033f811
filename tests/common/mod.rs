//! Common test utilities and helpers
//!
//! Spins up the HTTP API on a random port over a SQLite registry and a
//! temporary artifact directory.

use config_model_api::build_api_server;
use config_model_compiler::{ArtifactStore, BundleToolchain, DefaultPluginCompiler};
use config_model_db::{create_pool, PoolConfig, SqliteModelRepository};
use config_model_service::ServiceRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub mod fixtures;

/// Test application state
pub struct TestApp {
    pub address: String,
    pub services: ServiceRegistry,
    dir: TempDir,
    server: JoinHandle<()>,
}

impl TestApp {
    /// Create a new test application with empty state
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        Self::start(dir).await
    }

    /// Stop the server and start a fresh one over the same state on disk
    pub async fn restart(self) -> Self {
        self.server.abort();
        let _ = self.server.await;
        Self::start(self.dir).await
    }

    async fn start(dir: TempDir) -> Self {
        let services = build_services(dir.path()).await;
        let app = build_api_server(services.clone());

        // Start server on random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let address = listener.local_addr().expect("Failed to get local address");

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Failed to start test server");
        });

        Self {
            address: format!("http://{}", address),
            services,
            dir,
            server,
        }
    }

    /// Get base URL
    pub fn url(&self) -> &str {
        &self.address
    }

    /// Directory holding compiled artifacts
    pub fn artifact_dir(&self) -> PathBuf {
        self.dir.path().join("models")
    }

    /// Path of an artifact file
    pub fn artifact(&self, file: &str) -> PathBuf {
        self.artifact_dir().join(file)
    }

    /// Create HTTP client
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to build client")
    }
}

async fn build_services(root: &Path) -> ServiceRegistry {
    let url = format!("sqlite://{}", root.join("registry.db").display());
    let pool = create_pool(&PoolConfig::new(url))
        .await
        .expect("Failed to create database pool");
    let repository = Arc::new(SqliteModelRepository::new(pool));

    let store = ArtifactStore::open(root.join("models"))
        .await
        .expect("Failed to open artifact directory");
    let compiler = Arc::new(DefaultPluginCompiler::new(
        store,
        Arc::new(BundleToolchain::new()),
    ));

    ServiceRegistry::new(repository, compiler)
}

/// Assert response status
pub fn assert_status(response: &reqwest::Response, expected: reqwest::StatusCode) {
    assert_eq!(
        response.status(),
        expected,
        "Expected status {}, got {}",
        expected,
        response.status()
    );
}

/// Assert response is successful (2xx)
pub fn assert_success(response: &reqwest::Response) {
    assert!(
        response.status().is_success(),
        "Expected success status, got {}",
        response.status()
    );
}
