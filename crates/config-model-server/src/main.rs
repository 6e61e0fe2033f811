//! Config Model Registry Server
//!
//! Main entry point for the registry server. This binary wires the registry,
//! the plugin compiler and the coordinator together, repairs on-disk state,
//! and serves the HTTP (and optionally gRPC) API with graceful shutdown.

mod config;
mod metrics;
mod telemetry;

use anyhow::{bail, Context, Result};
use clap::Parser;
use config_model_api::{build_api_server_with_config, MiddlewareConfig};
use config_model_compiler::{
    ArtifactStore, BundleToolchain, CommandToolchain, DefaultPluginCompiler, PluginCompiler,
    Toolchain,
};
use config_model_db::{
    create_pool, InMemoryModelRepository, ModelRepository, PoolConfig, SqliteModelRepository,
};
use config_model_service::{DefaultModelService, ModelService, ServiceRegistry};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

use config::{ServerConfig, ToolchainKind};
use metrics::{InstrumentedCompiler, MeteredModelService};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration directory
    #[arg(short, long, env = "CONFIG_DIR", default_value = "config")]
    config_dir: String,

    /// Environment (development, production, etc.)
    #[arg(short, long, env = "ENVIRONMENT", default_value = "development")]
    environment: String,

    /// Server host
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// SQLite URL of the registry; in memory when unset
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Directory holding compiled artifacts
    #[arg(long, env = "ARTIFACT_DIR")]
    artifact_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = ServerConfig::load(&args.config_dir, &args.environment).with_context(|| {
        format!(
            "Failed to load configuration from {} ({})",
            args.config_dir, args.environment
        )
    })?;

    // Override with command-line arguments
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database_url) = args.database_url {
        config.registry.database_url = Some(database_url);
    }
    if let Some(artifact_dir) = args.artifact_dir {
        config.compiler.artifact_dir = artifact_dir;
    }
    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }

    let telemetry_config = telemetry::TelemetryConfig::new()
        .with_log_level(config.logging.level.clone())
        .with_json_format(config.logging.json_format)
        .with_timestamps(config.logging.include_timestamps)
        .with_thread_ids(config.logging.include_thread_ids)
        .with_target(config.logging.include_target);

    telemetry::init_with_config(telemetry_config);
    metrics::init_metrics();

    info!("Starting Config Model Registry Server");
    info!("Environment: {}", args.environment);
    info!("Server: {}", config.bind_address());
    info!("Artifacts: {}", config.compiler.artifact_dir.display());

    let repository = build_repository(&config).await?;
    let compiler = build_compiler(&config).await?;

    let models = Arc::new(MeteredModelService::new(Arc::new(DefaultModelService::new(
        repository, compiler,
    ))));

    if config.reconcile_on_startup {
        let report = models
            .reconcile()
            .await
            .context("Startup reconciliation failed")?;
        for identity in &report.dropped {
            warn!("Dropped model {} whose artifact could not be rebuilt", identity);
        }
    } else {
        models.refresh_model_count().await;
    }

    let services = Arc::new(ServiceRegistry::with_services(models));

    let middleware_config = MiddlewareConfig::new()
        .with_cors(config.cors.clone().into())
        .with_timeout(config.server.timeout_seconds);
    let app = build_api_server_with_config((*services).clone(), middleware_config)
        .layer(axum::middleware::from_fn(metrics::track_http_requests));

    let http_addr: SocketAddr = config
        .bind_address()
        .parse()
        .context("Invalid HTTP bind address")?;

    let http_listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .context("Failed to bind HTTP server")?;

    info!("HTTP Server listening on http://{}", http_addr);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let grpc_handle = spawn_grpc(&config, &services, shutdown_rx.clone())?;

    let http_server = async {
        if config.server.graceful_shutdown {
            axum::serve(http_listener, app.into_make_service())
                .with_graceful_shutdown(wait_for(shutdown_rx.clone()))
                .await
        } else {
            axum::serve(http_listener, app.into_make_service()).await
        }
    };

    let drain_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let http_result = tokio::select! {
        res = http_server => res.context("HTTP Server error"),
        _ = async {
            wait_for(shutdown_rx.clone()).await;
            tokio::time::sleep(drain_timeout).await;
        } => {
            warn!("Graceful shutdown timed out after {:?}", drain_timeout);
            Ok(())
        }
    };

    // Wait for gRPC server if it was started
    if let Some(handle) = grpc_handle {
        http_result?;
        handle
            .await
            .context("gRPC task panicked")??;
    } else {
        http_result?;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Open the model registry named by the configuration
async fn build_repository(config: &ServerConfig) -> Result<Arc<dyn ModelRepository>> {
    let Some(url) = &config.registry.database_url else {
        info!("Registry: in memory");
        return Ok(Arc::new(InMemoryModelRepository::new()));
    };

    info!("Registry: {}", url);
    let pool_config = PoolConfig::new(url)
        .max_connections(config.registry.max_connections)
        .connect_timeout(Duration::from_secs(config.registry.connect_timeout_seconds))
        .run_migrations(config.registry.run_migrations)
        .enable_logging(config.logging.level == "trace");

    let pool = create_pool(&pool_config)
        .await
        .context("Failed to open registry database")?;

    Ok(Arc::new(SqliteModelRepository::new(pool)))
}

/// Build the plugin compiler named by the configuration
async fn build_compiler(config: &ServerConfig) -> Result<Arc<dyn PluginCompiler>> {
    let toolchain: Arc<dyn Toolchain> = match config.compiler.toolchain {
        ToolchainKind::Bundle => {
            Arc::new(BundleToolchain::new().with_targets(config.compiler.targets.clone()))
        }
        ToolchainKind::Command => {
            let Some(command) = config.compiler.command.as_deref() else {
                bail!("compiler.toolchain is \"command\" but compiler.command is not set");
            };
            Arc::new(
                CommandToolchain::from_command_line(command)
                    .context("Invalid compiler command")?,
            )
        }
    };
    info!("Toolchain: {}", toolchain.name());

    let store = ArtifactStore::open(&config.compiler.artifact_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to open artifact directory {}",
                config.compiler.artifact_dir.display()
            )
        })?;

    Ok(Arc::new(InstrumentedCompiler::new(Arc::new(
        DefaultPluginCompiler::new(store, toolchain),
    ))))
}

#[cfg(feature = "grpc")]
fn spawn_grpc(
    config: &ServerConfig,
    services: &Arc<ServiceRegistry>,
    shutdown: watch::Receiver<bool>,
) -> Result<Option<tokio::task::JoinHandle<Result<()>>>> {
    if !config.grpc.enabled {
        info!("gRPC Server disabled");
        return Ok(None);
    }

    let grpc_addr: SocketAddr = config
        .grpc_bind_address()
        .parse()
        .context("Invalid gRPC bind address")?;
    info!("gRPC Server listening on grpc://{}", grpc_addr);

    let grpc_service = config_model_api::ConfigModelRegistryServiceImpl::new(Arc::clone(services));
    Ok(Some(tokio::spawn(async move {
        config_model_api::serve_grpc(grpc_addr, grpc_service, wait_for(shutdown))
            .await
            .context("gRPC Server error")
    })))
}

#[cfg(not(feature = "grpc"))]
fn spawn_grpc(
    config: &ServerConfig,
    _services: &Arc<ServiceRegistry>,
    _shutdown: watch::Receiver<bool>,
) -> Result<Option<tokio::task::JoinHandle<Result<()>>>> {
    if config.grpc.enabled {
        warn!("gRPC is enabled in configuration but the server was built without the grpc feature");
    }
    Ok(None)
}

/// Resolve once shutdown has been requested
async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    // A dropped sender also ends the wait
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Graceful shutdown signal handler
///
/// Waits for SIGTERM or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
