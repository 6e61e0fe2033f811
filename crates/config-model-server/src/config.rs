//! Server configuration
//!
//! This module handles hierarchical configuration loading from multiple sources:
//! - Default configuration file
//! - Environment-specific configuration file
//! - Environment variables
//! - Command-line arguments

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix of environment variable overrides, e.g. `CONFIG_MODEL_REGISTRY__SERVER__PORT`
pub const ENV_PREFIX: &str = "CONFIG_MODEL_REGISTRY";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: HttpServerConfig,

    /// gRPC server settings
    #[serde(default)]
    pub grpc: GrpcServerConfig,

    /// Model registry storage
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Plugin compiler settings
    #[serde(default)]
    pub compiler: CompilerConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// CORS settings
    #[serde(default)]
    pub cors: CorsConfig,

    /// Repair records and artifacts before serving
    #[serde(default = "default_true")]
    pub reconcile_on_startup: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: HttpServerConfig::default(),
            grpc: GrpcServerConfig::default(),
            registry: RegistryConfig::default(),
            compiler: CompilerConfig::default(),
            logging: LoggingConfig::default(),
            cors: CorsConfig::default(),
            reconcile_on_startup: default_true(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Enable graceful shutdown
    #[serde(default = "default_true")]
    pub graceful_shutdown: bool,

    /// Graceful shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5151
}

fn default_timeout() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            graceful_shutdown: default_true(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

/// gRPC server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrpcServerConfig {
    /// Enable gRPC server
    #[serde(default)]
    pub enabled: bool,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_grpc_port")]
    pub port: u16,
}

fn default_grpc_port() -> u16 {
    5150
}

impl Default for GrpcServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_grpc_port(),
        }
    }
}

/// Registry storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// SQLite URL; the registry stays in memory when unset
    #[serde(default)]
    pub database_url: Option<String>,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connect_timeout_seconds: u64,

    /// Run migrations on startup
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_connection_timeout() -> u64 {
    30
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: default_max_connections(),
            connect_timeout_seconds: default_connection_timeout(),
            run_migrations: default_true(),
        }
    }
}

/// Which toolchain produces artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainKind {
    /// Built-in bundle packaging
    #[default]
    Bundle,
    /// External compiler command
    Command,
}

/// Plugin compiler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Directory holding compiled artifacts
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Toolchain selection
    #[serde(default)]
    pub toolchain: ToolchainKind,

    /// Command line of the external compiler (`toolchain = "command"`)
    #[serde(default)]
    pub command: Option<String>,

    /// Accepted compilation targets; empty accepts any
    #[serde(default)]
    pub targets: Vec<String>,
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("models")
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            toolchain: ToolchainKind::default(),
            command: None,
            targets: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON formatting
    #[serde(default)]
    pub json_format: bool,

    /// Include timestamps
    #[serde(default = "default_true")]
    pub include_timestamps: bool,

    /// Include thread IDs
    #[serde(default)]
    pub include_thread_ids: bool,

    /// Include target module
    #[serde(default = "default_true")]
    pub include_target: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            include_timestamps: true,
            include_thread_ids: false,
            include_target: true,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins (empty means all)
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Allow credentials
    #[serde(default)]
    pub allow_credentials: bool,

    /// Max age for preflight requests in seconds
    #[serde(default = "default_cors_max_age")]
    pub max_age_seconds: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            allow_credentials: false,
            max_age_seconds: default_cors_max_age(),
        }
    }
}

impl From<CorsConfig> for config_model_api::CorsConfig {
    fn from(cors: CorsConfig) -> Self {
        Self {
            allowed_origins: cors.allowed_origins,
            allow_credentials: cors.allow_credentials,
            max_age_seconds: Some(cors.max_age_seconds),
        }
    }
}

impl ServerConfig {
    /// Load configuration from files and environment
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default configuration file (config/default.toml), required
    /// 2. Environment-specific file (config/{env}.toml)
    /// 3. Environment variables (CONFIG_MODEL_REGISTRY__*)
    ///
    /// Fails on a missing default file, a parse error or settings rejected by
    /// [`ServerConfig::validate`].
    pub fn load(config_dir: impl Into<PathBuf>, environment: &str) -> Result<Self, ConfigError> {
        let config_dir = config_dir.into();

        let config = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(true))
            .add_source(File::from(config_dir.join(format!("{}.toml", environment))).required(false))
            // e.g., CONFIG_MODEL_REGISTRY__SERVER__PORT=8080
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("compiler.targets")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot be served
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cors.allow_credentials && self.cors.allowed_origins.is_empty() {
            return Err(ConfigError::Message(
                "cors.allow_credentials requires explicit cors.allowed_origins".to_string(),
            ));
        }
        if self.compiler.toolchain == ToolchainKind::Command && self.compiler.command.is_none() {
            return Err(ConfigError::Message(
                "compiler.toolchain = \"command\" requires compiler.command".to_string(),
            ));
        }
        Ok(())
    }

    /// Get server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Get gRPC bind address
    pub fn grpc_bind_address(&self) -> String {
        format!("{}:{}", self.grpc.host, self.grpc.port)
    }
}
