//! SQLite connection pool management
//!
//! This module builds the SQLx pool backing `SqliteModelRepository` and runs
//! the embedded migrations.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

/// Default maximum number of connections in the pool
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default connection timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default time a writer waits on a locked database, in seconds
pub const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;

/// Configuration for the registry database pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Database URL (e.g., sqlite:///var/lib/registry/models.db or sqlite::memory:)
    pub database_url: String,

    /// Maximum number of connections allowed in the pool
    pub max_connections: u32,

    /// Timeout for acquiring a connection
    pub connect_timeout: Duration,

    /// How long a writer waits for a competing write lock
    pub busy_timeout: Duration,

    /// Whether to enable SQL statement logging
    pub enable_logging: bool,

    /// Whether to run migrations on startup
    pub run_migrations: bool,
}

impl PoolConfig {
    /// Create a new pool configuration with sensible defaults
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            busy_timeout: Duration::from_secs(DEFAULT_BUSY_TIMEOUT_SECS),
            enable_logging: false,
            run_migrations: true,
        }
    }

    /// In-memory database, private to the pool
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:")
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set busy timeout
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Enable or disable SQL logging
    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    /// Enable or disable automatic migrations
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Whether the URL points at an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    /// Validate the configuration
    pub fn validate(&self) -> DbResult<()> {
        if self.database_url.is_empty() {
            return Err(DbError::Configuration(
                "Database URL cannot be empty".to_string(),
            ));
        }

        if !self.database_url.starts_with("sqlite:") {
            return Err(DbError::Configuration(format!(
                "Unsupported database URL '{}': expected a sqlite: URL",
                self.database_url
            )));
        }

        if self.max_connections == 0 {
            return Err(DbError::Configuration(
                "max_connections must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Create a SQLite connection pool from configuration
pub async fn create_pool(config: &PoolConfig) -> DbResult<SqlitePool> {
    config.validate()?;

    // An in-memory database lives and dies with its connection, so the pool
    // must hold exactly one connection forever.
    let in_memory = config.is_in_memory();
    let max_connections = if in_memory { 1 } else { config.max_connections };

    info!(
        "Creating registry database pool: max={}, database={}",
        max_connections, config.database_url
    );

    let mut connect_opts = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|e| DbError::Configuration(format!("Invalid database URL: {}", e)))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

    if !in_memory {
        connect_opts = connect_opts.journal_mode(SqliteJournalMode::Wal);
    }
    if !config.enable_logging {
        connect_opts = connect_opts.disable_statement_logging();
    }

    let mut pool_opts = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(config.connect_timeout);
    if in_memory {
        pool_opts = pool_opts
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>);
    }

    let pool = pool_opts
        .connect_with(connect_opts)
        .await
        .map_err(|e| DbError::Connection(format!("Failed to create pool: {}", e)))?;

    info!("Registry database pool created successfully");

    if config.run_migrations {
        run_migrations(&pool).await?;
    }

    verify_pool_health(&pool).await?;

    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Running registry database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DbError::Migration(format!("Migration failed: {}", e)))?;

    info!("Registry database migrations completed successfully");
    Ok(())
}

/// Verify that the connection pool is healthy
pub async fn verify_pool_health(pool: &SqlitePool) -> DbResult<()> {
    debug!("Verifying registry database pool health");

    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(|e| DbError::Connection(format!("Health check failed: {}", e)))?;

    Ok(())
}
