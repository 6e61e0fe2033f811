//! Registry storage for the config model registry
//!
//! This crate persists model records. It provides:
//! - The `ModelRepository` trait the service layer programs against
//! - An in-memory implementation for single-process deployments and tests
//! - A SQLite implementation with embedded migrations for durable registries
//!
//! # Example
//!
//! ```rust,no_run
//! use config_model_db::{create_pool, ModelRepository, PoolConfig, SqliteModelRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PoolConfig::new("sqlite:///var/lib/config-models/registry.db");
//! let pool = create_pool(&config).await?;
//!
//! let repo = SqliteModelRepository::new(pool);
//! println!("{} models registered", repo.count_models().await?);
//! # Ok(())
//! # }
//! ```

// Re-export core domain types for convenience
pub use config_model_core;

pub mod error;
pub mod memory;
pub mod pool;
pub mod repository;
pub mod sqlite;

pub use error::{DbError, DbResult};
pub use memory::InMemoryModelRepository;
pub use pool::{create_pool, run_migrations, verify_pool_health, PoolConfig};
pub use repository::ModelRepository;
pub use sqlite::SqliteModelRepository;

pub use sqlx::sqlite::SqlitePool;

/// Registry storage version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
