//! Repository trait abstraction for model registry persistence
//!
//! This module defines the `ModelRepository` trait implemented by the in-memory
//! and SQLite registries.

use async_trait::async_trait;
use config_model_core::{ModelIdentity, ModelRecord};

use crate::error::DbResult;

/// Repository trait for model registry operations
///
/// Implementations must be thread-safe (Send + Sync) for use in async contexts.
/// Writers are mutually exclusive; readers always observe whole records.
#[async_trait]
pub trait ModelRepository: Send + Sync {
    /// Add a new model record
    ///
    /// # Returns
    /// * `Ok(())` - If the record was inserted
    /// * `Err(DbError::AlreadyExists)` - If the identity is already registered
    /// * `Err(DbError::ArtifactConflict)` - If another identity owns the same artifact file
    async fn add_model(&self, record: ModelRecord) -> DbResult<()>;

    /// Remove a model record
    ///
    /// # Returns
    /// * `Ok(ModelRecord)` - The removed record
    /// * `Err(DbError::NotFound)` - If the identity is not registered
    async fn remove_model(&self, identity: &ModelIdentity) -> DbResult<ModelRecord>;

    /// Get a model record by identity
    ///
    /// # Returns
    /// * `Ok(ModelRecord)` - The record
    /// * `Err(DbError::NotFound)` - If the identity is not registered
    async fn get_model(&self, identity: &ModelIdentity) -> DbResult<ModelRecord>;

    /// Find the record that owns an artifact file, if any
    async fn find_by_artifact(&self, file: &str) -> DbResult<Option<ModelRecord>>;

    /// List all records, sorted by name and then version
    async fn list_models(&self) -> DbResult<Vec<ModelRecord>>;

    /// Count registered models
    async fn count_models(&self) -> DbResult<usize>;

    /// Health check - verify the repository is operational
    async fn health_check(&self) -> DbResult<()>;
}
