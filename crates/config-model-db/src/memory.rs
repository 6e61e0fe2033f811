//! In-memory implementation of ModelRepository
//!
//! Records live in a `BTreeMap` guarded by a `tokio::sync::RwLock`, so listing
//! is naturally ordered by identity and any number of readers can proceed while
//! no writer holds the lock.

use async_trait::async_trait;
use config_model_core::{ModelIdentity, ModelRecord};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::error::{DbError, DbResult};
use crate::repository::ModelRepository;

#[derive(Debug, Default)]
struct Tables {
    models: BTreeMap<ModelIdentity, ModelRecord>,
    // artifact file -> owning identity
    artifacts: HashMap<String, ModelIdentity>,
}

/// Process-local model registry
#[derive(Debug, Default)]
pub struct InMemoryModelRepository {
    tables: RwLock<Tables>,
}

impl InMemoryModelRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelRepository for InMemoryModelRepository {
    #[instrument(skip(self, record), fields(model = %record.identity))]
    async fn add_model(&self, record: ModelRecord) -> DbResult<()> {
        let mut tables = self.tables.write().await;

        if tables.models.contains_key(&record.identity) {
            return Err(DbError::AlreadyExists {
                name: record.identity.name.to_string(),
                version: record.identity.version.to_string(),
            });
        }
        if let Some(owner) = tables.artifacts.get(record.artifact_file()) {
            return Err(DbError::ArtifactConflict {
                file: record.artifact_file().to_string(),
                owner: owner.to_string(),
            });
        }

        tables
            .artifacts
            .insert(record.artifact_file().to_string(), record.identity.clone());
        tables.models.insert(record.identity.clone(), record);
        debug!("Model added to registry");
        Ok(())
    }

    #[instrument(skip(self), fields(model = %identity))]
    async fn remove_model(&self, identity: &ModelIdentity) -> DbResult<ModelRecord> {
        let mut tables = self.tables.write().await;

        let record = tables
            .models
            .remove(identity)
            .ok_or_else(|| DbError::NotFound(identity.to_string()))?;
        tables.artifacts.remove(record.artifact_file());
        debug!("Model removed from registry");
        Ok(record)
    }

    async fn get_model(&self, identity: &ModelIdentity) -> DbResult<ModelRecord> {
        let tables = self.tables.read().await;
        tables
            .models
            .get(identity)
            .cloned()
            .ok_or_else(|| DbError::NotFound(identity.to_string()))
    }

    async fn find_by_artifact(&self, file: &str) -> DbResult<Option<ModelRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .artifacts
            .get(file)
            .and_then(|identity| tables.models.get(identity))
            .cloned())
    }

    async fn list_models(&self) -> DbResult<Vec<ModelRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.models.values().cloned().collect())
    }

    async fn count_models(&self) -> DbResult<usize> {
        Ok(self.tables.read().await.models.len())
    }

    async fn health_check(&self) -> DbResult<()> {
        Ok(())
    }
}
