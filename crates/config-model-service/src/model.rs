//! Model service
//!
//! Sequences the plugin compiler and the model registry so that a model is
//! never registered without an artifact, or left with an artifact but no
//! record:
//!
//! - Push compiles into a staged artifact, registers, then renames the staged
//!   file onto its final name. If registration fails only the staged file is
//!   dropped, so an artifact owned by another writer is never touched. If the
//!   rename fails the record is removed again.
//! - Delete unregisters first and removes the artifact second. A missing
//!   artifact counts as removed; any other failure is reported while the
//!   record stays removed.
//!
//! Both run under the lock of their artifact file, on a spawned task, so a
//! caller that gives up mid-operation does not leave the unit half done.

use async_trait::async_trait;
use config_model_compiler::PluginCompiler;
use config_model_core::{ModelIdentity, ModelRecord};
use config_model_db::ModelRepository;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn, Instrument, Span};

use crate::dto::{
    parse_identity, DeleteModelResponse, GetModelResponse, ListModelsResponse, ModelDto,
    PushModelRequest, PushModelResponse, ReconcileReport,
};
use crate::error::{ServiceError, ServiceResult};
use crate::locks::ArtifactLocks;
use crate::reconcile::reconcile;

/// Trait for config model operations
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Compile and register a model
    async fn push_model(&self, request: PushModelRequest) -> ServiceResult<PushModelResponse>;

    /// Unregister a model and remove its artifact
    async fn delete_model(&self, name: &str, version: &str) -> ServiceResult<DeleteModelResponse>;

    /// Get one model
    async fn get_model(&self, name: &str, version: &str) -> ServiceResult<GetModelResponse>;

    /// List all models, sorted by name then version
    async fn list_models(&self) -> ServiceResult<ListModelsResponse>;

    /// Count registered models
    async fn count_models(&self) -> ServiceResult<usize>;

    /// Repair record/artifact mismatches
    async fn reconcile(&self) -> ServiceResult<ReconcileReport>;

    /// Check that the registry is reachable
    async fn health_check(&self) -> ServiceResult<()>;
}

struct Coordinator {
    repository: Arc<dyn ModelRepository>,
    compiler: Arc<dyn PluginCompiler>,
    locks: ArtifactLocks,
}

impl Coordinator {
    async fn push(&self, record: ModelRecord) -> ServiceResult<()> {
        let _guard = self.locks.acquire(record.artifact_file()).await;

        if let Some(existing) = self.repository.find_by_artifact(record.artifact_file()).await? {
            debug!("Artifact {} already owned by {}", record.artifact_file(), existing.identity);
            return Err(ServiceError::AlreadyExists {
                name: existing.identity.name.to_string(),
                version: existing.identity.version.to_string(),
            });
        }

        let staged = self.compiler.stage_plugin(&record).await?;

        // The final artifact name may belong to a writer that registered
        // first, so nothing is renamed onto it until the add succeeds.
        if let Err(err) = self.repository.add_model(record.clone()).await {
            warn!("Registering {} failed, discarding staged artifact: {}", record.identity, err);
            self.compiler.discard_plugin(staged).await;
            return Err(err.into());
        }

        match self.compiler.promote_plugin(staged).await {
            Ok(path) => {
                debug!("Artifact written to {}", path.display());
                Ok(())
            }
            Err(err) => {
                error!("Placing artifact for {} failed, unregistering: {}", record.identity, err);
                if let Err(cleanup) = self.repository.remove_model(&record.identity).await {
                    error!(
                        "Failed to unregister {} after artifact failure: {}",
                        record.identity, cleanup
                    );
                }
                Err(err.into())
            }
        }
    }

    async fn delete(&self, identity: ModelIdentity) -> ServiceResult<()> {
        let _guard = self.locks.acquire(&identity.artifact_file()).await;

        let record = self.repository.remove_model(&identity).await?;

        match self.compiler.remove_artifact(record.artifact_file()).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!("Artifact {} was already gone", record.artifact_file());
                Ok(())
            }
            Err(err) => {
                error!(
                    "Model {} unregistered but artifact removal failed: {}",
                    identity, err
                );
                Err(err.into())
            }
        }
    }
}

/// Default implementation of ModelService
#[derive(Clone)]
pub struct DefaultModelService {
    inner: Arc<Coordinator>,
}

impl DefaultModelService {
    /// Create a new model service
    pub fn new(repository: Arc<dyn ModelRepository>, compiler: Arc<dyn PluginCompiler>) -> Self {
        Self {
            inner: Arc::new(Coordinator {
                repository,
                compiler,
                locks: ArtifactLocks::new(),
            }),
        }
    }

    /// Lock table shared by push, delete and reconcile
    pub fn locks(&self) -> &ArtifactLocks {
        &self.inner.locks
    }
}

#[async_trait]
impl ModelService for DefaultModelService {
    #[instrument(skip(self, request), fields(name = %request.name, version = %request.version))]
    async fn push_model(&self, request: PushModelRequest) -> ServiceResult<PushModelResponse> {
        let record = request.into_record()?;
        let identity = record.identity.clone();
        debug!("Pushing model with {} modules", record.modules.len());

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.push(record).await }.instrument(Span::current()))
            .await??;

        info!("Model {} pushed", identity);
        Ok(PushModelResponse::default())
    }

    #[instrument(skip(self))]
    async fn delete_model(&self, name: &str, version: &str) -> ServiceResult<DeleteModelResponse> {
        let identity = parse_identity(name, version)?;

        let inner = Arc::clone(&self.inner);
        let target = identity.clone();
        tokio::spawn(async move { inner.delete(target).await }.instrument(Span::current()))
            .await??;

        info!("Model {} deleted", identity);
        Ok(DeleteModelResponse::default())
    }

    #[instrument(skip(self))]
    async fn get_model(&self, name: &str, version: &str) -> ServiceResult<GetModelResponse> {
        let identity = parse_identity(name, version)?;
        let record = self.inner.repository.get_model(&identity).await?;
        Ok(GetModelResponse {
            model: ModelDto::from(record),
        })
    }

    #[instrument(skip(self))]
    async fn list_models(&self) -> ServiceResult<ListModelsResponse> {
        let records = self.inner.repository.list_models().await?;
        Ok(ListModelsResponse {
            models: records.into_iter().map(ModelDto::from).collect(),
        })
    }

    async fn count_models(&self) -> ServiceResult<usize> {
        Ok(self.inner.repository.count_models().await?)
    }

    async fn reconcile(&self) -> ServiceResult<ReconcileReport> {
        reconcile(
            self.inner.repository.as_ref(),
            self.inner.compiler.as_ref(),
            &self.inner.locks,
        )
        .await
    }

    async fn health_check(&self) -> ServiceResult<()> {
        Ok(self.inner.repository.health_check().await?)
    }
}
