//! Service layer for the config model registry
//!
//! This crate sits between the transport adapters and the storage/compiler
//! crates. It owns the only code that knows about both the registry and the
//! compiler.
//!
//! # Architecture
//!
//! - **ModelService**: push, delete, get and list orchestration
//! - **ArtifactLocks**: per-artifact serialization of push and delete
//! - **Reconciliation**: startup repair of the record/artifact invariant
//!
//! # Example
//!
//! ```rust,no_run
//! use config_model_service::ServiceRegistry;
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     repository: Arc<dyn config_model_db::ModelRepository>,
//! #     compiler: Arc<dyn config_model_compiler::PluginCompiler>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let services = ServiceRegistry::new(repository, compiler);
//!
//! let report = services.models().reconcile().await?;
//! let models = services.models().list_models().await?;
//! # Ok(())
//! # }
//! ```

pub mod dto;
pub mod error;
pub mod locks;
pub mod model;
pub mod reconcile;

// Re-export main types for convenience
pub use dto::*;
pub use error::{ServiceError, ServiceResult};
pub use locks::{ArtifactGuard, ArtifactLocks};
pub use model::{DefaultModelService, ModelService};

use config_model_compiler::PluginCompiler;
use config_model_db::ModelRepository;
use std::sync::Arc;

/// Service registry that holds all service instances
#[derive(Clone)]
pub struct ServiceRegistry {
    /// Model service
    pub models: Arc<dyn ModelService>,
}

impl ServiceRegistry {
    /// Create a service registry with default implementations
    ///
    /// # Arguments
    ///
    /// * `repository` - Model registry implementation
    /// * `compiler` - Plugin compiler implementation
    pub fn new(repository: Arc<dyn ModelRepository>, compiler: Arc<dyn PluginCompiler>) -> Self {
        Self {
            models: Arc::new(DefaultModelService::new(repository, compiler)),
        }
    }

    /// Create a service registry around a custom model service
    pub fn with_services(models: Arc<dyn ModelService>) -> Self {
        Self { models }
    }

    /// Get the model service
    pub fn models(&self) -> &Arc<dyn ModelService> {
        &self.models
    }
}
