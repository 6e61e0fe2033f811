//! Core domain types for the config model registry
//!
//! This crate contains the data structures shared by the registry, the plugin
//! compiler and the service layer: model identities, schema modules, plugin
//! descriptors and the records that tie them together.

pub mod error;
pub mod model;
pub mod plugin;
pub mod types;

// Re-exports for convenience
pub use error::{ModelError, Result};
pub use model::ModelRecord;
pub use plugin::{artifact_file, PluginDescriptor, ReplaceDirective, ARTIFACT_EXTENSION};
pub use types::{ModelIdentity, ModelName, ModelVersion, ModuleInfo};
