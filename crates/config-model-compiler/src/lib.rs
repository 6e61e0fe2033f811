//! Plugin compiler for the config model registry
//!
//! This crate turns model records into artifacts on disk:
//!
//! - **Toolchains** compile a bundle of schema modules into artifact bytes.
//!   [`BundleToolchain`] is built in; [`CommandToolchain`] delegates to an
//!   external program.
//! - **Artifact store** places artifacts at `<dir>/<name>-<version>.so`
//!   using write-to-temp then rename.
//! - **Loader** reads bundle artifacts back and verifies their digests.
//!
//! The compiler never reads or writes registry state.
//!
//! # Example
//!
//! ```rust,no_run
//! use config_model_compiler::{ArtifactStore, BundleToolchain, DefaultPluginCompiler, PluginCompiler};
//! use config_model_core::{ModelIdentity, ModelRecord, ModuleInfo};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ArtifactStore::open("/var/lib/config-models").await?;
//! let compiler = DefaultPluginCompiler::new(store, Arc::new(BundleToolchain::new()));
//!
//! let record = ModelRecord::new(
//!     ModelIdentity::parse("testdevice", "1.0.0")?,
//!     vec![ModuleInfo::new("test1", "ONF", "2018-02-20", b"module test1 {}".to_vec())],
//!     "",
//!     vec![],
//! );
//! let path = compiler.compile_plugin(&record).await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod compiler;
pub mod error;
pub mod format;
pub mod loader;
pub mod store;
pub mod toolchain;

pub use command::CommandToolchain;
pub use compiler::{DefaultPluginCompiler, PluginCompiler};
pub use error::{CompileError, CompileResult};
pub use format::{ArtifactManifest, ManifestModule};
pub use loader::{ArtifactLoader, LoadedPlugin};
pub use store::{ArtifactStore, StagedArtifact};
pub use toolchain::{resolve_replaces, BundleToolchain, CompileBundle, Toolchain};
