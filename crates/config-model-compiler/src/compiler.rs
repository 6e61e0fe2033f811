//! Plugin compiler
//!
//! Combines a [`Toolchain`] with an [`ArtifactStore`]. The compiler knows
//! nothing about the registry; it only maps model records to artifact files.

use async_trait::async_trait;
use config_model_core::{ModelIdentity, ModelRecord};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::error::CompileResult;
use crate::store::{ArtifactStore, StagedArtifact};
use crate::toolchain::{CompileBundle, Toolchain};

/// Compiles model records into artifacts and manages the artifact files
#[async_trait]
pub trait PluginCompiler: Send + Sync {
    /// Compile a record into a staged artifact
    ///
    /// Nothing appears under the final artifact name until the staged
    /// artifact is promoted.
    ///
    /// # Returns
    /// * `Ok(StagedArtifact)` - Artifact bytes under a temp name
    /// * `Err(CompileError::Compile)` - If module content is invalid for the target
    /// * `Err(CompileError::Io)` - If the artifact cannot be written
    async fn stage_plugin(&self, record: &ModelRecord) -> CompileResult<StagedArtifact>;

    /// Move a staged artifact onto its final name, replacing any file there
    async fn promote_plugin(&self, staged: StagedArtifact) -> CompileResult<PathBuf>;

    /// Drop a staged artifact; the final name is left untouched
    async fn discard_plugin(&self, staged: StagedArtifact);

    /// Compile a record and place its artifact at `record.plugin.file`
    async fn compile_plugin(&self, record: &ModelRecord) -> CompileResult<PathBuf> {
        let staged = self.stage_plugin(record).await?;
        self.promote_plugin(staged).await
    }

    /// Remove an artifact file by name; `false` if it did not exist
    async fn remove_artifact(&self, file: &str) -> CompileResult<bool>;

    /// Remove the artifact of a model; `false` if it did not exist
    async fn remove_plugin(&self, identity: &ModelIdentity) -> CompileResult<bool> {
        self.remove_artifact(&identity.artifact_file()).await
    }

    /// Check whether the artifact of a model exists
    async fn plugin_exists(&self, identity: &ModelIdentity) -> CompileResult<bool>;

    /// Path where the artifact of a model lives
    fn artifact_path(&self, identity: &ModelIdentity) -> PathBuf;

    /// Names of all artifact files present
    async fn list_artifacts(&self) -> CompileResult<Vec<String>>;

    /// Remove leftovers of interrupted writes
    async fn remove_stale_temp_files(&self) -> CompileResult<usize>;
}

/// Default plugin compiler over a directory and a toolchain
pub struct DefaultPluginCompiler {
    store: ArtifactStore,
    toolchain: Arc<dyn Toolchain>,
}

impl DefaultPluginCompiler {
    /// Create a compiler
    pub fn new(store: ArtifactStore, toolchain: Arc<dyn Toolchain>) -> Self {
        Self { store, toolchain }
    }

    /// Artifact store backing this compiler
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }
}

#[async_trait]
impl PluginCompiler for DefaultPluginCompiler {
    #[instrument(skip(self, record), fields(model = %record.identity, toolchain = self.toolchain.name()))]
    async fn stage_plugin(&self, record: &ModelRecord) -> CompileResult<StagedArtifact> {
        let start = Instant::now();
        let bytes = self.toolchain.compile(&CompileBundle::from(record)).await?;
        let staged = self.store.stage(record.artifact_file(), &bytes).await?;

        info!(
            "Compiled plugin {} ({} bytes) in {:?}",
            record.artifact_file(),
            bytes.len(),
            start.elapsed()
        );
        Ok(staged)
    }

    async fn promote_plugin(&self, staged: StagedArtifact) -> CompileResult<PathBuf> {
        self.store.promote(staged).await
    }

    async fn discard_plugin(&self, staged: StagedArtifact) {
        debug!("Discarding staged artifact {}", staged.file());
        self.store.discard(staged).await
    }

    #[instrument(skip(self))]
    async fn remove_artifact(&self, file: &str) -> CompileResult<bool> {
        let removed = self.store.remove(file).await?;
        if !removed {
            debug!("Artifact {} was already absent", file);
        }
        Ok(removed)
    }

    async fn plugin_exists(&self, identity: &ModelIdentity) -> CompileResult<bool> {
        self.store.exists(&identity.artifact_file()).await
    }

    fn artifact_path(&self, identity: &ModelIdentity) -> PathBuf {
        self.store.path_for(&identity.artifact_file())
    }

    async fn list_artifacts(&self) -> CompileResult<Vec<String>> {
        self.store.list().await
    }

    async fn remove_stale_temp_files(&self) -> CompileResult<usize> {
        self.store.remove_stale_temp_files().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::BundleToolchain;
    use config_model_core::ModuleInfo;

    async fn compiler(dir: &std::path::Path) -> DefaultPluginCompiler {
        let store = ArtifactStore::open(dir).await.unwrap();
        DefaultPluginCompiler::new(store, Arc::new(BundleToolchain::new()))
    }

    fn record(data: &[u8]) -> ModelRecord {
        ModelRecord::new(
            ModelIdentity::parse("foo", "1.0").unwrap(),
            vec![ModuleInfo::new("test1", "ONF", "2018-02-20", data.to_vec())],
            "",
            vec![],
        )
    }

    #[tokio::test]
    async fn test_compile_writes_to_derived_path() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(dir.path()).await;
        let rec = record(b"module test1 {}");

        let path = compiler.compile_plugin(&rec).await.unwrap();
        assert_eq!(path, dir.path().join("foo-1.0.so"));
        assert_eq!(path, compiler.artifact_path(&rec.identity));
        assert!(compiler.plugin_exists(&rec.identity).await.unwrap());
        assert_eq!(compiler.list_artifacts().await.unwrap(), vec!["foo-1.0.so".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_compile_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(dir.path()).await;
        let rec = record(b"");

        assert!(compiler.compile_plugin(&rec).await.unwrap_err().is_compile());
        assert!(!compiler.plugin_exists(&rec.identity).await.unwrap());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_discarded_stage_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(dir.path()).await;
        let rec = record(b"module test1 {}");

        let staged = compiler.stage_plugin(&rec).await.unwrap();
        assert!(!compiler.plugin_exists(&rec.identity).await.unwrap());
        compiler.discard_plugin(staged).await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_remove_plugin() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(dir.path()).await;
        let rec = record(b"module test1 {}");
        compiler.compile_plugin(&rec).await.unwrap();

        assert!(compiler.remove_plugin(&rec.identity).await.unwrap());
        assert!(!compiler.remove_plugin(&rec.identity).await.unwrap());
    }

    #[tokio::test]
    async fn test_unwritable_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(&dir.path().join("models")).await;
        std::fs::remove_dir(dir.path().join("models")).unwrap();

        let err = compiler
            .compile_plugin(&record(b"module test1 {}"))
            .await
            .unwrap_err();
        assert!(err.is_io());
    }
}
