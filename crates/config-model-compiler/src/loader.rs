//! Artifact loader
//!
//! Reads bundle artifacts back into memory after verifying their digests.
//! Loading never executes artifact content.

use config_model_core::{artifact_file, ModelIdentity, ReplaceDirective};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::error::{CompileError, CompileResult};
use crate::format::{self, ArtifactManifest, ManifestModule};

/// A verified artifact and its schema modules
#[derive(Debug, Clone)]
pub struct LoadedPlugin {
    path: PathBuf,
    manifest: ArtifactManifest,
    payloads: Vec<Vec<u8>>,
}

impl LoadedPlugin {
    /// Path the plugin was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity recorded in the manifest
    pub fn identity(&self) -> ModelIdentity {
        ModelIdentity::new(self.manifest.name.clone(), self.manifest.version.clone())
    }

    /// Compilation target
    pub fn target(&self) -> &str {
        &self.manifest.target
    }

    /// Resolved replace directives
    pub fn replace(&self) -> &[ReplaceDirective] {
        &self.manifest.replace
    }

    /// Full manifest
    pub fn manifest(&self) -> &ArtifactManifest {
        &self.manifest
    }

    /// Modules with their schema text, in declaration order
    pub fn modules(&self) -> impl Iterator<Item = (&ManifestModule, &str)> {
        self.manifest.modules.iter().zip(
            self.payloads
                .iter()
                .map(|p| std::str::from_utf8(p).unwrap_or_default()),
        )
    }

    /// Schema text of a module by name
    pub fn module_source(&self, name: &str) -> Option<&str> {
        self.modules()
            .find(|(module, _)| module.name == name)
            .map(|(_, source)| source)
    }
}

/// Loads bundle artifacts from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactLoader;

impl ArtifactLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load and verify an artifact
    ///
    /// Fails with `InvalidArtifact` when the header or a digest does not
    /// verify, or when the manifest identity does not own the file name.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn load(&self, path: impl AsRef<Path>) -> CompileResult<LoadedPlugin> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| CompileError::io(path, e))?;

        let (manifest, payloads) =
            format::decode(&data).map_err(|reason| CompileError::invalid_artifact(path, reason))?;

        let expected = artifact_file(&manifest.name, &manifest.version);
        let actual = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if actual != expected {
            return Err(CompileError::invalid_artifact(
                path,
                format!("manifest belongs to {} but file is named {}", expected, actual),
            ));
        }

        debug!("Loaded plugin with {} modules", payloads.len());
        Ok(LoadedPlugin {
            path: path.to_path_buf(),
            manifest,
            payloads,
        })
    }
}
