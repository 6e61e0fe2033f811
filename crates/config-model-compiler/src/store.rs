//! Artifact directory management
//!
//! Artifacts are written to `.<file>.<uuid>.tmp` in the artifact directory and
//! renamed into place, so a reader sees either the previous file or the
//! complete new one. Callers that must decide before the rename can stage and
//! promote in two steps. Temp files left behind by a crash are hidden from
//! [`ArtifactStore::list`] and removed by [`ArtifactStore::remove_stale_temp_files`].

use config_model_core::ARTIFACT_EXTENSION;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{CompileError, CompileResult};

const TEMP_SUFFIX: &str = ".tmp";

/// Artifact bytes written under a temp name, awaiting promotion
#[derive(Debug)]
pub struct StagedArtifact {
    file: String,
    temp_path: PathBuf,
}

impl StagedArtifact {
    /// Final artifact file name
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Where the bytes currently live
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }
}

/// Directory holding one artifact file per model
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open a store, creating the directory if needed
    pub async fn open(dir: impl Into<PathBuf>) -> CompileResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CompileError::io(&dir, e))?;
        Ok(Self { dir })
    }

    /// Artifact directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of an artifact file
    pub fn path_for(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Write an artifact atomically and return its final path
    pub async fn write_atomic(&self, file: &str, data: &[u8]) -> CompileResult<PathBuf> {
        let staged = self.stage(file, data).await?;
        self.promote(staged).await
    }

    /// Write artifact bytes under a temp name in the artifact directory
    ///
    /// The artifact does not appear under `file` until [`ArtifactStore::promote`].
    pub async fn stage(&self, file: &str, data: &[u8]) -> CompileResult<StagedArtifact> {
        let temp_path = self.dir.join(format!(".{}.{}{}", file, Uuid::new_v4(), TEMP_SUFFIX));

        if let Err(e) = Self::write_file(&temp_path, data).await {
            Self::remove_temp(&temp_path).await;
            return Err(e);
        }

        Ok(StagedArtifact {
            file: file.to_string(),
            temp_path,
        })
    }

    /// Rename a staged artifact onto its final name
    pub async fn promote(&self, staged: StagedArtifact) -> CompileResult<PathBuf> {
        let final_path = self.path_for(&staged.file);
        if let Err(e) = tokio::fs::rename(&staged.temp_path, &final_path).await {
            Self::remove_temp(&staged.temp_path).await;
            return Err(CompileError::io(&final_path, e));
        }

        debug!("Artifact written to {}", final_path.display());
        Ok(final_path)
    }

    /// Delete a staged artifact without touching the final name
    pub async fn discard(&self, staged: StagedArtifact) {
        Self::remove_temp(&staged.temp_path).await;
    }

    async fn write_file(path: &Path, data: &[u8]) -> CompileResult<()> {
        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| CompileError::io(path, e))?;
        file.write_all(data)
            .await
            .map_err(|e| CompileError::io(path, e))?;
        file.sync_all().await.map_err(|e| CompileError::io(path, e))
    }

    async fn remove_temp(temp_path: &Path) {
        if let Err(e) = tokio::fs::remove_file(temp_path).await {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to remove temp file {}: {}", temp_path.display(), e);
            }
        }
    }

    /// Remove an artifact; returns `false` if it did not exist
    pub async fn remove(&self, file: &str) -> CompileResult<bool> {
        let path = self.path_for(file);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Artifact removed: {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CompileError::io(&path, e)),
        }
    }

    /// Check whether an artifact file exists
    pub async fn exists(&self, file: &str) -> CompileResult<bool> {
        let path = self.path_for(file);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| CompileError::io(&path, e))
    }

    /// Artifact file names in the directory, sorted
    pub async fn list(&self) -> CompileResult<Vec<String>> {
        let suffix = format!(".{}", ARTIFACT_EXTENSION);
        let mut files: Vec<String> = self
            .entries()
            .await?
            .into_iter()
            .filter(|name| !name.starts_with('.') && name.ends_with(&suffix))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Remove temp files left behind by interrupted writes
    pub async fn remove_stale_temp_files(&self) -> CompileResult<usize> {
        let mut removed = 0;
        for name in self.entries().await? {
            if name.starts_with('.') && name.ends_with(TEMP_SUFFIX) {
                let path = self.dir.join(&name);
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(CompileError::io(&path, e)),
                }
            }
        }
        if removed > 0 {
            debug!("Removed {} stale temp files", removed);
        }
        Ok(removed)
    }

    async fn entries(&self) -> CompileResult<Vec<String>> {
        let mut reader = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| CompileError::io(&self.dir, e))?;

        let mut names = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| CompileError::io(&self.dir, e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if let (true, Some(name)) = (is_file, entry.file_name().to_str()) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}
