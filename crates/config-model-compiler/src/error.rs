//! Compiler error types

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for compiler operations
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors raised while compiling, storing or loading artifacts
#[derive(Debug, Error)]
pub enum CompileError {
    /// Module content is invalid for the requested target
    #[error("Compile error: {0}")]
    Compile(String),

    /// Artifact directory could not be read or written
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file in the artifact directory is not a valid artifact
    #[error("Invalid artifact {}: {reason}", path.display())]
    InvalidArtifact { path: PathBuf, reason: String },
}

impl CompileError {
    /// Create a compile error
    pub fn compile(reason: impl Into<String>) -> Self {
        CompileError::Compile(reason.into())
    }

    /// Attach a path to an I/O error
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create an invalid artifact error
    pub fn invalid_artifact(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        CompileError::InvalidArtifact {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Check if this error was caused by module content
    pub fn is_compile(&self) -> bool {
        matches!(self, CompileError::Compile(_))
    }

    /// Check if this error came from the filesystem
    pub fn is_io(&self) -> bool {
        matches!(self, CompileError::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CompileError::compile("module test1 has no content");
        assert_eq!(err.to_string(), "Compile error: module test1 has no content");
        assert!(err.is_compile());

        let err = CompileError::io(
            "/var/lib/models/a-1.so",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.is_io());
        assert!(err.to_string().contains("/var/lib/models/a-1.so"));
    }
}
