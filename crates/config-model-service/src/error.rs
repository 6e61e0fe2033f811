//! Service-layer error types
//!
//! Maps registry, compiler and domain errors to the taxonomy reported to
//! callers.

use config_model_compiler::CompileError;
use config_model_core::ModelError;
use config_model_db::DbError;
use thiserror::Error;

/// Result type alias for service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Service-layer error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Model identity is not registered
    #[error("Model not found: {0}")]
    NotFound(String),

    /// Model identity (or its artifact file) is already registered
    #[error("Model already exists: {name}@{version}")]
    AlreadyExists { name: String, version: String },

    /// Module content was rejected by the toolchain
    #[error("Compile error: {0}")]
    Compile(String),

    /// Artifact could not be written or removed
    #[error("I/O error: {0}")]
    Io(String),

    /// Request is malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal service error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::AlreadyExists { .. } => "already_exists",
            ServiceError::Compile(_) => "compile_error",
            ServiceError::Io(_) => "io_error",
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::Internal(_) => "internal",
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(msg) => ServiceError::NotFound(msg),
            DbError::AlreadyExists { name, version } => {
                ServiceError::AlreadyExists { name, version }
            }
            // Identities never contain '@', so the owner splits unambiguously.
            DbError::ArtifactConflict { file, owner } => match owner.split_once('@') {
                Some((name, version)) => ServiceError::AlreadyExists {
                    name: name.to_string(),
                    version: version.to_string(),
                },
                None => ServiceError::Internal(format!(
                    "artifact {} owned by unparseable identity {}",
                    file, owner
                )),
            },
            DbError::Domain(err) => ServiceError::from(err),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<CompileError> for ServiceError {
    fn from(err: CompileError) -> Self {
        match err {
            CompileError::Compile(msg) => ServiceError::Compile(msg),
            err @ CompileError::Io { .. } => ServiceError::Io(err.to_string()),
            err @ CompileError::InvalidArtifact { .. } => ServiceError::Internal(err.to_string()),
        }
    }
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServiceError::Internal(format!("Operation task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_from_db_error() {
        let err: ServiceError = DbError::NotFound("foo@1.0".to_string()).into();
        assert_eq!(err, ServiceError::NotFound("foo@1.0".to_string()));

        let err: ServiceError = DbError::ArtifactConflict {
            file: "a-b-1.so".to_string(),
            owner: "a-b@1".to_string(),
        }
        .into();
        assert_eq!(
            err,
            ServiceError::AlreadyExists {
                name: "a-b".to_string(),
                version: "1".to_string()
            }
        );

        let err: ServiceError = DbError::Connection("gone".to_string()).into();
        assert_eq!(err.kind(), "internal");
    }

    #[test]
    fn test_service_error_from_compile_error() {
        let err: ServiceError = CompileError::compile("bad module").into();
        assert_eq!(err, ServiceError::Compile("bad module".to_string()));

        let err: ServiceError = CompileError::io(
            "/models/a-1.so",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        )
        .into();
        assert_eq!(err.kind(), "io_error");
    }

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::AlreadyExists {
            name: "foo".to_string(),
            version: "1.0".to_string(),
        };
        assert_eq!(err.to_string(), "Model already exists: foo@1.0");
    }
}
