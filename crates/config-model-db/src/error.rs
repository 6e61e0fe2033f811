//! Registry storage error types and conversions

use thiserror::Error;

/// Result type alias for registry storage operations
pub type DbResult<T> = Result<T, DbError>;

/// Registry storage errors
#[derive(Debug, Error)]
pub enum DbError {
    /// Database connection error
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Connection pool error
    #[error("Connection pool error: {0}")]
    Pool(String),

    /// SQL query error
    #[error("Query error: {0}")]
    Query(String),

    /// Database migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Model not found
    #[error("Model not found: {0}")]
    NotFound(String),

    /// Model already registered under the same name and version
    #[error("Model already exists: {name}@{version}")]
    AlreadyExists { name: String, version: String },

    /// Another model already owns the artifact file
    #[error("Artifact {file} is already owned by model {owner}")]
    ArtifactConflict { file: String, owner: String },

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Stored data could not be mapped back to domain types
    #[error("Invalid data format: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal registry error
    #[error("Internal registry error: {0}")]
    Internal(String),

    /// Domain error from core crate
    #[error("Domain error: {0}")]
    Domain(#[from] config_model_core::ModelError),
}

impl DbError {
    /// Check if this error is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }
}

/// Convert SQLx database errors to our error type
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound("No rows returned".to_string()),

            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                if db_err.is_unique_violation() {
                    DbError::UniqueViolation(message)
                } else if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
                    DbError::ConstraintViolation(message)
                } else {
                    DbError::Query(message)
                }
            }

            sqlx::Error::PoolTimedOut => DbError::Pool("Connection pool timeout".to_string()),

            sqlx::Error::PoolClosed => DbError::Pool("Connection pool closed".to_string()),

            sqlx::Error::Io(io_err) => DbError::Connection(format!("I/O error: {}", io_err)),

            sqlx::Error::Protocol(msg) => DbError::Connection(format!("Protocol error: {}", msg)),

            sqlx::Error::ColumnNotFound(col) => {
                DbError::InvalidData(format!("Column not found: {}", col))
            }

            sqlx::Error::Decode(msg) => DbError::Serialization(format!("Decode error: {}", msg)),

            sqlx::Error::Migrate(migrate_err) => DbError::Migration(format!("{}", migrate_err)),

            _ => DbError::Internal(format!("{}", err)),
        }
    }
}

/// Convert SQLx migration errors
impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(format!("{}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let not_found = DbError::NotFound("test".to_string());
        assert!(not_found.is_not_found());

        let exists = DbError::AlreadyExists {
            name: "device".to_string(),
            version: "1.0".to_string(),
        };
        assert!(!exists.is_not_found());

        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = DbError::NotFound("device@1.0".to_string());
        assert_eq!(err.to_string(), "Model not found: device@1.0");

        let err = DbError::AlreadyExists {
            name: "device".to_string(),
            version: "1.0".to_string(),
        };
        assert_eq!(err.to_string(), "Model already exists: device@1.0");
    }
}
