//! Error types for config model domain validation

use thiserror::Error;

/// Result type alias for domain operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while constructing or validating domain values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Model name is empty or contains characters outside the allowed set
    #[error("Invalid model name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Model version is empty or contains characters outside the allowed set
    #[error("Invalid model version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// Replace directive could not be parsed
    #[error("Invalid replace directive '{0}': expected '<source> => <substitute>'")]
    InvalidReplace(String),
}
