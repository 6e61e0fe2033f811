//! Plugin descriptors and artifact naming
//!
//! Every model compiles to exactly one artifact whose file name is derived
//! from the model identity alone. Nothing else about the model influences it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ModelError, Result};
use crate::types::{ModelName, ModelVersion};

/// File extension of compiled model artifacts
pub const ARTIFACT_EXTENSION: &str = "so";

/// Artifact file name for a model: `<name>-<version>.so`
pub fn artifact_file(name: &ModelName, version: &ModelVersion) -> String {
    format!("{}-{}.{}", name, version, ARTIFACT_EXTENSION)
}

/// Substitutes one dependency for another during compilation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplaceDirective {
    /// Dependency being replaced
    pub source: String,
    /// Dependency used in its place
    pub substitute: String,
}

impl ReplaceDirective {
    /// Create a new replace directive
    pub fn new(source: impl Into<String>, substitute: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            substitute: substitute.into(),
        }
    }
}

impl fmt::Display for ReplaceDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.source, self.substitute)
    }
}

impl FromStr for ReplaceDirective {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let (source, substitute) = s
            .split_once("=>")
            .ok_or_else(|| ModelError::InvalidReplace(s.to_string()))?;
        let source = source.trim();
        let substitute = substitute.trim();
        if source.is_empty() || substitute.is_empty() {
            return Err(ModelError::InvalidReplace(s.to_string()));
        }
        Ok(Self::new(source, substitute))
    }
}

/// Describes how a model is compiled and where its artifact lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Model name
    pub name: ModelName,
    /// Model version
    pub version: ModelVersion,
    /// Compilation target identifier
    #[serde(default)]
    pub target: String,
    /// Dependency substitutions, applied in order
    #[serde(default)]
    pub replace: Vec<ReplaceDirective>,
    /// Artifact file name, relative to the artifact directory
    pub file: String,
}

impl PluginDescriptor {
    /// Create a descriptor; the artifact file is derived from name and version
    pub fn new(
        name: ModelName,
        version: ModelVersion,
        target: impl Into<String>,
        replace: Vec<ReplaceDirective>,
    ) -> Self {
        let file = artifact_file(&name, &version);
        Self {
            name,
            version,
            target: target.into(),
            replace,
            file,
        }
    }
}
