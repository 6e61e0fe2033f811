//! Core type definitions

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ModelError, Result};

/// Maximum length of a model name or version
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Names and versions end up in artifact file names, so they are restricted to
/// a character set that cannot escape the artifact directory or start a hidden file.
static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._+-]*$").expect("identifier pattern is valid"));

fn check_identifier(value: &str) -> std::result::Result<(), String> {
    if value.is_empty() {
        return Err("cannot be empty".to_string());
    }
    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(format!(
            "must be at most {} characters, got {}",
            MAX_IDENTIFIER_LENGTH,
            value.len()
        ));
    }
    if !IDENTIFIER_PATTERN.is_match(value) {
        return Err(
            "must start with an alphanumeric character and contain only [A-Za-z0-9._+-]"
                .to_string(),
        );
    }
    Ok(())
}

/// Name of a configuration model
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelName(String);

impl ModelName {
    /// Create a validated model name
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_identifier(&name).map_err(|reason| ModelError::InvalidName {
            name: name.clone(),
            reason,
        })?;
        Ok(Self(name))
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModelName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ModelName {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ModelName> for String {
    fn from(name: ModelName) -> Self {
        name.0
    }
}

/// Version of a configuration model
///
/// Versions are opaque strings: `1.0.0`, `2020-10-01` and `1.0.0+build.5` are all
/// accepted. No ordering beyond lexical ordering is implied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelVersion(String);

impl ModelVersion {
    /// Create a validated model version
    pub fn new(version: impl Into<String>) -> Result<Self> {
        let version = version.into();
        check_identifier(&version).map_err(|reason| ModelError::InvalidVersion {
            version: version.clone(),
            reason,
        })?;
        Ok(Self(version))
    }

    /// Get the version as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModelVersion {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ModelVersion {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ModelVersion> for String {
    fn from(version: ModelVersion) -> Self {
        version.0
    }
}

/// Unique key of a model in the registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelIdentity {
    /// Model name
    pub name: ModelName,
    /// Model version
    pub version: ModelVersion,
}

impl ModelIdentity {
    /// Create an identity from already validated parts
    pub fn new(name: ModelName, version: ModelVersion) -> Self {
        Self { name, version }
    }

    /// Parse and validate an identity from raw strings
    pub fn parse(name: &str, version: &str) -> Result<Self> {
        Ok(Self {
            name: ModelName::new(name)?,
            version: ModelVersion::new(version)?,
        })
    }

    /// File name of the compiled artifact for this identity
    pub fn artifact_file(&self) -> String {
        crate::plugin::artifact_file(&self.name, &self.version)
    }
}

impl fmt::Display for ModelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A schema module contributing to a model
///
/// The payload is opaque to the registry; only the compiler interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Module name
    pub name: String,
    /// Organization that publishes the module
    pub organization: String,
    /// Module revision
    pub version: String,
    /// Raw schema source
    #[serde(default)]
    pub data: Vec<u8>,
}

impl ModuleInfo {
    /// Create a module description
    pub fn new(
        name: impl Into<String>,
        organization: impl Into<String>,
        version: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            organization: organization.into(),
            version: version.into(),
            data: data.into(),
        }
    }
}
