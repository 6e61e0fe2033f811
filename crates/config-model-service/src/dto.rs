//! Data Transfer Objects (DTOs) for service layer
//!
//! Request and response types used at the service boundary. Module data is
//! carried as base64 text in JSON.

use config_model_core::{ModelIdentity, ModelRecord, ModuleInfo, ReplaceDirective};
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Serde adapter encoding bytes as standard base64
pub mod base64_data {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| serde::de::Error::custom(format!("invalid base64 data: {}", e)))
    }
}

// ============================================================================
// Model DTOs
// ============================================================================

/// A schema module as exchanged with clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDto {
    /// Module name
    pub name: String,

    /// Publishing organization
    #[serde(default)]
    pub organization: String,

    /// Module revision
    pub version: String,

    /// Schema source, base64-encoded
    #[serde(with = "base64_data")]
    pub data: Vec<u8>,
}

impl From<ModuleInfo> for ModuleDto {
    fn from(module: ModuleInfo) -> Self {
        Self {
            name: module.name,
            organization: module.organization,
            version: module.version,
            data: module.data,
        }
    }
}

impl From<ModuleDto> for ModuleInfo {
    fn from(dto: ModuleDto) -> Self {
        ModuleInfo::new(dto.name, dto.organization, dto.version, dto.data)
    }
}

/// A registered model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDto {
    pub name: String,
    pub version: String,
    pub modules: Vec<ModuleDto>,
}

impl From<ModelRecord> for ModelDto {
    fn from(record: ModelRecord) -> Self {
        Self {
            name: record.identity.name.into(),
            version: record.identity.version.into(),
            modules: record.modules.into_iter().map(ModuleDto::from).collect(),
        }
    }
}

// ============================================================================
// Push DTOs
// ============================================================================

/// Request to compile and register a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushModelRequest {
    /// Model name
    pub name: String,

    /// Model version
    pub version: String,

    /// Schema modules in declaration order
    #[serde(default)]
    pub modules: Vec<ModuleDto>,

    /// Compilation target
    #[serde(default)]
    pub target: String,

    /// Replace directives in `<source> => <substitute>` form, applied in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replace: Vec<String>,
}

impl PushModelRequest {
    /// Validate the request and build the record it describes
    ///
    /// Only shape is checked here; whether the modules compile is up to the
    /// toolchain.
    pub fn into_record(self) -> ServiceResult<ModelRecord> {
        let identity = ModelIdentity::parse(&self.name, &self.version)?;
        let replace = self
            .replace
            .iter()
            .map(|r| r.parse::<ReplaceDirective>())
            .collect::<Result<Vec<_>, _>>()?;
        let modules = self.modules.into_iter().map(ModuleInfo::from).collect();
        Ok(ModelRecord::new(identity, modules, self.target, replace))
    }
}

/// Response from a successful push
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushModelResponse {}

// ============================================================================
// Get / List / Delete DTOs
// ============================================================================

/// Response carrying one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetModelResponse {
    pub model: ModelDto,
}

/// Response carrying all models
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListModelsResponse {
    pub models: Vec<ModelDto>,
}

/// Response from a successful delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteModelResponse {}

/// Parse a name/version pair taken from a request path
pub fn parse_identity(name: &str, version: &str) -> ServiceResult<ModelIdentity> {
    ModelIdentity::parse(name, version).map_err(ServiceError::from)
}

// ============================================================================
// Reconciliation DTOs
// ============================================================================

/// Outcome of a startup reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Temp files from interrupted writes that were deleted
    pub stale_temp_files: usize,

    /// Records whose missing artifact was rebuilt
    pub recompiled: Vec<String>,

    /// Records dropped because their artifact could not be rebuilt
    pub dropped: Vec<String>,

    /// Artifact files deleted because no record owned them
    pub orphans_removed: Vec<String>,
}

impl ReconcileReport {
    /// Whether the pass changed anything
    pub fn is_clean(&self) -> bool {
        self.stale_temp_files == 0
            && self.recompiled.is_empty()
            && self.dropped.is_empty()
            && self.orphans_removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_data_is_base64() {
        let dto = ModuleDto {
            name: "test1".to_string(),
            organization: "ONF".to_string(),
            version: "2018-02-20".to_string(),
            data: b"module test1 {}".to_vec(),
        };
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["data"], "bW9kdWxlIHRlc3QxIHt9");

        let back: ModuleDto = serde_json::from_value(json).unwrap();
        assert_eq!(back, dto);
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let json = r#"{"name":"test1","version":"1","data":"not base64!"}"#;
        assert!(serde_json::from_str::<ModuleDto>(json).is_err());
    }

    #[test]
    fn test_push_request_into_record() {
        let request: PushModelRequest = serde_json::from_str(
            r#"{
                "name": "testdevice",
                "version": "1.0.0",
                "modules": [{"name": "test1", "organization": "ONF", "version": "2018-02-20", "data": "bW9kdWxlIHRlc3QxIHt9"}],
                "target": "openconfig",
                "replace": ["github.com/a => ../a"]
            }"#,
        )
        .unwrap();

        let record = request.into_record().unwrap();
        assert_eq!(record.artifact_file(), "testdevice-1.0.0.so");
        assert_eq!(record.modules[0].data, b"module test1 {}".to_vec());
        assert_eq!(record.plugin.replace[0].substitute, "../a");
    }

    #[test]
    fn test_push_request_validation() {
        let request = PushModelRequest {
            name: "../evil".to_string(),
            version: "1.0".to_string(),
            modules: vec![],
            target: String::new(),
            replace: vec![],
        };
        assert!(matches!(request.into_record(), Err(ServiceError::InvalidInput(_))));

        let request = PushModelRequest {
            name: "device".to_string(),
            version: "1.0".to_string(),
            modules: vec![],
            target: String::new(),
            replace: vec!["missing-arrow".to_string()],
        };
        assert!(matches!(request.into_record(), Err(ServiceError::InvalidInput(_))));
    }
}
