//! Model records
//!
//! A `ModelRecord` is what the registry stores for each identity: the modules
//! as they were pushed plus the plugin descriptor used to compile them.

use serde::{Deserialize, Serialize};

use crate::plugin::{PluginDescriptor, ReplaceDirective};
use crate::types::{ModelIdentity, ModuleInfo};

/// Registry entry for a compiled model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Unique identity
    pub identity: ModelIdentity,
    /// Schema modules in declaration order
    pub modules: Vec<ModuleInfo>,
    /// Compilation descriptor
    pub plugin: PluginDescriptor,
}

impl ModelRecord {
    /// Build a record, deriving the plugin descriptor from the identity
    pub fn new(
        identity: ModelIdentity,
        modules: Vec<ModuleInfo>,
        target: impl Into<String>,
        replace: Vec<ReplaceDirective>,
    ) -> Self {
        let plugin = PluginDescriptor::new(
            identity.name.clone(),
            identity.version.clone(),
            target,
            replace,
        );
        Self {
            identity,
            modules,
            plugin,
        }
    }

    /// Artifact file name of this record
    pub fn artifact_file(&self) -> &str {
        &self.plugin.file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_preserves_module_order() {
        let identity = ModelIdentity::parse("device", "1.0.0").unwrap();
        let modules = vec![
            ModuleInfo::new("zeta", "acme", "2020-01-01", b"module zeta {}".to_vec()),
            ModuleInfo::new("alpha", "acme", "2020-01-01", b"module alpha {}".to_vec()),
        ];
        let record = ModelRecord::new(identity, modules, "", vec![]);
        assert_eq!(record.modules[0].name, "zeta");
        assert_eq!(record.modules[1].name, "alpha");
        assert_eq!(record.artifact_file(), "device-1.0.0.so");
    }
}
