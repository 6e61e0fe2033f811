//! Compilation toolchains
//!
//! A [`Toolchain`] turns a [`CompileBundle`] into artifact bytes. It never
//! touches the filesystem location of the final artifact; the
//! [`PluginCompiler`](crate::PluginCompiler) owns placement.

use async_trait::async_trait;
use config_model_core::{ModelIdentity, ModelRecord, ModuleInfo, ReplaceDirective};
use std::collections::HashSet;
use tracing::{debug, instrument};

use crate::error::{CompileError, CompileResult};
use crate::format::{self, ArtifactManifest, ManifestModule};

/// Everything a toolchain needs to compile one model
#[derive(Debug, Clone, Copy)]
pub struct CompileBundle<'a> {
    pub identity: &'a ModelIdentity,
    pub target: &'a str,
    pub replace: &'a [ReplaceDirective],
    pub modules: &'a [ModuleInfo],
}

impl<'a> From<&'a ModelRecord> for CompileBundle<'a> {
    fn from(record: &'a ModelRecord) -> Self {
        Self {
            identity: &record.identity,
            target: &record.plugin.target,
            replace: &record.plugin.replace,
            modules: &record.modules,
        }
    }
}

/// Turns schema modules into an artifact
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Compile a bundle to artifact bytes
    ///
    /// Must be deterministic: equal bundles produce equal bytes.
    async fn compile(&self, bundle: &CompileBundle<'_>) -> CompileResult<Vec<u8>>;

    /// Short toolchain name for logs
    fn name(&self) -> &'static str;
}

/// Resolve replace directives in order
///
/// Each directive rewrites the current substitution of its source, so
/// `a => b` followed by `b => c` resolves `a` to `c`. Entries that resolve
/// back to themselves are dropped.
pub fn resolve_replaces(directives: &[ReplaceDirective]) -> CompileResult<Vec<ReplaceDirective>> {
    let mut resolved: Vec<ReplaceDirective> = Vec::new();

    for directive in directives {
        let source = directive.source.trim();
        let substitute = directive.substitute.trim();
        if source.is_empty() || substitute.is_empty() {
            return Err(CompileError::compile(format!(
                "replace directive '{}' has an empty side",
                directive
            )));
        }
        if source == substitute {
            return Err(CompileError::compile(format!(
                "replace directive '{}' substitutes a dependency for itself",
                directive
            )));
        }

        for entry in resolved.iter_mut() {
            if entry.substitute == source {
                entry.substitute = substitute.to_string();
            }
        }
        match resolved.iter_mut().find(|entry| entry.source == source) {
            Some(entry) => entry.substitute = substitute.to_string(),
            None => resolved.push(ReplaceDirective::new(source, substitute)),
        }
    }

    resolved.retain(|entry| entry.source != entry.substitute);
    Ok(resolved)
}

/// Built-in toolchain producing self-describing bundle artifacts
#[derive(Debug, Clone, Default)]
pub struct BundleToolchain {
    targets: Vec<String>,
}

impl BundleToolchain {
    /// Create a toolchain that accepts any target
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict accepted targets; an empty list accepts any target
    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        self.targets = targets;
        self
    }

    fn check_target(&self, target: &str) -> CompileResult<()> {
        if self.targets.is_empty() || self.targets.iter().any(|t| t == target) {
            Ok(())
        } else {
            Err(CompileError::compile(format!(
                "unsupported target '{}'; expected one of: {}",
                target,
                self.targets.join(", ")
            )))
        }
    }

    fn check_modules(modules: &[ModuleInfo]) -> CompileResult<()> {
        if modules.is_empty() {
            return Err(CompileError::compile("model has no modules"));
        }

        let mut seen = HashSet::new();
        for module in modules {
            if module.name.trim().is_empty() {
                return Err(CompileError::compile("module name cannot be empty"));
            }
            if module.version.trim().is_empty() {
                return Err(CompileError::compile(format!(
                    "module {} has no version",
                    module.name
                )));
            }
            if module.data.is_empty() {
                return Err(CompileError::compile(format!(
                    "module {}@{} has no content",
                    module.name, module.version
                )));
            }
            if std::str::from_utf8(&module.data).is_err() {
                return Err(CompileError::compile(format!(
                    "module {}@{} is not valid UTF-8 schema text",
                    module.name, module.version
                )));
            }
            if !seen.insert((module.name.as_str(), module.version.as_str())) {
                return Err(CompileError::compile(format!(
                    "module {}@{} is declared more than once",
                    module.name, module.version
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Toolchain for BundleToolchain {
    #[instrument(skip(self, bundle), fields(model = %bundle.identity))]
    async fn compile(&self, bundle: &CompileBundle<'_>) -> CompileResult<Vec<u8>> {
        self.check_target(bundle.target)?;
        Self::check_modules(bundle.modules)?;
        let replace = resolve_replaces(bundle.replace)?;

        let manifest = ArtifactManifest {
            name: bundle.identity.name.clone(),
            version: bundle.identity.version.clone(),
            target: bundle.target.to_string(),
            replace,
            modules: bundle
                .modules
                .iter()
                .map(|m| ManifestModule {
                    name: m.name.clone(),
                    organization: m.organization.clone(),
                    version: m.version.clone(),
                    size: m.data.len() as u64,
                    sha256: format::sha256_hex(&m.data),
                })
                .collect(),
        };
        let payloads: Vec<&[u8]> = bundle.modules.iter().map(|m| m.data.as_slice()).collect();

        let bytes = format::encode(&manifest, &payloads).map_err(CompileError::Compile)?;
        debug!("Bundle compiled: {} bytes", bytes.len());
        Ok(bytes)
    }

    fn name(&self) -> &'static str {
        "bundle"
    }
}
