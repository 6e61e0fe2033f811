//! External command toolchain
//!
//! Writes the bundle into a scratch directory and hands it to a configured
//! program. The program receives the bundle directory and the output path as
//! its two final arguments and must write the artifact to the output path.

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, instrument, warn};

use crate::error::{CompileError, CompileResult};
use crate::toolchain::{resolve_replaces, CompileBundle, Toolchain};
use config_model_core::ReplaceDirective;

/// Name of the bundle description written next to the module files
pub const BUNDLE_MANIFEST_FILE: &str = "bundle.json";

const OUTPUT_FILE: &str = "artifact.out";

#[derive(Serialize)]
struct BundleFile<'a> {
    name: &'a str,
    version: &'a str,
    target: &'a str,
    replace: Vec<ReplaceDirective>,
    modules: Vec<BundleModule<'a>>,
}

#[derive(Serialize)]
struct BundleModule<'a> {
    name: &'a str,
    organization: &'a str,
    version: &'a str,
    file: String,
}

/// Toolchain delegating to an external compiler process
#[derive(Debug, Clone)]
pub struct CommandToolchain {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandToolchain {
    /// Create a toolchain running `program` with leading `args`
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a command line such as `"/usr/bin/modelc --release"`
    pub fn from_command_line(command: &str) -> CompileResult<Self> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| CompileError::compile("toolchain command is empty"))?;
        Ok(Self::new(program, parts.map(str::to_string).collect()))
    }

    async fn write_bundle(dir: &Path, bundle: &CompileBundle<'_>) -> CompileResult<()> {
        let mut modules = Vec::with_capacity(bundle.modules.len());
        for (index, module) in bundle.modules.iter().enumerate() {
            let file = format!("module-{:03}.yang", index);
            let path = dir.join(&file);
            tokio::fs::write(&path, &module.data)
                .await
                .map_err(|e| CompileError::io(&path, e))?;
            modules.push(BundleModule {
                name: &module.name,
                organization: &module.organization,
                version: &module.version,
                file,
            });
        }

        let description = BundleFile {
            name: bundle.identity.name.as_str(),
            version: bundle.identity.version.as_str(),
            target: bundle.target,
            replace: resolve_replaces(bundle.replace)?,
            modules,
        };
        let json = serde_json::to_vec_pretty(&description)
            .map_err(|e| CompileError::compile(format!("bundle encoding failed: {}", e)))?;
        let path = dir.join(BUNDLE_MANIFEST_FILE);
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| CompileError::io(&path, e))
    }
}

#[async_trait]
impl Toolchain for CommandToolchain {
    #[instrument(skip(self, bundle), fields(model = %bundle.identity, program = %self.program.display()))]
    async fn compile(&self, bundle: &CompileBundle<'_>) -> CompileResult<Vec<u8>> {
        let scratch = tempfile::Builder::new()
            .prefix("config-model-")
            .tempdir()
            .map_err(|e| CompileError::io(std::env::temp_dir(), e))?;

        Self::write_bundle(scratch.path(), bundle).await?;
        let output_path = scratch.path().join(OUTPUT_FILE);

        debug!("Running external toolchain");
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(scratch.path())
            .arg(&output_path)
            .env("CONFIG_MODEL_NAME", bundle.identity.name.as_str())
            .env("CONFIG_MODEL_VERSION", bundle.identity.version.as_str())
            .env("CONFIG_MODEL_TARGET", bundle.target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CompileError::io(&self.program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "External toolchain failed");
            return Err(CompileError::compile(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let bytes = tokio::fs::read(&output_path)
            .await
            .map_err(|e| CompileError::io(&output_path, e))?;
        if bytes.is_empty() {
            return Err(CompileError::compile(format!(
                "{} produced an empty artifact",
                self.program.display()
            )));
        }
        Ok(bytes)
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use config_model_core::{ModelIdentity, ModelRecord, ModuleInfo};

    fn record() -> ModelRecord {
        ModelRecord::new(
            ModelIdentity::parse("device", "1.0.0").unwrap(),
            vec![ModuleInfo::new("test1", "ONF", "2018-02-20", b"module test1 {}".to_vec())],
            "",
            vec![],
        )
    }

    fn shell(script: &str) -> CommandToolchain {
        CommandToolchain::new("/bin/sh", vec!["-c".to_string(), script.to_string(), "sh".to_string()])
    }

    #[tokio::test]
    async fn test_command_output_becomes_artifact() {
        // $1 is the bundle directory, $2 the output path
        let toolchain = shell(r#"cat "$1/module-000.yang" > "$2""#);
        let rec = record();
        let bytes = toolchain.compile(&CompileBundle::from(&rec)).await.unwrap();
        assert_eq!(bytes, b"module test1 {}".to_vec());
    }

    #[tokio::test]
    async fn test_command_failure_is_compile_error() {
        let toolchain = shell("echo 'syntax error' >&2; exit 3");
        let rec = record();
        let err = toolchain.compile(&CompileBundle::from(&rec)).await.unwrap_err();
        assert!(err.is_compile());
        assert!(err.to_string().contains("syntax error"));
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let toolchain = CommandToolchain::new("/nonexistent/modelc", vec![]);
        let rec = record();
        let err = toolchain.compile(&CompileBundle::from(&rec)).await.unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_from_command_line() {
        let toolchain = CommandToolchain::from_command_line("/usr/bin/modelc --release").unwrap();
        assert_eq!(toolchain.program, PathBuf::from("/usr/bin/modelc"));
        assert_eq!(toolchain.args, vec!["--release".to_string()]);
        assert!(CommandToolchain::from_command_line("   ").is_err());
    }
}
