//! Bundle artifact binary format
//!
//! Layout:
//! - Header: magic bytes `CMPL`, format version u8, manifest length u32 (LE)
//! - Manifest: JSON-encoded [`ArtifactManifest`]
//! - Payloads: module data, concatenated in manifest order
//! - Footer: SHA-256 of all preceding bytes

use config_model_core::{ModelName, ModelVersion, ReplaceDirective};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Magic bytes at the start of every bundle artifact
pub const ARTIFACT_MAGIC: [u8; 4] = *b"CMPL";

/// Current artifact format version
pub const ARTIFACT_FORMAT_VERSION: u8 = 1;

const HEADER_LEN: usize = ARTIFACT_MAGIC.len() + 1 + 4;
const DIGEST_LEN: usize = 32;

/// Module entry in an artifact manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestModule {
    pub name: String,
    pub organization: String,
    pub version: String,
    /// Payload length in bytes
    pub size: u64,
    /// Hex-encoded SHA-256 of the payload
    pub sha256: String,
}

/// Self-description embedded in each bundle artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub name: ModelName,
    pub version: ModelVersion,
    pub target: String,
    /// Replace directives after chained resolution
    pub replace: Vec<ReplaceDirective>,
    pub modules: Vec<ManifestModule>,
}

/// Hex-encoded SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Serialize a manifest and its payloads into artifact bytes
pub fn encode(manifest: &ArtifactManifest, payloads: &[&[u8]]) -> Result<Vec<u8>, String> {
    let manifest_bytes =
        serde_json::to_vec(manifest).map_err(|e| format!("manifest encoding failed: {}", e))?;
    let manifest_len = u32::try_from(manifest_bytes.len())
        .map_err(|_| "manifest exceeds 4 GiB".to_string())?;

    let payload_len: usize = payloads.iter().map(|p| p.len()).sum();
    let mut data =
        Vec::with_capacity(HEADER_LEN + manifest_bytes.len() + payload_len + DIGEST_LEN);

    data.extend_from_slice(&ARTIFACT_MAGIC);
    data.push(ARTIFACT_FORMAT_VERSION);
    data.extend_from_slice(&manifest_len.to_le_bytes());
    data.extend_from_slice(&manifest_bytes);
    for payload in payloads {
        data.extend_from_slice(payload);
    }

    let digest = Sha256::digest(&data);
    data.extend_from_slice(&digest);
    Ok(data)
}

/// Parse and verify artifact bytes
///
/// Returns the manifest and one payload per manifest module.
pub fn decode(data: &[u8]) -> Result<(ArtifactManifest, Vec<Vec<u8>>), String> {
    if data.len() < HEADER_LEN + DIGEST_LEN {
        return Err(format!("artifact too short: {} bytes", data.len()));
    }
    if data[..ARTIFACT_MAGIC.len()] != ARTIFACT_MAGIC {
        return Err("bad magic bytes".to_string());
    }
    let format_version = data[ARTIFACT_MAGIC.len()];
    if format_version != ARTIFACT_FORMAT_VERSION {
        return Err(format!("unsupported format version {}", format_version));
    }

    let (body, footer) = data.split_at(data.len() - DIGEST_LEN);
    if Sha256::digest(body).as_slice() != footer {
        return Err("digest mismatch".to_string());
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&body[ARTIFACT_MAGIC.len() + 1..HEADER_LEN]);
    let manifest_len = u32::from_le_bytes(len_bytes) as usize;
    let manifest_end = HEADER_LEN
        .checked_add(manifest_len)
        .filter(|end| *end <= body.len())
        .ok_or_else(|| "manifest length out of range".to_string())?;

    let manifest: ArtifactManifest = serde_json::from_slice(&body[HEADER_LEN..manifest_end])
        .map_err(|e| format!("invalid manifest: {}", e))?;

    let mut payloads = Vec::with_capacity(manifest.modules.len());
    let mut offset = manifest_end;
    for module in &manifest.modules {
        let end = usize::try_from(module.size)
            .ok()
            .and_then(|size| offset.checked_add(size))
            .filter(|end| *end <= body.len())
            .ok_or_else(|| format!("payload of module {} out of range", module.name))?;
        let payload = &body[offset..end];
        if sha256_hex(payload) != module.sha256 {
            return Err(format!("payload digest mismatch for module {}", module.name));
        }
        payloads.push(payload.to_vec());
        offset = end;
    }
    if offset != body.len() {
        return Err(format!("{} trailing bytes after payloads", body.len() - offset));
    }

    Ok((manifest, payloads))
}
