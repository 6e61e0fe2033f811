//! Test fixtures

use config_model_service::{ModuleDto, PushModelRequest};

/// A schema module with the given source text
pub fn module(name: &str, source: &str) -> ModuleDto {
    ModuleDto {
        name: name.to_string(),
        organization: "ONF".to_string(),
        version: "2018-02-20".to_string(),
        data: source.as_bytes().to_vec(),
    }
}

/// A push request for a model with a single module
pub fn push_request(name: &str, version: &str) -> PushModelRequest {
    PushModelRequest {
        name: name.to_string(),
        version: version.to_string(),
        modules: vec![module("test1", "module test1 {}")],
        target: String::new(),
        replace: vec![],
    }
}
