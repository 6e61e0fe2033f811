//! Type converters between protobuf and service DTOs

use super::proto;
use config_model_service::{ModelDto, ModuleDto, PushModelRequest, ServiceError};
use tonic::Status;

impl From<ModuleDto> for proto::ConfigModule {
    fn from(module: ModuleDto) -> Self {
        Self {
            name: module.name,
            organization: module.organization,
            version: module.version,
            data: module.data,
        }
    }
}

impl From<proto::ConfigModule> for ModuleDto {
    fn from(module: proto::ConfigModule) -> Self {
        Self {
            name: module.name,
            organization: module.organization,
            version: module.version,
            data: module.data,
        }
    }
}

impl From<ModelDto> for proto::ConfigModel {
    fn from(model: ModelDto) -> Self {
        Self {
            name: model.name,
            version: model.version,
            modules: model.modules.into_iter().map(Into::into).collect(),
            target: String::new(),
            replace: Vec::new(),
        }
    }
}

impl From<proto::ConfigModel> for PushModelRequest {
    fn from(model: proto::ConfigModel) -> Self {
        Self {
            name: model.name,
            version: model.version,
            modules: model.modules.into_iter().map(Into::into).collect(),
            target: model.target,
            replace: model.replace,
        }
    }
}

/// Map a service error to a gRPC status
pub fn status_from_service_error(err: ServiceError) -> Status {
    let message = err.to_string();
    match err {
        ServiceError::NotFound(_) => Status::not_found(message),
        ServiceError::AlreadyExists { .. } => Status::already_exists(message),
        ServiceError::Compile(_) | ServiceError::InvalidInput(_) => {
            Status::invalid_argument(message)
        }
        ServiceError::Io(_) | ServiceError::Internal(_) => Status::internal(message),
    }
}
