//! gRPC service implementation

use super::converters::status_from_service_error;
use super::proto::{self, config_model_registry_service_server::ConfigModelRegistryService};
use config_model_service::{PushModelRequest, ServiceRegistry};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, info, instrument, warn};

/// gRPC service implementation
#[derive(Clone)]
pub struct ConfigModelRegistryServiceImpl {
    services: Arc<ServiceRegistry>,
}

impl ConfigModelRegistryServiceImpl {
    /// Create a new gRPC service instance
    pub fn new(services: Arc<ServiceRegistry>) -> Self {
        Self { services }
    }
}

#[tonic::async_trait]
impl ConfigModelRegistryService for ConfigModelRegistryServiceImpl {
    #[instrument(skip(self, request))]
    async fn get_model(
        &self,
        request: Request<proto::GetModelRequest>,
    ) -> Result<Response<proto::GetModelResponse>, Status> {
        let req = request.into_inner();
        debug!("GetModel {}@{}", req.name, req.version);

        let response = self
            .services
            .models()
            .get_model(&req.name, &req.version)
            .await
            .map_err(status_from_service_error)?;

        Ok(Response::new(proto::GetModelResponse {
            model: Some(response.model.into()),
        }))
    }

    #[instrument(skip(self, _request))]
    async fn list_models(
        &self,
        _request: Request<proto::ListModelsRequest>,
    ) -> Result<Response<proto::ListModelsResponse>, Status> {
        let response = self
            .services
            .models()
            .list_models()
            .await
            .map_err(status_from_service_error)?;

        Ok(Response::new(proto::ListModelsResponse {
            models: response.models.into_iter().map(Into::into).collect(),
        }))
    }

    #[instrument(skip(self, request))]
    async fn push_model(
        &self,
        request: Request<proto::PushModelRequest>,
    ) -> Result<Response<proto::PushModelResponse>, Status> {
        let model = request
            .into_inner()
            .model
            .ok_or_else(|| Status::invalid_argument("Model is required"))?;
        info!("PushModel {}@{}", model.name, model.version);

        self.services
            .models()
            .push_model(PushModelRequest::from(model))
            .await
            .map_err(|e| {
                warn!("PushModel failed: {}", e);
                status_from_service_error(e)
            })?;

        Ok(Response::new(proto::PushModelResponse {}))
    }

    #[instrument(skip(self, request))]
    async fn delete_model(
        &self,
        request: Request<proto::DeleteModelRequest>,
    ) -> Result<Response<proto::DeleteModelResponse>, Status> {
        let req = request.into_inner();
        info!("DeleteModel {}@{}", req.name, req.version);

        self.services
            .models()
            .delete_model(&req.name, &req.version)
            .await
            .map_err(|e| {
                warn!("DeleteModel failed: {}", e);
                status_from_service_error(e)
            })?;

        Ok(Response::new(proto::DeleteModelResponse {}))
    }
}
