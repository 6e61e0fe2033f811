//! gRPC API implementation
//!
//! Tonic adapter exposing the same four model operations as the REST API.
//! Only built with the `grpc` feature.

pub mod converters;
pub mod service;

// Include the generated protobuf code
pub mod proto {
    tonic::include_proto!("configmodel.v1");
}

pub use proto::config_model_registry_service_server::{
    ConfigModelRegistryService, ConfigModelRegistryServiceServer,
};
pub use service::ConfigModelRegistryServiceImpl;

use std::future::Future;
use std::net::SocketAddr;
use tonic::transport::Server;

/// Build a gRPC server with the registry service
pub fn build_grpc_server(
    service: ConfigModelRegistryServiceImpl,
) -> tonic::transport::server::Router {
    Server::builder().add_service(ConfigModelRegistryServiceServer::new(service))
}

/// Serve the gRPC server on the specified address until `shutdown` resolves
pub async fn serve_grpc<F>(
    addr: SocketAddr,
    service: ConfigModelRegistryServiceImpl,
    shutdown: F,
) -> Result<(), tonic::transport::Error>
where
    F: Future<Output = ()>,
{
    build_grpc_server(service)
        .serve_with_shutdown(addr, shutdown)
        .await
}
