//! exporter-portainer — the exporter's only network-facing component.
//!
//! Wraps the two Portainer calls the exporter needs:
//!
//! | Call | Resource |
//! |---|---|
//! | list endpoints | `GET /api/endpoints` |
//! | list containers | `GET /api/endpoints/{id}/docker/containers/json?all=true` |
//!
//! The [`PortainerApi`] trait is the seam the collector is generic over, so
//! collection logic can be exercised without a Portainer instance.

pub mod client;
pub mod error;
pub mod types;

use std::future::Future;

pub use client::PortainerClient;
pub use error::PortainerError;
pub use types::{ContainerDescriptor, Endpoint, EndpointId};

/// Source of endpoint and container listings.
pub trait PortainerApi: Send + Sync {
    /// List all registered endpoints (Docker hosts), in upstream order.
    fn list_endpoints(&self) -> impl Future<Output = Result<Vec<Endpoint>, PortainerError>> + Send;

    /// List every container on one endpoint, including stopped ones.
    fn list_containers(
        &self,
        endpoint_id: EndpointId,
    ) -> impl Future<Output = Result<Vec<ContainerDescriptor>, PortainerError>> + Send;
}
