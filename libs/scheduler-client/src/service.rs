//! Collaborator interfaces behind the scheduler client.
//!
//! Implementations own their transport. The client only needs them to be
//! shareable across tasks once constructed.

use async_trait::async_trait;
use plfm_id::{HostName, InstanceUuid, ResourceProviderUuid};

use crate::error::ClientError;
use crate::types::{
    Aggregate, ComputeNode, Destinations, InstanceInfo, Inventory, RequestContext, RequestSpec,
};

/// Destination selection and scheduler state synchronization.
#[async_trait]
pub trait QueryService: Send + Sync + 'static {
    /// Pick hosts for the instances described by `spec`.
    async fn select_destinations(
        &self,
        context: &RequestContext,
        spec: &RequestSpec,
    ) -> Result<Destinations, ClientError>;

    /// Create or update the scheduler's copy of the given aggregates.
    async fn update_aggregates(
        &self,
        context: &RequestContext,
        aggregates: &[Aggregate],
    ) -> Result<(), ClientError>;

    async fn delete_aggregate(
        &self,
        context: &RequestContext,
        aggregate: &Aggregate,
    ) -> Result<(), ClientError>;

    /// Record instances now present on `host`.
    async fn update_instance_info(
        &self,
        context: &RequestContext,
        host: &HostName,
        instance_info: &InstanceInfo,
    ) -> Result<(), ClientError>;

    async fn delete_instance_info(
        &self,
        context: &RequestContext,
        host: &HostName,
        instance_uuid: InstanceUuid,
    ) -> Result<(), ClientError>;

    /// Send the complete set of instance UUIDs on `host` so the scheduler
    /// can reconcile its view.
    async fn sync_instance_info(
        &self,
        context: &RequestContext,
        host: &HostName,
        instance_uuids: &[InstanceUuid],
    ) -> Result<(), ClientError>;
}

/// Capacity and inventory reporting.
#[async_trait]
pub trait ReportService: Send + Sync + 'static {
    /// Replace the inventory of a resource provider.
    async fn set_inventory_for_provider(
        &self,
        provider_id: ResourceProviderUuid,
        provider_name: &str,
        inventory: &Inventory,
    ) -> Result<(), ClientError>;

    async fn update_compute_node(&self, node: &ComputeNode) -> Result<(), ClientError>;
}

/// Zero-argument construction of a collaborator.
///
/// Implementations read whatever they need (endpoints, credentials) from
/// their own configuration.
#[async_trait]
pub trait Connect: Sized + Send {
    async fn connect() -> Result<Self, ClientError>;
}
