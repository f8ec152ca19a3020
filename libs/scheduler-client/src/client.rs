//! The scheduler client facade.

use std::future::Future;

use plfm_id::{HostName, InstanceUuid, ResourceProviderUuid};
use plfm_retry::{RetryError, RetryPolicy};
use tracing::debug;

use crate::config::{ConfigError, SchedulerClientConfig};
use crate::error::ClientError;
use crate::lazy::LazyHandle;
use crate::service::{Connect, QueryService, ReportService};
use crate::types::{
    Aggregate, ComputeNode, Destinations, InstanceInfo, Inventory, RequestContext, RequestSpec,
};

const QUERY_SERVICE: &str = "scheduler-query";
const REPORT_SERVICE: &str = "scheduler-report";

/// Client library for placing calls to the scheduler.
///
/// Each collaborator is connected the first time an operation routed to it
/// runs, then reused for the life of the client.
pub struct SchedulerClient<Q, R> {
    query: LazyHandle<Q>,
    report: LazyHandle<R>,
    retry_policy: RetryPolicy<ClientError>,
}

impl<Q, R> SchedulerClient<Q, R>
where
    Q: QueryService + Connect,
    R: ReportService + Connect,
{
    /// Create a client with default retry settings. Nothing is connected yet.
    pub fn new() -> Self {
        Self::with_factories(
            || Q::connect(),
            || R::connect(),
            SchedulerClientConfig::default().retry_policy(),
        )
    }

    /// Create a client with retry settings from `config`, which is validated
    /// first.
    pub fn from_config(config: &SchedulerClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_factories(
            || Q::connect(),
            || R::connect(),
            config.retry_policy(),
        ))
    }
}

impl<Q, R> Default for SchedulerClient<Q, R>
where
    Q: QueryService + Connect,
    R: ReportService + Connect,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Q, R> SchedulerClient<Q, R>
where
    Q: QueryService,
    R: ReportService,
{
    /// Create a client whose collaborators are built by the given factories.
    pub fn with_factories<QF, QFut, RF, RFut>(
        query_factory: QF,
        report_factory: RF,
        retry_policy: RetryPolicy<ClientError>,
    ) -> Self
    where
        QF: Fn() -> QFut + Send + Sync + 'static,
        QFut: Future<Output = Result<Q, ClientError>> + Send + 'static,
        RF: Fn() -> RFut + Send + Sync + 'static,
        RFut: Future<Output = Result<R, ClientError>> + Send + 'static,
    {
        Self {
            query: LazyHandle::new(QUERY_SERVICE, query_factory),
            report: LazyHandle::new(REPORT_SERVICE, report_factory),
            retry_policy,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy<ClientError> {
        &self.retry_policy
    }

    pub fn is_query_initialized(&self) -> bool {
        self.query.is_initialized()
    }

    pub fn is_report_initialized(&self) -> bool {
        self.report.is_initialized()
    }

    /// Ask the scheduler for destinations, retrying transient failures.
    ///
    /// Fatal errors are returned as the collaborator produced them. When
    /// every attempt fails with a retryable error the result is
    /// [`ClientError::RetryExhausted`] wrapping the last one.
    pub async fn select_destinations(
        &self,
        context: &RequestContext,
        spec: &RequestSpec,
    ) -> Result<Destinations, ClientError> {
        debug!(
            request_id = %context.request_id,
            instance_uuid = %spec.instance_uuid,
            num_instances = spec.num_instances,
            "Selecting destinations"
        );

        let query = &self.query;
        self.retry_policy
            .run("select_destinations", move || async move {
                query.instance().await?.select_destinations(context, spec).await
            })
            .await
            .map_err(|e| match e {
                RetryError::Fatal(error) => error,
                RetryError::Exhausted { attempts, last } => ClientError::RetryExhausted {
                    operation: "select_destinations",
                    attempts,
                    last: Box::new(last),
                },
            })
    }

    pub async fn update_aggregates(
        &self,
        context: &RequestContext,
        aggregates: &[Aggregate],
    ) -> Result<(), ClientError> {
        debug!(
            request_id = %context.request_id,
            aggregate_count = aggregates.len(),
            "Updating aggregates"
        );
        self.query
            .instance()
            .await?
            .update_aggregates(context, aggregates)
            .await
    }

    pub async fn delete_aggregate(
        &self,
        context: &RequestContext,
        aggregate: &Aggregate,
    ) -> Result<(), ClientError> {
        debug!(
            request_id = %context.request_id,
            aggregate_uuid = %aggregate.uuid,
            "Deleting aggregate"
        );
        self.query
            .instance()
            .await?
            .delete_aggregate(context, aggregate)
            .await
    }

    pub async fn update_instance_info(
        &self,
        context: &RequestContext,
        host: &HostName,
        instance_info: &InstanceInfo,
    ) -> Result<(), ClientError> {
        debug!(
            request_id = %context.request_id,
            host = %host,
            instance_count = instance_info.records().len(),
            "Updating instance info"
        );
        self.query
            .instance()
            .await?
            .update_instance_info(context, host, instance_info)
            .await
    }

    pub async fn delete_instance_info(
        &self,
        context: &RequestContext,
        host: &HostName,
        instance_uuid: InstanceUuid,
    ) -> Result<(), ClientError> {
        debug!(
            request_id = %context.request_id,
            host = %host,
            instance_uuid = %instance_uuid,
            "Deleting instance info"
        );
        self.query
            .instance()
            .await?
            .delete_instance_info(context, host, instance_uuid)
            .await
    }

    pub async fn sync_instance_info(
        &self,
        context: &RequestContext,
        host: &HostName,
        instance_uuids: &[InstanceUuid],
    ) -> Result<(), ClientError> {
        debug!(
            request_id = %context.request_id,
            host = %host,
            instance_count = instance_uuids.len(),
            "Syncing instance info"
        );
        self.query
            .instance()
            .await?
            .sync_instance_info(context, host, instance_uuids)
            .await
    }

    pub async fn set_inventory_for_provider(
        &self,
        provider_id: ResourceProviderUuid,
        provider_name: &str,
        inventory: &Inventory,
    ) -> Result<(), ClientError> {
        debug!(
            provider_id = %provider_id,
            provider_name,
            resource_classes = inventory.len(),
            "Setting provider inventory"
        );
        self.report
            .instance()
            .await?
            .set_inventory_for_provider(provider_id, provider_name, inventory)
            .await
    }

    pub async fn update_compute_node(&self, node: &ComputeNode) -> Result<(), ClientError> {
        debug!(
            compute_node_uuid = %node.uuid,
            host = %node.host,
            "Updating compute node"
        );
        self.report.instance().await?.update_compute_node(node).await
    }
}

impl<Q, R> std::fmt::Debug for SchedulerClient<Q, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerClient")
            .field("query", &self.query)
            .field("report", &self.report)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}
