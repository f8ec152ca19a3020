//! Recording stub collaborators.
//!
//! Stubs are cheap clones over shared state, so a test can keep one clone
//! for assertions while the client owns the one its factory produced.

use std::collections::VecDeque;
use std::future::{ready, Ready};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use plfm_id::{HostName, InstanceUuid, ResourceProviderUuid};
use plfm_scheduler_client::{
    Aggregate, ClientError, ComputeNode, Connect, Destinations, InstanceInfo, Inventory,
    QueryService, ReportService, RequestContext, RequestSpec,
};
use tracing::debug;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared construction bookkeeping for a stub factory.
#[derive(Debug, Default)]
struct Construction {
    attempts: u32,
    failures_remaining: u32,
}

impl Construction {
    fn attempt(&mut self, service: &'static str) -> Result<(), ClientError> {
        self.attempts += 1;
        if self.failures_remaining > 0 {
            self.failures_remaining -= 1;
            return Err(ClientError::construction(
                service,
                format!("stub construction attempt {} failed", self.attempts),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Query Service
// =============================================================================

/// A call received by [`StubQueryService`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryCall {
    SelectDestinations {
        context: RequestContext,
        spec: RequestSpec,
    },
    UpdateAggregates {
        context: RequestContext,
        aggregates: Vec<Aggregate>,
    },
    DeleteAggregate {
        context: RequestContext,
        aggregate: Aggregate,
    },
    UpdateInstanceInfo {
        context: RequestContext,
        host: HostName,
        instance_info: InstanceInfo,
    },
    DeleteInstanceInfo {
        context: RequestContext,
        host: HostName,
        instance_uuid: InstanceUuid,
    },
    SyncInstanceInfo {
        context: RequestContext,
        host: HostName,
        instance_uuids: Vec<InstanceUuid>,
    },
}

#[derive(Debug, Default)]
struct QueryState {
    calls: Vec<QueryCall>,
    construction: Construction,
    select_outcomes: VecDeque<Result<Destinations, ClientError>>,
    select_fallback: Option<ClientError>,
    failure: Option<ClientError>,
}

/// Query service stub that records calls and replays scripted outcomes.
#[derive(Debug, Clone, Default)]
pub struct StubQueryService {
    state: Arc<Mutex<QueryState>>,
}

impl StubQueryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory yielding clones of this stub, counting each construction.
    pub fn factory(
        &self,
    ) -> impl Fn() -> Ready<Result<StubQueryService, ClientError>> + Send + Sync + 'static {
        let stub = self.clone();
        move || {
            let result = lock(&stub.state)
                .construction
                .attempt("scheduler-query")
                .map(|()| stub.clone());
            ready(result)
        }
    }

    /// Make the next `count` constructions fail.
    pub fn fail_constructions(&self, count: u32) -> &Self {
        lock(&self.state).construction.failures_remaining = count;
        self
    }

    pub fn construction_attempts(&self) -> u32 {
        lock(&self.state).construction.attempts
    }

    /// Queue the outcome of the next `select_destinations` call.
    pub fn push_select_outcome(&self, outcome: Result<Destinations, ClientError>) -> &Self {
        lock(&self.state).select_outcomes.push_back(outcome);
        self
    }

    /// Fail every `select_destinations` call once the queue is empty.
    pub fn always_fail_select(&self, error: ClientError) -> &Self {
        lock(&self.state).select_fallback = Some(error);
        self
    }

    /// Fail every call other than `select_destinations`.
    pub fn fail_with(&self, error: ClientError) -> &Self {
        lock(&self.state).failure = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<QueryCall> {
        lock(&self.state).calls.clone()
    }

    pub fn select_calls(&self) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|c| matches!(c, QueryCall::SelectDestinations { .. }))
            .count()
    }

    fn record(&self, call: QueryCall) -> Result<(), ClientError> {
        debug!(call = ?call, "[STUB] Query call");
        let mut state = lock(&self.state);
        state.calls.push(call);
        match &state.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl QueryService for StubQueryService {
    async fn select_destinations(
        &self,
        context: &RequestContext,
        spec: &RequestSpec,
    ) -> Result<Destinations, ClientError> {
        let mut state = lock(&self.state);
        state.calls.push(QueryCall::SelectDestinations {
            context: context.clone(),
            spec: spec.clone(),
        });
        debug!(attempt = state.calls.len(), "[STUB] select_destinations");

        match state.select_outcomes.pop_front() {
            Some(outcome) => outcome,
            None => match &state.select_fallback {
                Some(error) => Err(error.clone()),
                None => Ok(Vec::new()),
            },
        }
    }

    async fn update_aggregates(
        &self,
        context: &RequestContext,
        aggregates: &[Aggregate],
    ) -> Result<(), ClientError> {
        self.record(QueryCall::UpdateAggregates {
            context: context.clone(),
            aggregates: aggregates.to_vec(),
        })
    }

    async fn delete_aggregate(
        &self,
        context: &RequestContext,
        aggregate: &Aggregate,
    ) -> Result<(), ClientError> {
        self.record(QueryCall::DeleteAggregate {
            context: context.clone(),
            aggregate: aggregate.clone(),
        })
    }

    async fn update_instance_info(
        &self,
        context: &RequestContext,
        host: &HostName,
        instance_info: &InstanceInfo,
    ) -> Result<(), ClientError> {
        self.record(QueryCall::UpdateInstanceInfo {
            context: context.clone(),
            host: host.clone(),
            instance_info: instance_info.clone(),
        })
    }

    async fn delete_instance_info(
        &self,
        context: &RequestContext,
        host: &HostName,
        instance_uuid: InstanceUuid,
    ) -> Result<(), ClientError> {
        self.record(QueryCall::DeleteInstanceInfo {
            context: context.clone(),
            host: host.clone(),
            instance_uuid,
        })
    }

    async fn sync_instance_info(
        &self,
        context: &RequestContext,
        host: &HostName,
        instance_uuids: &[InstanceUuid],
    ) -> Result<(), ClientError> {
        self.record(QueryCall::SyncInstanceInfo {
            context: context.clone(),
            host: host.clone(),
            instance_uuids: instance_uuids.to_vec(),
        })
    }
}

#[async_trait]
impl Connect for StubQueryService {
    async fn connect() -> Result<Self, ClientError> {
        Ok(Self::new())
    }
}

// =============================================================================
// Report Service
// =============================================================================

/// A call received by [`StubReportService`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReportCall {
    SetInventoryForProvider {
        provider_id: ResourceProviderUuid,
        provider_name: String,
        inventory: Inventory,
    },
    UpdateComputeNode {
        node: ComputeNode,
    },
}

#[derive(Debug, Default)]
struct ReportState {
    calls: Vec<ReportCall>,
    construction: Construction,
    failure: Option<ClientError>,
}

/// Report service stub that records calls.
#[derive(Debug, Clone, Default)]
pub struct StubReportService {
    state: Arc<Mutex<ReportState>>,
}

impl StubReportService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory yielding clones of this stub, counting each construction.
    pub fn factory(
        &self,
    ) -> impl Fn() -> Ready<Result<StubReportService, ClientError>> + Send + Sync + 'static {
        let stub = self.clone();
        move || {
            let result = lock(&stub.state)
                .construction
                .attempt("scheduler-report")
                .map(|()| stub.clone());
            ready(result)
        }
    }

    pub fn fail_constructions(&self, count: u32) -> &Self {
        lock(&self.state).construction.failures_remaining = count;
        self
    }

    pub fn construction_attempts(&self) -> u32 {
        lock(&self.state).construction.attempts
    }

    /// Fail every call.
    pub fn fail_with(&self, error: ClientError) -> &Self {
        lock(&self.state).failure = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<ReportCall> {
        lock(&self.state).calls.clone()
    }

    fn record(&self, call: ReportCall) -> Result<(), ClientError> {
        debug!(call = ?call, "[STUB] Report call");
        let mut state = lock(&self.state);
        state.calls.push(call);
        match &state.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ReportService for StubReportService {
    async fn set_inventory_for_provider(
        &self,
        provider_id: ResourceProviderUuid,
        provider_name: &str,
        inventory: &Inventory,
    ) -> Result<(), ClientError> {
        self.record(ReportCall::SetInventoryForProvider {
            provider_id,
            provider_name: provider_name.to_string(),
            inventory: inventory.clone(),
        })
    }

    async fn update_compute_node(&self, node: &ComputeNode) -> Result<(), ClientError> {
        self.record(ReportCall::UpdateComputeNode { node: node.clone() })
    }
}

#[async_trait]
impl Connect for StubReportService {
    async fn connect() -> Result<Self, ClientError> {
        Ok(Self::new())
    }
}
