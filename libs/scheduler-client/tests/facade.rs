//! Integration tests for the scheduler client facade.
//!
//! Every test drives `SchedulerClient` against the recording stubs from
//! `plfm-testing` and checks:
//! 1. Collaborators are only constructed when first needed, and only once
//! 2. Arguments and results pass through unchanged
//! 3. `select_destinations` honors the retry policy

use std::sync::Arc;

use plfm_id::{InstanceUuid, ResourceProviderUuid};
use plfm_scheduler_client::{
    BackoffSchedule, ClientError, ConfigError, RetryPolicy, SchedulerClient,
    SchedulerClientConfig,
};
use plfm_testing::{
    fixtures, init_test_tracing, QueryCall, ReportCall, StubQueryService, StubReportService,
};
use rstest::rstest;

type TestClient = SchedulerClient<StubQueryService, StubReportService>;

fn retry_policy(max_attempts: u32) -> RetryPolicy<ClientError> {
    RetryPolicy::new(max_attempts, BackoffSchedule::none(), ClientError::is_retryable)
}

fn test_client(
    query: &StubQueryService,
    report: &StubReportService,
    max_attempts: u32,
) -> TestClient {
    init_test_tracing();
    SchedulerClient::with_factories(query.factory(), report.factory(), retry_policy(max_attempts))
}

// =============================================================================
// Lazy construction
// =============================================================================

#[tokio::test]
async fn test_collaborators_not_constructed_up_front() {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    let client = test_client(&query, &report, 3);

    assert!(!client.is_query_initialized());
    assert!(!client.is_report_initialized());
    assert_eq!(query.construction_attempts(), 0);
    assert_eq!(report.construction_attempts(), 0);
}

#[tokio::test]
async fn test_query_operations_leave_report_unconstructed() {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    let client = test_client(&query, &report, 3);
    let context = fixtures::context();

    client
        .update_aggregates(&context, &[fixtures::aggregate(1, "agg1", &["compute-01"])])
        .await
        .unwrap();
    client
        .sync_instance_info(&context, &fixtures::host("compute-01"), &[])
        .await
        .unwrap();

    assert!(client.is_query_initialized());
    assert!(!client.is_report_initialized());
    assert_eq!(query.construction_attempts(), 1);
    assert_eq!(report.construction_attempts(), 0);
}

#[tokio::test]
async fn test_report_operations_leave_query_unconstructed() {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    let client = test_client(&query, &report, 3);

    client
        .update_compute_node(&fixtures::compute_node("compute-01"))
        .await
        .unwrap();
    client
        .set_inventory_for_provider(ResourceProviderUuid::new(), "compute-01", &fixtures::inventory())
        .await
        .unwrap();

    assert!(client.is_report_initialized());
    assert!(!client.is_query_initialized());
    assert_eq!(report.construction_attempts(), 1);
    assert_eq!(query.construction_attempts(), 0);
}

#[tokio::test]
async fn test_collaborator_constructed_once_across_calls() {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    let client = test_client(&query, &report, 3);
    let context = fixtures::context();
    let host = fixtures::host("compute-01");

    for _ in 0..4 {
        client
            .delete_instance_info(&context, &host, InstanceUuid::new())
            .await
            .unwrap();
    }
    client
        .select_destinations(&context, &fixtures::request_spec())
        .await
        .unwrap();

    assert_eq!(query.construction_attempts(), 1);
    assert_eq!(query.calls().len(), 5);
}

#[tokio::test]
async fn test_failed_construction_retried_on_next_call() {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    query.fail_constructions(1);
    let client = test_client(&query, &report, 3);
    let context = fixtures::context();
    let aggregate = fixtures::aggregate(7, "agg7", &[]);

    let err = client.delete_aggregate(&context, &aggregate).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Construction {
            service: "scheduler-query",
            ..
        }
    ));
    assert!(!client.is_query_initialized());
    assert!(query.calls().is_empty());

    client.delete_aggregate(&context, &aggregate).await.unwrap();
    assert!(client.is_query_initialized());
    assert_eq!(query.construction_attempts(), 2);
    assert_eq!(query.calls().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_shares_one_collaborator() {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    let client = Arc::new(test_client(&query, &report, 3));

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..8 {
        let client = Arc::clone(&client);
        tasks.spawn(async move {
            let node = fixtures::compute_node(&format!("compute-{i:02}"));
            client.update_compute_node(&node).await
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    assert_eq!(report.construction_attempts(), 1);
    assert_eq!(report.calls().len(), 8);
}

#[tokio::test]
async fn test_zero_argument_construction_via_connect() {
    init_test_tracing();
    let client = TestClient::new();
    assert!(!client.is_report_initialized());
    assert_eq!(client.retry_policy().max_attempts(), 3);

    client
        .update_compute_node(&fixtures::compute_node("compute-01"))
        .await
        .unwrap();
    assert!(client.is_report_initialized());
}

#[tokio::test]
async fn test_from_config_uses_configured_attempts() {
    let config = SchedulerClientConfig {
        max_attempts: 5,
        retry_base_ms: 0,
        ..SchedulerClientConfig::default()
    };
    let client = TestClient::from_config(&config).unwrap();
    assert_eq!(client.retry_policy().max_attempts(), 5);
}

#[tokio::test]
async fn test_from_config_rejects_invalid_config() {
    let config: SchedulerClientConfig =
        serde_json::from_str(r#"{"retry_base_ms": 2000, "retry_max_ms": 500}"#).unwrap();
    let err = TestClient::from_config(&config).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid {
            key: "PLFM_SCHEDULER_RETRY_MAX_MS",
            ..
        }
    ));

    let config = SchedulerClientConfig {
        retry_jitter: 1.5,
        ..SchedulerClientConfig::default()
    };
    assert!(TestClient::from_config(&config).is_err());
}

// =============================================================================
// Forwarding
// =============================================================================

#[tokio::test]
async fn test_update_compute_node_forwards_exactly_once() {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    let client = test_client(&query, &report, 3);
    let node = fixtures::compute_node("compute-01");

    client.update_compute_node(&node).await.unwrap();

    assert_eq!(report.calls(), vec![ReportCall::UpdateComputeNode { node }]);
}

#[tokio::test]
async fn test_set_inventory_forwards_arguments() {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    let client = test_client(&query, &report, 3);
    let provider_id = ResourceProviderUuid::new();
    let inventory = fixtures::inventory();

    client
        .set_inventory_for_provider(provider_id, "compute-01.hv", &inventory)
        .await
        .unwrap();

    assert_eq!(
        report.calls(),
        vec![ReportCall::SetInventoryForProvider {
            provider_id,
            provider_name: "compute-01.hv".to_string(),
            inventory,
        }]
    );
}

#[tokio::test]
async fn test_query_operations_forward_arguments() {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    let client = test_client(&query, &report, 3);

    let context = fixtures::context();
    let host = fixtures::host("compute-02");
    let aggregates = vec![
        fixtures::aggregate(1, "gpu", &["compute-01", "compute-02"]),
        fixtures::aggregate(2, "ssd", &["compute-02"]),
    ];
    let info = fixtures::instance_info("compute-02", 2);
    let instance_uuid = InstanceUuid::new();
    let uuids: Vec<InstanceUuid> = info.records().iter().map(|r| r.uuid).collect();

    client.update_aggregates(&context, &aggregates).await.unwrap();
    client.delete_aggregate(&context, &aggregates[1]).await.unwrap();
    client
        .update_instance_info(&context, &host, &info)
        .await
        .unwrap();
    client
        .delete_instance_info(&context, &host, instance_uuid)
        .await
        .unwrap();
    client
        .sync_instance_info(&context, &host, &uuids)
        .await
        .unwrap();

    assert_eq!(
        query.calls(),
        vec![
            QueryCall::UpdateAggregates {
                context: context.clone(),
                aggregates: aggregates.clone(),
            },
            QueryCall::DeleteAggregate {
                context: context.clone(),
                aggregate: aggregates[1].clone(),
            },
            QueryCall::UpdateInstanceInfo {
                context: context.clone(),
                host: host.clone(),
                instance_info: info,
            },
            QueryCall::DeleteInstanceInfo {
                context: context.clone(),
                host: host.clone(),
                instance_uuid,
            },
            QueryCall::SyncInstanceInfo {
                context,
                host,
                instance_uuids: uuids,
            },
        ]
    );
}

/// Operations that forward without retrying.
#[derive(Debug, Clone, Copy)]
enum Forwarded {
    UpdateAggregates,
    DeleteAggregate,
    UpdateInstanceInfo,
    DeleteInstanceInfo,
    SyncInstanceInfo,
    SetInventory,
    UpdateComputeNode,
}

impl Forwarded {
    fn routed_to_report(self) -> bool {
        matches!(self, Forwarded::SetInventory | Forwarded::UpdateComputeNode)
    }

    async fn call(self, client: &TestClient) -> Result<(), ClientError> {
        let context = fixtures::context();
        let host = fixtures::host("compute-01");
        let aggregate = fixtures::aggregate(3, "agg3", &["compute-01"]);
        match self {
            Forwarded::UpdateAggregates => {
                client
                    .update_aggregates(&context, std::slice::from_ref(&aggregate))
                    .await
            }
            Forwarded::DeleteAggregate => client.delete_aggregate(&context, &aggregate).await,
            Forwarded::UpdateInstanceInfo => {
                client
                    .update_instance_info(&context, &host, &fixtures::instance_info("compute-01", 1))
                    .await
            }
            Forwarded::DeleteInstanceInfo => {
                client
                    .delete_instance_info(&context, &host, InstanceUuid::new())
                    .await
            }
            Forwarded::SyncInstanceInfo => {
                client
                    .sync_instance_info(&context, &host, &[InstanceUuid::new()])
                    .await
            }
            Forwarded::SetInventory => {
                client
                    .set_inventory_for_provider(
                        ResourceProviderUuid::new(),
                        "compute-01",
                        &fixtures::inventory(),
                    )
                    .await
            }
            Forwarded::UpdateComputeNode => {
                client
                    .update_compute_node(&fixtures::compute_node("compute-01"))
                    .await
            }
        }
    }
}

#[rstest]
#[case::update_aggregates(Forwarded::UpdateAggregates)]
#[case::delete_aggregate(Forwarded::DeleteAggregate)]
#[case::update_instance_info(Forwarded::UpdateInstanceInfo)]
#[case::delete_instance_info(Forwarded::DeleteInstanceInfo)]
#[case::sync_instance_info(Forwarded::SyncInstanceInfo)]
#[case::set_inventory_for_provider(Forwarded::SetInventory)]
#[case::update_compute_node(Forwarded::UpdateComputeNode)]
#[tokio::test]
async fn test_forwarded_error_returned_unchanged(#[case] operation: Forwarded) {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    // retryable, so a retry outside select_destinations would show up as extra calls
    let unavailable = ClientError::Unavailable("scheduler restarting".into());
    let rejected = ClientError::service("scheduler-report", "generation conflict");
    query.fail_with(unavailable.clone());
    report.fail_with(rejected.clone());
    let client = test_client(&query, &report, 3);

    let err = operation.call(&client).await.unwrap_err();

    if operation.routed_to_report() {
        assert_eq!(err, rejected);
        assert_eq!(report.calls().len(), 1);
        assert!(query.calls().is_empty());
    } else {
        assert_eq!(err, unavailable);
        assert_eq!(query.calls().len(), 1);
        assert!(report.calls().is_empty());
    }
}

// =============================================================================
// select_destinations retry
// =============================================================================

#[tokio::test]
async fn test_select_destinations_returns_first_success() {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    let expected = vec![vec![
        fixtures::selection("compute-01"),
        fixtures::selection("compute-02"),
    ]];
    query.push_select_outcome(Ok(expected.clone()));
    let client = test_client(&query, &report, 3);
    let context = fixtures::context();
    let spec = fixtures::request_spec();

    let destinations = client.select_destinations(&context, &spec).await.unwrap();

    assert_eq!(destinations, expected);
    assert_eq!(query.calls(), vec![QueryCall::SelectDestinations { context, spec }]);
}

#[tokio::test]
async fn test_select_destinations_succeeds_on_third_attempt() {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    let expected = vec![vec![fixtures::selection("compute-03")]];
    query
        .push_select_outcome(Err(ClientError::Timeout("attempt 1".into())))
        .push_select_outcome(Err(ClientError::Timeout("attempt 2".into())))
        .push_select_outcome(Ok(expected.clone()));
    let client = test_client(&query, &report, 3);

    let destinations = client
        .select_destinations(&fixtures::context(), &fixtures::request_spec())
        .await
        .unwrap();

    assert_eq!(destinations, expected);
    assert_eq!(query.select_calls(), 3);
    assert_eq!(query.construction_attempts(), 1);
}

#[tokio::test]
async fn test_select_destinations_exhausts_retries() {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    query.always_fail_select(ClientError::Timeout("no reply".into()));
    let client = test_client(&query, &report, 3);

    let err = client
        .select_destinations(&fixtures::context(), &fixtures::request_spec())
        .await
        .unwrap_err();

    match &err {
        ClientError::RetryExhausted {
            operation,
            attempts,
            last,
        } => {
            assert_eq!(*operation, "select_destinations");
            assert_eq!(*attempts, 3);
            assert_eq!(**last, ClientError::Timeout("no reply".into()));
        }
        other => panic!("expected RetryExhausted, got {other:?}"),
    }
    assert_eq!(query.select_calls(), 3);
}

#[tokio::test]
async fn test_select_destinations_fatal_error_not_retried() {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    let no_host = ClientError::NoValidHost("0 hosts passed filters".into());
    query.push_select_outcome(Err(no_host.clone()));
    let client = test_client(&query, &report, 3);

    let err = client
        .select_destinations(&fixtures::context(), &fixtures::request_spec())
        .await
        .unwrap_err();

    assert_eq!(err, no_host);
    assert_eq!(query.select_calls(), 1);
}

#[tokio::test]
async fn test_select_destinations_custom_predicate() {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    query
        .push_select_outcome(Err(ClientError::NoValidHost("racing claims".into())))
        .push_select_outcome(Ok(vec![vec![fixtures::selection("compute-04")]]));
    let policy = RetryPolicy::new(2, BackoffSchedule::none(), |e: &ClientError| {
        e.is_retryable() || matches!(e, ClientError::NoValidHost(_))
    });
    let client: TestClient =
        SchedulerClient::with_factories(query.factory(), report.factory(), policy);

    let destinations = client
        .select_destinations(&fixtures::context(), &fixtures::request_spec())
        .await
        .unwrap();

    assert_eq!(destinations[0][0].service_host.as_str(), "compute-04");
    assert_eq!(query.select_calls(), 2);
}

#[tokio::test]
async fn test_select_destinations_construction_failure_is_fatal_by_default() {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    query.fail_constructions(1);
    let client = test_client(&query, &report, 3);

    let err = client
        .select_destinations(&fixtures::context(), &fixtures::request_spec())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Construction { .. }));
    assert_eq!(query.construction_attempts(), 1);
    assert_eq!(query.select_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_select_destinations_waits_between_attempts() {
    let query = StubQueryService::new();
    let report = StubReportService::new();
    query.always_fail_select(ClientError::Unavailable("down".into()));
    let policy = RetryPolicy::new(
        3,
        BackoffSchedule::fixed(std::time::Duration::from_millis(500)),
        ClientError::is_retryable,
    );
    let client: TestClient =
        SchedulerClient::with_factories(query.factory(), report.factory(), policy);

    let start = tokio::time::Instant::now();
    let err = client
        .select_destinations(&fixtures::context(), &fixtures::request_spec())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::RetryExhausted { attempts: 3, .. }));
    assert!(start.elapsed() >= std::time::Duration::from_secs(1));
}
