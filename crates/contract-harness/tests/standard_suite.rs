//! Full standard suite against the in-memory provider

use contract_harness::{HarnessConfig, HarnessError, InstanceState, Operation, Suite};
use contract_test_utils::{
    init_tracing, setup_cloud, setup_standard_suite, test_config, Ec2Fixtures, FakeCloud,
    ManualTimer,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn standard_suite_passes() {
    init_tracing();
    let (suite, cloud, timer) = setup_standard_suite(test_config());

    let report = suite.run().await;

    assert!(report.passed(), "{}", report.generate_text());
    assert_eq!(report.outcomes.len(), 11);

    // Every launched machine goes out in one terminate request.
    let launched = cloud.launched();
    assert_eq!(launched.len(), 5);
    let cleanup = report.cleanup.as_ref().unwrap();
    assert_eq!(cleanup.requests, 1);
    assert_eq!(cleanup.terminated, launched);
    assert!(suite.registry().is_empty());

    // Settle delays plus the poll intervals of the lifecycle scenarios.
    assert!(timer.sleeps().contains(&Duration::from_secs(1)));
    assert!(timer.sleeps().contains(&Duration::from_secs(3)));
}

#[tokio::test]
async fn report_lists_every_scenario() {
    let (suite, _cloud, _timer) = setup_standard_suite(test_config());
    let report = suite.run().await;
    let text = report.generate_text();

    for name in suite.scenario_names() {
        assert!(text.contains(&format!("[PASS] {name}")), "{text}");
    }
    assert!(text.contains("terminated 5 resource(s) in 1 request(s)"));
    assert!(text.contains("Status: PASSED"));
}

#[tokio::test]
async fn non_batch_provider_gets_one_request_per_handle() {
    let config = test_config();
    let cloud = Arc::new(
        FakeCloud::with_known_instances(
            config.running_instance.clone(),
            config.stopped_instance.clone(),
        )
        .without_batch_terminate(),
    );
    let suite = Suite::standard(cloud.clone(), Arc::new(Ec2Fixtures::load()), config)
        .with_timer(Arc::new(ManualTimer::new()));

    let report = suite.run().await;

    assert!(report.passed(), "{}", report.generate_text());
    // One terminate comes from the terminate scenario itself.
    let cleanup_calls: Vec<_> = cloud.terminate_calls().into_iter().skip(1).collect();
    assert_eq!(cleanup_calls.len(), 5);
    assert!(cleanup_calls.iter().all(|ids| ids.len() == 1));
    assert_eq!(report.cleanup.unwrap().requests, 5);
}

#[tokio::test]
async fn failed_preflight_does_not_stop_the_run() {
    let config = test_config();
    let cloud = Arc::new(
        FakeCloud::new()
            .with_instance(config.running_instance.clone(), InstanceState::Running)
            .with_instance(config.stopped_instance.clone(), InstanceState::Running),
    );
    let suite = Suite::standard(cloud.clone(), Arc::new(Ec2Fixtures::load()), config)
        .with_timer(Arc::new(ManualTimer::new()));

    let report = suite.run().await;

    assert!(!report.passed());
    let preflight = report.outcome("environment has a stopped instance").unwrap();
    assert!(matches!(
        preflight.result,
        Err(HarnessError::StateMismatch { .. })
    ));
    assert!(report
        .outcome("create tags matches expected structure")
        .unwrap()
        .passed());
    assert!(report.cleanup.is_ok());
}

#[tokio::test]
async fn missing_known_instance_fails_preflight_with_query_error() {
    let config = HarnessConfig::new().with_known_instances("i-gone", "i-32ac1f8a");
    let cloud = setup_cloud(&test_config());
    let suite = Suite::standard(cloud, Arc::new(Ec2Fixtures::load()), config)
        .with_timer(Arc::new(ManualTimer::new()));

    let report = suite.run().await;

    match &report.outcome("environment has a running instance").unwrap().result {
        Err(HarnessError::Query(err)) => {
            assert_eq!(err.operation, Operation::DescribeInstances);
            assert_eq!(err.code.as_deref(), Some("InvalidInstanceID.NotFound"));
        }
        other => panic!("expected query error, got {other:?}"),
    }
    assert!(!report.passed());
    assert!(report.cleanup.is_ok());
}
