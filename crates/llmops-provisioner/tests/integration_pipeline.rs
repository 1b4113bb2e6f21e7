//! Integration tests for the full Model → EndpointConfig → Endpoint pipeline.

mod common;

use common::{fixtures, TestProvisioner};
use llmops_provisioner::{
    DeploymentPipeline, DeploymentPlan, EndpointStatus, MemoryRegistry, Operation, ResourceKind,
};

fn pipeline(test: &TestProvisioner) -> DeploymentPipeline {
    DeploymentPipeline::new(
        test.provisioner.clone(),
        DeploymentPlan::from_config(&fixtures::deploy_config()),
    )
}

fn creates(test: &TestProvisioner) -> Vec<ResourceKind> {
    test.registry
        .operations()
        .unwrap()
        .into_iter()
        .filter_map(|op| match op {
            Operation::Create(kind, _) => Some(kind),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn run_provisions_in_dependency_order() {
    let test = TestProvisioner::new();

    let report = pipeline(&test).run().await.unwrap();

    assert_eq!(report.endpoint_name, "ep");
    assert_eq!(report.endpoint_status, EndpointStatus::InService);
    assert_eq!(
        report.stages.iter().map(|s| s.kind).collect::<Vec<_>>(),
        vec![
            ResourceKind::Model,
            ResourceKind::EndpointConfig,
            ResourceKind::Endpoint
        ]
    );
    assert!(report.stages.iter().all(|s| !s.replaced));
    assert_eq!(
        creates(&test),
        vec![
            ResourceKind::Model,
            ResourceKind::EndpointConfig,
            ResourceKind::Endpoint
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn rerun_replaces_every_resource() {
    let test = TestProvisioner::new();
    let pipeline = pipeline(&test);

    pipeline.run().await.unwrap();
    let report = pipeline.run().await.unwrap();

    assert!(report.stages.iter().all(|s| s.replaced));
    for kind in [
        ResourceKind::Model,
        ResourceKind::EndpointConfig,
        ResourceKind::Endpoint,
    ] {
        assert_eq!(test.registry.count(kind).unwrap(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn failed_endpoint_aborts_run() {
    let test = TestProvisioner::with_registry(
        MemoryRegistry::new()
            .with_endpoint_statuses(vec![EndpointStatus::Failed])
            .with_failure_reason("insufficient capacity"),
    );

    let err = pipeline(&test).run().await.unwrap_err();
    assert!(err.to_string().contains("insufficient capacity"));
    // Earlier stages are left in place.
    assert!(test.registry.contains(ResourceKind::Model, "m").unwrap());
    assert!(test
        .registry
        .contains(ResourceKind::EndpointConfig, "cfg")
        .unwrap());
}

#[tokio::test(start_paused = true)]
async fn teardown_removes_in_reverse_order() {
    let test = TestProvisioner::new();
    let pipeline = pipeline(&test);
    pipeline.run().await.unwrap();

    let report = pipeline.teardown().await.unwrap();

    assert_eq!(
        report.removed,
        vec![
            (ResourceKind::Endpoint, "ep".to_owned()),
            (ResourceKind::EndpointConfig, "cfg".to_owned()),
            (ResourceKind::Model, "m".to_owned()),
        ]
    );
    for kind in [
        ResourceKind::Model,
        ResourceKind::EndpointConfig,
        ResourceKind::Endpoint,
    ] {
        assert_eq!(test.registry.count(kind).unwrap(), 0);
    }
}

#[tokio::test]
async fn teardown_of_nothing_suppresses_not_found() {
    let test = TestProvisioner::new();
    let report = pipeline(&test).teardown().await.unwrap();
    assert!(report.removed.is_empty());
}

#[tokio::test(start_paused = true)]
async fn status_reports_absent_and_present() {
    let test = TestProvisioner::new();
    let pipeline = pipeline(&test);

    let before = pipeline.status().await.unwrap();
    assert!(before.resources.iter().all(|state| !state.exists()));
    assert_eq!(before.endpoint_status(), None);

    pipeline.run().await.unwrap();

    let after = pipeline.status().await.unwrap();
    assert!(after.resources.iter().all(|state| state.exists()));
    assert_eq!(after.endpoint_status(), Some(&EndpointStatus::InService));
}
