mod common;

use common::*;
use flowgate::clients::{AccessDecision, WorkspaceRole};
use flowgate::workflow::types::MetadataFilters;
use flowgate::GatewayError;

fn harness() -> Harness {
    let h = Harness::new();
    h.workspaces.grant(W1, WorkspaceRole::Reader);
    h.workspaces.grant(W2, WorkspaceRole::Owner);
    h.engine.bind(WORKFLOW, W1);
    h
}

#[tokio::test]
async fn test_member_workflow_is_readable() {
    let h = harness();
    let id = workflow_id(WORKFLOW);

    let status = h.gateway.get_workflow_status(&caller(W1), &id).await.unwrap();
    assert_eq!(status.id, id);

    let labels = h.gateway.get_workflow_labels(&caller(W1), &id).await.unwrap();
    assert_eq!(labels.labels["workspace-id"], W1);

    let metadata = h
        .gateway
        .get_workflow_metadata(&caller(W1), &id, &MetadataFilters::default())
        .await
        .unwrap();
    assert_eq!(metadata["id"], WORKFLOW);
}

#[tokio::test]
async fn test_foreign_workspace_is_tenancy_mismatch() {
    let h = harness();
    let id = workflow_id(WORKFLOW);

    let err = h.gateway.get_workflow_status(&caller(W2), &id).await.unwrap_err();
    assert!(matches!(err, GatewayError::TenancyMismatch { .. }), "unexpected error: {err:?}");
    assert_eq!(err.status_code().as_u16(), 400);

    assert!(matches!(
        h.gateway.get_workflow_labels(&caller(W2), &id).await,
        Err(GatewayError::TenancyMismatch { .. })
    ));
    assert!(matches!(
        h.gateway
            .get_workflow_metadata(&caller(W2), &id, &MetadataFilters::default())
            .await,
        Err(GatewayError::TenancyMismatch { .. })
    ));
    assert!(h.engine.metadata_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_workflow_is_tenancy_mismatch() {
    let h = harness();
    let unknown = workflow_id("22222222-2222-2222-2222-222222222222");

    assert!(matches!(
        h.gateway.get_workflow_status(&caller(W1), &unknown).await,
        Err(GatewayError::TenancyMismatch { .. })
    ));
}

#[tokio::test]
async fn test_unreachable_labels_are_tenancy_mismatch() {
    let h = harness();
    *h.engine.labels_unreachable.lock().unwrap() = true;

    let err = h
        .gateway
        .get_workflow_status(&caller(W1), &workflow_id(WORKFLOW))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::TenancyMismatch { .. }), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_workflow_without_workspace_label_is_rejected() {
    let h = harness();
    let id = workflow_id(WORKFLOW);
    h.engine
        .labels
        .lock()
        .unwrap()
        .get_mut(&id)
        .unwrap()
        .remove("workspace-id");

    assert!(matches!(
        h.gateway.get_workflow_labels(&caller(W1), &id).await,
        Err(GatewayError::TenancyMismatch { .. })
    ));
}

#[tokio::test]
async fn test_forbidden_workspace_fails_before_membership() {
    let h = harness();
    h.workspaces.deny(W1, AccessDecision::Forbidden);
    // Labels would fail too; the workspace check must win
    *h.engine.labels_unreachable.lock().unwrap() = true;

    let err = h
        .gateway
        .get_workflow_status(&caller(W1), &workflow_id(WORKFLOW))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Authorization { .. }), "unexpected error: {err:?}");
    assert_eq!(err.status_code().as_u16(), 403);
}

#[tokio::test]
async fn test_missing_workspace_looks_forbidden() {
    let h = harness();
    let ghost = "cccccccc-cccc-cccc-cccc-cccccccccccc";

    let err = h
        .gateway
        .get_workflow_labels(&caller(ghost), &workflow_id(WORKFLOW))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Authorization { .. }));
}

#[tokio::test]
async fn test_validator_returns_bound_labels() {
    let h = harness();
    let labels = h
        .gateway
        .validator()
        .validate(&caller(W1), &workflow_id(WORKFLOW))
        .await
        .unwrap();
    assert_eq!(labels["user-email"], EMAIL);
}
