/// Workspace-scoped workflow REST endpoints
///
/// Every route carries the workspace id in its path and requires a bearer token.
/// Handlers only translate HTTP into `WorkflowGateway` calls; all access control
/// happens in the gateway.

use crate::{
    api::params::{parse_metadata_filters, parse_query_filters},
    error::GatewayError,
    service::WorkflowGateway,
    workflow::types::{
        BearerToken, CallerContext, SubmitWorkflowRequest, WorkflowId, WorkflowIdAndStatus, WorkflowLabels,
        WorkflowQueryResponse, WorkspaceId,
    },
};
use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::sync::Arc;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<WorkflowGateway>,
}

/// Create workflow routes
pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workspaces/{workspace_id}/workflows", post(submit_workflow))
        .route("/api/workspaces/{workspace_id}/workflows/query", get(query_workflows))
        .route("/api/workspaces/{workspace_id}/workflows/{id}/status", get(get_status))
        .route("/api/workspaces/{workspace_id}/workflows/{id}/labels", get(get_labels))
        .route("/api/workspaces/{workspace_id}/workflows/{id}/metadata", get(get_metadata))
}

/// Submit a workflow
///
/// POST /api/workspaces/{workspace_id}/workflows
/// Body: { "workflowSourceUri": "gs://...", "workflowOptions": { "jes_gcs_root": "gs://..." }, ... }
async fn submit_workflow(
    State(state): State<AppState>,
    Path(workspace_id): Path<WorkspaceId>,
    token: BearerToken,
    Json(request): Json<SubmitWorkflowRequest>,
) -> Result<(StatusCode, Json<WorkflowIdAndStatus>), GatewayError> {
    let caller = CallerContext::new(workspace_id, token);
    let accepted = state.gateway.submit_workflow(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(accepted)))
}

/// GET /api/workspaces/{workspace_id}/workflows/{id}/status
async fn get_status(
    State(state): State<AppState>,
    Path((workspace_id, id)): Path<(WorkspaceId, WorkflowId)>,
    token: BearerToken,
) -> Result<Json<WorkflowIdAndStatus>, GatewayError> {
    let caller = CallerContext::new(workspace_id, token);
    Ok(Json(state.gateway.get_workflow_status(&caller, &id).await?))
}

/// GET /api/workspaces/{workspace_id}/workflows/{id}/labels
async fn get_labels(
    State(state): State<AppState>,
    Path((workspace_id, id)): Path<(WorkspaceId, WorkflowId)>,
    token: BearerToken,
) -> Result<Json<WorkflowLabels>, GatewayError> {
    let caller = CallerContext::new(workspace_id, token);
    Ok(Json(state.gateway.get_workflow_labels(&caller, &id).await?))
}

/// GET /api/workspaces/{workspace_id}/workflows/{id}/metadata?includeKey=..&excludeKey=..&expandSubWorkflows=..
async fn get_metadata(
    State(state): State<AppState>,
    Path((workspace_id, id)): Path<(WorkspaceId, WorkflowId)>,
    RawQuery(query): RawQuery,
    token: BearerToken,
) -> Result<Json<Value>, GatewayError> {
    let filters = parse_metadata_filters(query.as_deref())?;
    let caller = CallerContext::new(workspace_id, token);
    Ok(Json(state.gateway.get_workflow_metadata(&caller, &id, &filters).await?))
}

/// GET /api/workspaces/{workspace_id}/workflows/query?status=..&name=..
async fn query_workflows(
    State(state): State<AppState>,
    Path(workspace_id): Path<WorkspaceId>,
    RawQuery(query): RawQuery,
    token: BearerToken,
) -> Result<Json<WorkflowQueryResponse>, GatewayError> {
    let filters = parse_query_filters(query.as_deref())?;
    let caller = CallerContext::new(workspace_id, token);
    Ok(Json(state.gateway.query_workflows(&caller, &filters).await?))
}
