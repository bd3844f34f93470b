/// Workspace and tenancy checks for single-workflow operations
///
/// Stateless: every operation re-validates, nothing is cached.

use crate::clients::{AccessDecision, ExecutionEngine, WorkspaceAccess};
use crate::error::{GatewayError, Result};
use crate::workflow::presets::WORKSPACE_ID_LABEL;
use crate::workflow::types::{CallerContext, LabelSet, WorkflowId};
use std::sync::Arc;

#[derive(Clone)]
pub struct AccessValidator {
    workspaces: Arc<dyn WorkspaceAccess>,
    engine: Arc<dyn ExecutionEngine>,
}

impl AccessValidator {
    pub fn new(workspaces: Arc<dyn WorkspaceAccess>, engine: Arc<dyn ExecutionEngine>) -> Self {
        Self { workspaces, engine }
    }

    /// Caller must be able to read the workspace. A missing workspace is
    /// reported the same way as a forbidden one.
    pub async fn check_workspace_read(&self, caller: &CallerContext) -> Result<()> {
        let decision = self
            .workspaces
            .check_read_access(&caller.workspace_id, &caller.token)
            .await?;
        match decision {
            AccessDecision::Granted => Ok(()),
            AccessDecision::Forbidden | AccessDecision::NotFound => {
                tracing::info!("🔒 Read access to workspace {} denied ({:?})", caller.workspace_id, decision);
                Err(GatewayError::Authorization {
                    workspace: caller.workspace_id,
                    action: "read",
                })
            }
        }
    }

    /// Workflow's `workspace-id` label must equal the caller's workspace.
    ///
    /// Any failure to fetch the labels is reported as a mismatch too, so a caller
    /// cannot tell a foreign workflow from an unreachable engine.
    pub async fn check_membership(&self, caller: &CallerContext, workflow: &WorkflowId) -> Result<LabelSet> {
        let mismatch = || GatewayError::TenancyMismatch {
            workflow: *workflow,
            workspace: caller.workspace_id,
        };

        let labels = match self.engine.labels(workflow).await {
            Ok(labels) => labels,
            Err(e) => {
                tracing::warn!("⚠️ Could not fetch labels for workflow {}: {}", workflow, e);
                return Err(mismatch());
            }
        };

        let expected = caller.workspace_id.to_string();
        match labels.get(WORKSPACE_ID_LABEL) {
            Some(bound) if *bound == expected => Ok(labels),
            bound => {
                tracing::info!(
                    "🔒 Workflow {} is bound to {:?}, not workspace {}",
                    workflow,
                    bound,
                    caller.workspace_id
                );
                Err(mismatch())
            }
        }
    }

    /// Both checks, workspace access first. Returns the workflow's labels.
    pub async fn validate(&self, caller: &CallerContext, workflow: &WorkflowId) -> Result<LabelSet> {
        self.check_workspace_read(caller).await?;
        self.check_membership(caller, workflow).await
    }
}
