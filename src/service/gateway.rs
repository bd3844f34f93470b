/// Workflow gateway: submission orchestration and gated reads
///
/// `WorkflowGateway` is a stateless facade. Each call validates the caller,
/// talks to the collaborators it needs and returns; the only local state is the
/// scratch arena of a submission, which is released before `submit_workflow`
/// returns on every path.

use crate::clients::{
    EngineSubmission, ExecutionEngine, IdentityService, ObjectStorage, WorkflowSource, WorkspaceAccess,
    WorkspaceRole,
};
use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::service::access::AccessValidator;
use crate::staging::{archive_dependencies, DependencyResolver, ScratchArena};
use crate::workflow::presets::{self, PresetContext};
use crate::workflow::types::{
    CallerContext, LabelSet, MetadataFilters, ObjectLocator, OptionSet, QueryFilters, SubmitWorkflowRequest,
    WorkflowId, WorkflowIdAndStatus, WorkflowLabels, WorkflowQueryResponse,
};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_WORKFLOW_TYPE: &str = "WDL";
pub const DEFAULT_WORKFLOW_TYPE_VERSION: &str = "1.0";

/// External collaborators the gateway delegates to
#[derive(Clone)]
pub struct Collaborators {
    pub workspaces: Arc<dyn WorkspaceAccess>,
    pub identity: Arc<dyn IdentityService>,
    pub storage: Arc<dyn ObjectStorage>,
    pub engine: Arc<dyn ExecutionEngine>,
}

/// Local settings for assembling submissions
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Root for every scratch file/directory of a submission
    pub scratch_dir: PathBuf,
    pub default_runtime_attributes: Value,
}

impl GatewaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scratch_dir: config.staging.scratch_dir.clone(),
            default_runtime_attributes: config.submission.default_runtime_attributes.clone(),
        }
    }
}

/// Where the main source document comes from, after validation
#[derive(Debug, Clone)]
enum SourceRef {
    Storage(ObjectLocator),
    Url(String),
}

/// A submission request that passed caller-input validation
#[derive(Debug)]
struct SubmissionPlan {
    source: SourceRef,
    inputs: Option<Value>,
    options: OptionSet,
    labels: LabelSet,
    workflow_type: String,
    workflow_type_version: String,
    requested_id: Option<WorkflowId>,
}

impl SubmissionPlan {
    /// Pure validation: no external calls, no scratch allocation
    fn from_request(request: SubmitWorkflowRequest) -> Result<Self> {
        let source = match (request.workflow_source_uri, request.workflow_url) {
            (Some(uri), _) => SourceRef::Storage(
                ObjectLocator::parse(&uri)
                    .ok_or_else(|| GatewayError::CallerInput(format!("invalid storage locator: {}", uri)))?,
            ),
            (None, Some(url)) if !url.trim().is_empty() => SourceRef::Url(url),
            _ => {
                return Err(GatewayError::CallerInput(
                    "a workflow source locator or workflow URL is required".to_string(),
                ))
            }
        };

        let options = request.workflow_options.unwrap_or_default();
        if presets::root_bucket(&options).is_none() {
            return Err(GatewayError::CallerInput(format!(
                "workflow options must contain {}",
                presets::ROOT_BUCKET_OPTION
            )));
        }

        Ok(Self {
            source,
            inputs: request.workflow_inputs,
            options,
            labels: request.labels.unwrap_or_default(),
            workflow_type: request
                .workflow_type
                .unwrap_or_else(|| DEFAULT_WORKFLOW_TYPE.to_string()),
            workflow_type_version: request
                .workflow_type_version
                .unwrap_or_else(|| DEFAULT_WORKFLOW_TYPE_VERSION.to_string()),
            requested_id: request.requested_workflow_id,
        })
    }
}

#[derive(Clone)]
pub struct WorkflowGateway {
    collaborators: Collaborators,
    validator: AccessValidator,
    resolver: DependencyResolver,
    settings: GatewaySettings,
}

impl WorkflowGateway {
    pub fn new(collaborators: Collaborators, settings: GatewaySettings) -> Self {
        let validator = AccessValidator::new(collaborators.workspaces.clone(), collaborators.engine.clone());
        let resolver = DependencyResolver::new(collaborators.storage.clone());
        Self {
            collaborators,
            validator,
            resolver,
            settings,
        }
    }

    pub fn validator(&self) -> &AccessValidator {
        &self.validator
    }

    /// Build a complete submission bundle and forward it to the engine
    pub async fn submit_workflow(
        &self,
        caller: &CallerContext,
        request: SubmitWorkflowRequest,
    ) -> Result<WorkflowIdAndStatus> {
        let plan = SubmissionPlan::from_request(request)?;
        // A refused workspace lookup must surface as Authorization, not as a failed role fetch
        self.validator.check_workspace_read(caller).await?;
        self.require_role(caller, WorkspaceRole::Writer).await?;

        let preset = self.resolve_presets(caller, &plan).await?;

        let mut arena = ScratchArena::new(&self.settings.scratch_dir);
        let outcome = self.stage_and_submit(&mut arena, plan, &preset).await;
        arena.release_all();

        match &outcome {
            Ok(accepted) => tracing::info!(
                "🚀 Submitted workflow {} ({:?}) for workspace {}",
                accepted.id,
                accepted.status,
                caller.workspace_id
            ),
            Err(e) if e.is_server_error() => {
                tracing::error!("❌ Submission for workspace {} failed: {}", caller.workspace_id, e)
            }
            Err(e) => tracing::info!("🚫 Submission for workspace {} rejected: {}", caller.workspace_id, e),
        }
        outcome
    }

    pub async fn get_workflow_status(&self, caller: &CallerContext, id: &WorkflowId) -> Result<WorkflowIdAndStatus> {
        self.validator.validate(caller, id).await?;
        Ok(self.collaborators.engine.status(id).await?)
    }

    pub async fn get_workflow_labels(&self, caller: &CallerContext, id: &WorkflowId) -> Result<WorkflowLabels> {
        let labels = self.validator.validate(caller, id).await?;
        Ok(WorkflowLabels { id: *id, labels })
    }

    pub async fn get_workflow_metadata(
        &self,
        caller: &CallerContext,
        id: &WorkflowId,
        filters: &MetadataFilters,
    ) -> Result<Value> {
        self.validator.validate(caller, id).await?;
        Ok(self.collaborators.engine.metadata(id, filters).await?)
    }

    /// Query the engine, always scoped to the caller's workspace label
    pub async fn query_workflows(
        &self,
        caller: &CallerContext,
        filters: &QueryFilters,
    ) -> Result<WorkflowQueryResponse> {
        self.validator.check_workspace_read(caller).await?;

        let mut params = filters.to_engine_params();
        params.push((
            "label".to_string(),
            presets::workspace_label_filter(&caller.workspace_id),
        ));
        tracing::debug!("🔎 Querying workflows for workspace {}", caller.workspace_id);
        Ok(self.collaborators.engine.query(&params).await?)
    }

    async fn require_role(&self, caller: &CallerContext, minimum: WorkspaceRole) -> Result<()> {
        let role = self
            .collaborators
            .workspaces
            .highest_role(&caller.workspace_id, &caller.token)
            .await?;
        if role < minimum {
            tracing::info!(
                "🔒 {:?} role in workspace {} cannot submit workflows",
                role,
                caller.workspace_id
            );
            return Err(GatewayError::Authorization {
                workspace: caller.workspace_id,
                action: "submit workflows to",
            });
        }
        Ok(())
    }

    /// Everything externally resolved that the preset injector needs
    async fn resolve_presets(&self, caller: &CallerContext, plan: &SubmissionPlan) -> Result<PresetContext> {
        let c = &self.collaborators;
        let user_email = c.identity.caller_email(&caller.token).await?;
        let project = c.workspaces.project_context(&caller.workspace_id, &caller.token).await?;
        let service_account_key = c
            .identity
            .service_identity_key(&project.project_id, &user_email)
            .await?;
        let compute_service_account = c.identity.service_identity(&project.project_id, &caller.token).await?;

        Ok(PresetContext {
            workspace_id: caller.workspace_id,
            user_email,
            project_id: project.project_id,
            service_account_key,
            compute_service_account,
            source: match &plan.source {
                SourceRef::Storage(locator) => Some(locator.clone()),
                SourceRef::Url(_) => None,
            },
            default_runtime_attributes: self.settings.default_runtime_attributes.clone(),
        })
    }

    async fn stage_and_submit(
        &self,
        arena: &mut ScratchArena,
        plan: SubmissionPlan,
        preset: &PresetContext,
    ) -> Result<WorkflowIdAndStatus> {
        let inputs_path = arena.file("workflow-inputs-")?;
        let options_path = arena.file("workflow-options-")?;
        let labels_path = arena.file("workflow-labels-")?;
        let source_path = arena.file("workflow-source-")?;
        let staging_dir = arena.directory("workflow-deps-")?;
        let archive_path = arena.file("workflow-deps-archive-")?;

        let inputs = match &plan.inputs {
            Some(inputs) => {
                write_json(&inputs_path, inputs).await?;
                Some(inputs_path)
            }
            None => None,
        };

        // Last mutation of the caller's sets before they hit disk
        let options = presets::finalize_options(plan.options, preset);
        let labels = presets::finalize_labels(plan.labels, preset);
        write_json(&options_path, &options).await?;
        write_json(&labels_path, &labels).await?;

        let (source, dependencies) = match plan.source {
            SourceRef::Storage(locator) => {
                let document = self
                    .collaborators
                    .storage
                    .read_object(&locator)
                    .await
                    .map_err(GatewayError::Storage)?;
                tokio::fs::write(&source_path, document).await?;

                let has_dependencies = self
                    .resolver
                    .download_dependencies_if_exist(&source_path, &locator, &staging_dir)
                    .await?;
                let dependencies = if has_dependencies {
                    archive_dependencies(&staging_dir, &archive_path).await?;
                    Some(archive_path)
                } else {
                    None
                };
                (WorkflowSource::File(source_path), dependencies)
            }
            SourceRef::Url(url) => (WorkflowSource::Url(url), None),
        };

        let submission = EngineSubmission {
            source,
            inputs,
            options: options_path,
            labels: labels_path,
            dependencies,
            workflow_type: plan.workflow_type,
            workflow_type_version: plan.workflow_type_version,
            requested_id: plan.requested_id,
        };
        tracing::debug!("📨 Forwarding submission bundle to execution engine");
        Ok(self.collaborators.engine.submit(&submission).await?)
    }
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}
