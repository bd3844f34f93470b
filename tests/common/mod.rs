#![allow(dead_code)]

use async_trait::async_trait;
use flowgate::clients::{
    AccessDecision, EngineError, EngineSubmission, ExecutionEngine, IdentityService, ObjectStorage, ProjectContext,
    ServiceError, StorageError, WorkflowSource, WorkspaceAccess, WorkspaceRole,
};
use flowgate::service::{Collaborators, GatewaySettings, WorkflowGateway};
use flowgate::workflow::types::{
    BearerToken, CallerContext, LabelSet, MetadataFilters, ObjectLocator, OptionSet, WorkflowId,
    WorkflowIdAndStatus, WorkflowQueryResponse, WorkflowQueryResult, WorkflowState, WorkspaceId,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const W1: &str = "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa";
pub const W2: &str = "bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb";
pub const WORKFLOW: &str = "11111111-1111-1111-1111-111111111111";
pub const PROJECT: &str = "terra-proj-1";
pub const EMAIL: &str = "alice@example.org";
pub const SA_KEY: &str = "{\"type\":\"service_account\",\"client_email\":\"pet@terra-proj-1\"}";
pub const COMPUTE_SA: &str = "pet-1234@terra-proj-1.iam.gserviceaccount.com";

pub fn workspace(id: &str) -> WorkspaceId {
    id.parse().unwrap()
}

pub fn workflow_id(id: &str) -> WorkflowId {
    id.parse().unwrap()
}

pub fn caller(workspace_id: &str) -> CallerContext {
    CallerContext::new(workspace(workspace_id), BearerToken::new("token-alice"))
}

pub fn options(value: Value) -> OptionSet {
    value.as_object().cloned().unwrap()
}

// ----------------------------------------------------------------------------
// Workspace access
// ----------------------------------------------------------------------------

pub struct FakeWorkspaces {
    pub decisions: Mutex<HashMap<WorkspaceId, AccessDecision>>,
    pub roles: Mutex<HashMap<WorkspaceId, WorkspaceRole>>,
    pub calls: AtomicUsize,
}

impl FakeWorkspaces {
    pub fn new() -> Self {
        Self {
            decisions: Mutex::new(HashMap::new()),
            roles: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Grant read access with the given role
    pub fn grant(&self, workspace_id: &str, role: WorkspaceRole) {
        let id = workspace(workspace_id);
        self.decisions.lock().unwrap().insert(id, AccessDecision::Granted);
        self.roles.lock().unwrap().insert(id, role);
    }

    pub fn deny(&self, workspace_id: &str, decision: AccessDecision) {
        self.decisions.lock().unwrap().insert(workspace(workspace_id), decision);
    }
}

#[async_trait]
impl WorkspaceAccess for FakeWorkspaces {
    async fn check_read_access(&self, workspace: &WorkspaceId, _: &BearerToken) -> Result<AccessDecision, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self
            .decisions
            .lock()
            .unwrap()
            .get(workspace)
            .unwrap_or(&AccessDecision::NotFound))
    }

    async fn project_context(&self, _: &WorkspaceId, _: &BearerToken) -> Result<ProjectContext, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProjectContext {
            project_id: PROJECT.to_string(),
        })
    }

    async fn highest_role(&self, workspace: &WorkspaceId, _: &BearerToken) -> Result<WorkspaceRole, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.roles
            .lock()
            .unwrap()
            .get(workspace)
            .copied()
            .ok_or(ServiceError::Status {
                service: "workspace service",
                code: 404,
                message: "no such workspace".to_string(),
            })
    }
}

// ----------------------------------------------------------------------------
// Identity
// ----------------------------------------------------------------------------

pub struct FakeIdentity {
    pub calls: AtomicUsize,
}

#[async_trait]
impl IdentityService for FakeIdentity {
    async fn caller_email(&self, _: &BearerToken) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EMAIL.to_string())
    }

    async fn service_identity_key(&self, project: &str, email: &str) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(project, PROJECT);
        assert_eq!(email, EMAIL);
        Ok(SA_KEY.to_string())
    }

    async fn service_identity(&self, project: &str, _: &BearerToken) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(project, PROJECT);
        Ok(COMPUTE_SA.to_string())
    }
}

// ----------------------------------------------------------------------------
// Object storage
// ----------------------------------------------------------------------------

pub struct FakeStorage {
    pub objects: Mutex<HashMap<ObjectLocator, Vec<u8>>>,
    pub calls: AtomicUsize,
    pub fail_listing: Mutex<bool>,
}

impl FakeStorage {
    pub fn put(&self, uri: &str, body: &str) {
        self.put_bytes(uri, body.as_bytes());
    }

    pub fn put_bytes(&self, uri: &str, body: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(ObjectLocator::parse(uri).unwrap(), body.to_vec());
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn read_object(&self, locator: &ObjectLocator) -> Result<Vec<u8>, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .unwrap()
            .get(locator)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(locator.to_string()))
    }

    async fn list_objects(&self, bucket: &str, prefix: &str, extension: &str) -> Result<Vec<ObjectLocator>, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_listing.lock().unwrap() {
            return Err(StorageError::Status {
                code: 503,
                message: "listing unavailable".to_string(),
            });
        }
        let suffix = format!(".{}", extension);
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|l| l.bucket == bucket && l.parent_prefix() == prefix)
            .filter(|l| extension.is_empty() || l.object.ends_with(&suffix))
            .cloned()
            .collect())
    }
}

// ----------------------------------------------------------------------------
// Execution engine
// ----------------------------------------------------------------------------

/// What the engine saw, read from the bundle files at submit time
#[derive(Debug, Clone)]
pub struct CapturedSubmission {
    pub source: Option<String>,
    /// Source document exactly as staged
    pub source_bytes: Option<Vec<u8>>,
    pub url: Option<String>,
    pub inputs: Option<Value>,
    pub options: OptionSet,
    pub labels: LabelSet,
    pub dependency_entries: Option<Vec<String>>,
    pub workflow_type: String,
    pub workflow_type_version: String,
    pub requested_id: Option<WorkflowId>,
    pub paths: Vec<PathBuf>,
}

pub struct FakeEngine {
    pub labels: Mutex<HashMap<WorkflowId, LabelSet>>,
    pub submissions: Mutex<Vec<CapturedSubmission>>,
    pub queries: Mutex<Vec<Vec<(String, String)>>>,
    pub metadata_requests: Mutex<Vec<MetadataFilters>>,
    pub reject_submit: Mutex<Option<(u16, String)>>,
    pub labels_unreachable: Mutex<bool>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            labels: Mutex::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            metadata_requests: Mutex::new(Vec::new()),
            reject_submit: Mutex::new(None),
            labels_unreachable: Mutex::new(false),
        }
    }

    /// Register an existing workflow bound to `workspace_id`
    pub fn bind(&self, workflow: &str, workspace_id: &str) {
        let mut labels = LabelSet::new();
        labels.insert("workspace-id".to_string(), workspace_id.to_string());
        labels.insert("user-email".to_string(), EMAIL.to_string());
        self.labels.lock().unwrap().insert(workflow_id(workflow), labels);
    }

    pub fn last_submission(&self) -> CapturedSubmission {
        self.submissions.lock().unwrap().last().cloned().expect("no submission recorded")
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> T {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

fn zip_entries(path: &PathBuf) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut names = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut sink = String::new();
        entry.read_to_string(&mut sink).unwrap();
        names.push(entry.name().to_string());
    }
    names.sort();
    names
}

#[async_trait]
impl ExecutionEngine for FakeEngine {
    async fn submit(&self, submission: &EngineSubmission) -> Result<WorkflowIdAndStatus, EngineError> {
        let mut paths = vec![submission.options.clone(), submission.labels.clone()];
        let (source_bytes, url) = match &submission.source {
            WorkflowSource::File(path) => {
                paths.push(path.clone());
                (Some(std::fs::read(path).unwrap()), None)
            }
            WorkflowSource::Url(url) => (None, Some(url.clone())),
        };
        let source = source_bytes
            .as_ref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned());
        if let Some(inputs) = &submission.inputs {
            paths.push(inputs.clone());
        }
        if let Some(deps) = &submission.dependencies {
            paths.push(deps.clone());
        }

        let captured = CapturedSubmission {
            source,
            source_bytes,
            url,
            inputs: submission.inputs.as_ref().map(read_json),
            options: read_json(&submission.options),
            labels: read_json(&submission.labels),
            dependency_entries: submission.dependencies.as_ref().map(zip_entries),
            workflow_type: submission.workflow_type.clone(),
            workflow_type_version: submission.workflow_type_version.clone(),
            requested_id: submission.requested_id,
            paths,
        };
        let labels = captured.labels.clone();
        self.submissions.lock().unwrap().push(captured);

        if let Some((code, message)) = self.reject_submit.lock().unwrap().clone() {
            return Err(EngineError::Status { code, message });
        }

        let id = submission.requested_id.unwrap_or_else(WorkflowId::new);
        self.labels.lock().unwrap().insert(id, labels);
        Ok(WorkflowIdAndStatus {
            id,
            status: WorkflowState::Submitted,
        })
    }

    async fn status(&self, id: &WorkflowId) -> Result<WorkflowIdAndStatus, EngineError> {
        Ok(WorkflowIdAndStatus {
            id: *id,
            status: WorkflowState::Running,
        })
    }

    async fn labels(&self, id: &WorkflowId) -> Result<LabelSet, EngineError> {
        if *self.labels_unreachable.lock().unwrap() {
            return Err(EngineError::Status {
                code: 503,
                message: "engine unavailable".to_string(),
            });
        }
        self.labels
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::Status {
                code: 404,
                message: format!("Unrecognized workflow ID: {}", id),
            })
    }

    async fn metadata(&self, id: &WorkflowId, filters: &MetadataFilters) -> Result<Value, EngineError> {
        self.metadata_requests.lock().unwrap().push(filters.clone());
        Ok(json!({ "id": id.to_string(), "status": "Running", "calls": {} }))
    }

    async fn query(&self, params: &[(String, String)]) -> Result<WorkflowQueryResponse, EngineError> {
        self.queries.lock().unwrap().push(params.to_vec());
        Ok(WorkflowQueryResponse {
            results: vec![WorkflowQueryResult {
                id: workflow_id(WORKFLOW),
                name: Some("main".to_string()),
                status: Some(WorkflowState::Running),
                submission: None,
                start: None,
                end: None,
                labels: None,
                parent_workflow_id: None,
                root_workflow_id: None,
            }],
            total_results_count: 1,
        })
    }
}

// ----------------------------------------------------------------------------
// Harness
// ----------------------------------------------------------------------------

pub struct Harness {
    pub gateway: WorkflowGateway,
    pub workspaces: Arc<FakeWorkspaces>,
    pub identity: Arc<FakeIdentity>,
    pub storage: Arc<FakeStorage>,
    pub engine: Arc<FakeEngine>,
    pub scratch: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let workspaces = Arc::new(FakeWorkspaces::new());
        let identity = Arc::new(FakeIdentity {
            calls: AtomicUsize::new(0),
        });
        let storage = Arc::new(FakeStorage {
            objects: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            fail_listing: Mutex::new(false),
        });
        let engine = Arc::new(FakeEngine::new());
        let scratch = tempfile::tempdir().unwrap();

        let collaborators = Collaborators {
            workspaces: workspaces.clone(),
            identity: identity.clone(),
            storage: storage.clone(),
            engine: engine.clone(),
        };
        let settings = GatewaySettings {
            scratch_dir: scratch.path().to_path_buf(),
            default_runtime_attributes: json!({ "zones": "us-central1-a us-central1-b" }),
        };

        Self {
            gateway: WorkflowGateway::new(collaborators, settings),
            workspaces,
            identity,
            storage,
            engine,
            scratch,
        }
    }

    /// Number of entries currently left in the scratch root
    pub fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.scratch.path()).unwrap().count()
    }

    pub fn external_calls(&self) -> usize {
        self.workspaces.calls.load(Ordering::SeqCst)
            + self.identity.calls.load(Ordering::SeqCst)
            + self.storage.calls.load(Ordering::SeqCst)
            + self.engine.submissions.lock().unwrap().len()
    }
}
