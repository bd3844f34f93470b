/// Core type definitions shared by the gateway layers
///
/// Identifiers, label/option sets, storage locators and the caller-facing
/// request/response shapes. Engine payloads are relayed in these shapes so the
/// HTTP layer never sees raw engine JSON except for metadata documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Workflow labels: string keys to string values, unordered
pub type LabelSet = HashMap<String, String>;

/// Workflow options: string keys to arbitrary JSON
pub type OptionSet = serde_json::Map<String, Value>;

/// Identifier assigned by the execution engine (or requested by the caller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(pub Uuid);

impl WorkflowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for WorkflowId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Identifier of the workspace that owns a workflow
///
/// The `Display` form is the canonical lowercase hyphenated UUID; it is the exact
/// string written to and compared against the `workspace-id` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(pub Uuid);

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for WorkspaceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Caller's bearer token, forwarded to collaborators on the caller's behalf
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Mandatory context of every gateway operation
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub workspace_id: WorkspaceId,
    pub token: BearerToken,
}

impl CallerContext {
    pub fn new(workspace_id: WorkspaceId, token: BearerToken) -> Self {
        Self { workspace_id, token }
    }
}

/// Location of an object in cloud storage (`gs://bucket/path/to/object`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocator {
    pub bucket: String,
    pub object: String,
}

impl ObjectLocator {
    pub const SCHEME: &'static str = "gs://";

    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
        }
    }

    /// Parse a `gs://bucket/object` URI. Both bucket and object must be non-empty.
    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix(Self::SCHEME)?;
        let (bucket, object) = rest.split_once('/')?;
        if bucket.is_empty() || object.is_empty() {
            return None;
        }
        Some(Self::new(bucket, object))
    }

    /// Object path of the enclosing "directory", including the trailing slash.
    /// Empty for objects at the bucket root.
    pub fn parent_prefix(&self) -> &str {
        match self.object.rfind('/') {
            Some(idx) => &self.object[..=idx],
            None => "",
        }
    }

    /// Last path segment of the object
    pub fn file_name(&self) -> &str {
        self.object.rsplit('/').next().unwrap_or(&self.object)
    }

    /// Extension of the object's file name without the dot (e.g., "wdl")
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 && idx + 1 < name.len() => Some(&name[idx + 1..]),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", Self::SCHEME, self.bucket, self.object)
    }
}

/// Run state reported by the execution engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    Submitted,
    Running,
    Aborting,
    Aborted,
    Failed,
    Succeeded,
    #[serde(rename = "On Hold")]
    OnHold,
    /// Any state this gateway does not know about yet
    #[serde(other)]
    Unknown,
}

/// `{id, status}` pair returned by submit and status calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowIdAndStatus {
    pub id: WorkflowId,
    pub status: WorkflowState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowLabels {
    pub id: WorkflowId,
    pub labels: LabelSet,
}

/// Caller-facing submission request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitWorkflowRequest {
    /// Storage location of the main source document (`gs://...`)
    pub workflow_source_uri: Option<String>,
    /// Direct URL of the main source document, used when no storage locator is given
    pub workflow_url: Option<String>,
    pub workflow_inputs: Option<Value>,
    pub workflow_options: Option<OptionSet>,
    pub labels: Option<LabelSet>,
    pub workflow_type: Option<String>,
    pub workflow_type_version: Option<String>,
    pub requested_workflow_id: Option<WorkflowId>,
}

/// Field filters for metadata retrieval
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilters {
    pub include_keys: Vec<String>,
    pub exclude_keys: Vec<String>,
    pub expand_sub_workflows: bool,
}

/// Caller-controllable query filters
///
/// There is deliberately no label filter here: queries are always scoped by the
/// gateway to the caller's workspace label and nothing else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilters {
    pub statuses: Vec<String>,
    pub names: Vec<String>,
    pub ids: Vec<WorkflowId>,
    pub submission: Option<DateTime<Utc>>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub include_subworkflows: Option<bool>,
    pub additional_query_result_fields: Vec<String>,
}

impl QueryFilters {
    pub const DEFAULT_PAGE_SIZE: u32 = 100;

    /// Flatten into engine query parameters (repeated keys allowed)
    pub fn to_engine_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        for status in &self.statuses {
            params.push(("status".to_string(), status.clone()));
        }
        for name in &self.names {
            params.push(("name".to_string(), name.clone()));
        }
        for id in &self.ids {
            params.push(("id".to_string(), id.to_string()));
        }
        if let Some(submission) = self.submission {
            params.push(("submission".to_string(), submission.to_rfc3339()));
        }
        if let Some(start) = self.start {
            params.push(("start".to_string(), start.to_rfc3339()));
        }
        if let Some(end) = self.end {
            params.push(("end".to_string(), end.to_rfc3339()));
        }
        if let Some(page) = self.page {
            params.push(("page".to_string(), page.to_string()));
        }
        params.push((
            "pageSize".to_string(),
            self.page_size.unwrap_or(Self::DEFAULT_PAGE_SIZE).to_string(),
        ));
        if let Some(include) = self.include_subworkflows {
            params.push(("includeSubworkflows".to_string(), include.to_string()));
        }
        for field in &self.additional_query_result_fields {
            params.push(("additionalQueryResultFields".to_string(), field.clone()));
        }
        params
    }
}

/// One row of an engine query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowQueryResult {
    pub id: WorkflowId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkflowState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<LabelSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_workflow_id: Option<WorkflowId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_workflow_id: Option<WorkflowId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowQueryResponse {
    pub results: Vec<WorkflowQueryResult>,
    pub total_results_count: u64,
}
