/// Execution engine client
///
/// The engine owns workflow run state; the gateway only submits bundles and reads
/// status, labels, metadata and query results back. `EngineClient` speaks the
/// engine's REST dialect under `{base}/api/workflows/v1`.

use crate::workflow::types::{
    LabelSet, MetadataFilters, WorkflowId, WorkflowIdAndStatus, WorkflowLabels, WorkflowQueryResponse,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("execution engine returned {code}: {message}")]
    Status { code: u16, message: String },
    #[error("execution engine request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid execution engine url: {0}")]
    InvalidUrl(String),
    #[error("failed to read submission artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the engine gets the main source document from
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowSource {
    /// Locally staged copy, uploaded with the submission
    File(PathBuf),
    /// URL the engine fetches itself
    Url(String),
}

/// A fully assembled submission bundle, backed by scratch files
#[derive(Debug, Clone)]
pub struct EngineSubmission {
    pub source: WorkflowSource,
    pub inputs: Option<PathBuf>,
    pub options: PathBuf,
    pub labels: PathBuf,
    /// Zip archive of sibling source files, when the main document has imports
    pub dependencies: Option<PathBuf>,
    pub workflow_type: String,
    pub workflow_type_version: String,
    pub requested_id: Option<WorkflowId>,
}

#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    async fn submit(&self, submission: &EngineSubmission) -> Result<WorkflowIdAndStatus, EngineError>;

    async fn status(&self, id: &WorkflowId) -> Result<WorkflowIdAndStatus, EngineError>;

    async fn labels(&self, id: &WorkflowId) -> Result<LabelSet, EngineError>;

    async fn metadata(&self, id: &WorkflowId, filters: &MetadataFilters) -> Result<Value, EngineError>;

    /// Run a query; `params` may repeat keys (e.g. several `label` filters)
    async fn query(&self, params: &[(String, String)]) -> Result<WorkflowQueryResponse, EngineError>;
}

/// Failure body the engine sends with non-2xx responses
#[derive(Debug, Deserialize)]
struct EngineFailure {
    message: String,
}

/// reqwest-backed engine client
#[derive(Debug, Clone)]
pub struct EngineClient {
    http: reqwest::Client,
    base_url: String,
}

impl EngineClient {
    pub const API_VERSION: &'static str = "v1";

    pub fn new(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn url(&self, tail: &[&str]) -> Result<reqwest::Url, EngineError> {
        let mut segments = vec!["api", "workflows", Self::API_VERSION];
        segments.extend_from_slice(tail);
        super::join_segments(&self.base_url, &segments).map_err(EngineError::InvalidUrl)
    }

    /// Decode a successful JSON body, or turn the failure into `EngineError::Status`
    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, EngineError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<EngineFailure>(&body)
            .map(|failure| failure.message)
            .unwrap_or(body);
        tracing::error!("❌ Execution engine returned {}: {}", status.as_u16(), message);
        Err(EngineError::Status {
            code: status.as_u16(),
            message,
        })
    }
}

async fn file_part(path: &Path, name: &str) -> Result<Part, EngineError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| EngineError::Artifact {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Part::bytes(bytes).file_name(name.to_string()))
}

#[async_trait]
impl ExecutionEngine for EngineClient {
    async fn submit(&self, submission: &EngineSubmission) -> Result<WorkflowIdAndStatus, EngineError> {
        let mut form = Form::new()
            .text("workflowType", submission.workflow_type.clone())
            .text("workflowTypeVersion", submission.workflow_type_version.clone())
            .part("workflowOptions", file_part(&submission.options, "options.json").await?)
            .part("labels", file_part(&submission.labels, "labels.json").await?);

        form = match &submission.source {
            WorkflowSource::File(path) => form.part("workflowSource", file_part(path, "workflow").await?),
            WorkflowSource::Url(url) => form.text("workflowUrl", url.clone()),
        };
        if let Some(inputs) = &submission.inputs {
            form = form.part("workflowInputs", file_part(inputs, "inputs.json").await?);
        }
        if let Some(dependencies) = &submission.dependencies {
            form = form.part("workflowDependencies", file_part(dependencies, "dependencies.zip").await?);
        }
        if let Some(id) = &submission.requested_id {
            form = form.text("requestedWorkflowId", id.to_string());
        }

        let response = self.http.post(self.url(&[])?).multipart(form).send().await?;
        Self::decode(response).await
    }

    async fn status(&self, id: &WorkflowId) -> Result<WorkflowIdAndStatus, EngineError> {
        let id = id.to_string();
        let response = self.http.get(self.url(&[id.as_str(), "status"])?).send().await?;
        Self::decode(response).await
    }

    async fn labels(&self, id: &WorkflowId) -> Result<LabelSet, EngineError> {
        let id = id.to_string();
        let response = self.http.get(self.url(&[id.as_str(), "labels"])?).send().await?;
        let labels: WorkflowLabels = Self::decode(response).await?;
        Ok(labels.labels)
    }

    async fn metadata(&self, id: &WorkflowId, filters: &MetadataFilters) -> Result<Value, EngineError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        for key in &filters.include_keys {
            params.push(("includeKey", key.clone()));
        }
        for key in &filters.exclude_keys {
            params.push(("excludeKey", key.clone()));
        }
        params.push(("expandSubWorkflows", filters.expand_sub_workflows.to_string()));

        let id = id.to_string();
        let response = self
            .http
            .get(self.url(&[id.as_str(), "metadata"])?)
            .query(&params)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn query(&self, params: &[(String, String)]) -> Result<WorkflowQueryResponse, EngineError> {
        let response = self.http.get(self.url(&["query"])?).query(params).send().await?;
        Self::decode(response).await
    }
}
