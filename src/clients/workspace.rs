/// Workspace access service client
///
/// Answers three questions about a caller and a workspace: may they read it,
/// which cloud project backs it, and what is their highest role in it.

use super::{status_error, ServiceError};
use crate::workflow::types::{BearerToken, WorkspaceId};
use async_trait::async_trait;
use serde::Deserialize;

const SERVICE: &str = "workspace service";

/// Outcome of a read-access check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Forbidden,
    NotFound,
}

/// Workspace roles, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkspaceRole {
    Discoverer,
    Reader,
    Writer,
    Applicator,
    Owner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    pub project_id: String,
}

#[async_trait]
pub trait WorkspaceAccess: Send + Sync {
    async fn check_read_access(
        &self,
        workspace: &WorkspaceId,
        token: &BearerToken,
    ) -> Result<AccessDecision, ServiceError>;

    async fn project_context(
        &self,
        workspace: &WorkspaceId,
        token: &BearerToken,
    ) -> Result<ProjectContext, ServiceError>;

    async fn highest_role(
        &self,
        workspace: &WorkspaceId,
        token: &BearerToken,
    ) -> Result<WorkspaceRole, ServiceError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceDescription {
    highest_role: Option<WorkspaceRole>,
    gcp_context: Option<GcpContext>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcpContext {
    project_id: String,
}

/// reqwest-backed workspace service client
#[derive(Debug, Clone)]
pub struct HttpWorkspaceAccess {
    http: reqwest::Client,
    base_url: String,
}

impl HttpWorkspaceAccess {
    pub fn new(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn fetch(&self, workspace: &WorkspaceId, token: &BearerToken) -> Result<reqwest::Response, ServiceError> {
        let id = workspace.to_string();
        let url = super::join_segments(&self.base_url, &["api", "workspaces", "v1", id.as_str()]).map_err(|message| {
            ServiceError::Status {
                service: SERVICE,
                code: 500,
                message,
            }
        })?;
        self.http
            .get(url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|source| ServiceError::Transport { service: SERVICE, source })
    }

    async fn describe(&self, workspace: &WorkspaceId, token: &BearerToken) -> Result<WorkspaceDescription, ServiceError> {
        let response = self.fetch(workspace, token).await?;
        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }
        response
            .json()
            .await
            .map_err(|source| ServiceError::Transport { service: SERVICE, source })
    }
}

#[async_trait]
impl WorkspaceAccess for HttpWorkspaceAccess {
    async fn check_read_access(
        &self,
        workspace: &WorkspaceId,
        token: &BearerToken,
    ) -> Result<AccessDecision, ServiceError> {
        let response = self.fetch(workspace, token).await?;
        match response.status().as_u16() {
            200..=299 => Ok(AccessDecision::Granted),
            401 | 403 => Ok(AccessDecision::Forbidden),
            404 => Ok(AccessDecision::NotFound),
            _ => Err(status_error(SERVICE, response).await),
        }
    }

    async fn project_context(
        &self,
        workspace: &WorkspaceId,
        token: &BearerToken,
    ) -> Result<ProjectContext, ServiceError> {
        let description = self.describe(workspace, token).await?;
        let gcp = description.gcp_context.ok_or(ServiceError::MissingField {
            service: SERVICE,
            field: "gcpContext",
        })?;
        Ok(ProjectContext {
            project_id: gcp.project_id,
        })
    }

    async fn highest_role(
        &self,
        workspace: &WorkspaceId,
        token: &BearerToken,
    ) -> Result<WorkspaceRole, ServiceError> {
        self.describe(workspace, token)
            .await?
            .highest_role
            .ok_or(ServiceError::MissingField {
                service: SERVICE,
                field: "highestRole",
            })
    }
}
