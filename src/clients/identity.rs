/// Identity service client
///
/// Resolves the caller's email and the per-user service identity (and its key
/// material) used by the engine to run the caller's workflows in their project.

use super::{status_error, ServiceError};
use crate::workflow::types::BearerToken;
use async_trait::async_trait;
use serde::Deserialize;

const SERVICE: &str = "identity service";

#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn caller_email(&self, token: &BearerToken) -> Result<String, ServiceError>;

    /// Key material for the caller's service identity in `project`
    async fn service_identity_key(&self, project: &str, email: &str) -> Result<String, ServiceError>;

    /// Email of the caller's service identity in `project`
    async fn service_identity(&self, project: &str, token: &BearerToken) -> Result<String, ServiceError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserInfo {
    user_email: String,
}

/// reqwest-backed identity service client
#[derive(Debug, Clone)]
pub struct HttpIdentityService {
    http: reqwest::Client,
    base_url: String,
    /// Needed for the admin-only key lookup
    service_token: Option<String>,
}

impl HttpIdentityService {
    pub fn new(base_url: impl Into<String>, service_token: Option<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            service_token,
        }
    }

    async fn get(&self, segments: &[&str], token: Option<&str>) -> Result<reqwest::Response, ServiceError> {
        let url = super::join_segments(&self.base_url, segments).map_err(|message| ServiceError::Status {
            service: SERVICE,
            code: 500,
            message,
        })?;
        let mut request = self.http.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|source| ServiceError::Transport { service: SERVICE, source })?;
        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn caller_email(&self, token: &BearerToken) -> Result<String, ServiceError> {
        let info: UserInfo = self
            .get(&["register", "user", "v2", "self", "info"], Some(token.as_str()))
            .await?
            .json()
            .await
            .map_err(|source| ServiceError::Transport { service: SERVICE, source })?;
        Ok(info.user_email)
    }

    async fn service_identity_key(&self, project: &str, email: &str) -> Result<String, ServiceError> {
        let response = self
            .get(
                &["api", "google", "v1", "petServiceAccount", project, email, "key"],
                self.service_token.as_deref(),
            )
            .await?;
        // The key document is forwarded verbatim as a JSON string option
        response
            .text()
            .await
            .map_err(|source| ServiceError::Transport { service: SERVICE, source })
    }

    async fn service_identity(&self, project: &str, token: &BearerToken) -> Result<String, ServiceError> {
        self.get(
            &["api", "google", "v1", "user", "petServiceAccount", project],
            Some(token.as_str()),
        )
        .await?
        .json::<String>()
        .await
        .map_err(|source| ServiceError::Transport { service: SERVICE, source })
    }
}
