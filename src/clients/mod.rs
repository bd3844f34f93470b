/// External collaborator clients
///
/// One trait per collaborator (execution engine, object storage, workspace access,
/// identity) with its own error type, plus a reqwest-backed implementation of each.
/// The gateway holds them as `Arc<dyn Trait>` so tests can swap in fakes.

// Remote workflow execution engine
pub mod engine;

// Cloud object storage holding workflow sources
pub mod storage;

// Workspace access and project context
pub mod workspace;

// Caller identity and service identities
pub mod identity;

pub use engine::{EngineClient, EngineError, EngineSubmission, ExecutionEngine, WorkflowSource};
pub use identity::{HttpIdentityService, IdentityService};
pub use storage::{GcsObjectStorage, ObjectStorage, StorageError};
pub use workspace::{AccessDecision, HttpWorkspaceAccess, ProjectContext, WorkspaceAccess, WorkspaceRole};

use std::time::Duration;
use thiserror::Error;

/// Failure talking to the workspace or identity service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} returned {code}: {message}")]
    Status {
        service: &'static str,
        code: u16,
        message: String,
    },
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} response missing {field}")]
    MissingField {
        service: &'static str,
        field: &'static str,
    },
}

/// Build the reqwest client shared by every collaborator implementation
pub fn build_http_client(timeout_secs: u64) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Turn a non-success response into a `ServiceError::Status`
pub(crate) async fn status_error(service: &'static str, response: reqwest::Response) -> ServiceError {
    let code = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    ServiceError::Status { service, code, message }
}

/// Join path segments onto a base URL, percent-encoding each segment
pub(crate) fn join_segments(base_url: &str, segments: &[&str]) -> Result<reqwest::Url, String> {
    let mut url = reqwest::Url::parse(base_url).map_err(|e| format!("invalid base url {}: {}", base_url, e))?;
    url.path_segments_mut()
        .map_err(|_| format!("base url cannot carry a path: {}", base_url))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
