/// Gateway error taxonomy
///
/// Collaborator errors are mapped onto these variants at the service boundary;
/// the HTTP layer turns them into status codes and a small JSON body.

use crate::clients::{EngineError, ServiceError, StorageError};
use crate::staging::DependencyError;
use crate::workflow::types::{WorkflowId, WorkspaceId};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed or incomplete request; raised before any external call
    #[error("invalid request: {0}")]
    CallerInput(String),

    #[error("caller is not allowed to {action} workspace {workspace}")]
    Authorization { workspace: WorkspaceId, action: &'static str },

    /// Workflow is not bound to the caller's workspace. Also used when the
    /// workflow's labels cannot be fetched at all.
    #[error("workflow {workflow} is not a member of workspace {workspace}")]
    TenancyMismatch { workflow: WorkflowId, workspace: WorkspaceId },

    #[error("failed to stage workflow dependencies: {0}")]
    DependencyResolution(#[source] DependencyError),

    #[error("execution engine error ({code}): {message}")]
    Engine { code: u16, message: String },

    #[error("failed to read workflow source: {0}")]
    Storage(#[source] StorageError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("local staging failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize submission document: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<EngineError> for GatewayError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Status { code, message } => GatewayError::Engine { code, message },
            other => GatewayError::Engine {
                code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                message: other.to_string(),
            },
        }
    }
}

impl From<DependencyError> for GatewayError {
    fn from(err: DependencyError) -> Self {
        GatewayError::DependencyResolution(err)
    }
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::CallerInput(_) | GatewayError::TenancyMismatch { .. } => StatusCode::BAD_REQUEST,
            GatewayError::Authorization { .. } => StatusCode::FORBIDDEN,
            GatewayError::Engine { code, .. } => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            GatewayError::Service(_) => StatusCode::BAD_GATEWAY,
            GatewayError::DependencyResolution(_)
            | GatewayError::Storage(_)
            | GatewayError::Io(_)
            | GatewayError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Failure on our side or a collaborator's, as opposed to a caller mistake.
    /// Decides between `error!` and `info!` logging.
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_server_error() {
            tracing::error!("❌ {}", self);
        } else {
            tracing::info!("🚫 Rejected request: {}", self);
        }
        let body = json!({
            "message": self.to_string(),
            "statusCode": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}
