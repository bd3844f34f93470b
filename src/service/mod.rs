/// Gateway Service Layer
///
/// The workspace-scoped operations exposed to callers:
/// - Access validation (workspace read access + workflow tenancy label)
/// - Submission orchestration
/// - Gated status/labels/metadata reads and workspace-scoped queries

// Workspace access and tenancy label checks
pub mod access;

// Submission orchestrator and read operations
pub mod gateway;

pub use access::AccessValidator;
pub use gateway::{Collaborators, GatewaySettings, WorkflowGateway};
