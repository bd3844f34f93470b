/// flowgate: workspace-scoped gateway in front of a remote workflow execution engine
///
/// Proves workflows belong to the calling workspace before exposing them,
/// assembles self-contained submission bundles from object storage, and binds
/// every submission to its workspace through gateway-owned labels.

// Core configuration and setup
pub mod config;

// Error taxonomy and HTTP mapping
pub mod error;

// Workflow domain types and preset injection
pub mod workflow;

// Scoped scratch resources and dependency staging
pub mod staging;

// External collaborator clients (engine, storage, workspace, identity)
pub mod clients;

// Access validation and submission orchestration
pub mod service;

// HTTP API layer - workspace-scoped workflow endpoints
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::GatewayError;
pub use server::start_server;
pub use service::WorkflowGateway;
pub use workflow::{CallerContext, WorkflowId, WorkspaceId};
